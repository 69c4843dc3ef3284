use crate::connection::Connection;
use crate::frame::ServerFrame;
use crate::sampler::Sampler;
use std::sync::Arc;

/// One seat at the table.
#[derive(Default)]
pub struct Player {
    pub name: String,
    pub token: String,
    pub conn: Option<Arc<Connection>>,
    pub submitted: bool,
}

impl Player {
    fn is_seated(&self) -> bool {
        !self.token.is_empty()
    }

    fn push(&self, frame: &ServerFrame) {
        if let Some(conn) = &self.conn {
            conn.push(frame);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    fn index(self) -> usize {
        match self {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }

    fn other(self) -> Self {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }
}

/// A single game. Every method is a complete read-modify-write and is only
/// ever called with exclusive access to the session.
pub struct Session {
    players: [Player; 2],
    chart: usize,
    charts: Sampler,
    cards: Sampler,
}

impl Session {
    pub fn new(host_name: String, host_token: String, charts: Sampler, cards: Sampler) -> Self {
        let host = Player {
            name: host_name,
            token: host_token,
            conn: None,
            // Pre-satisfied so the first round deals immediately.
            submitted: true,
        };
        let guest = Player {
            submitted: true,
            ..Player::default()
        };
        Self {
            players: [host, guest],
            chart: 0,
            charts,
            cards,
        }
    }

    pub fn player(&self, seat: Seat) -> &Player {
        &self.players[seat.index()]
    }

    fn player_mut(&mut self, seat: Seat) -> &mut Player {
        &mut self.players[seat.index()]
    }

    pub fn seat_of(&self, token: &str) -> Option<Seat> {
        [Seat::First, Seat::Second]
            .into_iter()
            .find(|&seat| self.player(seat).is_seated() && self.player(seat).token == token)
    }

    pub fn has_guest(&self) -> bool {
        self.player(Seat::Second).is_seated()
    }

    pub fn seat_guest(&mut self, name: String, token: String) {
        let guest = self.player_mut(Seat::Second);
        guest.name = name;
        guest.token = token;
    }

    /// Marks `token`'s card as played and tells the opponent which one.
    /// Unknown tokens change nothing.
    pub fn submit(&mut self, token: &str, card: u32) -> Option<Seat> {
        let seat = self.seat_of(token)?;
        self.player_mut(seat).submitted = true;
        self.player(seat.other()).push(&ServerFrame::Submit(card));
        Some(seat)
    }

    /// Deals a new chart once both players have submitted; otherwise the
    /// current chart stands.
    pub fn advance_round(&mut self) -> usize {
        if self.players.iter().all(|p| p.submitted) {
            for p in &mut self.players {
                p.submitted = false;
            }
            self.chart = self.charts.draw();
        }
        self.chart
    }

    pub fn draw_card(&mut self) -> usize {
        self.cards.draw()
    }

    /// Attaches a push channel to `token`'s seat, replacing any earlier one,
    /// and announces the player to an already connected opponent.
    pub fn bind(&mut self, token: &str, conn: Arc<Connection>) -> Option<Seat> {
        let seat = self.seat_of(token)?;
        self.player_mut(seat).conn = Some(conn);
        let name = self.player(seat).name.clone();
        self.player(seat.other()).push(&ServerFrame::Connect(name));
        Some(seat)
    }

    pub fn submitted(&self) -> (bool, bool) {
        (
            self.player(Seat::First).submitted,
            self.player(Seat::Second).submitted,
        )
    }

    pub fn bound(&self) -> (bool, bool) {
        (
            self.player(Seat::First).conn.is_some(),
            self.player(Seat::Second).conn.is_some(),
        )
    }
}
