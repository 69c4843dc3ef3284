use serde::{Deserialize, Serialize};

/// Frames a client sends over its push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Join(JoinFrame),
}

/// Wire shape of an inbound frame. Keys other than `join` are ignored.
#[derive(Deserialize)]
struct Inbound {
    join: Option<JoinFrame>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JoinFrame {
    #[serde(alias = "userID")]
    pub player_token: String,
    #[serde(alias = "gameID")]
    pub session_token: String,
}

/// Notifications pushed to a connected player.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ServerFrame {
    /// The opponent's push channel came up.
    Connect(String),
    /// The opponent submitted a card.
    Submit(u32),
}

impl ClientFrame {
    /// Returns `None` for anything that isn't a recognised frame.
    pub fn decode(text: &str) -> Option<Self> {
        let inbound: Inbound = serde_json::from_str(text).ok()?;
        inbound.join.map(ClientFrame::Join)
    }
}

impl ServerFrame {
    pub fn encode(&self) -> String {
        // Both variants hold plain strings or integers, which always serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}
