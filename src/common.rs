use serde::{Deserialize, Serialize};
use std::{error::Error, path::PathBuf};

pub type BoxError = Box<dyn Error + Send + Sync>;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";
pub const CHART_COUNT: usize = 44;
pub const CARD_COUNT: usize = 272;
/// Outbound frames buffered per push channel before it is considered stalled.
pub const QUEUE_CAPACITY: usize = 256;
/// Largest deck a sampler may hold.
pub const MAX_DECK: usize = 1 << 20;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub addr: String,
    pub threads: usize,
    pub queue_capacity: usize,
    pub chart_count: usize,
    pub card_count: usize,
    pub static_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.into(),
            threads: num_cpus::get(),
            queue_capacity: QUEUE_CAPACITY,
            chart_count: CHART_COUNT,
            card_count: CARD_COUNT,
            static_dir: None,
        }
    }
}

impl Config {
    /// Loads a JSON config file; fields left out keep their defaults.
    pub fn from_json_file(path: &str) -> Result<Self, BoxError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, BoxError> {
        let cfg: Config = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), BoxError> {
        if self.chart_count == 0 || self.card_count == 0 {
            return Err("chart_count and card_count must be at least 1".into());
        }
        if self.chart_count > MAX_DECK || self.card_count > MAX_DECK {
            return Err(format!("chart_count and card_count must be at most {MAX_DECK}").into());
        }
        if self.queue_capacity == 0 {
            return Err("queue_capacity must be at least 1".into());
        }
        if self.threads == 0 {
            return Err("threads must be at least 1".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_deck_sizes() {
        let cfg = Config::default();
        assert_eq!(cfg.addr, "0.0.0.0:8080");
        assert_eq!(cfg.chart_count, 44);
        assert_eq!(cfg.card_count, 272);
        assert_eq!(cfg.queue_capacity, 256);
        assert!(cfg.threads >= 1);
        assert!(cfg.static_dir.is_none());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = Config::from_json(r#"{"addr": "127.0.0.1:9000", "static_dir": "assets"}"#).unwrap();
        assert_eq!(cfg.addr, "127.0.0.1:9000");
        assert_eq!(cfg.static_dir, Some(PathBuf::from("assets")));
        assert_eq!(cfg.chart_count, CHART_COUNT);
    }

    #[test]
    fn empty_deck_is_rejected() {
        assert!(Config::from_json(r#"{"chart_count": 0}"#).is_err());
        assert!(Config::from_json(r#"{"queue_capacity": 0}"#).is_err());
    }

    #[test]
    fn oversized_deck_is_rejected() {
        assert!(Config::from_json(r#"{"chart_count": 1000000000000000}"#).is_err());
        assert!(Config::from_json(r#"{"card_count": 1048577}"#).is_err());
        assert!(Config::from_json(r#"{"card_count": 1048576}"#).is_ok());
    }
}
