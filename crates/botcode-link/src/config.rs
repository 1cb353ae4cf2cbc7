//! Link pacing configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Delays the receiver needs between packets, plus progress reporting.
///
/// Loaded from JSON; any missing key takes its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct LinkConfig {
    /// Pause after BEGIN and after END, in milliseconds
    pub settle_ms: u64,
    /// Pause after each CHUNK, in milliseconds
    pub inter_packet_ms: u64,
    /// Log progress every this many chunks (and on the last one). Zero
    /// only logs the last chunk.
    pub progress_every: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            settle_ms: 60,
            inter_packet_ms: 30,
            progress_every: 5,
        }
    }
}

impl LinkConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn inter_packet(&self) -> Duration {
        Duration::from_millis(self.inter_packet_ms)
    }

    /// Whether chunk number `index` (1-based) of `total` gets a progress line
    pub fn reports_progress(&self, index: usize, total: usize) -> bool {
        index == total || (self.progress_every != 0 && index % self.progress_every == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.settle(), Duration::from_millis(60));
        assert_eq!(config.inter_packet(), Duration::from_millis(30));
        assert_eq!(LinkConfig::from_json("{}").unwrap(), config);
    }

    #[test]
    fn test_partial_override() {
        let config = LinkConfig::from_json(r#"{ "inter_packet_ms": 5 }"#).unwrap();
        assert_eq!(config.inter_packet_ms, 5);
        assert_eq!(config.settle_ms, 60);
    }

    #[test]
    fn test_bad_json() {
        assert!(LinkConfig::from_json(r#"{ "settle_ms": "soon" }"#).is_err());
    }

    #[test]
    fn test_progress_schedule() {
        let config = LinkConfig::default();
        let reported: Vec<usize> = (1..=12).filter(|&i| config.reports_progress(i, 12)).collect();
        assert_eq!(reported, vec![5, 10, 12]);

        let quiet = LinkConfig {
            progress_every: 0,
            ..LinkConfig::default()
        };
        assert!(!quiet.reports_progress(5, 12));
        assert!(quiet.reports_progress(12, 12));
    }
}
