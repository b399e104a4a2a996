use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Deck file or directory of deck files
    pub decks_path: PathBuf,
    /// Where game documents are written; `None` keeps games in memory
    pub data_dir: Option<PathBuf>,
    pub tx_attempts: u32,
    pub tx_backoff: Duration,
    /// Interval of the background deadline sweep; `None` disables it
    pub deadline_sweep: Option<Duration>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 6574)),
            decks_path: PathBuf::from("decks"),
            data_dir: None,
            tx_attempts: 5,
            tx_backoff: Duration::from_millis(10),
            deadline_sweep: Some(Duration::from_millis(1000)),
        }
    }
}

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = match non_empty("CARDPARTY_BIND") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(
                    "Invalid CARDPARTY_BIND '{}': {}. Using {}",
                    raw,
                    e,
                    defaults.bind_addr
                );
                defaults.bind_addr
            }),
            None => defaults.bind_addr,
        };

        let deadline_sweep = match non_empty("CARDPARTY_DEADLINE_SWEEP_MS")
            .and_then(|s| s.parse::<u64>().ok())
        {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => defaults.deadline_sweep,
        };

        Self {
            bind_addr,
            decks_path: non_empty("CARDPARTY_DECKS")
                .map(PathBuf::from)
                .unwrap_or(defaults.decks_path),
            data_dir: non_empty("CARDPARTY_DATA_DIR").map(PathBuf::from),
            tx_attempts: non_empty("CARDPARTY_TX_ATTEMPTS")
                .and_then(|s| s.parse().ok())
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.tx_attempts),
            tx_backoff: non_empty("CARDPARTY_TX_BACKOFF_MS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.tx_backoff),
            deadline_sweep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 6] = [
        "CARDPARTY_BIND",
        "CARDPARTY_DECKS",
        "CARDPARTY_DATA_DIR",
        "CARDPARTY_TX_ATTEMPTS",
        "CARDPARTY_TX_BACKOFF_MS",
        "CARDPARTY_DEADLINE_SWEEP_MS",
    ];

    fn clear() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    fn set(var: &str, value: &str) {
        std::env::set_var(var, value);
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear();
        let config = AppConfig::from_env();
        assert_eq!(config.bind_addr.port(), 6574);
        assert_eq!(config.decks_path, PathBuf::from("decks"));
        assert!(config.data_dir.is_none());
        assert_eq!(config.tx_attempts, 5);
        assert_eq!(config.deadline_sweep, Some(Duration::from_secs(1)));
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear();
        set("CARDPARTY_BIND", "127.0.0.1:9000");
        set("CARDPARTY_DATA_DIR", "/tmp/games");
        set("CARDPARTY_TX_ATTEMPTS", "8");
        set("CARDPARTY_TX_BACKOFF_MS", "25");
        set("CARDPARTY_DEADLINE_SWEEP_MS", "0");

        let config = AppConfig::from_env();
        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/games")));
        assert_eq!(config.tx_attempts, 8);
        assert_eq!(config.tx_backoff, Duration::from_millis(25));
        assert!(config.deadline_sweep.is_none());
        clear();
    }

    #[test]
    #[serial]
    fn test_garbage_falls_back() {
        clear();
        set("CARDPARTY_BIND", "not an address");
        set("CARDPARTY_TX_ATTEMPTS", "0");
        set("CARDPARTY_DATA_DIR", "   ");

        let config = AppConfig::from_env();
        assert_eq!(config.bind_addr.port(), 6574);
        assert_eq!(config.tx_attempts, 5);
        assert!(config.data_dir.is_none());
        clear();
    }
}
