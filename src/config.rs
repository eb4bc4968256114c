use std::{env, net::SocketAddr, path::PathBuf};

use crate::error::{AppError, AppResult};
use crate::logic::WeekStart;

/// Server configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    // None: follow the profile language
    pub week_start: Option<WeekStart>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            data_dir: PathBuf::from("data"),
            static_dir: PathBuf::from("static"),
            week_start: None,
        }
    }
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let mut cfg = Config::default();

        if let Some(addr) = get("FOCUS_TRACKER_ADDR") {
            cfg.addr = addr
                .parse()
                .map_err(|_| AppError::invalid(format!("invalid FOCUS_TRACKER_ADDR: {addr}")))?;
        }
        if let Some(dir) = get("FOCUS_TRACKER_DATA_DIR") {
            cfg.data_dir = dir.into();
        }
        if let Some(dir) = get("FOCUS_TRACKER_STATIC_DIR") {
            cfg.static_dir = dir.into();
        }
        if let Some(ws) = get("FOCUS_TRACKER_WEEK_START") {
            cfg.week_start = Some(match ws.to_ascii_lowercase().as_str() {
                "monday" => WeekStart::Monday,
                "sunday" => WeekStart::Sunday,
                _ => return Err(AppError::invalid(format!("invalid FOCUS_TRACKER_WEEK_START: {ws}"))),
            });
        }

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_bind_loopback() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert!(cfg.addr.ip().is_loopback());
        assert_eq!(cfg.week_start, None);
    }

    #[test]
    fn env_overrides() {
        let cfg = Config::from_lookup(lookup(&[
            ("FOCUS_TRACKER_ADDR", "127.0.0.1:4100"),
            ("FOCUS_TRACKER_DATA_DIR", "/tmp/focus"),
            ("FOCUS_TRACKER_WEEK_START", "Sunday"),
        ]))
        .unwrap();
        assert_eq!(cfg.addr.port(), 4100);
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/focus"));
        assert_eq!(cfg.week_start, Some(WeekStart::Sunday));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(Config::from_lookup(lookup(&[("FOCUS_TRACKER_ADDR", "nowhere")])).is_err());
        assert!(Config::from_lookup(lookup(&[("FOCUS_TRACKER_WEEK_START", "friday")])).is_err());
    }
}
