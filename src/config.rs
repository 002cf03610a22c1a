use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::ledger::DayTemplate;
use crate::model::RoomTypeKey;

/// Lock budget for ledger writers.
///
/// Each attempt waits up to `lock_timeout` per night; after `lock_attempts`
/// failed attempts the request fails with `Contention`. Attempts are spaced by
/// `lock_backoff`, doubling each time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    pub lock_timeout: Duration,
    pub lock_attempts: u32,
    pub lock_backoff: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(500),
            lock_attempts: 3,
            lock_backoff: Duration::from_millis(10),
        }
    }
}

/// Host process settings, read from `ROOMYIELD_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub metrics_port: Option<u16>,
    pub rate_tables: Option<PathBuf>,
    /// JSON list of [`HorizonSeed`]s opened at startup.
    pub inventory: Option<PathBuf>,
    pub ledger: LedgerConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parse = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());
        let defaults = LedgerConfig::default();

        Self {
            metrics_port: lookup("ROOMYIELD_METRICS_PORT").and_then(|s| s.trim().parse().ok()),
            rate_tables: lookup("ROOMYIELD_RATE_TABLES").map(PathBuf::from),
            inventory: lookup("ROOMYIELD_INVENTORY").map(PathBuf::from),
            ledger: LedgerConfig {
                lock_timeout: parse("ROOMYIELD_LOCK_TIMEOUT_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.lock_timeout),
                lock_attempts: parse("ROOMYIELD_LOCK_ATTEMPTS")
                    .map(|n| n.clamp(1, 100) as u32)
                    .unwrap_or(defaults.lock_attempts),
                lock_backoff: parse("ROOMYIELD_LOCK_BACKOFF_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.lock_backoff),
            },
        }
    }
}

/// One room type's opening horizon, as listed in the inventory file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HorizonSeed {
    pub room_type: RoomTypeKey,
    pub from: NaiveDate,
    pub nights: u32,
    pub template: DayTemplate,
}

impl HorizonSeed {
    pub fn from_json(json: &str) -> io::Result<Vec<Self>> {
        serde_json::from_str(json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub fn load(path: &Path) -> io::Result<Vec<Self>> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Channel;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = Config::from_lookup(lookup(&[]));
        assert_eq!(cfg.metrics_port, None);
        assert_eq!(cfg.rate_tables, None);
        assert_eq!(cfg.inventory, None);
        assert_eq!(cfg.ledger, LedgerConfig::default());
    }

    #[test]
    fn values_are_parsed() {
        let cfg = Config::from_lookup(lookup(&[
            ("ROOMYIELD_METRICS_PORT", "9100"),
            ("ROOMYIELD_LOCK_TIMEOUT_MS", "250"),
            ("ROOMYIELD_LOCK_ATTEMPTS", "5"),
            ("ROOMYIELD_RATE_TABLES", "/etc/roomyield/rates.json"),
            ("ROOMYIELD_INVENTORY", "/etc/roomyield/inventory.json"),
        ]));
        assert_eq!(cfg.metrics_port, Some(9100));
        assert_eq!(cfg.ledger.lock_timeout, Duration::from_millis(250));
        assert_eq!(cfg.ledger.lock_attempts, 5);
        assert_eq!(cfg.rate_tables, Some(PathBuf::from("/etc/roomyield/rates.json")));
        assert_eq!(cfg.inventory, Some(PathBuf::from("/etc/roomyield/inventory.json")));
    }

    #[test]
    fn garbage_falls_back_and_attempts_are_clamped() {
        let cfg = Config::from_lookup(lookup(&[
            ("ROOMYIELD_LOCK_TIMEOUT_MS", "soon"),
            ("ROOMYIELD_LOCK_ATTEMPTS", "0"),
        ]));
        assert_eq!(cfg.ledger.lock_timeout, LedgerConfig::default().lock_timeout);
        assert_eq!(cfg.ledger.lock_attempts, 1);
    }

    #[test]
    fn horizon_seeds_parse_with_defaults() {
        let json = r#"[{
            "room_type": {
                "hotel_id": "01J0000000000000000000000A",
                "room_type_id": "01J0000000000000000000000B"
            },
            "from": "2027-07-01",
            "nights": 90,
            "template": {
                "total_inventory": 40,
                "restrictions": { "overbooking_limit": 2, "minimum_stay": 2 },
                "channel_restrictions": { "ota": { "stop_sell": false, "available_rooms": 10 } }
            }
        }]"#;
        let seeds = HorizonSeed::from_json(json).unwrap();
        assert_eq!(seeds.len(), 1);
        let seed = &seeds[0];
        assert_eq!(seed.from, NaiveDate::from_ymd_opt(2027, 7, 1).unwrap());
        assert_eq!(seed.template.total_inventory, 40);
        assert_eq!(seed.template.restrictions.minimum_stay, 2);
        assert!(!seed.template.restrictions.stop_sell);
        assert_eq!(seed.template.channel_restrictions[&Channel::Ota].available_rooms, 10);

        assert!(HorizonSeed::from_json("[{\"nights\": 3}]").is_err());
    }
}
