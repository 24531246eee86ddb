//! Configuration loading and representation.
//!
//! Settings come either from the environment (`LOTSPLIT_*` variables) or from a
//! JSON document. Unset or blank variables keep their defaults.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lotsplit_core::{Clock, FixedClock, SystemClock};
use lotsplit_inventory::LocationKind;

pub const ENV_TODAY: &str = "LOTSPLIT_TODAY";
pub const ENV_ASSIGNABLE_ONLY: &str = "LOTSPLIT_ASSIGNABLE_ONLY";
pub const ENV_LOT_REQUIRED: &str = "LOTSPLIT_LOT_REQUIRED";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },

    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Runtime settings of the lot split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LotSplitConfig {
    /// Pin "today" (ISO date). The system date is used when absent.
    pub today: Option<NaiveDate>,
    /// Count only stock that can be reserved now, ignoring forecast receipts.
    pub assignable_only: bool,
    /// Location kinds for which every product requires a lot.
    pub lot_required: BTreeSet<LocationKind>,
}

impl Default for LotSplitConfig {
    fn default() -> Self {
        Self {
            today: None,
            assignable_only: true,
            lot_required: BTreeSet::new(),
        }
    }
}

impl LotSplitConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; `lookup` returns the raw value of a name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = get(ENV_TODAY) {
            config.today = Some(raw.trim().parse::<NaiveDate>().map_err(|e| {
                ConfigError::InvalidValue {
                    key: ENV_TODAY,
                    message: e.to_string(),
                }
            })?);
        }
        if let Some(raw) = get(ENV_ASSIGNABLE_ONLY) {
            config.assignable_only = parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: ENV_ASSIGNABLE_ONLY,
                message: format!("expected a boolean, got {raw:?}"),
            })?;
        }
        if let Some(raw) = get(ENV_LOT_REQUIRED) {
            config.lot_required = raw
                .split(',')
                .filter(|kind| !kind.trim().is_empty())
                .map(str::parse::<LocationKind>)
                .collect::<Result<_, _>>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: ENV_LOT_REQUIRED,
                    message: e.to_string(),
                })?;
        }
        Ok(config)
    }

    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(document)?)
    }

    /// Business clock for these settings.
    pub fn clock(&self) -> Arc<dyn Clock> {
        match self.today {
            Some(date) => Arc::new(FixedClock(date)),
            None => Arc::new(SystemClock),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Load settings from a JSON file when given, otherwise from the environment.
pub fn load(path: Option<&Path>) -> anyhow::Result<LotSplitConfig> {
    let config = match path {
        Some(path) => {
            let document = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            LotSplitConfig::from_json(&document)
                .with_context(|| format!("parsing config file {}", path.display()))?
        }
        None => LotSplitConfig::from_env().context("reading LOTSPLIT_* environment")?,
    };
    tracing::info!(
        today = ?config.today,
        assignable_only = config.assignable_only,
        lot_required = ?config.lot_required,
        "configuration loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = LotSplitConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LotSplitConfig::default());
        assert!(config.assignable_only);
    }

    #[test]
    fn reads_every_variable() {
        let config = LotSplitConfig::from_lookup(lookup(&[
            (ENV_TODAY, "2026-05-01"),
            (ENV_ASSIGNABLE_ONLY, "false"),
            (ENV_LOT_REQUIRED, "storage, customer"),
        ]))
        .unwrap();

        assert_eq!(config.today, NaiveDate::from_ymd_opt(2026, 5, 1));
        assert!(!config.assignable_only);
        assert_eq!(
            config.lot_required,
            BTreeSet::from([LocationKind::Storage, LocationKind::Customer])
        );
        assert_eq!(config.clock().today(), NaiveDate::from_ymd_opt(2026, 5, 1).unwrap());
    }

    #[test]
    fn blank_values_keep_defaults() {
        let config =
            LotSplitConfig::from_lookup(lookup(&[(ENV_TODAY, "  "), (ENV_ASSIGNABLE_ONLY, "")])).unwrap();
        assert_eq!(config, LotSplitConfig::default());
    }

    #[test]
    fn rejects_bad_values_naming_the_variable() {
        let err = LotSplitConfig::from_lookup(lookup(&[(ENV_ASSIGNABLE_ONLY, "maybe")])).unwrap_err();
        assert!(err.to_string().contains(ENV_ASSIGNABLE_ONLY));

        let err = LotSplitConfig::from_lookup(lookup(&[(ENV_LOT_REQUIRED, "storage,attic")])).unwrap_err();
        assert!(err.to_string().contains(ENV_LOT_REQUIRED));

        assert!(LotSplitConfig::from_lookup(lookup(&[(ENV_TODAY, "tomorrow")])).is_err());
    }

    #[test]
    fn json_document_fills_missing_fields_with_defaults() {
        let config = LotSplitConfig::from_json(r#"{ "lot_required": ["lost_found"] }"#).unwrap();
        assert!(config.assignable_only);
        assert_eq!(config.today, None);
        assert_eq!(config.lot_required, BTreeSet::from([LocationKind::LostFound]));

        assert!(matches!(
            LotSplitConfig::from_json("{ \"today\": 3 }"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn load_reports_the_file_it_failed_on() {
        let err = load(Some(Path::new("/nonexistent/lotsplit.json"))).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/lotsplit.json"));
    }
}
