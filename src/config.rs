//! Configuration management module
//!
//! Loads and validates environment-based configuration for a simulation run
//! and for the JSONL feeds fed from it.

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid value for {0}")]
    ParseError(&'static str),

    #[error("{0} out of range: {1}")]
    OutOfRange(&'static str, String),
}

/// Simulation engine settings
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationSettings {
    /// JSON snapshot of the reference data
    pub reference_data_path: PathBuf,
    /// Overrides the horizon carried by the reference snapshot
    pub duration_minutes: Option<u32>,
    /// Fixed seed for reproducible runs; OS entropy when absent
    pub seed: Option<u64>,
    /// Chance that a connected device opens a new disconnection window at a tick
    pub disconnect_probability: f64,
}

/// Feed output settings
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSettings {
    pub output_dir: PathBuf,
    pub device_batch_size: usize,
    pub metric_batch_size: usize,
    /// Pause between two feed flushes in milliseconds
    pub interval_ms: u64,
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub simulation: SimulationSettings,
    pub feed: FeedSettings,
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load settings from an arbitrary key lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let disconnect_probability: f64 = parse_or(&lookup, "DISCONNECT_PROBABILITY", 0.1)?;
        if !(0.0..=1.0).contains(&disconnect_probability) {
            return Err(SettingsError::OutOfRange(
                "DISCONNECT_PROBABILITY",
                disconnect_probability.to_string(),
            ));
        }

        let device_batch_size = positive(parse_or(&lookup, "DEVICE_BATCH_SIZE", 10)?, "DEVICE_BATCH_SIZE")?;
        let metric_batch_size = positive(parse_or(&lookup, "METRIC_BATCH_SIZE", 20)?, "METRIC_BATCH_SIZE")?;

        Ok(Self {
            simulation: SimulationSettings {
                reference_data_path: lookup("REFERENCE_DATA_PATH")
                    .unwrap_or_else(|| "data/reference.sample.json".into())
                    .into(),
                duration_minutes: parse_opt(&lookup, "SIMULATION_DURATION_MINUTES")?,
                seed: parse_opt(&lookup, "SIMULATION_SEED")?,
                disconnect_probability,
            },
            feed: FeedSettings {
                output_dir: lookup("OUTPUT_DIR").unwrap_or_else(|| "monitoring".into()).into(),
                device_batch_size,
                metric_batch_size,
                interval_ms: parse_or(&lookup, "FEED_INTERVAL_MS", 6000)?,
            },
        })
    }
}

fn parse_opt<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, SettingsError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .map(|raw| raw.trim().parse().map_err(|_| SettingsError::ParseError(key)))
        .transpose()
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, SettingsError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    Ok(parse_opt(lookup, key)?.unwrap_or(default))
}

fn positive(value: usize, key: &'static str) -> Result<usize, SettingsError> {
    if value == 0 {
        return Err(SettingsError::OutOfRange(key, "0".into()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::from_vars(lookup_from(&[])).unwrap();

        assert_eq!(
            settings.simulation.reference_data_path,
            PathBuf::from("data/reference.sample.json")
        );
        assert_eq!(settings.simulation.duration_minutes, None);
        assert_eq!(settings.simulation.seed, None);
        assert_eq!(settings.simulation.disconnect_probability, 0.1);
        assert_eq!(settings.feed.output_dir, PathBuf::from("monitoring"));
        assert_eq!(settings.feed.device_batch_size, 10);
        assert_eq!(settings.feed.metric_batch_size, 20);
        assert_eq!(settings.feed.interval_ms, 6000);
    }

    #[test]
    fn test_custom_settings() {
        let settings = Settings::from_vars(lookup_from(&[
            ("SIMULATION_DURATION_MINUTES", "60"),
            ("SIMULATION_SEED", "7"),
            ("DISCONNECT_PROBABILITY", "0.25"),
            ("FEED_INTERVAL_MS", "0"),
        ]))
        .unwrap();

        assert_eq!(settings.simulation.duration_minutes, Some(60));
        assert_eq!(settings.simulation.seed, Some(7));
        assert_eq!(settings.simulation.disconnect_probability, 0.25);
        assert_eq!(settings.feed.interval_ms, 0);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let result = Settings::from_vars(lookup_from(&[("SIMULATION_SEED", "abc")]));
        assert!(matches!(result, Err(SettingsError::ParseError("SIMULATION_SEED"))));
    }

    #[test]
    fn test_probability_out_of_range() {
        let result = Settings::from_vars(lookup_from(&[("DISCONNECT_PROBABILITY", "1.5")]));
        assert!(matches!(result, Err(SettingsError::OutOfRange("DISCONNECT_PROBABILITY", _))));
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let result = Settings::from_vars(lookup_from(&[("METRIC_BATCH_SIZE", "0")]));
        assert!(matches!(result, Err(SettingsError::OutOfRange("METRIC_BATCH_SIZE", _))));
    }
}
