//! Data models for simulated devices, patients and telemetry records
//!
//! Defines the core data structures shared by the generators, the stream
//! assembler and the JSONL feeds.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

pub type UserId = u32;
pub type DeviceId = u32;

/// Wire format for every timestamp: second precision, no timezone suffix.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Serde adapter for [`TIMESTAMP_FORMAT`].
pub mod timestamp_format {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Firmware variant installed on a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Firmware {
    pub name: &'static str,
    pub version: &'static str,
}

/// A simulated glucose monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub device_id: DeviceId,
    pub firmware: Firmware,
}

/// A monitored patient; the device assignment is fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Patient {
    pub user_id: UserId,
    pub device_id: DeviceId,
}

/// Interval `[start, end]` (both ends inclusive) during which a device is unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisconnectionWindow {
    pub device_id: DeviceId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DisconnectionWindow {
    pub fn new(device_id: DeviceId, start: NaiveDateTime, duration: Duration) -> Self {
        Self {
            device_id,
            start,
            end: start + duration,
        }
    }

    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    pub fn is_connected(self) -> bool {
        self == ConnectionStatus::Connected
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Connected => write!(f, "Connected"),
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// Device error code as reported on the device feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "None")]
    NoError,
    #[serde(rename = "Battery Low")]
    BatteryLow,
    #[serde(rename = "404 Connection Lost")]
    ConnectionLost,
}

impl ErrorCode {
    /// Battery level below this while disconnected is reported as [`ErrorCode::BatteryLow`].
    pub const LOW_BATTERY_THRESHOLD: u8 = 20;

    /// Battery takes priority over connectivity as the cause of a disconnection.
    pub fn classify(status: ConnectionStatus, battery_level: u8) -> Self {
        match status {
            ConnectionStatus::Connected => ErrorCode::NoError,
            ConnectionStatus::Disconnected if battery_level < Self::LOW_BATTERY_THRESHOLD => {
                ErrorCode::BatteryLow
            }
            ConnectionStatus::Disconnected => ErrorCode::ConnectionLost,
        }
    }
}

/// Device health record emitted once per device per tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DeviceRecord {
    pub device_id: DeviceId,

    #[validate(range(min = 0, max = 100, message = "Battery level must be between 0 and 100"))]
    pub battery_level: u8,

    pub firmware_name: String,
    pub firmware_version: String,
    pub connection_status: ConnectionStatus,
    pub error_code: ErrorCode,

    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
}

/// Glucose reading record; absent for checks that hit a disconnection window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MetricRecord {
    pub user_id: UserId,
    pub device_id: DeviceId,

    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,

    /// mg/dL, not clamped: the behavior offset may push it past 50..=240
    pub glucose_reading: f64,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: f64,
}

/// Anything the stream assembler can order by time.
pub trait Timestamped {
    fn timestamp(&self) -> NaiveDateTime;
}

impl Timestamped for DeviceRecord {
    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }
}

impl Timestamped for MetricRecord {
    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let window = DisconnectionWindow::new(1, at(10, 0, 0), Duration::minutes(2));

        assert_eq!(window.end, at(10, 2, 0));
        assert!(window.contains(at(10, 0, 0)));
        assert!(window.contains(at(10, 2, 0)));
        assert!(!window.contains(at(9, 59, 59)));
        assert!(!window.contains(at(10, 2, 1)));
    }

    #[test]
    fn test_error_code_classification() {
        assert_eq!(ErrorCode::classify(ConnectionStatus::Connected, 5), ErrorCode::NoError);
        assert_eq!(ErrorCode::classify(ConnectionStatus::Disconnected, 19), ErrorCode::BatteryLow);
        assert_eq!(
            ErrorCode::classify(ConnectionStatus::Disconnected, 20),
            ErrorCode::ConnectionLost
        );
    }

    #[test]
    fn test_device_record_wire_format() {
        let record = DeviceRecord {
            device_id: 3,
            battery_level: 12,
            firmware_name: "FirmwareC".to_string(),
            firmware_version: "3.0.1".to_string(),
            connection_status: ConnectionStatus::Disconnected,
            error_code: ErrorCode::BatteryLow,
            timestamp: at(8, 30, 15),
        };

        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["timestamp"], "2024-05-01T08:30:15");
        assert_eq!(json["connection_status"], "Disconnected");
        assert_eq!(json["error_code"], "Battery Low");
    }

    #[test]
    fn test_metric_record_parses_wire_timestamp() {
        let raw = r#"{"user_id":1,"device_id":2,"timestamp":"2024-05-01T23:59:59",
            "glucose_reading":251.5,"latitude":40.4,"longitude":-3.7}"#;

        let record: MetricRecord = serde_json::from_str(raw).unwrap();

        assert_eq!(record.timestamp, at(23, 59, 59));
        assert_eq!(record.glucose_reading, 251.5);
    }

    #[test]
    fn test_no_error_serializes_as_none_string() {
        let json = serde_json::to_string(&ErrorCode::NoError).unwrap();
        assert_eq!(json, "\"None\"");
        let back: ErrorCode = serde_json::from_str("\"404 Connection Lost\"").unwrap();
        assert_eq!(back, ErrorCode::ConnectionLost);
    }
}
