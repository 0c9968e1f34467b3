//! Device telemetry generator
//!
//! Produces one health record per device per simulated minute. Each record
//! carries a random battery level, the device's firmware, and a connection
//! status decided by the [`DisconnectionTracker`]. Timestamps get 0-59 s of
//! jitter inside their minute; the tick cadence itself never drifts.

use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use std::ops::RangeInclusive;
use tracing::{debug, info};

use crate::error::SimResult;
use crate::fleet::DeviceFleet;
use crate::models::{DeviceId, DeviceRecord, ErrorCode};
use crate::tracker::{DisconnectionDraw, DisconnectionTracker};

/// Simulated minutes between two device ticks
pub const RECORD_INTERVAL_MINUTES: i64 = 1;

/// Generator for the device health feed
#[derive(Debug, Clone)]
pub struct DeviceTelemetryGenerator {
    /// Seconds of jitter added to each tick's timestamp
    jitter_seconds: RangeInclusive<i64>,
}

impl Default for DeviceTelemetryGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceTelemetryGenerator {
    pub fn new() -> Self {
        Self {
            jitter_seconds: 0..=59,
        }
    }

    /// Single record for `device_id` at `timestamp`
    pub fn generate_record<D, R>(
        &self,
        fleet: &DeviceFleet,
        device_id: DeviceId,
        timestamp: NaiveDateTime,
        tracker: &mut DisconnectionTracker<D>,
        rng: &mut R,
    ) -> SimResult<DeviceRecord>
    where
        D: DisconnectionDraw,
        R: Rng + ?Sized,
    {
        let device = fleet.get(device_id)?;
        let battery_level: u8 = rng.gen_range(0..=100);
        let connection_status = tracker.decide(device_id, timestamp, rng);
        let error_code = ErrorCode::classify(connection_status, battery_level);

        Ok(DeviceRecord {
            device_id,
            battery_level,
            firmware_name: device.firmware.name.to_string(),
            firmware_version: device.firmware.version.to_string(),
            connection_status,
            error_code,
            timestamp,
        })
    }

    /// Every device, every tick from `start` over `duration_minutes`, in generation order.
    pub fn generate_all<D, R>(
        &self,
        fleet: &DeviceFleet,
        start: NaiveDateTime,
        duration_minutes: u32,
        tracker: &mut DisconnectionTracker<D>,
        rng: &mut R,
    ) -> SimResult<Vec<DeviceRecord>>
    where
        D: DisconnectionDraw,
        R: Rng + ?Sized,
    {
        info!(
            devices = fleet.len(),
            duration_minutes = duration_minutes,
            "Starting device telemetry pass"
        );

        let ticks = (0..i64::from(duration_minutes)).step_by(RECORD_INTERVAL_MINUTES as usize);
        let mut records = Vec::with_capacity(fleet.len() * duration_minutes as usize);

        for minute in ticks {
            for device in fleet.devices() {
                let jitter = rng.gen_range(self.jitter_seconds.clone());
                let timestamp = start + Duration::minutes(minute) + Duration::seconds(jitter);

                let record = self.generate_record(fleet, device.device_id, timestamp, tracker, rng)?;
                if !record.connection_status.is_connected() {
                    debug!(
                        device_id = record.device_id,
                        battery_level = record.battery_level,
                        error_code = ?record.error_code,
                        %timestamp,
                        "Device disconnected"
                    );
                }
                records.push(record);
            }
        }

        info!(records = records.len(), "Device telemetry pass complete");
        Ok(records)
    }
}
