//! Glucose metric generator
//!
//! Each patient reports on their own sampling interval rather than on a global
//! tick. The generation loop walks a minute counter across the horizon; when a
//! patient is due, a reading time is drawn from the 59 s window opening at the
//! patient's next expected timestamp, and the schedule then moves on by one
//! interval from that reading. The window is cut off at the end of the minute
//! slot the check belongs to, so jitter never carries over into later checks
//! and every reading stays inside the horizon.
//!
//! A reading is skipped when the patient's device sits inside a disconnection
//! window at the drawn time.

use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::behavior::UserBehavior;
use crate::error::{SimError, SimResult};
use crate::location::PatientLocator;
use crate::models::{MetricRecord, Patient, UserId};
use crate::reference::ReferenceIndex;
use crate::sampling::uniform;
use crate::tracker::{DisconnectionDraw, DisconnectionTracker};

/// Chance a reading falls inside the patient's own threshold
pub const WITHIN_THRESHOLD_PROBABILITY: f64 = 0.95;

/// Nominal glucose domain (mg/dL) out-of-threshold readings are drawn from
pub const GLUCOSE_FLOOR: f64 = 50.0;
pub const GLUCOSE_CEILING: f64 = 240.0;

/// Width of the window a reading time is drawn from, in seconds
pub const READING_WINDOW_SECONDS: i64 = 59;

/// Where one patient is in their sampling cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatientSchedule {
    pub interval_minutes: u32,
    /// Timestamp of minute zero of the counter
    pub grid_start: NaiveDateTime,
    /// Minute counter value at which the patient is next checked
    pub next_due_minute: u64,
    pub next_expected: NaiveDateTime,
    pub next_max_allowed: NaiveDateTime,
}

impl PatientSchedule {
    /// First reading is expected one interval after `last_observed`.
    pub fn new(last_observed: NaiveDateTime, interval_minutes: u32) -> Self {
        let mut schedule = Self {
            interval_minutes,
            grid_start: last_observed + Duration::minutes(1),
            next_due_minute: u64::from(interval_minutes) - 1,
            next_expected: last_observed + Duration::minutes(i64::from(interval_minutes)),
            next_max_allowed: last_observed,
        };
        schedule.next_max_allowed = schedule.window_end();
        schedule
    }

    /// Last second of the minute slot the next check belongs to.
    pub fn slot_deadline(&self) -> NaiveDateTime {
        // due minutes are sums of u32 values, well inside i64
        let slot_minutes = self.next_due_minute as i64 + 1;
        self.grid_start + Duration::minutes(slot_minutes) - Duration::seconds(1)
    }

    fn window_end(&self) -> NaiveDateTime {
        let end = self.next_expected + Duration::seconds(READING_WINDOW_SECONDS);
        end.min(self.slot_deadline())
    }

    pub fn is_due(&self, minute: u64) -> bool {
        minute >= self.next_due_minute
    }

    /// Reading time uniformly within `[next_expected, next_max_allowed]`.
    pub fn draw_timestamp<R: Rng + ?Sized>(&self, rng: &mut R) -> NaiveDateTime {
        let span = (self.next_max_allowed - self.next_expected).num_seconds().max(0);
        self.next_expected + Duration::seconds(rng.gen_range(0..=span))
    }

    /// Move the schedule on from a drawn reading time.
    pub fn advance(&mut self, drawn: NaiveDateTime) {
        self.next_due_minute += u64::from(self.interval_minutes);
        self.next_expected = drawn + Duration::minutes(i64::from(self.interval_minutes));
        self.next_max_allowed = self.window_end();
    }
}

/// Output of a full metric pass
#[derive(Debug, Clone, Default)]
pub struct MetricPass {
    pub records: Vec<MetricRecord>,
    /// Checks that produced nothing because the device was disconnected
    pub skipped: usize,
}

/// Generator for the glucose metric feed
#[derive(Debug, Clone)]
pub struct MetricGenerator {
    behaviors: HashMap<UserId, UserBehavior>,
    locator: PatientLocator,
}

impl MetricGenerator {
    pub fn new(behaviors: HashMap<UserId, UserBehavior>, locator: PatientLocator) -> Self {
        Self { behaviors, locator }
    }

    /// Glucose reading for `patient` at `timestamp`, or `None` while their device is disconnected.
    pub fn generate_record<D, R>(
        &mut self,
        patient: Patient,
        timestamp: NaiveDateTime,
        reference: &ReferenceIndex,
        tracker: &DisconnectionTracker<D>,
        rng: &mut R,
    ) -> SimResult<Option<MetricRecord>>
    where
        D: DisconnectionDraw,
        R: Rng + ?Sized,
    {
        if tracker.query(patient.device_id, timestamp) {
            return Ok(None);
        }

        let behavior = self
            .behaviors
            .get(&patient.user_id)
            .ok_or_else(|| SimError::configuration("user", patient.user_id, "no behavior profile"))?;

        let threshold = reference.threshold(patient.user_id);
        let base = if rng.gen_bool(WITHIN_THRESHOLD_PROBABILITY) {
            uniform(rng, threshold.min_glucose, threshold.max_glucose)
        } else if rng.gen_bool(0.5) {
            uniform(rng, GLUCOSE_FLOOR, threshold.min_glucose)
        } else {
            uniform(rng, threshold.max_glucose, GLUCOSE_CEILING)
        };

        let glucose_reading = base + behavior.glucose_reading_effect(rng);
        let location = self.locator.locate(patient.user_id, rng);

        Ok(Some(MetricRecord {
            user_id: patient.user_id,
            device_id: patient.device_id,
            timestamp,
            glucose_reading,
            latitude: location.latitude,
            longitude: location.longitude,
        }))
    }

    /// Walk the horizon minute by minute and sample every due patient.
    pub fn generate_all<D, R>(
        &mut self,
        patients: &[Patient],
        reference: &ReferenceIndex,
        start: NaiveDateTime,
        duration_minutes: u32,
        tracker: &DisconnectionTracker<D>,
        rng: &mut R,
    ) -> SimResult<MetricPass>
    where
        D: DisconnectionDraw,
        R: Rng + ?Sized,
    {
        let last_observed = start - Duration::minutes(1);
        let mut schedules = Vec::with_capacity(patients.len());
        for patient in patients {
            let interval = reference.sampling_interval(patient.user_id)?;
            schedules.push(PatientSchedule::new(last_observed, interval));
        }

        info!(
            patients = patients.len(),
            duration_minutes = duration_minutes,
            "Starting glucose metric pass"
        );

        let mut pass = MetricPass::default();
        for minute in 0..u64::from(duration_minutes) {
            for (patient, schedule) in patients.iter().zip(schedules.iter_mut()) {
                if !schedule.is_due(minute) {
                    continue;
                }

                let timestamp = schedule.draw_timestamp(rng);
                match self.generate_record(*patient, timestamp, reference, tracker, rng)? {
                    Some(record) => pass.records.push(record),
                    None => {
                        debug!(
                            user_id = patient.user_id,
                            device_id = patient.device_id,
                            %timestamp,
                            "Device disconnected, no glucose reading"
                        );
                        pass.skipped += 1;
                    }
                }
                schedule.advance(timestamp);
            }
        }

        info!(
            records = pass.records.len(),
            skipped = pass.skipped,
            "Glucose metric pass complete"
        );
        Ok(pass)
    }
}
