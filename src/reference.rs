//! Reference data snapshot
//!
//! Read-only inputs supplied by the reference data provider (user ages,
//! medical conditions, medications, glucose thresholds, device assignments
//! and sampling intervals). Loaded once before a run and never mutated.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{SimError, SimResult};
use crate::models::{DeviceId, UserId};

/// Threshold used when a user has no `thresholds` entry.
pub const DEFAULT_THRESHOLD: GlucoseThreshold = GlucoseThreshold {
    min_glucose: 50.0,
    max_glucose: 240.0,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAge {
    pub user_id: UserId,
    pub age: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCondition {
    pub user_id: UserId,
    pub condition: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMedication {
    pub user_id: UserId,
    pub medication: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserThreshold {
    pub user_id: UserId,
    pub min_glucose: f64,
    pub max_glucose: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceAssignment {
    pub user_id: UserId,
    pub device_id: DeviceId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingInterval {
    pub user_id: UserId,
    pub interval_minutes: u32,
}

/// Glucose bounds in mg/dL for one patient
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlucoseThreshold {
    pub min_glucose: f64,
    pub max_glucose: f64,
}

/// Snapshot of everything the reference data provider hands to a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceData {
    #[serde(default)]
    pub users: Vec<UserAge>,
    #[serde(default)]
    pub conditions: Vec<UserCondition>,
    #[serde(default)]
    pub medications: Vec<UserMedication>,
    #[serde(default)]
    pub thresholds: Vec<UserThreshold>,
    #[serde(default)]
    pub device_assignments: Vec<DeviceAssignment>,
    #[serde(default)]
    pub sampling_intervals: Vec<SamplingInterval>,
    #[serde(default = "default_duration")]
    pub simulation_duration_minutes: u32,
}

/// 24 hours
fn default_duration() -> u32 {
    60 * 24
}

impl ReferenceData {
    /// Read a JSON snapshot from disk
    pub fn load(path: &Path) -> SimResult<Self> {
        let raw = fs::read_to_string(path)?;
        let data: ReferenceData = serde_json::from_str(&raw)?;

        info!(
            path = %path.display(),
            users = data.users.len(),
            assignments = data.device_assignments.len(),
            duration_minutes = data.simulation_duration_minutes,
            "Loaded reference data snapshot"
        );

        Ok(data)
    }
}

/// Per-user lookups built once from a [`ReferenceData`] snapshot
#[derive(Debug, Clone)]
pub struct ReferenceIndex {
    users: Vec<UserAge>,
    conditions: HashMap<UserId, String>,
    medications: HashMap<UserId, String>,
    thresholds: HashMap<UserId, GlucoseThreshold>,
    assignments: HashMap<UserId, DeviceId>,
    intervals: HashMap<UserId, u32>,
}

impl ReferenceIndex {
    pub fn build(data: &ReferenceData) -> SimResult<Self> {
        let mut seen = HashSet::with_capacity(data.users.len());
        for user in &data.users {
            if !seen.insert(user.user_id) {
                return Err(SimError::configuration("user", user.user_id, "listed more than once"));
            }
        }

        let mut thresholds = HashMap::with_capacity(data.thresholds.len());
        for t in &data.thresholds {
            if !t.min_glucose.is_finite() || !t.max_glucose.is_finite() || t.min_glucose > t.max_glucose {
                return Err(SimError::configuration(
                    "user",
                    t.user_id,
                    format!("invalid glucose threshold ({}, {})", t.min_glucose, t.max_glucose),
                ));
            }
            thresholds.insert(
                t.user_id,
                GlucoseThreshold {
                    min_glucose: t.min_glucose,
                    max_glucose: t.max_glucose,
                },
            );
        }

        let mut intervals = HashMap::with_capacity(data.sampling_intervals.len());
        for s in &data.sampling_intervals {
            if s.interval_minutes == 0 {
                return Err(SimError::configuration("user", s.user_id, "sampling interval must be at least 1 minute"));
            }
            intervals.insert(s.user_id, s.interval_minutes);
        }

        Ok(Self {
            users: data.users.clone(),
            conditions: data.conditions.iter().map(|c| (c.user_id, c.condition.clone())).collect(),
            medications: data.medications.iter().map(|m| (m.user_id, m.medication.clone())).collect(),
            thresholds,
            assignments: data.device_assignments.iter().map(|a| (a.user_id, a.device_id)).collect(),
            intervals,
        })
    }

    /// Users in snapshot order
    pub fn users(&self) -> &[UserAge] {
        &self.users
    }

    pub fn condition(&self, user_id: UserId) -> Option<&str> {
        self.conditions.get(&user_id).map(String::as_str)
    }

    pub fn medication(&self, user_id: UserId) -> Option<&str> {
        self.medications.get(&user_id).map(String::as_str)
    }

    pub fn assigned_device(&self, user_id: UserId) -> Option<DeviceId> {
        self.assignments.get(&user_id).copied()
    }

    /// Falls back to [`DEFAULT_THRESHOLD`] for users without an entry
    pub fn threshold(&self, user_id: UserId) -> GlucoseThreshold {
        match self.thresholds.get(&user_id) {
            Some(threshold) => *threshold,
            None => {
                warn!(user_id = user_id, "No glucose threshold on record, using default (50, 240)");
                DEFAULT_THRESHOLD
            }
        }
    }

    pub fn sampling_interval(&self, user_id: UserId) -> SimResult<u32> {
        self.intervals
            .get(&user_id)
            .copied()
            .ok_or_else(|| SimError::configuration("user", user_id, "no sampling interval on record"))
    }
}
