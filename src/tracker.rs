//! Disconnection tracker
//!
//! Keeps every disconnection window opened for each device during a run.
//! Windows are only appended as the device pass walks forward in time, so
//! each device's list is sorted by `start` and never overlaps; point-in-time
//! queries from the metric pass binary search that list.

use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

use crate::models::{ConnectionStatus, DeviceId, DisconnectionWindow};

/// Decides, for a device that is currently connected, whether an outage starts now.
pub trait DisconnectionDraw {
    /// Length of the new outage, or `None` to stay connected.
    fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Duration>;
}

/// Outage policy used by real runs: a fixed chance per tick, lasting a whole number of minutes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomDisconnects {
    pub probability: f64,
    pub min_minutes: i64,
    pub max_minutes: i64,
}

impl RandomDisconnects {
    pub fn with_probability(probability: f64) -> Self {
        Self {
            probability,
            ..Self::default()
        }
    }
}

impl Default for RandomDisconnects {
    fn default() -> Self {
        Self {
            probability: 0.1,
            min_minutes: 1,
            max_minutes: 3,
        }
    }
}

impl DisconnectionDraw for RandomDisconnects {
    fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Duration> {
        if rng.gen::<f64>() < self.probability {
            Some(Duration::minutes(rng.gen_range(self.min_minutes..=self.max_minutes)))
        } else {
            None
        }
    }
}

/// Replays a fixed sequence of draw outcomes, then never disconnects again.
///
/// Lets scenario tests force outages at known ticks without touching the RNG.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDisconnects {
    script: VecDeque<Option<Duration>>,
}

impl ScriptedDisconnects {
    pub fn new(script: impl IntoIterator<Item = Option<Duration>>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    pub fn never() -> Self {
        Self::default()
    }

    /// The first draw opens an outage of `minutes`; every later draw fails.
    pub fn once(minutes: i64) -> Self {
        Self::new([Some(Duration::minutes(minutes))])
    }
}

impl DisconnectionDraw for ScriptedDisconnects {
    fn draw<R: Rng + ?Sized>(&mut self, _rng: &mut R) -> Option<Duration> {
        self.script.pop_front().flatten()
    }
}

/// Per-device connectivity state for one run
#[derive(Debug, Clone)]
pub struct DisconnectionTracker<D> {
    policy: D,
    windows: HashMap<DeviceId, Vec<DisconnectionWindow>>,
}

impl<D: DisconnectionDraw> DisconnectionTracker<D> {
    pub fn new(policy: D) -> Self {
        Self {
            policy,
            windows: HashMap::new(),
        }
    }

    /// Connectivity at `timestamp`, possibly opening a new window.
    ///
    /// Must be called with non-decreasing timestamps per device: only the
    /// latest window is checked before drawing.
    pub fn decide<R: Rng + ?Sized>(
        &mut self,
        device_id: DeviceId,
        timestamp: NaiveDateTime,
        rng: &mut R,
    ) -> ConnectionStatus {
        let windows = self.windows.entry(device_id).or_default();

        if windows.last().is_some_and(|latest| latest.contains(timestamp)) {
            return ConnectionStatus::Disconnected;
        }

        match self.policy.draw(rng) {
            Some(duration) => {
                let window = DisconnectionWindow::new(device_id, timestamp, duration);
                debug!(
                    device_id = device_id,
                    start = %window.start,
                    end = %window.end,
                    "Opened disconnection window"
                );
                windows.push(window);
                ConnectionStatus::Disconnected
            }
            None => ConnectionStatus::Connected,
        }
    }

    /// Whether `timestamp` falls inside any window recorded for the device.
    pub fn query(&self, device_id: DeviceId, timestamp: NaiveDateTime) -> bool {
        let Some(windows) = self.windows.get(&device_id) else {
            return false;
        };

        // First window starting after `timestamp`; the candidate sits just before it.
        let idx = windows.partition_point(|w| w.start <= timestamp);
        idx > 0 && windows[idx - 1].contains(timestamp)
    }

    pub fn windows(&self, device_id: DeviceId) -> &[DisconnectionWindow] {
        self.windows.get(&device_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn window_count(&self) -> usize {
        self.windows.values().map(Vec::len).sum()
    }
}
