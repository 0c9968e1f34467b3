//! Simulation run context
//!
//! A [`Simulation`] owns all the state of one run: the random source, the
//! disconnection tracker, the fleet and patients, behavior profiles and
//! location anchors. Nothing is shared between runs, so several simulations
//! can run side by side and a fixed seed reproduces a run exactly.
//!
//! The device pass covers the whole horizon before the metric pass starts,
//! so every disconnection window exists by the time readings are checked
//! against it.

use chrono::{Local, NaiveDateTime, Timelike};
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use crate::behavior::create_user_behaviors;
use crate::device::DeviceTelemetryGenerator;
use crate::error::{SimError, SimResult};
use crate::fleet::{assign_patients, DeviceFleet};
use crate::location::PatientLocator;
use crate::metric::MetricGenerator;
use crate::models::{ConnectionStatus, DeviceRecord, MetricRecord, Patient};
use crate::reference::{ReferenceData, ReferenceIndex};
use crate::stream::assemble;
use crate::tracker::{DisconnectionDraw, DisconnectionTracker};
use crate::validation::{validate_device_record, validate_metric_record};

/// Current local time truncated to whole seconds
pub fn now_start_time() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// One device per user; device ids are `u32`.
fn fleet_size(users: usize) -> SimResult<u32> {
    u32::try_from(users)
        .map_err(|_| SimError::Configuration(format!("{} users exceed the device id range", users)))
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RunStatistics {
    pub device_records: usize,
    pub disconnected_device_records: usize,
    pub windows_opened: usize,
    pub metric_records: usize,
    pub metric_checks_skipped: usize,
}

/// Both assembled streams of one run
#[derive(Debug, Clone)]
pub struct SimulationOutput {
    pub run_id: Uuid,
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
    pub device_records: Vec<DeviceRecord>,
    pub metric_records: Vec<MetricRecord>,
    pub statistics: RunStatistics,
}

/// One simulation run
pub struct Simulation<R, D> {
    run_id: Uuid,
    rng: R,
    start: NaiveDateTime,
    duration_minutes: u32,
    reference: ReferenceIndex,
    fleet: DeviceFleet,
    patients: Vec<Patient>,
    tracker: DisconnectionTracker<D>,
    devices: DeviceTelemetryGenerator,
    metrics: MetricGenerator,
}

impl<R: Rng, D: DisconnectionDraw> Simulation<R, D> {
    /// Build a run from a reference snapshot.
    ///
    /// One device per user; `duration_minutes` overrides the snapshot's horizon.
    pub fn new(
        data: &ReferenceData,
        start: NaiveDateTime,
        duration_minutes: Option<u32>,
        policy: D,
        mut rng: R,
    ) -> SimResult<Self> {
        let run_id = Uuid::new_v4();
        let duration_minutes = duration_minutes.unwrap_or(data.simulation_duration_minutes);

        let reference = ReferenceIndex::build(data)?;
        let fleet = DeviceFleet::new(fleet_size(reference.users().len())?);
        let patients = assign_patients(&reference, &fleet, &mut rng)?;
        for patient in &patients {
            reference.sampling_interval(patient.user_id)?;
        }
        let behaviors = create_user_behaviors(&reference, &mut rng);

        info!(
            run_id = %run_id,
            %start,
            duration_minutes = duration_minutes,
            patients = patients.len(),
            devices = fleet.len(),
            "Simulation initialized"
        );

        Ok(Self {
            run_id,
            rng,
            start,
            duration_minutes,
            reference,
            fleet,
            patients,
            tracker: DisconnectionTracker::new(policy),
            devices: DeviceTelemetryGenerator::new(),
            metrics: MetricGenerator::new(behaviors, PatientLocator::default()),
        })
    }

    pub fn tracker(&self) -> &DisconnectionTracker<D> {
        &self.tracker
    }

    /// Generate, validate and assemble both streams.
    ///
    /// Borrows rather than consumes so the tracker can still be inspected afterwards.
    pub fn run(&mut self) -> SimResult<SimulationOutput> {
        info!(run_id = %self.run_id, "Simulation run started");

        let device_records = self.devices.generate_all(
            &self.fleet,
            self.start,
            self.duration_minutes,
            &mut self.tracker,
            &mut self.rng,
        )?;
        for record in &device_records {
            validate_device_record(record)?;
        }

        let metric_pass = self.metrics.generate_all(
            &self.patients,
            &self.reference,
            self.start,
            self.duration_minutes,
            &self.tracker,
            &mut self.rng,
        )?;
        for record in &metric_pass.records {
            validate_metric_record(record)?;
        }

        let statistics = RunStatistics {
            device_records: device_records.len(),
            disconnected_device_records: device_records
                .iter()
                .filter(|r| r.connection_status == ConnectionStatus::Disconnected)
                .count(),
            windows_opened: self.tracker.window_count(),
            metric_records: metric_pass.records.len(),
            metric_checks_skipped: metric_pass.skipped,
        };

        let device_records = assemble(device_records, &mut self.rng);
        let metric_records = assemble(metric_pass.records, &mut self.rng);

        info!(
            run_id = %self.run_id,
            device_records = statistics.device_records,
            disconnected = statistics.disconnected_device_records,
            windows_opened = statistics.windows_opened,
            metric_records = statistics.metric_records,
            metric_checks_skipped = statistics.metric_checks_skipped,
            "Simulation run complete"
        );

        Ok(SimulationOutput {
            run_id: self.run_id,
            start: self.start,
            duration_minutes: self.duration_minutes,
            device_records,
            metric_records,
            statistics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::reference::{SamplingInterval, UserAge};
    use crate::tracker::RandomDisconnects;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn data(users: u32, interval_minutes: u32) -> ReferenceData {
        ReferenceData {
            users: (1..=users).map(|user_id| UserAge { user_id, age: 20 + user_id * 7 }).collect(),
            sampling_intervals: (1..=users)
                .map(|user_id| SamplingInterval { user_id, interval_minutes })
                .collect(),
            simulation_duration_minutes: 45,
            ..ReferenceData::default()
        }
    }

    fn start() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_start_time_has_second_precision() {
        assert_eq!(now_start_time().nanosecond(), 0);
    }

    #[test]
    fn test_run_uses_snapshot_duration() {
        let mut simulation = Simulation::new(
            &data(3, 2),
            start(),
            None,
            RandomDisconnects::default(),
            StdRng::seed_from_u64(61),
        )
        .unwrap();

        let output = simulation.run().unwrap();

        assert_eq!(output.duration_minutes, 45);
        assert_eq!(output.statistics.device_records, 3 * 45);
        assert_eq!(
            output.statistics.metric_records + output.statistics.metric_checks_skipped,
            3 * 22
        );
    }

    #[test]
    fn test_same_seed_reproduces_streams() {
        let run = |seed| {
            Simulation::new(&data(4, 3), start(), Some(30), RandomDisconnects::default(), StdRng::seed_from_u64(seed))
                .unwrap()
                .run()
                .unwrap()
        };

        let a = run(62);
        let b = run(62);

        assert_eq!(a.device_records, b.device_records);
        assert_eq!(a.metric_records, b.metric_records);
        assert_eq!(a.statistics, b.statistics);
    }

    #[test]
    fn test_missing_interval_aborts_before_running() {
        let mut snapshot = data(2, 1);
        snapshot.sampling_intervals.pop();

        let result = Simulation::new(
            &snapshot,
            start(),
            None,
            RandomDisconnects::default(),
            StdRng::seed_from_u64(63),
        );

        assert!(matches!(result, Err(SimError::Configuration(_))));
    }

    #[test]
    fn test_fleet_size_fits_device_ids() {
        assert_eq!(fleet_size(12).unwrap(), 12);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_fleet_size_overflow_is_configuration_error() {
        let users = u32::MAX as usize + 1;
        assert!(matches!(fleet_size(users), Err(SimError::Configuration(_))));
    }

    #[test]
    fn test_full_day_records_stay_inside_horizon() {
        let mut simulation =
            Simulation::new(&data(3, 1), start(), Some(1440), RandomDisconnects::default(), StdRng::seed_from_u64(1))
                .unwrap();

        let output = simulation.run().unwrap();
        let horizon_end = start() + Duration::minutes(1440);

        assert_eq!(
            output.statistics.metric_records + output.statistics.metric_checks_skipped,
            3 * 1440
        );
        for record in &output.metric_records {
            assert!(record.timestamp >= start() && record.timestamp < horizon_end);
            assert!(!simulation.tracker().query(record.device_id, record.timestamp));
        }
        for record in &output.device_records {
            assert!(record.timestamp >= start() && record.timestamp < horizon_end);
        }
    }
}
