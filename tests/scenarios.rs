//! End-to-end simulation scenarios

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::SeedableRng;

use glucosim::behavior::{DietType, ExerciseIntensity, UserBehavior};
use glucosim::device::DeviceTelemetryGenerator;
use glucosim::fleet::DeviceFleet;
use glucosim::models::{ConnectionStatus, ErrorCode};
use glucosim::reference::{
    DeviceAssignment, ReferenceData, SamplingInterval, UserAge, UserCondition, UserMedication, UserThreshold,
};
use glucosim::simulation::Simulation;
use glucosim::stream::is_time_ordered;
use glucosim::tracker::{DisconnectionTracker, RandomDisconnects, ScriptedDisconnects};

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 14)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

fn fleet_snapshot(users: u32) -> ReferenceData {
    let conditions = ["Type 1 Diabetes", "Hypoglycemia", "Hyperglycemia", "Prediabetes"];
    let medications = ["Metformin", "Insulin Lispro", "Glipizide"];

    ReferenceData {
        users: (1..=users).map(|user_id| UserAge { user_id, age: 18 + (user_id * 11) % 60 }).collect(),
        conditions: (1..=users)
            .map(|user_id| UserCondition {
                user_id,
                condition: conditions[user_id as usize % conditions.len()].to_string(),
            })
            .collect(),
        medications: (1..=users)
            .filter(|user_id| user_id % 2 == 0)
            .map(|user_id| UserMedication {
                user_id,
                medication: medications[user_id as usize % medications.len()].to_string(),
            })
            .collect(),
        thresholds: (1..=users)
            .filter(|user_id| user_id % 3 != 0)
            .map(|user_id| UserThreshold {
                user_id,
                min_glucose: 70.0,
                max_glucose: 180.0,
            })
            .collect(),
        device_assignments: (1..=users)
            .filter(|user_id| user_id % 4 != 0)
            .map(|user_id| DeviceAssignment {
                user_id,
                device_id: users + 1 - user_id,
            })
            .collect(),
        sampling_intervals: (1..=users)
            .map(|user_id| SamplingInterval {
                user_id,
                interval_minutes: 1 + user_id % 5,
            })
            .collect(),
        simulation_duration_minutes: 180,
    }
}

#[test]
fn device_records_respect_battery_and_error_invariants() {
    let mut simulation = Simulation::new(
        &fleet_snapshot(12),
        start(),
        None,
        RandomDisconnects::default(),
        StdRng::seed_from_u64(101),
    )
    .unwrap();

    let output = simulation.run().unwrap();

    assert_eq!(output.device_records.len(), 12 * 180);
    assert!(output.statistics.disconnected_device_records > 0);
    for record in &output.device_records {
        assert!(record.battery_level <= 100);
        if record.connection_status == ConnectionStatus::Connected {
            assert_eq!(record.error_code, ErrorCode::NoError);
        } else {
            assert_ne!(record.error_code, ErrorCode::NoError);
        }
    }
}

#[test]
fn metric_records_never_fall_inside_disconnection_windows() {
    let mut simulation = Simulation::new(
        &fleet_snapshot(12),
        start(),
        None,
        RandomDisconnects::with_probability(0.3),
        StdRng::seed_from_u64(102),
    )
    .unwrap();

    let output = simulation.run().unwrap();

    assert!(output.statistics.metric_checks_skipped > 0);
    for record in &output.metric_records {
        assert!(!simulation.tracker().query(record.device_id, record.timestamp));
    }
}

#[test]
fn assembled_streams_are_time_ordered() {
    let mut simulation = Simulation::new(
        &fleet_snapshot(8),
        start(),
        Some(90),
        RandomDisconnects::default(),
        StdRng::seed_from_u64(103),
    )
    .unwrap();

    let output = simulation.run().unwrap();

    assert!(is_time_ordered(&output.device_records));
    assert!(is_time_ordered(&output.metric_records));
}

#[test]
fn one_minute_patient_gets_five_readings_in_five_minutes() {
    let data = ReferenceData {
        users: vec![UserAge { user_id: 1, age: 45 }],
        thresholds: vec![UserThreshold {
            user_id: 1,
            min_glucose: 70.0,
            max_glucose: 180.0,
        }],
        device_assignments: vec![DeviceAssignment { user_id: 1, device_id: 1 }],
        sampling_intervals: vec![SamplingInterval {
            user_id: 1,
            interval_minutes: 1,
        }],
        simulation_duration_minutes: 5,
        ..ReferenceData::default()
    };

    let mut simulation =
        Simulation::new(&data, start(), None, ScriptedDisconnects::never(), StdRng::seed_from_u64(104)).unwrap();
    let output = simulation.run().unwrap();

    assert_eq!(output.metric_records.len(), 5);
    assert_eq!(output.statistics.metric_checks_skipped, 0);
    for pair in output.metric_records.windows(2) {
        let gap = pair[1].timestamp - pair[0].timestamp;
        assert!(gap >= Duration::minutes(1) && gap <= Duration::minutes(2), "gap {}", gap);
    }
}

#[test]
fn forced_outage_at_tick_zero_lasts_two_ticks() {
    let mut rng = StdRng::seed_from_u64(105);
    let fleet = DeviceFleet::new(1);
    let mut tracker = DisconnectionTracker::new(ScriptedDisconnects::once(2));
    let generator = DeviceTelemetryGenerator::new();

    let statuses: Vec<_> = (0..6)
        .map(|minute| {
            let jitter = if minute == 0 { 0 } else { 5 };
            let timestamp = start() + Duration::minutes(minute) + Duration::seconds(jitter);
            generator
                .generate_record(&fleet, 1, timestamp, &mut tracker, &mut rng)
                .unwrap()
                .connection_status
        })
        .collect();

    assert_eq!(&statuses[..2], &[ConnectionStatus::Disconnected; 2]);
    assert!(statuses[2..].iter().all(|s| *s == ConnectionStatus::Connected));
    assert_eq!(tracker.windows(1).len(), 1);
}

#[test]
fn hypoglycemia_balanced_diet_effect_bounds() {
    let mut rng = StdRng::seed_from_u64(106);
    let behavior = UserBehavior {
        user_id: 1,
        age: 62,
        condition: Some("Hypoglycemia".to_string()),
        medication: None,
        exercise_intensity: ExerciseIntensity::None,
        diet_type: DietType::Balanced,
    };

    for _ in 0..5000 {
        let effect = behavior.glucose_reading_effect(&mut rng);
        assert!((-5.0..=15.0).contains(&effect), "effect {}", effect);
    }
}

#[test]
fn device_without_history_is_connected() {
    let tracker = DisconnectionTracker::new(RandomDisconnects::default());
    for minute in 0..60 {
        assert!(!tracker.query(3, start() + Duration::minutes(minute)));
    }
}
