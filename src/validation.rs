//! Record validation module
//!
//! Every record the simulation emits is checked against its declared domain.
//! A failure here means a generator broke an invariant, so it surfaces as
//! [`SimError::RangeViolation`] and aborts the run.

use tracing::warn;
use validator::{Validate, ValidationErrors};

use crate::error::{SimError, SimResult};
use crate::models::{DeviceRecord, MetricRecord};

/// Validate a device health record
pub fn validate_device_record(record: &DeviceRecord) -> SimResult<()> {
    if let Err(validation_errors) = record.validate() {
        let message = describe(&validation_errors);
        warn!(device_id = record.device_id, errors = %message, "Device record out of range");
        return Err(SimError::RangeViolation(message));
    }

    Ok(())
}

/// Validate a glucose metric record
pub fn validate_metric_record(record: &MetricRecord) -> SimResult<()> {
    if !record.glucose_reading.is_finite() {
        return Err(SimError::RangeViolation(format!(
            "glucose_reading: {} is not a finite number",
            record.glucose_reading
        )));
    }

    if let Err(validation_errors) = record.validate() {
        let message = describe(&validation_errors);
        warn!(user_id = record.user_id, errors = %message, "Metric record out of range");
        return Err(SimError::RangeViolation(message));
    }

    Ok(())
}

fn describe(validation_errors: &ValidationErrors) -> String {
    let error_messages: Vec<String> = validation_errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let msgs: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.message.as_ref().map(|c| c.as_ref()))
                .collect();
            format!("{}: {}", field, msgs.join(", "))
        })
        .collect();

    error_messages.join("; ")
}
