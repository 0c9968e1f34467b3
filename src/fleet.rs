//! Device fleet and patient assignment
//!
//! Devices are numbered from 1 and take firmware from a rotating catalog.
//! Every user in the reference snapshot becomes a patient wearing either
//! their assigned device or, failing that, a random one from the fleet.

use rand::Rng;
use tracing::{info, warn};

use crate::error::{SimError, SimResult};
use crate::models::{Device, DeviceId, Firmware, Patient};
use crate::reference::ReferenceIndex;

pub const FIRMWARE_CATALOG: [Firmware; 5] = [
    Firmware { name: "FirmwareA", version: "1.0.0" },
    Firmware { name: "FirmwareB", version: "2.1.0" },
    Firmware { name: "FirmwareC", version: "3.0.1" },
    Firmware { name: "FirmwareD", version: "4.0.2" },
    Firmware { name: "FirmwareE", version: "5.1.1" },
];

/// Device 1 runs FirmwareA, device 6 wraps back to it.
pub fn firmware_for(device_id: DeviceId) -> Firmware {
    let slot = (device_id.saturating_sub(1) as usize) % FIRMWARE_CATALOG.len();
    FIRMWARE_CATALOG[slot]
}

/// Devices `1..=device_count` in id order
#[derive(Debug, Clone)]
pub struct DeviceFleet {
    devices: Vec<Device>,
}

impl DeviceFleet {
    pub fn new(device_count: u32) -> Self {
        let devices = (1..=device_count)
            .map(|device_id| Device {
                device_id,
                firmware: firmware_for(device_id),
            })
            .collect();
        Self { devices }
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn contains(&self, device_id: DeviceId) -> bool {
        device_id >= 1 && (device_id as usize) <= self.devices.len()
    }

    pub fn get(&self, device_id: DeviceId) -> SimResult<&Device> {
        if !self.contains(device_id) {
            return Err(SimError::configuration("device", device_id, "not in firmware catalog"));
        }
        Ok(&self.devices[device_id as usize - 1])
    }
}

/// Pair every user with a device; one device per user in the fleet.
pub fn assign_patients<R: Rng + ?Sized>(
    reference: &ReferenceIndex,
    fleet: &DeviceFleet,
    rng: &mut R,
) -> SimResult<Vec<Patient>> {
    let mut patients = Vec::with_capacity(reference.users().len());

    for user in reference.users() {
        let device_id = match reference.assigned_device(user.user_id) {
            Some(device_id) if fleet.contains(device_id) => device_id,
            Some(device_id) => {
                return Err(SimError::configuration(
                    "user",
                    user.user_id,
                    format!("assigned device {} is not in the fleet of {}", device_id, fleet.len()),
                ));
            }
            None => {
                if fleet.is_empty() {
                    return Err(SimError::configuration("user", user.user_id, "no device available"));
                }
                let device_id = rng.gen_range(1..=fleet.len() as DeviceId);
                warn!(
                    user_id = user.user_id,
                    device_id = device_id,
                    "No device assignment on record, assigned a random device"
                );
                device_id
            }
        };

        patients.push(Patient {
            user_id: user.user_id,
            device_id,
        });
    }

    info!(patients = patients.len(), devices = fleet.len(), "Assigned patients to devices");
    Ok(patients)
}
