//! Patient location simulation
//!
//! Patients move within Spain. A patient's first reading anchors them at a
//! random point inside the bounding box; every later reading lands near that
//! anchor (not near the previous reading), so nobody drifts across the map.

use rand::Rng;
use std::collections::HashMap;

use crate::models::UserId;
use crate::sampling::uniform;

/// Latitude/longitude box in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub latitude_min: f64,
    pub latitude_max: f64,
    pub longitude_min: f64,
    pub longitude_max: f64,
}

impl BoundingBox {
    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.latitude_min..=self.latitude_max).contains(&point.latitude)
            && (self.longitude_min..=self.longitude_max).contains(&point.longitude)
    }
}

pub const SPAIN: BoundingBox = BoundingBox {
    latitude_min: 36.0,
    latitude_max: 43.79,
    longitude_min: -9.3,
    longitude_max: 3.3,
};

/// Per-axis perturbation magnitude bounds, in degrees
pub const NEARBY_OFFSET_MIN: f64 = 0.01;
pub const NEARBY_OFFSET_MAX: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Anchor points per user for one run
#[derive(Debug, Clone)]
pub struct PatientLocator {
    region: BoundingBox,
    anchors: HashMap<UserId, GeoPoint>,
}

impl Default for PatientLocator {
    fn default() -> Self {
        Self::new(SPAIN)
    }
}

impl PatientLocator {
    pub fn new(region: BoundingBox) -> Self {
        Self {
            region,
            anchors: HashMap::new(),
        }
    }

    /// Location for the user's next reading.
    pub fn locate<R: Rng + ?Sized>(&mut self, user_id: UserId, rng: &mut R) -> GeoPoint {
        match self.anchors.get(&user_id) {
            Some(anchor) => nearby(*anchor, rng),
            None => {
                let anchor = GeoPoint {
                    latitude: uniform(rng, self.region.latitude_min, self.region.latitude_max),
                    longitude: uniform(rng, self.region.longitude_min, self.region.longitude_max),
                };
                self.anchors.insert(user_id, anchor);
                anchor
            }
        }
    }

    pub fn anchor(&self, user_id: UserId) -> Option<GeoPoint> {
        self.anchors.get(&user_id).copied()
    }
}

fn nearby<R: Rng + ?Sized>(anchor: GeoPoint, rng: &mut R) -> GeoPoint {
    let range_lat = uniform(rng, NEARBY_OFFSET_MIN, NEARBY_OFFSET_MAX);
    let range_lon = uniform(rng, NEARBY_OFFSET_MIN, NEARBY_OFFSET_MAX);
    GeoPoint {
        latitude: uniform(rng, anchor.latitude - range_lat, anchor.latitude + range_lat),
        longitude: uniform(rng, anchor.longitude - range_lon, anchor.longitude + range_lon),
    }
}
