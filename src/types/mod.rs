pub mod features;

pub use features::{points_from_features, to_feature_collection};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// One geo-located sample of a route.
///
/// `speed` is the absolute value of the logger's signed `pitch` reading.
/// No unit conversion is applied. Stored documents use the short
/// `lat`/`lng` keys.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
    pub speed: f64,
}

impl RoutePoint {
    pub fn new(latitude: f64, longitude: f64, speed: f64) -> Self {
        RoutePoint {
            latitude,
            longitude,
            speed: speed.abs(),
        }
    }

    /// Coordinate pair in GeoJSON order: (lng, lat)
    pub fn lng_lat(&self) -> (f64, f64) {
        (self.longitude, self.latitude)
    }
}

/// Opaque identifier of a stored route document
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(String);

impl RouteId {
    pub fn new(id: impl Into<String>) -> Self {
        RouteId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RouteId {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RouteId {
    fn from(id: &str) -> Self {
        RouteId(id.to_string())
    }
}

impl From<String> for RouteId {
    fn from(id: String) -> Self {
        RouteId(id)
    }
}

/// Successful upload summary returned by the upload endpoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub id: RouteId,
    /// Points written to the new route document
    pub stored: usize,
    /// Non-empty lines that failed to decode
    pub discarded: usize,
}
