use crate::error::GeometryError;
use crate::types::RoutePoint;
use geo::{Coord, HaversineBearing, HaversineDistance, LineString, Point};

/// Connected line through the route points plus its distance index.
///
/// Distances are great-circle (haversine) meters. `cumulative[i]` is the
/// path length from point 0 to point i, so `cumulative[0] == 0` and the
/// array is non-decreasing.
#[derive(Clone, Debug, PartialEq)]
pub struct LineGeometry {
    line: LineString<f64>,
    segment_lengths: Vec<f64>,
    cumulative: Vec<f64>,
}

impl LineGeometry {
    pub fn from_points(points: &[RoutePoint]) -> Result<Self, GeometryError> {
        let coords: Vec<(f64, f64)> = points.iter().map(RoutePoint::lng_lat).collect();
        Self::from_coords(&coords)
    }

    /// Build from `(lng, lat)` pairs in traversal order
    pub fn from_coords(coords: &[(f64, f64)]) -> Result<Self, GeometryError> {
        if coords.is_empty() {
            return Err(GeometryError::Empty);
        }

        let segment_lengths: Vec<f64> = coords
            .windows(2)
            .map(|pair| segment_length(pair[0], pair[1]))
            .collect();

        let mut cumulative = Vec::with_capacity(coords.len());
        let mut progress = 0.0;
        cumulative.push(progress);
        for length in &segment_lengths {
            progress += length;
            cumulative.push(progress);
        }

        let line = LineString::new(coords.iter().map(|&(x, y)| Coord { x, y }).collect());

        Ok(LineGeometry {
            line,
            segment_lengths,
            cumulative,
        })
    }

    pub fn line(&self) -> &LineString<f64> {
        &self.line
    }

    /// `(lng, lat)` pairs, 1:1 with the input points
    pub fn coords(&self) -> Vec<(f64, f64)> {
        self.line.0.iter().map(|c| (c.x, c.y)).collect()
    }

    /// Length of each segment, one fewer entry than points
    pub fn segment_lengths(&self) -> &[f64] {
        &self.segment_lengths
    }

    pub fn cumulative_distances(&self) -> &[f64] {
        &self.cumulative
    }

    pub fn total_length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }

    /// Single point or all points coincident
    pub fn is_degenerate(&self) -> bool {
        self.total_length() <= 0.0
    }
}

/// Great-circle distance in meters between two `(lng, lat)` pairs
pub fn segment_length(from: (f64, f64), to: (f64, f64)) -> f64 {
    Point::new(from.0, from.1).haversine_distance(&Point::new(to.0, to.1))
}

/// Initial great-circle bearing from `from` to `to`, degrees in [0, 360)
pub fn initial_bearing(from: (f64, f64), to: (f64, f64)) -> f64 {
    let bearing = Point::new(from.0, from.1).haversine_bearing(Point::new(to.0, to.1));
    let normalized = (bearing + 360.0) % 360.0;
    // -0.0 and tiny negative round-off both land here
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Linear interpolation in lat/lng space, `factor` in [0, 1]
pub fn interpolate(from: (f64, f64), to: (f64, f64), factor: f64) -> (f64, f64) {
    (
        from.0 + (to.0 - from.0) * factor,
        from.1 + (to.1 - from.1) * factor,
    )
}
