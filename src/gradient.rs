use crate::geometry::LineGeometry;
use crate::types::RoutePoint;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Fixed speed → color ramp, ordered by upper bound
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpeedColor {
    Blue,
    DodgerBlue,
    Cyan,
    Lime,
    Chartreuse,
    Yellow,
    Gold,
    Orange,
    DeepOrange,
    Red,
    DeepRed,
}

impl SpeedColor {
    /// First bucket whose upper bound is >= `speed`; anything above 10 is deep red
    pub fn for_speed(speed: f64) -> Self {
        match speed {
            s if s <= 1.0 => SpeedColor::Blue,
            s if s <= 2.0 => SpeedColor::DodgerBlue,
            s if s <= 3.0 => SpeedColor::Cyan,
            s if s <= 4.0 => SpeedColor::Lime,
            s if s <= 5.0 => SpeedColor::Chartreuse,
            s if s <= 6.0 => SpeedColor::Yellow,
            s if s <= 7.0 => SpeedColor::Gold,
            s if s <= 8.0 => SpeedColor::Orange,
            s if s <= 9.0 => SpeedColor::DeepOrange,
            s if s <= 10.0 => SpeedColor::Red,
            _ => SpeedColor::DeepRed,
        }
    }

    pub fn hex(&self) -> &'static str {
        match self {
            SpeedColor::Blue => "#0000FF",
            SpeedColor::DodgerBlue => "#1E90FF",
            SpeedColor::Cyan => "#00FFFF",
            SpeedColor::Lime => "#00FF00",
            SpeedColor::Chartreuse => "#7FFF00",
            SpeedColor::Yellow => "#FFFF00",
            SpeedColor::Gold => "#FFD700",
            SpeedColor::Orange => "#FFA500",
            SpeedColor::DeepOrange => "#FF4500",
            SpeedColor::Red => "#FF0000",
            SpeedColor::DeepRed => "#8B0000",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    /// Position along the line, 0 at the first point
    pub fraction: f64,
    pub color: SpeedColor,
}

/// Ordered color stops keyed by fraction of total path length
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GradientStops(pub Vec<GradientStop>);

impl GradientStops {
    /// One stop per point, at the cumulative distance fraction of that point.
    ///
    /// A zero-length route (single point, or every point coincident) gets a
    /// single stop at 0 colored by the first point. Coincident neighbours in
    /// an otherwise non-degenerate route keep both stops so a speed change
    /// at a standstill is still visible.
    pub fn compile(points: &[RoutePoint], geometry: &LineGeometry) -> Self {
        let Some(first) = points.first() else {
            return GradientStops::default();
        };

        let total = geometry.total_length();
        if geometry.is_degenerate() {
            return GradientStops(vec![GradientStop {
                fraction: 0.0,
                color: SpeedColor::for_speed(first.speed),
            }]);
        }

        let stops = points
            .iter()
            .zip(geometry.cumulative_distances())
            .map(|(point, distance)| GradientStop {
                fraction: (distance / total).clamp(0.0, 1.0),
                color: SpeedColor::for_speed(point.speed),
            })
            .collect();

        GradientStops(stops)
    }

    pub fn stops(&self) -> &[GradientStop] {
        &self.0
    }

    pub fn colors(&self) -> Vec<SpeedColor> {
        self.0.iter().map(|s| s.color).collect()
    }

    /// Renderer expression:
    /// `["interpolate", ["linear"], ["line-progress"], f0, "#RRGGBB", ...]`
    pub fn to_expression(&self) -> Value {
        let mut exp = vec![json!("interpolate"), json!(["linear"]), json!(["line-progress"])];
        for stop in &self.0 {
            exp.push(json!(stop.fraction));
            exp.push(json!(stop.color.hex()));
        }
        Value::Array(exp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(speeds: &[f64]) -> Vec<RoutePoint> {
        speeds
            .iter()
            .enumerate()
            .map(|(i, &s)| RoutePoint::new(47.0 + i as f64 * 0.001, 8.0, s))
            .collect()
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(SpeedColor::for_speed(0.0), SpeedColor::Blue);
        assert_eq!(SpeedColor::for_speed(1.0), SpeedColor::Blue);
        assert_eq!(SpeedColor::for_speed(1.01), SpeedColor::DodgerBlue);
        assert_eq!(SpeedColor::for_speed(5.0), SpeedColor::Chartreuse);
        assert_eq!(SpeedColor::for_speed(9.5), SpeedColor::Red);
        assert_eq!(SpeedColor::for_speed(10.0), SpeedColor::Red);
        assert_eq!(SpeedColor::for_speed(10.01), SpeedColor::DeepRed);
        assert_eq!(SpeedColor::for_speed(f64::MAX), SpeedColor::DeepRed);
    }

    #[test]
    fn test_colors_follow_speeds() {
        let points = route(&[0.5, 3.0, 11.0]);
        let geometry = LineGeometry::from_points(&points).unwrap();

        let gradient = GradientStops::compile(&points, &geometry);
        assert_eq!(
            gradient.colors(),
            vec![SpeedColor::Blue, SpeedColor::Cyan, SpeedColor::DeepRed]
        );
    }

    #[test]
    fn test_fractions_start_at_zero_and_never_decrease() {
        let points = route(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let geometry = LineGeometry::from_points(&points).unwrap();
        let gradient = GradientStops::compile(&points, &geometry);

        let fractions: Vec<f64> = gradient.stops().iter().map(|s| s.fraction).collect();
        assert_eq!(fractions[0], 0.0);
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
        assert!((fractions[4] - 1.0).abs() < 1e-9);
        // Equal spacing along a meridian
        assert!((fractions[2] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_single_point_gets_single_stop() {
        let points = route(&[7.5]);
        let geometry = LineGeometry::from_points(&points).unwrap();

        let gradient = GradientStops::compile(&points, &geometry);
        assert_eq!(
            gradient.stops(),
            &[GradientStop {
                fraction: 0.0,
                color: SpeedColor::Orange
            }]
        );
    }

    #[test]
    fn test_all_coincident_points_collapse_to_single_stop() {
        let points = vec![RoutePoint::new(47.0, 8.0, 0.0), RoutePoint::new(47.0, 8.0, 12.0)];
        let geometry = LineGeometry::from_points(&points).unwrap();

        let gradient = GradientStops::compile(&points, &geometry);
        assert_eq!(gradient.colors(), vec![SpeedColor::Blue]);
    }

    #[test]
    fn test_standstill_keeps_both_stops() {
        let points = vec![
            RoutePoint::new(47.0, 8.0, 0.5),
            RoutePoint::new(47.0, 8.0, 6.0),
            RoutePoint::new(47.001, 8.0, 6.0),
        ];
        let geometry = LineGeometry::from_points(&points).unwrap();

        let gradient = GradientStops::compile(&points, &geometry);
        assert_eq!(gradient.stops().len(), 3);
        assert_eq!(gradient.stops()[0].fraction, 0.0);
        assert_eq!(gradient.stops()[1].fraction, 0.0);
        assert_eq!(gradient.stops()[1].color, SpeedColor::Yellow);
    }

    #[test]
    fn test_expression_layout() {
        let points = route(&[0.0, 2.0]);
        let geometry = LineGeometry::from_points(&points).unwrap();
        let exp = GradientStops::compile(&points, &geometry).to_expression();

        assert_eq!(
            exp,
            json!(["interpolate", ["linear"], ["line-progress"], 0.0, "#0000FF", 1.0, "#1E90FF"])
        );
    }
}
