use super::RoutePoint;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};

/// Re-project route points as GeoJSON `Point` features, one per sample.
///
/// Feature order is route order; animation and gradient both depend on it.
pub fn to_feature_collection(points: &[RoutePoint]) -> FeatureCollection {
    let features = points
        .iter()
        .map(|point| {
            let mut properties = JsonObject::new();
            properties.insert("speed".to_string(), serde_json::json!(point.speed));

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![
                    point.longitude,
                    point.latitude,
                ]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Decode `Point` features back into route points.
///
/// Features without a point geometry or a numeric `speed` are skipped and
/// logged; a missing speed is not guessed.
pub fn points_from_features(collection: &FeatureCollection) -> Vec<RoutePoint> {
    let mut points = Vec::with_capacity(collection.features.len());

    for (index, feature) in collection.features.iter().enumerate() {
        let coords = match feature.geometry.as_ref().map(|g| &g.value) {
            Some(Value::Point(coords)) if coords.len() >= 2 => coords,
            _ => {
                log::warn!("Skipping feature {}: not a point geometry", index);
                continue;
            }
        };

        let Some(speed) = feature.property("speed").and_then(|v| v.as_f64()) else {
            log::warn!("Skipping feature {}: missing numeric speed", index);
            continue;
        };

        points.push(RoutePoint::new(coords[1], coords[0], speed));
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_features_keep_route_order() {
        let points = vec![
            RoutePoint::new(51.0, 7.0, 1.0),
            RoutePoint::new(51.1, 7.1, 2.5),
            RoutePoint::new(51.2, 7.2, 0.0),
        ];

        let collection = to_feature_collection(&points);
        assert_eq!(collection.features.len(), 3);

        let first = &collection.features[0];
        match first.geometry.as_ref().map(|g| &g.value) {
            Some(Value::Point(coords)) => assert_eq!(coords, &vec![7.0, 51.0]),
            other => panic!("unexpected geometry {:?}", other),
        }

        assert_eq!(points_from_features(&collection), points);
    }

    #[test]
    fn test_malformed_features_are_skipped() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [8.0, 47.0]}, "properties": {"speed": 4}},
                {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[8.0, 47.0], [8.1, 47.1]]}, "properties": {"speed": 4}},
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [8.2, 47.2]}, "properties": {}}
            ]
        }"#;
        let collection: FeatureCollection = serde_json::from_str(json).unwrap();

        let points = points_from_features(&collection);
        assert_eq!(points, vec![RoutePoint::new(47.0, 8.0, 4.0)]);
    }
}
