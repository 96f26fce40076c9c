use crate::animator::{AnimationConfig, RouteAnimator, ScheduledStep, StepOutcome, StepToken};
use crate::driver::AnimatorCommand;
use crate::error::{AnimationError, ClientError};
use crate::render::{Popup, RenderSurface};
use crate::types::{RouteId, RoutePoint};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc::Sender;

/// A rendered shape under the cursor, as reported by the renderer
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ShapeHit {
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// `[lng, lat]` for points, `[[lng, lat], ...]` for lines
    #[serde(default)]
    pub coordinates: Value,
}

impl ShapeHit {
    pub fn point(lng: f64, lat: f64, speed: Option<f64>) -> Self {
        let mut properties = Map::new();
        if let Some(speed) = speed {
            properties.insert("speed".to_string(), serde_json::json!(speed));
        }
        ShapeHit {
            properties,
            coordinates: serde_json::json!([lng, lat]),
        }
    }

    /// First coordinate of the hit geometry, `None` when malformed
    pub fn anchor(&self) -> Option<(f64, f64)> {
        let coords = match self.coordinates.as_array()?.first() {
            Some(Value::Array(_)) => self.coordinates.get(0)?,
            _ => &self.coordinates,
        };

        match coords.as_array()?.as_slice() {
            [lng, lat] => Some((lng.as_f64()?, lat.as_f64()?)),
            _ => None,
        }
    }

    pub fn speed(&self) -> Option<f64> {
        self.properties.get("speed").and_then(Value::as_f64)
    }
}

/// The map view: one animator bound to one render surface
pub struct MapSession<S: RenderSurface> {
    animator: RouteAnimator,
    surface: S,
}

impl<S: RenderSurface> MapSession<S> {
    /// Open the map on `points` and paint the initial view
    pub fn open(
        points: Vec<RoutePoint>,
        config: AnimationConfig,
        mut surface: S,
    ) -> Result<Self, AnimationError> {
        let animator = RouteAnimator::new(points, config)?;
        animator.render_initial(&mut surface);
        Ok(MapSession { animator, surface })
    }

    pub fn animator(&self) -> &RouteAnimator {
        &self.animator
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn play(&mut self) -> Result<ScheduledStep, AnimationError> {
        self.animator.start()
    }

    pub fn pause(&mut self) -> Result<(), AnimationError> {
        self.animator.pause()
    }

    pub fn toggle(&mut self) -> Option<ScheduledStep> {
        self.animator.toggle()
    }

    pub fn step(&mut self, token: StepToken) -> StepOutcome {
        self.animator.step(token, &mut self.surface)
    }

    pub fn replace_route(&mut self, points: Vec<RoutePoint>) -> Result<(), AnimationError> {
        self.animator.replace_route(points, &mut self.surface)
    }

    /// Popup with the speed of the first hit shape; malformed hits are logged and ignored
    pub fn on_map_click(&mut self, hits: &[ShapeHit]) {
        let Some(hit) = hits.first() else {
            return;
        };

        let Some(position) = hit.anchor() else {
            log::error!("Invalid coordinates format: {}", hit.coordinates);
            return;
        };

        self.surface.show_popup(&Popup {
            position,
            speed: hit.speed(),
        });
    }

    pub fn show_route_list(&mut self, ids: &[RouteId]) {
        self.surface.show_route_list(ids);
    }

    pub fn show_notice(&mut self, message: &str) {
        self.surface.show_notice(message);
    }
}

/// Where the viewer gets route ids and route points from
#[async_trait]
pub trait RouteSource: Send + Sync {
    async fn list_route_ids(&self) -> Result<Vec<RouteId>, ClientError>;

    async fn fetch_route(&self, id: &RouteId) -> Result<Vec<RoutePoint>, ClientError>;
}

/// Route list browsing. Results travel to the map session as driver commands.
pub struct RouteBrowser<R: RouteSource> {
    source: R,
    commands: Sender<AnimatorCommand>,
}

impl<R: RouteSource> RouteBrowser<R> {
    pub fn new(source: R, commands: Sender<AnimatorCommand>) -> Self {
        RouteBrowser { source, commands }
    }

    /// Fetch every id and show it as a selectable list
    pub async fn browse(&self) -> Vec<RouteId> {
        match self.source.list_route_ids().await {
            Ok(ids) => {
                self.send(AnimatorCommand::ShowRouteList(ids.clone())).await;
                ids
            }
            Err(e) => {
                log::error!("Error getting route ids: {}", e);
                self.send(AnimatorCommand::Notice(format!("Could not list routes: {}", e)))
                    .await;
                Vec::new()
            }
        }
    }

    /// Fetch `id` and swap it in as the active route. Returns whether it was loaded.
    pub async fn select(&self, id: &RouteId) -> bool {
        match self.source.fetch_route(id).await {
            Ok(points) if points.is_empty() => {
                log::warn!("Route {} has no points, keeping current route", id);
                self.send(AnimatorCommand::Notice(format!("Route {} is empty", id)))
                    .await;
                false
            }
            Ok(points) => {
                self.send(AnimatorCommand::LoadRoute(points)).await;
                true
            }
            Err(ClientError::NotFound(id)) => {
                log::warn!("Route {} not found, keeping current route", id);
                false
            }
            Err(e) => {
                log::error!("Failed to fetch route {}: {}", id, e);
                self.send(AnimatorCommand::Notice(format!("Could not load {}: {}", id, e)))
                    .await;
                false
            }
        }
    }

    async fn send(&self, command: AnimatorCommand) {
        if self.commands.send(command).await.is_err() {
            log::warn!("Map session is gone, dropping command");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{RecordingSurface, RenderCommand};
    use tokio::sync::mpsc;

    fn open_session() -> MapSession<RecordingSurface> {
        let points = vec![RoutePoint::new(47.0, 8.0, 1.0), RoutePoint::new(47.001, 8.0, 2.0)];
        let mut session =
            MapSession::open(points, AnimationConfig::default(), RecordingSurface::new()).unwrap();
        session.surface_mut().take();
        session
    }

    #[test]
    fn test_open_paints_route_and_markers() {
        let points = vec![RoutePoint::new(47.0, 8.0, 1.0)];
        let session =
            MapSession::open(points, AnimationConfig::default(), RecordingSurface::new()).unwrap();

        let commands = &session.surface().commands;
        assert!(matches!(commands[0], RenderCommand::DrawRoute(_)));
        assert_eq!(session.surface().cameras()[0].zoom, 12.0);
    }

    #[test]
    fn test_click_on_point_opens_popup() {
        let mut session = open_session();
        session.on_map_click(&[ShapeHit::point(8.0, 47.0, Some(3.5))]);

        assert_eq!(
            session.surface().commands,
            vec![RenderCommand::ShowPopup {
                position: (8.0, 47.0),
                content: "slope: 3.5 mph".to_string(),
            }]
        );
    }

    #[test]
    fn test_click_on_line_uses_first_coordinate() {
        let mut session = open_session();
        let hit = ShapeHit {
            properties: Map::new(),
            coordinates: serde_json::json!([[8.5, 47.5], [8.6, 47.6]]),
        };
        session.on_map_click(&[hit]);

        assert_eq!(
            session.surface().commands,
            vec![RenderCommand::ShowPopup {
                position: (8.5, 47.5),
                content: "slope: n/a".to_string(),
            }]
        );
    }

    #[test]
    fn test_click_misses_and_malformed_hits_are_ignored() {
        let mut session = open_session();
        session.on_map_click(&[]);
        session.on_map_click(&[ShapeHit {
            properties: Map::new(),
            coordinates: serde_json::json!([8.0]),
        }]);
        session.on_map_click(&[ShapeHit {
            properties: Map::new(),
            coordinates: serde_json::json!("nope"),
        }]);
        session.on_map_click(&[ShapeHit::default()]);

        assert!(session.surface().commands.is_empty());
    }

    #[test]
    fn test_shape_hit_deserializes() {
        let hit: ShapeHit =
            serde_json::from_str(r#"{"properties":{"speed":7},"coordinates":[8.1,47.1]}"#).unwrap();
        assert_eq!(hit.anchor(), Some((8.1, 47.1)));
        assert_eq!(hit.speed(), Some(7.0));
    }

    struct FakeSource {
        routes: Vec<(RouteId, Vec<RoutePoint>)>,
    }

    #[async_trait]
    impl RouteSource for FakeSource {
        async fn list_route_ids(&self) -> Result<Vec<RouteId>, ClientError> {
            Ok(self.routes.iter().map(|(id, _)| id.clone()).collect())
        }

        async fn fetch_route(&self, id: &RouteId) -> Result<Vec<RoutePoint>, ClientError> {
            self.routes
                .iter()
                .find(|(candidate, _)| candidate == id)
                .map(|(_, points)| points.clone())
                .ok_or_else(|| ClientError::NotFound(id.clone()))
        }
    }

    #[tokio::test]
    async fn test_browse_and_select() {
        let route = vec![RoutePoint::new(1.0, 2.0, 3.0)];
        let source = FakeSource {
            routes: vec![
                (RouteId::from("a"), route.clone()),
                (RouteId::from("empty"), Vec::new()),
            ],
        };
        let (tx, mut rx) = mpsc::channel(8);
        let browser = RouteBrowser::new(source, tx);

        let ids = browser.browse().await;
        assert_eq!(ids, vec![RouteId::from("a"), RouteId::from("empty")]);
        assert!(matches!(rx.recv().await, Some(AnimatorCommand::ShowRouteList(list)) if list == ids));

        assert!(browser.select(&RouteId::from("a")).await);
        assert!(matches!(rx.recv().await, Some(AnimatorCommand::LoadRoute(points)) if points == route));

        assert!(!browser.select(&RouteId::from("empty")).await);
        assert!(matches!(rx.recv().await, Some(AnimatorCommand::Notice(_))));

        assert!(!browser.select(&RouteId::from("missing")).await);
        assert!(rx.try_recv().is_err());
    }

    struct DownSource;

    #[async_trait]
    impl RouteSource for DownSource {
        async fn list_route_ids(&self) -> Result<Vec<RouteId>, ClientError> {
            Err(ClientError::Decode("connection reset".to_string()))
        }

        async fn fetch_route(&self, _id: &RouteId) -> Result<Vec<RoutePoint>, ClientError> {
            Err(ClientError::Decode("connection reset".to_string()))
        }
    }

    #[tokio::test]
    async fn test_service_failures_become_notices() {
        let (tx, mut rx) = mpsc::channel(8);
        let browser = RouteBrowser::new(DownSource, tx);

        assert!(browser.browse().await.is_empty());
        assert!(matches!(rx.recv().await, Some(AnimatorCommand::Notice(_))));

        assert!(!browser.select(&RouteId::from("a")).await);
        assert!(matches!(rx.recv().await, Some(AnimatorCommand::Notice(_))));
    }
}
