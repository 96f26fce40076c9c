use crate::error::AnimationError;
use crate::geometry::{initial_bearing, interpolate, LineGeometry};
use crate::gradient::GradientStops;
use crate::render::{CameraOptions, InfoLabel, MarkerKind, MarkerUpdate, RenderSurface, RouteLayer};
use crate::types::RoutePoint;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound for the wait between two steps
pub const MAX_STEP_DELAY: Duration = Duration::from_secs(60 * 60);

/// Timing and camera parameters for route playback
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Interpolation sub-steps between two route points (K)
    pub sub_steps: u32,
    /// Time budget of one sub-step
    pub frame_interval_ms: u64,
    pub follow_zoom: f64,
    pub overview_zoom: f64,
    pub initial_zoom: f64,
    pub pitch: f64,
    pub reset_duration_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        AnimationConfig {
            sub_steps: 5,
            frame_interval_ms: 50,
            follow_zoom: 18.0,
            overview_zoom: 17.0,
            initial_zoom: 12.0,
            pitch: 45.0,
            reset_duration_ms: 500,
        }
    }
}

impl AnimationConfig {
    fn sub_steps(&self) -> u32 {
        self.sub_steps.max(1)
    }

    /// Delay between two point-to-point steps: interval × (K + 1), capped at
    /// [`MAX_STEP_DELAY`]
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
            .saturating_mul(self.sub_steps().saturating_add(1))
            .min(MAX_STEP_DELAY)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Phase {
    Paused,
    Running,
}

/// Identity of one scheduled continuation.
///
/// Tokens are never reused, so a token that is not the animator's current
/// pending token can only belong to a cancelled or already consumed step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StepToken(u64);

/// A step the caller must run after `delay`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduledStep {
    pub token: StepToken,
    pub delay: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Token was cancelled or already used; nothing happened
    Stale,
    Advanced(ScheduledStep),
    /// Reached the last point, reset to point 0 and paused
    Completed,
}

/// Mutable playback state, owned by [`RouteAnimator`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnimationState {
    current_index: usize,
    phase: Phase,
    pending: Option<StepToken>,
    next_token: u64,
}

impl AnimationState {
    fn new() -> Self {
        AnimationState {
            current_index: 0,
            phase: Phase::Paused,
            pending: None,
            next_token: 0,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pending(&self) -> Option<StepToken> {
        self.pending
    }

    fn schedule(&mut self, delay: Duration) -> ScheduledStep {
        let token = StepToken(self.next_token);
        self.next_token += 1;
        self.pending = Some(token);
        ScheduledStep { token, delay }
    }

    fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            log::debug!("Cancelled pending step {:?}", token);
        }
    }

    fn reset(&mut self) {
        self.cancel();
        self.current_index = 0;
        self.phase = Phase::Paused;
    }
}

/// Cancellable, resumable stepper over a route.
///
/// The animator never sleeps. `start` and `step` hand back a
/// [`ScheduledStep`] and the caller runs `step` with its token after the
/// delay. `pause` and `replace_route` invalidate the pending token in the
/// same call that changes the phase, so a late timer cannot apply a stale
/// update.
pub struct RouteAnimator {
    points: Vec<RoutePoint>,
    geometry: LineGeometry,
    gradient: GradientStops,
    state: AnimationState,
    config: AnimationConfig,
}

impl RouteAnimator {
    pub fn new(points: Vec<RoutePoint>, config: AnimationConfig) -> Result<Self, AnimationError> {
        let geometry = LineGeometry::from_points(&points)?;
        let gradient = GradientStops::compile(&points, &geometry);

        Ok(RouteAnimator {
            points,
            geometry,
            gradient,
            state: AnimationState::new(),
            config,
        })
    }

    pub fn points(&self) -> &[RoutePoint] {
        &self.points
    }

    pub fn geometry(&self) -> &LineGeometry {
        &self.geometry
    }

    pub fn gradient(&self) -> &GradientStops {
        &self.gradient
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.state.phase == Phase::Running
    }

    pub fn route_layer(&self) -> RouteLayer {
        RouteLayer::new(&self.points, &self.geometry, &self.gradient)
    }

    /// First paint of a freshly opened map: route, markers, wide camera
    pub fn render_initial<S: RenderSurface>(&self, surface: &mut S) {
        surface.draw_route(&self.route_layer());
        self.park_markers(surface);
        surface.set_camera(CameraOptions {
            center: self.points[0].lng_lat(),
            zoom: self.config.initial_zoom,
            pitch: 0.0,
            bearing: 0.0,
            duration_ms: 0,
        });
    }

    /// Paused → Running; the first step is due immediately
    pub fn start(&mut self) -> Result<ScheduledStep, AnimationError> {
        if self.state.phase == Phase::Running {
            return Err(AnimationError::InvalidTransition("start while running"));
        }

        self.state.phase = Phase::Running;
        log::debug!("Animation started at point {}", self.state.current_index);
        Ok(self.state.schedule(Duration::ZERO))
    }

    /// Running → Paused, keeps the current index
    pub fn pause(&mut self) -> Result<(), AnimationError> {
        if self.state.phase != Phase::Running {
            return Err(AnimationError::InvalidTransition("pause while paused"));
        }

        self.state.cancel();
        self.state.phase = Phase::Paused;
        log::debug!("Animation paused at point {}", self.state.current_index);
        Ok(())
    }

    /// Play/pause button semantics. Returns the step to schedule when starting.
    pub fn toggle(&mut self) -> Option<ScheduledStep> {
        match self.state.phase {
            Phase::Paused => self.start().ok(),
            Phase::Running => {
                let _ = self.pause();
                None
            }
        }
    }

    /// Run the scheduled continuation identified by `token`
    pub fn step<S: RenderSurface>(&mut self, token: StepToken, surface: &mut S) -> StepOutcome {
        if self.state.phase != Phase::Running || self.state.pending != Some(token) {
            log::debug!("Ignoring stale step {:?}", token);
            return StepOutcome::Stale;
        }
        self.state.pending = None;

        let index = self.state.current_index;
        if index + 1 >= self.points.len() {
            self.complete(surface);
            return StepOutcome::Completed;
        }

        let start = self.points[index].lng_lat();
        let end = self.points[index + 1].lng_lat();
        let speed = self.points[index].speed;
        let bearing = initial_bearing(start, end);

        let sub_steps = self.config.sub_steps();
        for sub_step in 0..=sub_steps {
            let factor = sub_step as f64 / sub_steps as f64;
            let position = interpolate(start, end, factor);

            surface.set_marker(
                MarkerKind::Position,
                MarkerUpdate {
                    position,
                    visible: None,
                },
            );
            surface.set_marker(
                MarkerKind::Info,
                MarkerUpdate {
                    position,
                    visible: Some(true),
                },
            );
            surface.set_info_label(&InfoLabel {
                speed,
                latitude: position.1,
                longitude: position.0,
            });
            surface.set_camera(CameraOptions {
                center: position,
                zoom: self.config.follow_zoom,
                pitch: self.config.pitch,
                bearing,
                duration_ms: self.config.frame_interval_ms,
            });
        }

        self.state.current_index = index + 1;
        StepOutcome::Advanced(self.state.schedule(self.config.step_delay()))
    }

    /// Swap in a new route: cancels any pending step, redraws, resets to point 0
    pub fn replace_route<S: RenderSurface>(
        &mut self,
        points: Vec<RoutePoint>,
        surface: &mut S,
    ) -> Result<(), AnimationError> {
        let geometry = LineGeometry::from_points(&points)?;
        let gradient = GradientStops::compile(&points, &geometry);

        self.state.reset();
        self.points = points;
        self.geometry = geometry;
        self.gradient = gradient;

        surface.clear();
        surface.draw_route(&self.route_layer());
        self.park_markers(surface);
        surface.set_camera(self.overview_camera());

        log::info!("Loaded route with {} point(s)", self.points.len());
        Ok(())
    }

    fn complete<S: RenderSurface>(&mut self, surface: &mut S) {
        self.state.reset();
        self.park_markers(surface);
        surface.set_camera(self.overview_camera());
        surface.animation_finished();
        log::info!("Animation finished");
    }

    fn park_markers<S: RenderSurface>(&self, surface: &mut S) {
        let origin = self.points[0].lng_lat();
        surface.set_marker(
            MarkerKind::Position,
            MarkerUpdate {
                position: origin,
                visible: None,
            },
        );
        surface.set_marker(
            MarkerKind::Info,
            MarkerUpdate {
                position: origin,
                visible: Some(false),
            },
        );
    }

    fn overview_camera(&self) -> CameraOptions {
        CameraOptions {
            center: self.points[0].lng_lat(),
            zoom: self.config.overview_zoom,
            pitch: self.config.pitch,
            bearing: 0.0,
            duration_ms: self.config.reset_duration_ms,
        }
    }
}
