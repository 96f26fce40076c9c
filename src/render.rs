//! Seam to the map renderer.
//!
//! The renderer itself (tiles, projection, marker DOM) lives outside this
//! crate. Everything the core asks of it goes through [`RenderSurface`],
//! and every call has a serializable [`RenderCommand`] form so a headless
//! surface can record or stream it.

use crate::geometry::LineGeometry;
use crate::gradient::GradientStops;
use crate::types::{RouteId, RoutePoint};
use serde::Serialize;
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::io::Write;

pub const ROUTE_STROKE_WIDTH: f64 = 6.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CameraOptions {
    /// `(lng, lat)`
    pub center: (f64, f64),
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
    pub duration_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// Dot tracking the current position
    Position,
    /// Label box next to the position
    Info,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MarkerUpdate {
    pub position: (f64, f64),
    /// `None` leaves visibility unchanged
    pub visible: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct InfoLabel {
    pub speed: f64,
    pub latitude: f64,
    pub longitude: f64,
}

impl Display for InfoLabel {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "slope: {} | Lat: {:.5} | Lng: {:.5}",
            self.speed, self.latitude, self.longitude
        )
    }
}

/// Line layer plus the point features it was built from
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RouteLayer {
    pub line: Vec<(f64, f64)>,
    pub points: Vec<RoutePoint>,
    pub stroke_width: f64,
    pub stroke_gradient: Value,
}

impl RouteLayer {
    pub fn new(points: &[RoutePoint], geometry: &LineGeometry, gradient: &GradientStops) -> Self {
        RouteLayer {
            line: geometry.coords(),
            points: points.to_vec(),
            stroke_width: ROUTE_STROKE_WIDTH,
            stroke_gradient: gradient.to_expression(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Popup {
    pub position: (f64, f64),
    pub speed: Option<f64>,
}

impl Popup {
    pub fn content(&self) -> String {
        match self.speed {
            Some(speed) => format!("slope: {} mph", speed),
            None => "slope: n/a".to_string(),
        }
    }
}

pub trait RenderSurface {
    fn set_camera(&mut self, camera: CameraOptions);

    fn set_marker(&mut self, marker: MarkerKind, update: MarkerUpdate);

    fn set_info_label(&mut self, label: &InfoLabel);

    fn draw_route(&mut self, layer: &RouteLayer);

    /// Remove every route line and point from the surface
    fn clear(&mut self);

    fn show_popup(&mut self, popup: &Popup);

    fn show_route_list(&mut self, ids: &[RouteId]);

    /// Non-blocking user notice, e.g. a failed fetch
    fn show_notice(&mut self, message: &str);

    /// The animation ran to the end and reset itself
    fn animation_finished(&mut self);
}

/// Serializable form of every [`RenderSurface`] call
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum RenderCommand {
    SetCamera(CameraOptions),
    SetMarker {
        marker: MarkerKind,
        position: (f64, f64),
        visible: Option<bool>,
    },
    SetInfoLabel {
        text: String,
    },
    DrawRoute(RouteLayer),
    Clear,
    ShowPopup {
        position: (f64, f64),
        content: String,
    },
    ShowRouteList {
        ids: Vec<RouteId>,
    },
    ShowNotice {
        message: String,
    },
    AnimationFinished,
}

/// Anything that can consume render commands one by one
pub trait CommandSink {
    fn emit(&mut self, command: RenderCommand);
}

impl<T: CommandSink> RenderSurface for T {
    fn set_camera(&mut self, camera: CameraOptions) {
        self.emit(RenderCommand::SetCamera(camera));
    }

    fn set_marker(&mut self, marker: MarkerKind, update: MarkerUpdate) {
        self.emit(RenderCommand::SetMarker {
            marker,
            position: update.position,
            visible: update.visible,
        });
    }

    fn set_info_label(&mut self, label: &InfoLabel) {
        self.emit(RenderCommand::SetInfoLabel {
            text: label.to_string(),
        });
    }

    fn draw_route(&mut self, layer: &RouteLayer) {
        self.emit(RenderCommand::DrawRoute(layer.clone()));
    }

    fn clear(&mut self) {
        self.emit(RenderCommand::Clear);
    }

    fn show_popup(&mut self, popup: &Popup) {
        self.emit(RenderCommand::ShowPopup {
            position: popup.position,
            content: popup.content(),
        });
    }

    fn show_route_list(&mut self, ids: &[RouteId]) {
        self.emit(RenderCommand::ShowRouteList { ids: ids.to_vec() });
    }

    fn show_notice(&mut self, message: &str) {
        self.emit(RenderCommand::ShowNotice {
            message: message.to_string(),
        });
    }

    fn animation_finished(&mut self) {
        self.emit(RenderCommand::AnimationFinished);
    }
}

/// Keeps every command in memory
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub commands: Vec<RenderCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn cameras(&self) -> Vec<CameraOptions> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::SetCamera(camera) => Some(*camera),
                _ => None,
            })
            .collect()
    }

    pub fn finished_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, RenderCommand::AnimationFinished))
            .count()
    }
}

impl CommandSink for RecordingSurface {
    fn emit(&mut self, command: RenderCommand) {
        self.commands.push(command);
    }
}

/// Streams one JSON object per command
pub struct JsonLinesSurface<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSurface<W> {
    pub fn new(writer: W) -> Self {
        JsonLinesSurface { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> CommandSink for JsonLinesSurface<W> {
    fn emit(&mut self, command: RenderCommand) {
        let result = serde_json::to_writer(&mut self.writer, &command)
            .map_err(std::io::Error::from)
            .and_then(|_| self.writer.write_all(b"\n"))
            .and_then(|_| self.writer.flush());

        if let Err(e) = result {
            log::error!("Failed to write render command: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_label_format() {
        let label = InfoLabel {
            speed: 3.5,
            latitude: 47.123456789,
            longitude: 8.1,
        };
        assert_eq!(label.to_string(), "slope: 3.5 | Lat: 47.12346 | Lng: 8.10000");
    }

    #[test]
    fn test_popup_content() {
        let with_speed = Popup {
            position: (8.0, 47.0),
            speed: Some(4.0),
        };
        let without = Popup {
            position: (8.0, 47.0),
            speed: None,
        };
        assert_eq!(with_speed.content(), "slope: 4 mph");
        assert_eq!(without.content(), "slope: n/a");
    }

    #[test]
    fn test_json_lines_output() {
        let mut surface = JsonLinesSurface::new(Vec::new());
        surface.clear();
        surface.set_marker(
            MarkerKind::Info,
            MarkerUpdate {
                position: (8.0, 47.0),
                visible: Some(false),
            },
        );
        surface.animation_finished();

        let output = String::from_utf8(surface.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], r#"{"command":"clear"}"#);
        assert_eq!(
            lines[1],
            r#"{"command":"set_marker","marker":"info","position":[8.0,47.0],"visible":false}"#
        );
        assert_eq!(lines[2], r#"{"command":"animation_finished"}"#);
    }

    #[test]
    fn test_recording_surface_helpers() {
        let mut surface = RecordingSurface::new();
        let camera = CameraOptions {
            center: (8.0, 47.0),
            zoom: 17.0,
            pitch: 45.0,
            bearing: 0.0,
            duration_ms: 500,
        };
        surface.set_camera(camera);
        surface.animation_finished();

        assert_eq!(surface.cameras(), vec![camera]);
        assert_eq!(surface.finished_count(), 1);
        assert_eq!(surface.take().len(), 2);
        assert!(surface.commands.is_empty());
    }
}
