//! GPS slope logs: upload, storage, gradient-colored route rendering and
//! animated playback.

pub mod animator;
pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod geometry;
pub mod gradient;
pub mod interaction;
pub mod logging;
pub mod parser;
pub mod render;
pub mod serial;
pub mod server;
pub mod store;
pub mod types;

pub use animator::{AnimationConfig, RouteAnimator};
pub use client::ApiClient;
pub use driver::{AnimationDriver, AnimatorCommand};
pub use interaction::{MapSession, RouteBrowser, RouteSource, ShapeHit};
pub use render::RenderSurface;
pub use store::RouteStore;
pub use types::{RouteId, RoutePoint, UploadReceipt};
