use crate::animator::{ScheduledStep, StepOutcome, StepToken};
use crate::interaction::{MapSession, ShapeHit};
use crate::render::RenderSurface;
use crate::types::{RouteId, RoutePoint};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::time::{sleep_until, Instant};

#[derive(Clone, Debug, PartialEq)]
pub enum AnimatorCommand {
    Play,
    Pause,
    Toggle,
    LoadRoute(Vec<RoutePoint>),
    Click(Vec<ShapeHit>),
    ShowRouteList(Vec<RouteId>),
    Notice(String),
    Shutdown,
}

/// Owns a [`MapSession`] inside a single task.
///
/// Commands and the one pending step timer are multiplexed with
/// `tokio::select!`, so steps never overlap and every state change happens
/// on this task. The timer carries the animator's step token; a timer that
/// outlived a pause or route swap is rejected by the animator.
pub struct AnimationDriver<S: RenderSurface> {
    session: MapSession<S>,
    commands: Receiver<AnimatorCommand>,
    pending: Option<(StepToken, Instant)>,
}

impl<S: RenderSurface> AnimationDriver<S> {
    pub fn new(session: MapSession<S>) -> (Self, Sender<AnimatorCommand>) {
        let (tx, rx) = mpsc::channel(64);
        let driver = AnimationDriver {
            session,
            commands: rx,
            pending: None,
        };
        (driver, tx)
    }

    /// Run until `Shutdown` or every sender is dropped; hands the session back
    pub async fn run(mut self) -> MapSession<S> {
        loop {
            let deadline = self.pending.map(|(_, at)| at);

            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        None | Some(AnimatorCommand::Shutdown) => break,
                        Some(command) => self.handle(command),
                    }
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some((token, _)) = self.pending.take() {
                        if let StepOutcome::Advanced(next) = self.session.step(token) {
                            self.schedule(next);
                        }
                    }
                }
            }
        }

        log::debug!("Animation driver stopped");
        self.session
    }

    fn handle(&mut self, command: AnimatorCommand) {
        match command {
            AnimatorCommand::Play => match self.session.play() {
                Ok(step) => self.schedule(step),
                Err(e) => log::warn!("Play ignored: {}", e),
            },
            AnimatorCommand::Pause => {
                if let Err(e) = self.session.pause() {
                    log::warn!("Pause ignored: {}", e);
                }
                self.pending = None;
            }
            AnimatorCommand::Toggle => match self.session.toggle() {
                Some(step) => self.schedule(step),
                None => self.pending = None,
            },
            AnimatorCommand::LoadRoute(points) => match self.session.replace_route(points) {
                Ok(()) => self.pending = None,
                Err(e) => {
                    log::error!("Failed to load route: {}", e);
                    self.session.show_notice(&format!("Could not load route: {}", e));
                }
            },
            AnimatorCommand::Click(hits) => self.session.on_map_click(&hits),
            AnimatorCommand::ShowRouteList(ids) => self.session.show_route_list(&ids),
            AnimatorCommand::Notice(message) => self.session.show_notice(&message),
            AnimatorCommand::Shutdown => {}
        }
    }

    fn schedule(&mut self, step: ScheduledStep) {
        self.pending = Some((step.token, Instant::now() + step.delay));
    }
}
