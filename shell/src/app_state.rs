use std::sync::Arc;

use ractor::{Actor, ActorRef};

use crate::actors::desktop::{DesktopActor, DesktopActorMsg, DesktopArguments};
use crate::backend::SystemBackend;

/// Handles shared by every request: the desktop actor and the backend.
///
/// System queries (stats, files) go straight to the backend. Anything that
/// touches windows or the user config goes through the desktop actor.
pub struct AppState {
    desktop: ActorRef<DesktopActorMsg>,
    backend: Arc<dyn SystemBackend>,
}

impl AppState {
    pub fn new(desktop: ActorRef<DesktopActorMsg>, backend: Arc<dyn SystemBackend>) -> Self {
        Self { desktop, backend }
    }

    /// Spawns the desktop actor and wraps it.
    pub async fn start(args: DesktopArguments) -> Result<Self, String> {
        let backend = args.backend.clone();
        let (desktop, _handle) = Actor::spawn(None, DesktopActor, args)
            .await
            .map_err(|e| e.to_string())?;
        Ok(Self::new(desktop, backend))
    }

    pub fn desktop(&self) -> ActorRef<DesktopActorMsg> {
        self.desktop.clone()
    }

    pub fn backend(&self) -> Arc<dyn SystemBackend> {
        self.backend.clone()
    }
}
