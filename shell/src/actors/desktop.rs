//! DesktopActor - single writer for the window manager.
//!
//! Owns the [`WindowManager`], the surface bridge and one [`TerminalActor`]
//! per terminal window. HTTP handlers and WebSocket sessions never touch the
//! registry directly; they send requests here and observe the
//! [`DesktopEvent`] broadcast.
//!
//! Backend calls are awaited inside the handler, so a launch or a config save
//! is ordered with the window operations around it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use serde::{Deserialize, Serialize};
use shared_types::{
    AppDefinition, DesktopEvent, OverlayKind, Overlays, TaskbarEntry, Toast, ToastLevel,
    UserConfig, WindowState,
};
use std::collections::HashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::actors::terminal::{TerminalActor, TerminalArguments, TerminalError, TerminalMsg};
use crate::backend::compositor::CompositorBridge;
use crate::backend::SystemBackend;
use crate::surface::{BoundingBox, SurfaceBridge, FRAME_INTERVAL};
use crate::wm::toasts::TOAST_LIFETIME;
use crate::wm::views;
use crate::wm::{
    DesktopError, DragFrame, InputSource, Key, KeyOutcome, Point, ResizeEdges, ResizeFrame,
    ScreenLayout, TaskbarAction, WindowManager,
};

/// App id whose windows get a PTY session.
pub const TERMINAL_APP_ID: &str = "terminal";

pub const CONFIG_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const STATS_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Actor that owns desktop window state
#[derive(Debug, Default)]
pub struct DesktopActor;

/// Arguments for spawning DesktopActor
#[derive(Clone)]
pub struct DesktopArguments {
    pub layout: ScreenLayout,
    pub apps: Vec<AppDefinition>,
    pub backend: Arc<dyn SystemBackend>,
    pub compositor: Arc<dyn CompositorBridge>,
    pub terminal_shell: String,
    pub home_dir: PathBuf,
    /// `None` disables the poller
    pub config_poll: Option<Duration>,
    pub stats_poll: Option<Duration>,
    pub surface_frame_interval: Duration,
}

impl DesktopArguments {
    pub fn new(
        layout: ScreenLayout,
        apps: Vec<AppDefinition>,
        backend: Arc<dyn SystemBackend>,
        compositor: Arc<dyn CompositorBridge>,
    ) -> Self {
        Self {
            layout,
            apps,
            backend,
            compositor,
            terminal_shell: "/bin/sh".to_string(),
            home_dir: PathBuf::from("/"),
            config_poll: Some(CONFIG_POLL_INTERVAL),
            stats_poll: Some(STATS_POLL_INTERVAL),
            surface_frame_interval: FRAME_INTERVAL,
        }
    }
}

/// State for DesktopActor
pub struct DesktopActorState {
    manager: WindowManager,
    surfaces: SurfaceBridge,
    backend: Arc<dyn SystemBackend>,
    terminals: HashMap<String, ActorRef<TerminalMsg>>,
    terminal_shell: String,
    home_dir: PathBuf,
    config_poll: Option<Duration>,
    stats_poll: Option<Duration>,
    pollers: Vec<JoinHandle<()>>,
}

// ============================================================================
// Messages
// ============================================================================

/// Pointer, keyboard and measurement input from a connected UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    DragStart {
        window_id: String,
        x: i32,
        y: i32,
    },
    DragMove {
        x: i32,
        y: i32,
    },
    DragEnd,
    DragCancel,
    ResizeStart {
        window_id: String,
        /// Handle name: `n`, `se`, `w`, ...
        edges: String,
        x: i32,
        y: i32,
    },
    ResizeMove {
        x: i32,
        y: i32,
    },
    ResizeEnd,
    KeyDown {
        key: Key,
    },
    KeyUp {
        key: Key,
    },
    /// Placeholder box as laid out by the UI
    SurfaceRect {
        window_id: String,
        left: f64,
        top: f64,
        width: f64,
        height: f64,
    },
    BackgroundClick,
}

/// Transient frame returned to the client driving the interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputFeedback {
    DragFrame(DragFrame),
    ResizeFrame(ResizeFrame),
}

/// Messages handled by DesktopActor
#[derive(Debug)]
pub enum DesktopActorMsg {
    /// Open a framed window for a registered app
    OpenWindow {
        app_id: String,
        title: Option<String>,
        props: Option<serde_json::Value>,
        reply: RpcReplyPort<Result<WindowState, DesktopError>>,
    },
    /// Launch a process outside the frame and track it on the taskbar
    LaunchExternal {
        app_id: String,
        command: Option<String>,
        title: Option<String>,
        reply: RpcReplyPort<Result<WindowState, DesktopError>>,
    },
    CloseWindow {
        window_id: String,
        reply: RpcReplyPort<Option<WindowState>>,
    },
    FocusWindow {
        window_id: String,
        reply: RpcReplyPort<Option<u32>>,
    },
    MinimizeWindow {
        window_id: String,
        reply: RpcReplyPort<bool>,
    },
    MaximizeWindow {
        window_id: String,
        reply: RpcReplyPort<Option<bool>>,
    },
    /// Taskbar click
    ToggleWindow {
        window_id: String,
        reply: RpcReplyPort<Option<TaskbarAction>>,
    },
    MoveWindow {
        window_id: String,
        x: i32,
        y: i32,
        reply: RpcReplyPort<bool>,
    },
    ResizeWindow {
        window_id: String,
        width: i32,
        height: i32,
        reply: RpcReplyPort<Option<(i32, i32)>>,
    },
    SwitchDesktop {
        desktop_id: u32,
        reply: RpcReplyPort<bool>,
    },
    /// Windows back to front
    GetWindows {
        reply: RpcReplyPort<Vec<WindowState>>,
    },
    GetDesktopState {
        reply: RpcReplyPort<shared_types::DesktopState>,
    },
    GetTaskbar {
        reply: RpcReplyPort<Vec<TaskbarEntry>>,
    },
    RegisterApp {
        app: AppDefinition,
        reply: RpcReplyPort<()>,
    },
    GetApps {
        reply: RpcReplyPort<Vec<AppDefinition>>,
    },
    /// `None` closes every overlay
    ToggleOverlay {
        overlay: Option<OverlayKind>,
        reply: RpcReplyPort<Overlays>,
    },
    PushToast {
        level: ToastLevel,
        title: String,
        message: String,
        reply: RpcReplyPort<Toast>,
    },
    DismissToast {
        toast_id: String,
        reply: RpcReplyPort<bool>,
    },
    GetConfig {
        reply: RpcReplyPort<UserConfig>,
    },
    SaveConfig {
        config: UserConfig,
        reply: RpcReplyPort<Result<(), DesktopError>>,
    },
    /// Gestures are bound to the `source` that started them
    Input {
        source: InputSource,
        event: InputEvent,
        reply: RpcReplyPort<Option<InputFeedback>>,
    },
    /// PTY session for a terminal window, started on first request
    GetTerminal {
        window_id: String,
        reply: RpcReplyPort<Result<ActorRef<TerminalMsg>, DesktopError>>,
    },
    Subscribe {
        reply: RpcReplyPort<broadcast::Receiver<DesktopEvent>>,
    },
    /// Internal: deferred super-key single tap
    SingleTapDue { generation: u64 },
    /// Internal: toast lifetime elapsed
    ExpireToast { toast_id: String },
    /// Internal: re-read the persisted config
    PollConfig,
    /// Internal: refresh system stats
    PollStats,
}

// ============================================================================
// Actor Implementation
// ============================================================================

#[async_trait]
impl Actor for DesktopActor {
    type Msg = DesktopActorMsg;
    type State = DesktopActorState;
    type Arguments = DesktopArguments;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!(
            actor_id = %myself.get_id(),
            backend = args.backend.name(),
            apps = args.apps.len(),
            "DesktopActor starting"
        );

        let mut manager = WindowManager::new(args.layout, args.apps);

        match args.backend.load_config().await {
            Ok(config) => {
                manager.apply_config(config);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load user config; using defaults");
            }
        }

        match args.backend.installed_apps().await {
            Ok(installed) => {
                for app in installed {
                    if manager.app(&app.id).is_none() {
                        manager.register_app(app);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list installed apps");
            }
        }

        Ok(DesktopActorState {
            manager,
            surfaces: SurfaceBridge::with_frame_interval(
                args.compositor,
                args.surface_frame_interval,
            ),
            backend: args.backend,
            terminals: HashMap::new(),
            terminal_shell: args.terminal_shell,
            home_dir: args.home_dir,
            config_poll: args.config_poll,
            stats_poll: args.stats_poll,
            pollers: Vec::new(),
        })
    }

    async fn post_start(
        &self,
        myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if let Some(period) = state.config_poll {
            state
                .pollers
                .push(spawn_poller(myself.clone(), period, || DesktopActorMsg::PollConfig));
        }
        if let Some(period) = state.stats_poll {
            state
                .pollers
                .push(spawn_poller(myself.clone(), period, || DesktopActorMsg::PollStats));
        }
        tracing::info!(actor_id = %myself.get_id(), "DesktopActor started successfully");
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DesktopActorMsg::OpenWindow {
                app_id,
                title,
                props,
                reply,
            } => {
                let result = self
                    .handle_open_window(&myself, app_id, title, props, state)
                    .await;
                let _ = reply.send(result);
            }
            DesktopActorMsg::LaunchExternal {
                app_id,
                command,
                title,
                reply,
            } => {
                let result = self
                    .handle_launch_external(&myself, app_id, command, title, state)
                    .await;
                let _ = reply.send(result);
            }
            DesktopActorMsg::CloseWindow { window_id, reply } => {
                let closed = state.manager.close_window(&window_id);
                if let Some(terminal) = state.terminals.remove(&window_id) {
                    tracing::debug!(window_id = %window_id, "Stopping terminal session");
                    terminal.stop(None);
                }
                let _ = reply.send(closed);
            }
            DesktopActorMsg::FocusWindow { window_id, reply } => {
                let _ = reply.send(state.manager.focus_window(&window_id));
            }
            DesktopActorMsg::MinimizeWindow { window_id, reply } => {
                let _ = reply.send(state.manager.minimize_window(&window_id));
            }
            DesktopActorMsg::MaximizeWindow { window_id, reply } => {
                let _ = reply.send(state.manager.maximize_window(&window_id));
            }
            DesktopActorMsg::ToggleWindow { window_id, reply } => {
                let _ = reply.send(state.manager.toggle_from_taskbar(&window_id));
            }
            DesktopActorMsg::MoveWindow {
                window_id,
                x,
                y,
                reply,
            } => {
                let _ = reply.send(state.manager.move_window(&window_id, x, y));
            }
            DesktopActorMsg::ResizeWindow {
                window_id,
                width,
                height,
                reply,
            } => {
                let _ = reply.send(state.manager.resize_window(&window_id, width, height));
            }
            DesktopActorMsg::SwitchDesktop { desktop_id, reply } => {
                let _ = reply.send(state.manager.switch_desktop(desktop_id));
            }
            DesktopActorMsg::GetWindows { reply } => {
                let _ = reply.send(state.manager.windows_by_z());
            }
            DesktopActorMsg::GetDesktopState { reply } => {
                let _ = reply.send(state.manager.snapshot());
            }
            DesktopActorMsg::GetTaskbar { reply } => {
                let _ = reply.send(views::taskbar(&state.manager));
            }
            DesktopActorMsg::RegisterApp { app, reply } => {
                tracing::info!(app_id = %app.id, "Registering app");
                state.manager.register_app(app);
                let _ = reply.send(());
            }
            DesktopActorMsg::GetApps { reply } => {
                let _ = reply.send(state.manager.apps().to_vec());
            }
            DesktopActorMsg::ToggleOverlay { overlay, reply } => {
                let overlays = match overlay {
                    Some(kind) => state.manager.toggle_overlay(kind),
                    None => {
                        state.manager.dismiss_overlays();
                        state.manager.overlays()
                    }
                };
                let _ = reply.send(overlays);
            }
            DesktopActorMsg::PushToast {
                level,
                title,
                message,
                reply,
            } => {
                let toast = notify(&myself, state, level, title, message);
                let _ = reply.send(toast);
            }
            DesktopActorMsg::DismissToast { toast_id, reply } => {
                let _ = reply.send(state.manager.dismiss_toast(&toast_id));
            }
            DesktopActorMsg::GetConfig { reply } => {
                let _ = reply.send(state.manager.config().clone());
            }
            DesktopActorMsg::SaveConfig { config, reply } => {
                let result = self.handle_save_config(&myself, config, state).await;
                let _ = reply.send(result);
            }
            DesktopActorMsg::Input {
                source,
                event,
                reply,
            } => {
                let feedback = self.handle_input(&myself, source, event, state);
                let _ = reply.send(feedback);
            }
            DesktopActorMsg::GetTerminal { window_id, reply } => {
                let result = self.handle_get_terminal(&myself, window_id, state).await;
                let _ = reply.send(result);
            }
            DesktopActorMsg::Subscribe { reply } => {
                let _ = reply.send(state.manager.subscribe());
            }
            DesktopActorMsg::SingleTapDue { generation } => {
                state.manager.single_tap_due(generation);
            }
            DesktopActorMsg::ExpireToast { toast_id } => {
                state.manager.dismiss_toast(&toast_id);
            }
            DesktopActorMsg::PollConfig => match state.backend.load_config().await {
                Ok(config) => {
                    if state.manager.apply_config(config) {
                        tracing::info!("User config changed on disk");
                    }
                }
                Err(e) => tracing::debug!(error = %e, "Config poll failed"),
            },
            DesktopActorMsg::PollStats => match state.backend.system_stats().await {
                Ok(stats) => {
                    state.manager.update_stats(stats);
                }
                Err(e) => tracing::debug!(error = %e, "Stats poll failed"),
            },
        }

        state.surfaces.sync_windows(&state.manager);
        Ok(())
    }

    async fn post_stop(
        &self,
        myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        for poller in state.pollers.drain(..) {
            poller.abort();
        }
        for (_, terminal) in state.terminals.drain() {
            terminal.stop(None);
        }
        state.surfaces.detach_all();
        tracing::info!(actor_id = %myself.get_id(), "DesktopActor stopped");
        Ok(())
    }
}

// ============================================================================
// Handler Implementations
// ============================================================================

impl DesktopActor {
    async fn handle_open_window(
        &self,
        myself: &ActorRef<DesktopActorMsg>,
        app_id: String,
        title: Option<String>,
        props: Option<serde_json::Value>,
        state: &mut DesktopActorState,
    ) -> Result<WindowState, DesktopError> {
        let app = state
            .manager
            .app(&app_id)
            .cloned()
            .ok_or_else(|| DesktopError::AppNotFound(app_id.clone()))?;

        if app.external {
            // Framed external window: the process must start before the frame exists
            let command = app
                .exec
                .clone()
                .ok_or_else(|| DesktopError::MissingExec(app_id.clone()))?;
            if state.manager.config().disabled_apps.contains(&app_id) {
                return Err(DesktopError::AppDisabled(app_id));
            }
            launch(myself, state, &command).await?;
        }

        state.manager.open_window(&app_id, title, props)
    }

    async fn handle_launch_external(
        &self,
        myself: &ActorRef<DesktopActorMsg>,
        app_id: String,
        command: Option<String>,
        title: Option<String>,
        state: &mut DesktopActorState,
    ) -> Result<WindowState, DesktopError> {
        let command = command
            .or_else(|| state.manager.app(&app_id).and_then(|a| a.exec.clone()))
            .ok_or_else(|| DesktopError::MissingExec(app_id.clone()))?;

        launch(myself, state, &command).await?;
        Ok(state.manager.track_external(&app_id, title))
    }

    async fn handle_save_config(
        &self,
        myself: &ActorRef<DesktopActorMsg>,
        config: UserConfig,
        state: &mut DesktopActorState,
    ) -> Result<(), DesktopError> {
        if let Err(e) = state.backend.save_config(&config).await {
            tracing::warn!(error = %e, "Failed to save user config");
            notify(
                myself,
                state,
                ToastLevel::Error,
                "Settings not saved",
                e.to_string(),
            );
            return Err(DesktopError::Backend(e.to_string()));
        }
        state.manager.apply_config(config);
        Ok(())
    }

    fn handle_input(
        &self,
        myself: &ActorRef<DesktopActorMsg>,
        source: InputSource,
        event: InputEvent,
        state: &mut DesktopActorState,
    ) -> Option<InputFeedback> {
        let manager = &mut state.manager;
        match event {
            InputEvent::DragStart { window_id, x, y } => manager
                .begin_drag(source, &window_id, Point::new(x, y))
                .map(InputFeedback::DragFrame),
            InputEvent::DragMove { x, y } => manager
                .drag_to(source, Point::new(x, y))
                .map(InputFeedback::DragFrame),
            InputEvent::DragEnd => {
                manager.end_drag(source);
                None
            }
            InputEvent::DragCancel => {
                manager.cancel_drag(source);
                None
            }
            InputEvent::ResizeStart {
                window_id,
                edges,
                x,
                y,
            } => {
                let edges = ResizeEdges::parse(&edges)?;
                manager
                    .begin_resize(source, &window_id, edges, Point::new(x, y))
                    .map(InputFeedback::ResizeFrame)
            }
            InputEvent::ResizeMove { x, y } => manager
                .resize_to(source, Point::new(x, y))
                .map(InputFeedback::ResizeFrame),
            InputEvent::ResizeEnd => {
                manager.end_resize(source);
                None
            }
            InputEvent::KeyDown { key } => {
                if let KeyOutcome::SingleTapPending { generation, delay } =
                    manager.key_down(key, Instant::now())
                {
                    schedule(myself.clone(), delay, DesktopActorMsg::SingleTapDue { generation });
                }
                None
            }
            InputEvent::KeyUp { key } => {
                manager.key_up(key);
                None
            }
            InputEvent::SurfaceRect {
                window_id,
                left,
                top,
                width,
                height,
            } => {
                state
                    .surfaces
                    .report_measured(&window_id, BoundingBox::new(left, top, width, height));
                None
            }
            InputEvent::BackgroundClick => {
                manager.dismiss_overlays();
                None
            }
        }
    }

    async fn handle_get_terminal(
        &self,
        myself: &ActorRef<DesktopActorMsg>,
        window_id: String,
        state: &mut DesktopActorState,
    ) -> Result<ActorRef<TerminalMsg>, DesktopError> {
        let window = state
            .manager
            .window(&window_id)
            .ok_or_else(|| DesktopError::WindowNotFound(window_id.clone()))?;
        if window.app_id != TERMINAL_APP_ID {
            return Err(DesktopError::NotATerminal(window_id));
        }

        let terminal = match state.terminals.get(&window_id) {
            Some(terminal) => terminal.clone(),
            None => {
                let (terminal, _handle) = Actor::spawn(
                    None,
                    TerminalActor,
                    TerminalArguments {
                        window_id: window_id.clone(),
                        shell: state.terminal_shell.clone(),
                        working_dir: state.home_dir.to_string_lossy().to_string(),
                    },
                )
                .await
                .map_err(|e| DesktopError::Terminal(e.to_string()))?;
                state.terminals.insert(window_id.clone(), terminal.clone());
                terminal
            }
        };

        // Restarts the shell if it exited since the last attach
        match ractor::call!(terminal, |reply| TerminalMsg::Start { reply }) {
            Ok(Ok(())) | Ok(Err(TerminalError::AlreadyRunning)) => Ok(terminal),
            Ok(Err(e)) => {
                notify(
                    myself,
                    state,
                    ToastLevel::Error,
                    "Terminal failed to start",
                    e.to_string(),
                );
                Err(DesktopError::Terminal(e.to_string()))
            }
            Err(e) => {
                state.terminals.remove(&window_id);
                Err(DesktopError::Terminal(e.to_string()))
            }
        }
    }
}

/// Starts a process through the backend. Failures become an error toast.
async fn launch(
    myself: &ActorRef<DesktopActorMsg>,
    state: &mut DesktopActorState,
    command: &str,
) -> Result<(), DesktopError> {
    match state.backend.launch_process(command).await {
        Ok(()) => {
            tracing::info!(command = %command, "Launched external process");
            Ok(())
        }
        Err(e) => {
            tracing::warn!(command = %command, error = %e, "Launch failed");
            notify(
                myself,
                state,
                ToastLevel::Error,
                "Failed to launch app",
                e.to_string(),
            );
            Err(DesktopError::LaunchFailed {
                command: command.to_string(),
                reason: e.to_string(),
            })
        }
    }
}

/// Pushes a toast and arms its expiry timer.
fn notify(
    myself: &ActorRef<DesktopActorMsg>,
    state: &mut DesktopActorState,
    level: ToastLevel,
    title: impl Into<String>,
    message: impl Into<String>,
) -> Toast {
    let toast = state.manager.push_toast(level, title, message);
    schedule(
        myself.clone(),
        TOAST_LIFETIME,
        DesktopActorMsg::ExpireToast {
            toast_id: toast.id.clone(),
        },
    );
    toast
}

fn schedule(myself: ActorRef<DesktopActorMsg>, delay: Duration, msg: DesktopActorMsg) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        // Actor may be gone by now
        let _ = myself.send_message(msg);
    });
}

fn spawn_poller(
    myself: ActorRef<DesktopActorMsg>,
    period: Duration,
    make_msg: fn() -> DesktopActorMsg,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick completes immediately; start-up already loaded everything
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if myself.send_message(make_msg()).is_err() {
                break;
            }
        }
    })
}

// ============================================================================
// Convenience Functions
// ============================================================================

/// Convenience function to open a window
pub async fn open_window(
    desktop: &ActorRef<DesktopActorMsg>,
    app_id: impl Into<String>,
    title: Option<String>,
    props: Option<serde_json::Value>,
) -> Result<Result<WindowState, DesktopError>, ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::OpenWindow {
        app_id: app_id.into(),
        title,
        props,
        reply,
    })
}

/// Convenience function to close a window
pub async fn close_window(
    desktop: &ActorRef<DesktopActorMsg>,
    window_id: impl Into<String>,
) -> Result<Option<WindowState>, ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::CloseWindow {
        window_id: window_id.into(),
        reply,
    })
}

/// Convenience function to focus a window
pub async fn focus_window(
    desktop: &ActorRef<DesktopActorMsg>,
    window_id: impl Into<String>,
) -> Result<Option<u32>, ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::FocusWindow {
        window_id: window_id.into(),
        reply,
    })
}

/// Convenience function to get the desktop snapshot
pub async fn get_desktop_state(
    desktop: &ActorRef<DesktopActorMsg>,
) -> Result<shared_types::DesktopState, ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::GetDesktopState { reply })
}

/// Convenience function to forward an input event
pub async fn send_input(
    desktop: &ActorRef<DesktopActorMsg>,
    source: InputSource,
    event: InputEvent,
) -> Result<Option<InputFeedback>, ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::Input {
        source,
        event,
        reply
    })
}

/// Convenience function to subscribe to desktop events
pub async fn subscribe(
    desktop: &ActorRef<DesktopActorMsg>,
) -> Result<broadcast::Receiver<DesktopEvent>, ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::Subscribe { reply })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::compositor::RecordingCompositor;
    use crate::backend::{BackendError, DetachedBackend};
    use shared_types::{FileEntry, SystemStats};
    use std::sync::Mutex;

    const UI: InputSource = 1;

    /// Backend whose launches fail and whose stats can be changed.
    #[derive(Default)]
    struct FailingBackend {
        stats: Mutex<SystemStats>,
        launched: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SystemBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn launch_process(&self, command: &str) -> Result<(), BackendError> {
            self.launched.lock().unwrap().push(command.to_string());
            Err(BackendError::Launch {
                command: command.to_string(),
                reason: "no such file".to_string(),
            })
        }

        async fn system_stats(&self) -> Result<SystemStats, BackendError> {
            Ok(self.stats.lock().unwrap().clone())
        }

        async fn load_config(&self) -> Result<UserConfig, BackendError> {
            Err(BackendError::Io("unreadable".to_string()))
        }

        async fn save_config(&self, _config: &UserConfig) -> Result<(), BackendError> {
            Err(BackendError::Io("read-only".to_string()))
        }

        async fn list_dir(&self, _path: &str) -> Result<Vec<FileEntry>, BackendError> {
            Ok(Vec::new())
        }

        async fn installed_apps(&self) -> Result<Vec<AppDefinition>, BackendError> {
            Ok(vec![AppDefinition {
                id: "firefox".to_string(),
                name: "Firefox".to_string(),
                icon: String::new(),
                default_width: 1000,
                default_height: 700,
                external: true,
                exec: Some("firefox".to_string()),
            }])
        }
    }

    fn app(id: &str, external: bool) -> AppDefinition {
        AppDefinition {
            id: id.to_string(),
            name: id.to_string(),
            icon: String::new(),
            default_width: 800,
            default_height: 600,
            external,
            exec: external.then(|| id.to_string()),
        }
    }

    fn args(backend: Arc<dyn SystemBackend>, compositor: Arc<dyn CompositorBridge>) -> DesktopArguments {
        let mut args = DesktopArguments::new(
            ScreenLayout::default(),
            vec![
                app("terminal", false),
                app("explorer", false),
                app("settings", false),
                app("gimp", true),
            ],
            backend,
            compositor,
        );
        args.config_poll = None;
        args.stats_poll = None;
        args.surface_frame_interval = Duration::from_millis(5);
        args
    }

    async fn spawn_detached() -> ActorRef<DesktopActorMsg> {
        let (desktop, _handle) = Actor::spawn(
            None,
            DesktopActor,
            args(
                Arc::new(DetachedBackend::new()),
                Arc::new(RecordingCompositor::default()),
            ),
        )
        .await
        .unwrap();
        desktop
    }

    #[tokio::test]
    async fn test_open_focus_close_flow() {
        let desktop = spawn_detached().await;

        // Test 1: Open two windows
        let terminal = open_window(&desktop, "terminal", None, None)
            .await
            .unwrap()
            .unwrap();
        let files = open_window(&desktop, "explorer", Some("Files".to_string()), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!((terminal.x, terminal.y, terminal.z_index), (150, 100, 10));
        assert_eq!((files.x, files.y, files.z_index), (180, 130, 11));
        assert_eq!(files.title, "Files");

        // Test 2: Focus raises
        let z = focus_window(&desktop, &terminal.id).await.unwrap();
        assert_eq!(z, Some(12));

        // Test 3: Close the active window, nothing promoted
        let closed = close_window(&desktop, &terminal.id).await.unwrap();
        assert!(closed.is_some());
        let snapshot = get_desktop_state(&desktop).await.unwrap();
        assert_eq!(snapshot.active_window, None);
        assert_eq!(snapshot.windows.len(), 1);

        // Test 4: Closing again is a no-op
        assert!(close_window(&desktop, &terminal.id).await.unwrap().is_none());

        desktop.stop(None);
    }

    #[tokio::test]
    async fn test_unknown_app_is_rejected() {
        let desktop = spawn_detached().await;
        let result = open_window(&desktop, "nope", None, None).await.unwrap();
        assert_eq!(result, Err(DesktopError::AppNotFound("nope".to_string())));
        desktop.stop(None);
    }

    #[tokio::test]
    async fn test_failed_launch_creates_no_window_and_toasts() {
        let backend = Arc::new(FailingBackend::default());
        let (desktop, _handle) = Actor::spawn(
            None,
            DesktopActor,
            args(backend.clone(), Arc::new(RecordingCompositor::default())),
        )
        .await
        .unwrap();

        let result = open_window(&desktop, "gimp", None, None).await.unwrap();
        assert!(matches!(result, Err(DesktopError::LaunchFailed { .. })));

        let tracked = ractor::call!(desktop, |reply| DesktopActorMsg::LaunchExternal {
            app_id: "firefox".to_string(),
            command: None,
            title: None,
            reply,
        })
        .unwrap();
        assert!(tracked.is_err());

        let snapshot = get_desktop_state(&desktop).await.unwrap();
        assert!(snapshot.windows.is_empty());
        assert_eq!(snapshot.toasts.len(), 2);
        assert!(snapshot
            .toasts
            .iter()
            .all(|t| t.level == ToastLevel::Error));
        assert_eq!(
            *backend.launched.lock().unwrap(),
            vec!["gimp".to_string(), "firefox".to_string()]
        );

        // Installed apps were merged into the catalog at start-up
        assert!(snapshot.apps.iter().any(|a| a.id == "firefox"));

        desktop.stop(None);
    }

    #[tokio::test]
    async fn test_external_launch_tracks_and_frames() {
        let compositor = Arc::new(RecordingCompositor::default());
        let (desktop, _handle) = Actor::spawn(
            None,
            DesktopActor,
            args(Arc::new(DetachedBackend::new()), compositor.clone()),
        )
        .await
        .unwrap();

        // Test 1: Tracking record for an unframed launch
        let record = ractor::call!(desktop, |reply| DesktopActorMsg::LaunchExternal {
            app_id: "vlc".to_string(),
            command: Some("vlc --started-from-file".to_string()),
            title: Some("VLC".to_string()),
            reply,
        })
        .unwrap()
        .unwrap();
        assert!(record.is_tracking_record());

        // Test 2: Framed external window reports its surface
        let gimp = open_window(&desktop, "gimp", None, None)
            .await
            .unwrap()
            .unwrap();
        assert!(gimp.external);
        tokio::time::sleep(Duration::from_millis(50)).await;
        let reports = compositor.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].app_id, "gimp");
        assert_eq!((reports[0].x, reports[0].y), (180, 166));

        let taskbar = ractor::call!(desktop, |reply| DesktopActorMsg::GetTaskbar { reply }).unwrap();
        assert!(taskbar.iter().any(|e| e.app_id == "vlc" && e.open));

        desktop.stop(None);
    }

    #[tokio::test]
    async fn test_drag_input_returns_frames_and_commits_on_end() {
        let desktop = spawn_detached().await;
        let window = open_window(&desktop, "explorer", None, None)
            .await
            .unwrap()
            .unwrap();
        let mut events = subscribe(&desktop).await.unwrap();

        let first = send_input(
            &desktop,
            UI,
            InputEvent::DragStart {
                window_id: window.id.clone(),
                x: 200,
                y: 110,
            },
        )
        .await
        .unwrap();
        assert!(matches!(first, Some(InputFeedback::DragFrame(_))));

        let frame = send_input(&desktop, UI, InputEvent::DragMove { x: 55, y: 410 })
            .await
            .unwrap();
        let Some(InputFeedback::DragFrame(frame)) = frame else {
            panic!("expected drag frame");
        };
        assert_eq!((frame.x, frame.y), (5, 400));
        assert!(frame.snap.is_some());

        // Registry untouched mid-drag
        let snapshot = get_desktop_state(&desktop).await.unwrap();
        assert_eq!((snapshot.windows[0].x, snapshot.windows[0].y), (150, 100));

        send_input(&desktop, UI, InputEvent::DragEnd).await.unwrap();
        let snapshot = get_desktop_state(&desktop).await.unwrap();
        let committed = &snapshot.windows[0];
        assert_eq!(
            (committed.x, committed.y, committed.width, committed.height),
            (0, 48, 960, 1032)
        );
        assert!(!committed.maximized);

        let mut saw_geometry = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, DesktopEvent::WindowGeometry { .. }) {
                saw_geometry = true;
            }
        }
        assert!(saw_geometry);

        desktop.stop(None);
    }

    #[tokio::test]
    async fn test_super_single_tap_toggles_start_menu() {
        let desktop = spawn_detached().await;

        send_input(&desktop, UI, InputEvent::KeyDown { key: Key::Super })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        let snapshot = get_desktop_state(&desktop).await.unwrap();
        assert!(snapshot.overlays.start_menu);

        send_input(&desktop, UI, InputEvent::BackgroundClick).await.unwrap();
        let snapshot = get_desktop_state(&desktop).await.unwrap();
        assert!(!snapshot.overlays.any_open());

        desktop.stop(None);
    }

    #[tokio::test]
    async fn test_save_config_failure_keeps_state() {
        let (desktop, _handle) = Actor::spawn(
            None,
            DesktopActor,
            args(
                Arc::new(FailingBackend::default()),
                Arc::new(RecordingCompositor::default()),
            ),
        )
        .await
        .unwrap();

        let mut config = UserConfig::default();
        config.theme_name = "dracula".to_string();
        let result = ractor::call!(desktop, |reply| DesktopActorMsg::SaveConfig {
            config,
            reply,
        })
        .unwrap();
        assert!(matches!(result, Err(DesktopError::Backend(_))));

        let current = ractor::call!(desktop, |reply| DesktopActorMsg::GetConfig { reply }).unwrap();
        assert_eq!(current.theme_name, "blue-default");

        desktop.stop(None);
    }

    #[tokio::test]
    async fn test_stats_poll_broadcasts_changes() {
        let backend = Arc::new(FailingBackend::default());
        let mut args = args(backend.clone(), Arc::new(RecordingCompositor::default()));
        args.stats_poll = Some(Duration::from_millis(20));
        let (desktop, _handle) = Actor::spawn(None, DesktopActor, args).await.unwrap();
        let mut events = subscribe(&desktop).await.unwrap();

        backend.stats.lock().unwrap().volume = 80;
        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap()
            .unwrap();
        let DesktopEvent::StatsUpdated { stats } = event else {
            panic!("expected stats update, got {event:?}");
        };
        assert_eq!(stats.volume, 80);

        desktop.stop(None);
    }

    #[tokio::test]
    async fn test_terminal_requires_terminal_window() {
        let desktop = spawn_detached().await;
        let files = open_window(&desktop, "explorer", None, None)
            .await
            .unwrap()
            .unwrap();

        let result = ractor::call!(desktop, |reply| DesktopActorMsg::GetTerminal {
            window_id: files.id.clone(),
            reply,
        })
        .unwrap();
        assert!(matches!(result, Err(DesktopError::NotATerminal(_))));

        let result = ractor::call!(desktop, |reply| DesktopActorMsg::GetTerminal {
            window_id: "missing".to_string(),
            reply,
        })
        .unwrap();
        assert!(matches!(result, Err(DesktopError::WindowNotFound(_))));

        desktop.stop(None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_closing_terminal_window_stops_session() {
        let desktop = spawn_detached().await;
        let window = open_window(&desktop, "terminal", None, None)
            .await
            .unwrap()
            .unwrap();

        let terminal = ractor::call!(desktop, |reply| DesktopActorMsg::GetTerminal {
            window_id: window.id.clone(),
            reply,
        })
        .unwrap()
        .unwrap();
        let info = ractor::call!(terminal, |reply| TerminalMsg::GetInfo { reply }).unwrap();
        assert!(info.is_running);

        close_window(&desktop, &window.id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(ractor::call!(terminal, |reply| TerminalMsg::GetInfo { reply }).is_err());

        desktop.stop(None);
    }
}
