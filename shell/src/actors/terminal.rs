//! TerminalActor - one PTY session per terminal window.
//!
//! The desktop actor spawns it on first attach and stops it when the window
//! closes, so the shell process never outlives its window.

use async_trait::async_trait;
use portable_pty::{ChildKiller, CommandBuilder, PtySize};
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::io::{Read, Write};
use tokio::sync::{broadcast, mpsc};

/// Chunks of output kept for clients that attach late.
const OUTPUT_BUFFER_LIMIT: usize = 1000;

#[derive(Debug, Default)]
pub struct TerminalActor;

/// Arguments for spawning TerminalActor
#[derive(Debug, Clone)]
pub struct TerminalArguments {
    pub window_id: String,
    pub shell: String,
    pub working_dir: String,
}

/// State for TerminalActor
pub struct TerminalState {
    window_id: String,
    shell: String,
    working_dir: String,
    /// PTY master handle (for resize)
    pty_master: Option<Box<dyn portable_pty::MasterPty + Send>>,
    child_killer: Option<Box<dyn ChildKiller + Send + Sync>>,
    input_tx: Option<mpsc::Sender<String>>,
    output_tx: Option<broadcast::Sender<String>>,
    output_buffer: Vec<String>,
    is_running: bool,
    exit_code: Option<i32>,
    process_id: Option<u32>,
    rows: u16,
    cols: u16,
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug)]
pub enum TerminalMsg {
    /// Spawn the shell in a fresh PTY
    Start {
        reply: RpcReplyPort<Result<(), TerminalError>>,
    },
    SendInput {
        input: String,
        reply: RpcReplyPort<Result<(), TerminalError>>,
    },
    /// Recent output, for new connections
    GetOutput { reply: RpcReplyPort<Vec<String>> },
    SubscribeOutput {
        reply: RpcReplyPort<broadcast::Receiver<String>>,
    },
    Resize {
        rows: u16,
        cols: u16,
        reply: RpcReplyPort<Result<(), TerminalError>>,
    },
    GetInfo { reply: RpcReplyPort<TerminalInfo> },
    Stop {
        reply: RpcReplyPort<Result<(), TerminalError>>,
    },
    /// Internal: output received from PTY
    OutputReceived { data: String },
    /// Internal: process exited
    ProcessExited { exit_code: Option<i32> },
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TerminalInfo {
    pub window_id: String,
    pub shell: String,
    pub working_dir: String,
    pub is_running: bool,
    pub exit_code: Option<i32>,
    pub process_id: Option<u32>,
    pub rows: u16,
    pub cols: u16,
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error, Clone)]
pub enum TerminalError {
    #[error("Terminal not running")]
    NotRunning,

    #[error("Terminal already running")]
    AlreadyRunning,

    #[error("Failed to spawn PTY: {0}")]
    SpawnFailed(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TerminalError {
    fn from(e: std::io::Error) -> Self {
        TerminalError::Io(e.to_string())
    }
}

// ============================================================================
// Actor Implementation
// ============================================================================

#[async_trait]
impl Actor for TerminalActor {
    type Msg = TerminalMsg;
    type State = TerminalState;
    type Arguments = TerminalArguments;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::debug!(
            actor_id = %myself.get_id(),
            window_id = %args.window_id,
            "TerminalActor starting"
        );
        Ok(TerminalState {
            window_id: args.window_id,
            shell: args.shell,
            working_dir: args.working_dir,
            pty_master: None,
            child_killer: None,
            input_tx: None,
            output_tx: None,
            output_buffer: Vec::with_capacity(OUTPUT_BUFFER_LIMIT),
            is_running: false,
            exit_code: None,
            process_id: None,
            rows: 24,
            cols: 80,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            TerminalMsg::Start { reply } => {
                if state.is_running {
                    let _ = reply.send(Err(TerminalError::AlreadyRunning));
                    return Ok(());
                }

                match spawn_pty(
                    &state.shell,
                    &state.working_dir,
                    state.rows,
                    state.cols,
                    myself.clone(),
                ) {
                    Ok(pty) => {
                        tracing::info!(
                            window_id = %state.window_id,
                            pid = ?pty.process_id,
                            "Terminal started"
                        );
                        state.pty_master = Some(pty.master);
                        state.child_killer = Some(pty.child_killer);
                        state.input_tx = Some(pty.input_tx);
                        state.output_tx = Some(pty.output_tx);
                        state.is_running = true;
                        state.exit_code = None;
                        state.process_id = pty.process_id;
                        let _ = reply.send(Ok(()));
                    }
                    Err(e) => {
                        tracing::warn!(window_id = %state.window_id, error = %e, "Terminal spawn failed");
                        let _ = reply.send(Err(e));
                    }
                }
            }

            TerminalMsg::SendInput { input, reply } => {
                let result = match (&state.input_tx, state.is_running) {
                    (Some(tx), true) => tx
                        .send(input)
                        .await
                        .map_err(|_| TerminalError::Io("Failed to send input".to_string())),
                    _ => Err(TerminalError::NotRunning),
                };
                let _ = reply.send(result);
            }

            TerminalMsg::GetOutput { reply } => {
                let _ = reply.send(state.output_buffer.clone());
            }

            TerminalMsg::SubscribeOutput { reply } => {
                if let Some(ref tx) = state.output_tx {
                    let _ = reply.send(tx.subscribe());
                } else {
                    // Not running; hand back a closed channel
                    let (tx, rx) = broadcast::channel::<String>(1);
                    drop(tx);
                    let _ = reply.send(rx);
                }
            }

            TerminalMsg::Resize { rows, cols, reply } => {
                // Transient 0x0 layouts from a client must not poison the PTY size
                let rows = rows.max(2);
                let cols = cols.max(2);
                state.rows = rows;
                state.cols = cols;

                let result = match state.pty_master {
                    Some(ref master) => master
                        .resize(PtySize {
                            rows,
                            cols,
                            pixel_width: 0,
                            pixel_height: 0,
                        })
                        .map_err(|e| TerminalError::Io(e.to_string())),
                    None => Ok(()),
                };
                let _ = reply.send(result);
            }

            TerminalMsg::GetInfo { reply } => {
                let _ = reply.send(TerminalInfo {
                    window_id: state.window_id.clone(),
                    shell: state.shell.clone(),
                    working_dir: state.working_dir.clone(),
                    is_running: state.is_running,
                    exit_code: state.exit_code,
                    process_id: state.process_id,
                    rows: state.rows,
                    cols: state.cols,
                });
            }

            TerminalMsg::Stop { reply } => {
                kill_child(state);
                let _ = reply.send(Ok(()));
            }

            TerminalMsg::OutputReceived { data } => {
                state.output_buffer.push(data);
                if state.output_buffer.len() > OUTPUT_BUFFER_LIMIT {
                    state.output_buffer.remove(0);
                }
            }

            TerminalMsg::ProcessExited { exit_code } => {
                if state.is_running {
                    tracing::info!(window_id = %state.window_id, ?exit_code, "Terminal process exited");
                }
                state.is_running = false;
                state.exit_code = exit_code.or(state.exit_code);
                state.pty_master = None;
                state.child_killer = None;
                state.input_tx = None;
                state.output_tx = None;
                state.process_id = None;
            }
        }

        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        kill_child(state);
        tracing::debug!(window_id = %state.window_id, "TerminalActor stopped");
        Ok(())
    }
}

fn kill_child(state: &mut TerminalState) {
    if let Some(mut child_killer) = state.child_killer.take() {
        if let Err(e) = child_killer.kill() {
            tracing::warn!(
                window_id = %state.window_id,
                error = %e,
                "Failed to kill terminal child process"
            );
        }
    }
    state.pty_master = None;
    state.is_running = false;
    state.input_tx = None;
    state.output_tx = None;
    state.process_id = None;
}

// ============================================================================
// PTY Implementation
// ============================================================================

struct SpawnedPty {
    master: Box<dyn portable_pty::MasterPty + Send>,
    child_killer: Box<dyn ChildKiller + Send + Sync>,
    input_tx: mpsc::Sender<String>,
    output_tx: broadcast::Sender<String>,
    process_id: Option<u32>,
}

fn spawn_pty(
    shell: &str,
    working_dir: &str,
    rows: u16,
    cols: u16,
    actor_ref: ActorRef<TerminalMsg>,
) -> Result<SpawnedPty, TerminalError> {
    let pty_system = portable_pty::native_pty_system();
    let pair = pty_system
        .openpty(PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        })
        .map_err(|e| TerminalError::SpawnFailed(e.to_string()))?;

    let mut cmd_builder = CommandBuilder::new(shell);
    cmd_builder.cwd(std::path::Path::new(working_dir));

    let mut child = pair
        .slave
        .spawn_command(cmd_builder)
        .map_err(|e| TerminalError::SpawnFailed(e.to_string()))?;
    let child_killer = child.clone_killer();
    let process_id = child.process_id();

    let (input_tx, mut input_rx) = mpsc::channel::<String>(100);
    let (output_tx, _output_rx) = broadcast::channel::<String>(1000);

    let mut master_writer = pair
        .master
        .take_writer()
        .map_err(|e| TerminalError::SpawnFailed(format!("Failed to get PTY writer: {e}")))?;
    let mut master_reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| TerminalError::SpawnFailed(format!("Failed to clone PTY reader: {e}")))?;

    // Writer: channel -> PTY
    tokio::task::spawn_blocking(move || {
        while let Some(input) = input_rx.blocking_recv() {
            if master_writer.write_all(input.as_bytes()).is_err() {
                break;
            }
            if master_writer.flush().is_err() {
                break;
            }
        }
    });

    // Reader: PTY -> subscribers and the actor's replay buffer
    let actor = actor_ref.clone();
    let output_tx_for_reader = output_tx.clone();
    tokio::task::spawn_blocking(move || {
        let mut buffer = [0u8; 1024];
        loop {
            match master_reader.read(&mut buffer) {
                Ok(0) | Err(_) => {
                    let _ = actor.send_message(TerminalMsg::ProcessExited { exit_code: None });
                    break;
                }
                Ok(n) => {
                    let data = String::from_utf8_lossy(&buffer[..n]).to_string();
                    let _ = output_tx_for_reader.send(data.clone());
                    let _ = actor.send_message(TerminalMsg::OutputReceived { data });
                }
            }
        }
    });

    // Exit monitor
    let actor = actor_ref;
    tokio::task::spawn_blocking(move || {
        let exit_code = child.wait().ok().map(|status| status.exit_code() as i32);
        let _ = actor.send_message(TerminalMsg::ProcessExited { exit_code });
    });

    Ok(SpawnedPty {
        master: pair.master,
        child_killer,
        input_tx,
        output_tx,
        process_id,
    })
}
