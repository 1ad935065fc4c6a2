//! Outbound surface rectangle reports.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use futures_util::SinkExt;
use shared_types::SurfaceRect;
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedWrite, LinesCodec};

use crate::surface::SurfaceError;

/// Fire-and-forget sink for surface rectangles. Must never block.
pub trait CompositorBridge: Send + Sync + 'static {
    fn report_surface(&self, rect: SurfaceRect);
}

/// No compositor attached: reports are logged and dropped.
#[derive(Debug, Default)]
pub struct DetachedCompositor;

impl CompositorBridge for DetachedCompositor {
    fn report_surface(&self, rect: SurfaceRect) {
        tracing::debug!(
            app_id = %rect.app_id,
            x = rect.x,
            y = rect.y,
            width = rect.width,
            height = rect.height,
            "Surface rect (no compositor attached)"
        );
    }
}

/// Keeps every report in memory. Used by tests and preview tooling.
#[derive(Debug, Default)]
pub struct RecordingCompositor {
    reports: Mutex<Vec<SurfaceRect>>,
}

impl RecordingCompositor {
    pub fn reports(&self) -> Vec<SurfaceRect> {
        self.reports
            .lock()
            .map(|reports| reports.clone())
            .unwrap_or_default()
    }
}

impl CompositorBridge for RecordingCompositor {
    fn report_surface(&self, rect: SurfaceRect) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(rect);
        }
    }
}

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Writes reports as newline-delimited JSON to a Unix socket.
///
/// Reports are queued to a writer task. While the socket is down they are
/// discarded; the writer reconnects on the next report after a short delay.
pub struct SocketCompositor {
    tx: mpsc::UnboundedSender<SurfaceRect>,
}

impl SocketCompositor {
    pub fn spawn(socket_path: impl Into<PathBuf>) -> Self {
        let socket_path = socket_path.into();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(socket_path, rx));
        Self { tx }
    }
}

impl CompositorBridge for SocketCompositor {
    fn report_surface(&self, rect: SurfaceRect) {
        if self.tx.send(rect).is_err() {
            tracing::debug!("Compositor writer stopped; dropping surface report");
        }
    }
}

type LineSink = FramedWrite<UnixStream, LinesCodec>;

async fn connect(path: &Path) -> Result<LineSink, SurfaceError> {
    let stream = UnixStream::connect(path)
        .await
        .map_err(|e| SurfaceError::Connect(format!("{}: {e}", path.display())))?;
    Ok(FramedWrite::new(stream, LinesCodec::new()))
}

async fn send_report(sink: &mut LineSink, rect: &SurfaceRect) -> Result<(), SurfaceError> {
    let line = serde_json::to_string(rect).map_err(|e| SurfaceError::Encode(e.to_string()))?;
    sink.send(line).await.map_err(|_| SurfaceError::Closed)
}

async fn write_loop(socket_path: PathBuf, mut rx: mpsc::UnboundedReceiver<SurfaceRect>) {
    let mut sink: Option<LineSink> = None;
    let mut retry_at = tokio::time::Instant::now();

    while let Some(rect) = rx.recv().await {
        if sink.is_none() && tokio::time::Instant::now() >= retry_at {
            match connect(&socket_path).await {
                Ok(connected) => {
                    tracing::info!(path = %socket_path.display(), "Connected to compositor");
                    sink = Some(connected);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Compositor unavailable; dropping surface reports");
                    retry_at = tokio::time::Instant::now() + RECONNECT_DELAY;
                }
            }
        }

        let Some(active) = sink.as_mut() else {
            continue;
        };
        if let Err(e) = send_report(active, &rect).await {
            tracing::warn!(error = %e, app_id = %rect.app_id, "Lost compositor connection");
            sink = None;
            retry_at = tokio::time::Instant::now() + RECONNECT_DELAY;
        }
    }
}
