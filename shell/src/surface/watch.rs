//! Per-window geometry reporter.
//!
//! One task per external window. While the window is active it re-reads the
//! placeholder every frame so drags and animations track smoothly. While
//! inactive it only wakes when the placeholder geometry changes. Dropping the
//! [`SurfaceWatch`] cancels the task unconditionally.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::mapper::{BoundingBox, SurfaceMapper};

pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

pub type SharedMapper = Arc<Mutex<SurfaceMapper>>;

/// Where the placeholder currently is on screen. `None` while hidden.
#[derive(Debug)]
pub struct Placeholder {
    tx: watch::Sender<Option<BoundingBox>>,
}

impl Default for Placeholder {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Placeholder {
    pub fn new(initial: Option<BoundingBox>) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Updates the box; observers wake only on an actual change.
    pub fn set(&self, bounds: Option<BoundingBox>) {
        self.tx.send_if_modified(|current| {
            if *current == bounds {
                false
            } else {
                *current = bounds;
                true
            }
        });
    }

    pub fn get(&self) -> Option<BoundingBox> {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<Option<BoundingBox>> {
        self.tx.subscribe()
    }
}

pub struct SurfaceWatch {
    app_id: String,
    placeholder: Arc<Placeholder>,
    active: watch::Sender<bool>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl SurfaceWatch {
    pub fn spawn(
        app_id: impl Into<String>,
        placeholder: Arc<Placeholder>,
        mapper: SharedMapper,
        active: bool,
        frame_interval: Duration,
    ) -> Self {
        let app_id = app_id.into();
        let (active_tx, active_rx) = watch::channel(active);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(
            app_id.clone(),
            placeholder.subscribe(),
            active_rx,
            mapper,
            cancel.clone(),
            frame_interval,
        ));
        Self {
            app_id,
            placeholder,
            active: active_tx,
            cancel,
            handle,
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn placeholder(&self) -> &Placeholder {
        &self.placeholder
    }

    pub fn set_active(&self, active: bool) {
        self.active.send_if_modified(|current| {
            let changed = *current != active;
            *current = active;
            changed
        });
    }

    pub fn is_active(&self) -> bool {
        *self.active.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for SurfaceWatch {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

async fn run(
    app_id: String,
    mut placeholder: watch::Receiver<Option<BoundingBox>>,
    mut active: watch::Receiver<bool>,
    mapper: SharedMapper,
    cancel: CancellationToken,
    frame_interval: Duration,
) {
    let mut frames = tokio::time::interval(frame_interval);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let initial = *placeholder.borrow_and_update();
    report(&mapper, &app_id, initial);

    loop {
        let polling = *active.borrow_and_update();
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = placeholder.changed() => {
                if changed.is_err() {
                    break;
                }
                let bounds = *placeholder.borrow_and_update();
                report(&mapper, &app_id, bounds);
            }
            changed = active.changed() => {
                if changed.is_err() {
                    break;
                }
                frames.reset();
            }
            _ = frames.tick(), if polling => {
                let bounds = *placeholder.borrow();
                report(&mapper, &app_id, bounds);
            }
        }
    }

    tracing::debug!(app_id = %app_id, "Surface watch stopped");
}

fn report(mapper: &SharedMapper, app_id: &str, bounds: Option<BoundingBox>) {
    let Some(bounds) = bounds else {
        return;
    };
    match mapper.lock() {
        Ok(mut mapper) => {
            mapper.sync(app_id, bounds);
        }
        Err(e) => {
            tracing::warn!(app_id = %app_id, error = %e, "Surface mapper lock poisoned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::compositor::RecordingCompositor;
    use tokio::time::sleep;

    fn shared_mapper(recorder: Arc<RecordingCompositor>) -> SharedMapper {
        Arc::new(Mutex::new(SurfaceMapper::new(recorder)))
    }

    #[tokio::test]
    async fn test_reports_initial_and_changes() {
        let recorder = Arc::new(RecordingCompositor::default());
        let placeholder = Arc::new(Placeholder::new(Some(BoundingBox::new(
            10.0, 20.0, 300.0, 200.0,
        ))));
        let watch = SurfaceWatch::spawn(
            "xterm",
            placeholder.clone(),
            shared_mapper(recorder.clone()),
            false,
            FRAME_INTERVAL,
        );

        sleep(Duration::from_millis(50)).await;
        assert_eq!(recorder.reports().len(), 1);

        placeholder.set(Some(BoundingBox::new(10.0, 20.0, 400.0, 300.0)));
        sleep(Duration::from_millis(50)).await;
        let reports = recorder.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].width, 400);

        drop(watch);
    }

    #[tokio::test]
    async fn test_active_polling_dedups() {
        let recorder = Arc::new(RecordingCompositor::default());
        let placeholder = Arc::new(Placeholder::new(Some(BoundingBox::new(
            0.0, 0.0, 300.0, 200.0,
        ))));
        let watch = SurfaceWatch::spawn(
            "xterm",
            placeholder,
            shared_mapper(recorder.clone()),
            true,
            Duration::from_millis(5),
        );

        // Many frames, one unchanged rectangle
        sleep(Duration::from_millis(100)).await;
        assert_eq!(recorder.reports().len(), 1);
        assert!(watch.is_active());
    }

    #[tokio::test]
    async fn test_drop_cancels_task() {
        let recorder = Arc::new(RecordingCompositor::default());
        let placeholder = Arc::new(Placeholder::default());
        let watch = SurfaceWatch::spawn(
            "xterm",
            placeholder.clone(),
            shared_mapper(recorder.clone()),
            true,
            FRAME_INTERVAL,
        );
        drop(watch);
        sleep(Duration::from_millis(20)).await;

        placeholder.set(Some(BoundingBox::new(0.0, 0.0, 300.0, 200.0)));
        sleep(Duration::from_millis(50)).await;
        assert!(recorder.reports().is_empty());
    }
}
