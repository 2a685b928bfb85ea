use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::debug;

use super::{FrameOutcome, PreviewHandle, Surface};

/// Drive `handle` on `surface`, one frame per `frame_interval`.
///
/// The task checks the shared engine state before drawing each frame and
/// exits after the first frame that is not [`FrameOutcome::Continue`], so a
/// `stop()` takes effect within one pending frame. `on_frame` runs after every
/// step, outside the surface lock. Resolves to the number of frames drawn.
pub fn spawn_preview<S, F>(
    handle: PreviewHandle,
    surface: Arc<Mutex<S>>,
    frame_interval: Duration,
    mut on_frame: F,
) -> JoinHandle<u32>
where
    S: Surface + Send + 'static,
    F: FnMut(FrameOutcome) + Send + 'static,
{
    let frame_interval = frame_interval.max(Duration::from_millis(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(frame_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let outcome = {
                let mut surface = surface.lock();
                handle.step(&mut *surface)
            };
            on_frame(outcome);
            if outcome != FrameOutcome::Continue {
                break;
            }
        }
        let frames = handle.frame();
        debug!(frames, "Preview task exited");
        frames
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::{Canvas, PreviewState, FRAME_BUDGET};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn runs_to_the_frame_budget() {
        let handle = PreviewHandle::new();
        let canvas = Arc::new(Mutex::new(Canvas::new(200, 150)));
        handle.start(&*canvas.lock()).unwrap();

        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let task = spawn_preview(
            handle.clone(),
            Arc::clone(&canvas),
            Duration::from_millis(1),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        let frames = task.await.unwrap();
        assert_eq!(frames, FRAME_BUDGET);
        assert_eq!(calls.load(Ordering::SeqCst), FRAME_BUDGET);
        assert_eq!(handle.state(), PreviewState::Stopped);
        assert_eq!(canvas.lock().presented(), FRAME_BUDGET);
    }

    #[tokio::test]
    async fn stop_ends_the_task_without_more_drawing() {
        let handle = PreviewHandle::new();
        let canvas = Arc::new(Mutex::new(Canvas::new(200, 150)));
        handle.start(&*canvas.lock()).unwrap();

        let task = spawn_preview(
            handle.clone(),
            Arc::clone(&canvas),
            Duration::from_millis(5),
            |_| {},
        );
        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.stop();
        let mutations_at_stop = canvas.lock().mutations();

        let frames = task.await.unwrap();
        assert!(frames < FRAME_BUDGET);
        assert_eq!(handle.state(), PreviewState::Stopped);
        assert_eq!(canvas.lock().mutations(), mutations_at_stop);
    }

    #[tokio::test]
    async fn idle_engine_exits_immediately() {
        let handle = PreviewHandle::new();
        let canvas = Arc::new(Mutex::new(Canvas::new(10, 10)));
        let frames = spawn_preview(handle, Arc::clone(&canvas), Duration::ZERO, |_| {})
            .await
            .unwrap();
        assert_eq!(frames, 0);
        assert_eq!(canvas.lock().mutations(), 0);
    }
}
