//! Simplified visual preview of a generated game.
//!
//! The preview does not run the generated program. It animates a stand-in
//! player square on a [`Surface`] for a fixed number of frames.

/// Tokio task driving the engine at a fixed frame rate.
pub mod scheduler;
/// Drawing surfaces the engine renders onto.
pub mod surface;

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::{LifecycleError, Result};

pub use scheduler::spawn_preview;
pub use surface::{Canvas, PixelRect, Rgb, Surface, TextLabel};

/// Frames rendered before the preview stops on its own.
pub const FRAME_BUDGET: u32 = 300;
/// Edge length of the simulated player square.
pub const PLAYER_SIZE: u32 = 50;
/// Instruction line rendered every frame.
pub const INSTRUCTIONS: &str = "Use arrow keys to move";
/// Title line rendered every frame.
pub const PREVIEW_TITLE: &str = "Vibr Game";

/// Lifecycle of a preview run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewState {
    /// Never started.
    Idle,
    /// Rendering frames.
    Running,
    /// Stopped explicitly or after the frame budget.
    Stopped,
}

/// Result of a single [`PreviewEngine::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A frame was drawn and another should be scheduled.
    Continue,
    /// The last frame of the budget was drawn.
    Finished,
    /// Nothing was drawn because the preview is not running.
    Halted,
}

/// Frame-stepped preview state machine.
#[derive(Debug, Clone)]
pub struct PreviewEngine {
    state: PreviewState,
    frame: u32,
    position: (i32, i32),
}

impl Default for PreviewEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewEngine {
    /// Idle engine at frame 0.
    pub fn new() -> Self {
        Self {
            state: PreviewState::Idle,
            frame: 0,
            position: (0, 0),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PreviewState {
        self.state
    }

    /// Frames drawn since the last start.
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Top-left corner of the player square in the last drawn frame.
    pub fn position(&self) -> (i32, i32) {
        self.position
    }

    /// Begin (or restart) a run on `surface`.
    pub fn start<S: Surface + ?Sized>(&mut self, surface: &S) -> Result<()> {
        if !surface.is_available() {
            return Err(LifecycleError::Surface(
                "preview canvas is not available".to_string(),
            ));
        }
        let (width, height) = surface.size();
        self.state = PreviewState::Running;
        self.frame = 0;
        self.position = player_position(0, width, height);
        info!(width, height, "Preview started");
        Ok(())
    }

    /// Stop the run; the next step draws nothing.
    pub fn stop(&mut self) {
        if self.state == PreviewState::Running {
            debug!(frame = self.frame, "Preview stopped");
        }
        self.state = PreviewState::Stopped;
    }

    /// Render one frame if running.
    pub fn step<S: Surface + ?Sized>(&mut self, surface: &mut S) -> FrameOutcome {
        if self.state != PreviewState::Running {
            return FrameOutcome::Halted;
        }

        let (width, height) = surface.size();
        surface.clear(Rgb::WHITE);
        surface.fill_text(INSTRUCTIONS, 10, 10, Rgb::BLACK);
        surface.fill_text(PREVIEW_TITLE, 10, 50, Rgb::GREEN);

        self.position = player_position(self.frame, width, height);
        let (x, y) = self.position;
        surface.fill_rect(PixelRect::new(x, y, PLAYER_SIZE, PLAYER_SIZE), Rgb::BLUE);

        self.frame += 1;
        surface.present(self.frame);

        if self.frame >= FRAME_BUDGET {
            self.state = PreviewState::Stopped;
            info!(frames = self.frame, "Preview finished");
            return FrameOutcome::Finished;
        }
        FrameOutcome::Continue
    }
}

/// Deterministic player position for a frame, clamped inside the surface.
pub fn player_position(frame: u32, width: u32, height: u32) -> (i32, i32) {
    let t = f64::from(frame);
    let max_x = f64::from(width.saturating_sub(PLAYER_SIZE));
    let max_y = f64::from(height.saturating_sub(PLAYER_SIZE));
    let centre_x = max_x / 2.0;
    let centre_y = max_y / 2.0;
    // Amplitudes overshoot the surface so the clamp is exercised at the extremes.
    let x = centre_x + f64::from(width) * 0.45 * (t * 0.05).sin();
    let y = centre_y + f64::from(height) * 0.45 * (t * 0.03).cos();
    (
        x.clamp(0.0, max_x).round() as i32,
        y.clamp(0.0, max_y).round() as i32,
    )
}

/// Engine shared between the UI and a scheduler task.
///
/// Every clone controls the same run, so `stop()` from the UI is observed by
/// the scheduler before it draws the next frame.
#[derive(Debug, Clone, Default)]
pub struct PreviewHandle {
    inner: Arc<Mutex<PreviewEngine>>,
}

impl PreviewHandle {
    /// Handle around a fresh idle engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// See [`PreviewEngine::start`].
    pub fn start<S: Surface + ?Sized>(&self, surface: &S) -> Result<()> {
        self.inner.lock().start(surface)
    }

    /// See [`PreviewEngine::stop`].
    pub fn stop(&self) {
        self.inner.lock().stop();
    }

    /// See [`PreviewEngine::step`].
    pub fn step<S: Surface + ?Sized>(&self, surface: &mut S) -> FrameOutcome {
        self.inner.lock().step(surface)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PreviewState {
        self.inner.lock().state()
    }

    /// Frames drawn since the last start.
    pub fn frame(&self) -> u32 {
        self.inner.lock().frame()
    }

    /// True while frames are being drawn.
    pub fn is_running(&self) -> bool {
        self.state() == PreviewState::Running
    }
}
