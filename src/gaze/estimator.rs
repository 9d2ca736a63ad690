use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use tokio::sync::mpsc;

use crate::models::GazeSample;
use crate::settings::EstimatorOptions;

/// Channel end the estimator pushes every estimate into.
pub type GazeListener = mpsc::UnboundedSender<GazeSample>;

/// The slice of a gaze-estimation engine the proctor relies on.
///
/// Engines are configured once, get a single listener, and are then driven
/// through their lifecycle by proctoring commands.
pub trait GazeEstimator: Send {
    fn configure(&mut self, options: &EstimatorOptions);

    /// Replace the registered listener.
    fn set_listener(&mut self, listener: GazeListener);

    /// Load the model and open the camera. Errors here are environment
    /// failures (library missing, webcam denied).
    fn begin(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn resume(&mut self) -> Result<()>;

    fn end(&mut self);

    /// Forget the learned gaze mapping.
    fn clear_data(&mut self);

    /// Show or hide the live prediction marker.
    fn show_prediction_points(&mut self, visible: bool);
}

#[derive(Default)]
struct ScriptedState {
    pending: Vec<GazeSample>,
    listener: Option<GazeListener>,
    running: bool,
    prediction_points: bool,
    options: EstimatorOptions,
    cleared: usize,
}

impl ScriptedState {
    fn flush(&mut self) {
        if !self.running {
            return;
        }
        let Some(listener) = self.listener.as_ref() else {
            return;
        };
        for sample in self.pending.drain(..) {
            if listener.send(sample).is_err() {
                log::debug!("gaze listener closed; dropping remaining samples");
                break;
            }
        }
    }
}

/// Estimator that replays samples handed to it instead of watching a camera.
///
/// Clones share state, so one handle can be given to the controller while
/// another keeps feeding samples. Samples are only delivered while running;
/// `pause` holds them back until `resume`.
#[derive(Clone, Default)]
pub struct ScriptedEstimator {
    inner: Arc<Mutex<ScriptedState>>,
}

impl ScriptedEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue samples; they go out immediately if the estimator is running.
    pub fn push(&self, samples: impl IntoIterator<Item = GazeSample>) {
        let mut state = self.lock();
        state.pending.extend(samples);
        state.flush();
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    pub fn prediction_points_visible(&self) -> bool {
        self.lock().prediction_points
    }

    pub fn options(&self) -> EstimatorOptions {
        self.lock().options.clone()
    }

    pub fn times_cleared(&self) -> usize {
        self.lock().cleared
    }

    fn lock(&self) -> MutexGuard<'_, ScriptedState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl GazeEstimator for ScriptedEstimator {
    fn configure(&mut self, options: &EstimatorOptions) {
        let mut state = self.lock();
        state.options = options.clone();
        state.prediction_points = options.show_prediction_points;
    }

    fn set_listener(&mut self, listener: GazeListener) {
        let mut state = self.lock();
        state.listener = Some(listener);
        state.flush();
    }

    fn begin(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.running = true;
        state.flush();
        Ok(())
    }

    fn pause(&mut self) {
        self.lock().running = false;
    }

    fn resume(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.running = true;
        state.flush();
        Ok(())
    }

    fn end(&mut self) {
        let mut state = self.lock();
        state.running = false;
        state.listener = None;
    }

    fn clear_data(&mut self) {
        self.lock().cleared += 1;
    }

    fn show_prediction_points(&mut self, visible: bool) {
        self.lock().prediction_points = visible;
    }
}
