use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::gaze::{capture_frame, CapturedFrame};
use crate::models::{ClassifiedEvent, GazeSample};

use super::state::{ProctorState, SharedCapture};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Owns the task that drains the estimator's listener channel.
pub struct SampleWorker {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl SampleWorker {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start(
        &mut self,
        state: Arc<Mutex<ProctorState>>,
        receiver: mpsc::UnboundedReceiver<GazeSample>,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("sample worker already running");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(sample_loop(state, receiver, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("sample worker task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

/// Single consumer of gaze samples. Each sample is classified and logged to
/// completion before the next one is taken off the channel.
async fn sample_loop(
    state: Arc<Mutex<ProctorState>>,
    mut receiver: mpsc::UnboundedReceiver<GazeSample>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            maybe_sample = receiver.recv() => {
                let Some(sample) = maybe_sample else {
                    log_info!("gaze listener closed; sample worker exiting");
                    break;
                };
                ingest_sample(&state, sample).await;
            }
            _ = cancel_token.cancelled() => {
                log_info!("sample worker shutting down");
                break;
            }
        }
    }
}

/// Classify under the state lock, capture on the blocking pool with the lock
/// released, then record under the lock again. Returns the logged event.
pub async fn ingest_sample(
    state: &Mutex<ProctorState>,
    sample: GazeSample,
) -> Option<ClassifiedEvent> {
    let pending = state.lock().await.begin_sample(sample, Utc::now())?;

    let frame = match pending.capture() {
        Some(capture) => grab_frame(capture).await,
        None => None,
    };

    state.lock().await.finish_sample(pending, frame)
}

async fn grab_frame(capture: SharedCapture) -> Option<CapturedFrame> {
    let joined = tokio::task::spawn_blocking(move || {
        let mut capture = match capture.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        capture_frame(&mut **capture)
    })
    .await;

    match joined {
        Ok(frame) => frame,
        Err(err) => {
            log_warn!("snapshot capture worker join failed: {err}");
            None
        }
    }
}
