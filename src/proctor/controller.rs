use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use log::{error, info, warn};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::calibration::{CalibrationPhase, ClickOutcome};
use crate::gaze::{GazeEstimator, SnapshotCapture};
use crate::heatmap::{build_live_view, HeatmapData, RasterRendererFactory, RendererFactory};
use crate::models::{ClassifiedEvent, GazeSample, SessionInfo, Viewport};
use crate::report::{assemble, bundle, ArchiveBundler, EvidenceArchive, ZipBundler};
use crate::session::SessionSummary;
use crate::settings::ProctorSettings;

use super::state::{EnvironmentStatus, ProctorSnapshot, ProctorState};
use super::worker::{ingest_sample, SampleWorker};

pub const REPORT_ARCHIVE_NAME: &str = "proctoring_report.zip";

#[derive(Debug, Clone, Serialize)]
pub struct ExportedReport {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Command surface of the proctor. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ProctorController {
    state: Arc<Mutex<ProctorState>>,
    estimator: Arc<Mutex<Box<dyn GazeEstimator>>>,
    worker: Arc<Mutex<SampleWorker>>,
    settings: Arc<ProctorSettings>,
    renderers: Arc<dyn RendererFactory>,
    bundler: Arc<dyn ArchiveBundler>,
}

impl ProctorController {
    pub fn new(
        estimator: Box<dyn GazeEstimator>,
        capture: Box<dyn SnapshotCapture>,
        viewport: Viewport,
        settings: ProctorSettings,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(ProctorState::new(viewport, capture))),
            estimator: Arc::new(Mutex::new(estimator)),
            worker: Arc::new(Mutex::new(SampleWorker::new())),
            settings: Arc::new(settings),
            renderers: Arc::new(RasterRendererFactory),
            bundler: Arc::new(ZipBundler),
        }
    }

    pub fn with_renderers(mut self, renderers: Arc<dyn RendererFactory>) -> Self {
        self.renderers = renderers;
        self
    }

    pub fn with_bundler(mut self, bundler: Arc<dyn ArchiveBundler>) -> Self {
        self.bundler = bundler;
        self
    }

    pub fn settings(&self) -> &ProctorSettings {
        &self.settings
    }

    /// Configure the estimator, attach the sample worker, and begin
    /// estimation. A failing `begin` is recorded as the environment status
    /// rather than returned; the proctor stays usable but exams cannot start.
    pub async fn start(&self) -> Result<EnvironmentStatus> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.worker
            .lock()
            .await
            .start(self.state.clone(), receiver)?;

        let begin_result = {
            let mut estimator = self.estimator.lock().await;
            estimator.configure(&self.settings.estimator);
            estimator.set_listener(sender);
            estimator.begin()
        };

        let status = match begin_result {
            Ok(()) => {
                info!("gaze estimator started");
                EnvironmentStatus::Ready
            }
            Err(err) => {
                error!("gaze estimator failed to start: {err:#}");
                EnvironmentStatus::Failed(format!("Gaze tracking unavailable: {err}"))
            }
        };

        self.state.lock().await.environment = status.clone();
        Ok(status)
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.estimator.lock().await.end();
        self.worker.lock().await.stop().await
    }

    pub async fn get_snapshot(&self) -> ProctorSnapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn summary(&self) -> SessionSummary {
        SessionSummary::from_log(self.state.lock().await.session.log())
    }

    pub async fn events(&self) -> Vec<ClassifiedEvent> {
        self.state.lock().await.session.log().events().to_vec()
    }

    /// Feed one sample directly, bypassing the listener channel.
    pub async fn handle_sample(&self, sample: GazeSample) -> Option<ClassifiedEvent> {
        ingest_sample(&self.state, sample).await
    }

    pub async fn resize(&self, width: u32, height: u32) {
        self.state.lock().await.viewport = Viewport::new(width, height);
    }

    pub async fn set_capture(&self, capture: Box<dyn SnapshotCapture>) {
        self.state.lock().await.set_capture(capture);
    }

    /// Show the nine targets and restart calibration from the first one.
    /// Refused while an exam is tracking.
    pub async fn start_calibration(&self) -> Result<ProctorSnapshot> {
        let snapshot = {
            let mut state = self.state.lock().await;
            if state.session.tracking() {
                bail!("stop the exam before recalibrating the gaze estimator");
            }
            state.calibration.start();
            state.overlay_visible = true;
            state.snapshot()
        };
        {
            // A stopped exam leaves the estimator paused; calibration needs it live.
            let mut estimator = self.estimator.lock().await;
            if let Err(err) = estimator.resume() {
                warn!("gaze estimator did not resume for calibration: {err:#}");
            }
            estimator.show_prediction_points(true);
        }
        info!("calibration started");
        Ok(snapshot)
    }

    pub async fn click_calibration_point(&self, index: usize) -> ClickOutcome {
        let outcome = self.state.lock().await.calibration.click(index);
        match outcome {
            ClickOutcome::Ignored => {
                log::debug!("ignored calibration click on point {index}");
            }
            ClickOutcome::Advanced(next) => {
                log::debug!("calibration point {index} accepted; point {next} active");
            }
            ClickOutcome::Completed => {
                self.estimator.lock().await.show_prediction_points(false);
                info!("calibration complete; exam tracking unlocked");
            }
        }
        outcome
    }

    /// Hide the calibration overlay. Progress is kept, so reopening with
    /// `start_calibration` is the only way to begin again.
    pub async fn close_calibration_overlay(&self) {
        let complete = {
            let mut state = self.state.lock().await;
            state.overlay_visible = false;
            state.calibration.is_complete()
        };
        if !complete {
            self.estimator.lock().await.show_prediction_points(false);
        }
    }

    /// Begin tracking a fresh session. The session only starts once the
    /// estimator has resumed; a failed resume leaves the proctor untouched.
    pub async fn start_exam(&self) -> Result<SessionInfo> {
        let info = {
            let mut state = self.state.lock().await;
            if let EnvironmentStatus::Failed(message) = &state.environment {
                bail!("cannot start exam: {message}");
            }
            if state.calibration.phase() != CalibrationPhase::Complete {
                bail!("calibration must be completed before starting the exam");
            }

            // Lock order is state then estimator, never the reverse.
            self.estimator
                .lock()
                .await
                .resume()
                .context("gaze estimator did not resume for the exam")?;

            if state.session.tracking() {
                warn!("restarting exam; discarding the current event log");
            }
            state.overlay_visible = false;
            state.session.begin(Uuid::new_v4().to_string(), Utc::now());
            state.session.info()
        };

        info!(
            "exam started (session {})",
            info.id.as_deref().unwrap_or("-")
        );
        Ok(info)
    }

    pub async fn stop_exam(&self) -> Result<SessionInfo> {
        let info = {
            let mut state = self.state.lock().await;
            if !state.session.stop(Utc::now()) {
                bail!("no exam in progress");
            }
            state.session.info()
        };

        self.estimator.lock().await.pause();
        info!(
            "exam stopped (session {})",
            info.id.as_deref().unwrap_or("-")
        );
        Ok(info)
    }

    /// Forget the estimator's mapping and start over from an uncalibrated,
    /// empty proctor.
    pub async fn recalibrate(&self) {
        self.estimator.lock().await.clear_data();
        {
            let mut state = self.state.lock().await;
            state.calibration.reset();
            state.session.reset();
            state.overlay_visible = false;
        }
        info!("recalibration requested; session cleared");
    }

    pub async fn live_heatmap(&self) -> HeatmapData {
        let state = self.state.lock().await;
        build_live_view(state.session.log().events(), &self.settings.heatmap)
    }

    /// Assemble the evidence for the stopped session without bundling it.
    pub async fn evidence(&self) -> Result<EvidenceArchive> {
        let (session, viewport) = {
            let state = self.state.lock().await;
            if !state.session.started() {
                bail!("no exam session to export");
            }
            if state.session.tracking() {
                bail!("stop the exam before downloading the report");
            }
            (state.session.clone(), state.viewport)
        };

        assemble(&session, viewport, &self.settings, self.renderers.as_ref()).await
    }

    pub async fn download_report(&self) -> Result<ExportedReport> {
        let archive = self.evidence().await?;
        let bytes = bundle(&archive, self.bundler.clone())
            .await
            .context("failed to bundle evidence archive")?;

        info!(
            "evidence archive ready: {} ({} bytes)",
            REPORT_ARCHIVE_NAME,
            bytes.len()
        );

        Ok(ExportedReport {
            file_name: REPORT_ARCHIVE_NAME.to_string(),
            bytes,
        })
    }
}
