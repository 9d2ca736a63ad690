#![allow(dead_code)]

use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};
use zip::ZipArchive;

use gazeproctor_lib::gaze::{CapturedFrame, GazeListener};
use gazeproctor_lib::settings::EstimatorOptions;
use gazeproctor_lib::{
    FrameSource, GazeEstimator, JpegSnapshotCapture, ProctorController, ProctorSettings,
    SnapshotCapture, StillFrameSource, Viewport,
};

pub fn settings() -> ProctorSettings {
    let mut settings = ProctorSettings::default();
    settings.heatmap.report_margin = 50;
    settings.render_settle_ms = 1;
    settings
}

pub fn camera() -> Box<dyn FrameSource> {
    Box::new(StillFrameSource::new(RgbImage::from_pixel(160, 120, Rgb([90, 120, 200]))))
}

pub fn controller_with(estimator: Box<dyn GazeEstimator>, with_camera: bool) -> ProctorController {
    let settings = settings();
    let source = with_camera.then(camera);
    ProctorController::new(
        estimator,
        Box::new(JpegSnapshotCapture::new(source, settings.capture.clone())),
        Viewport::new(1000, 800),
        settings,
    )
}

pub async fn calibrate(controller: &ProctorController) {
    controller.start_calibration().await.unwrap();
    for index in 0..9 {
        controller.click_calibration_point(index).await;
    }
}

pub async fn wait_for_samples(controller: &ProctorController, expected: usize) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while controller.summary().await.total_samples < expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "worker did not log {expected} samples in time");
}

pub async fn wait_for_cursor(controller: &ProctorController, expected: (i32, i32)) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while controller.get_snapshot().await.cursor != Some(expected) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "cursor never reached {expected:?}");
}

pub fn zip_names(bytes: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

pub fn zip_text(bytes: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    let mut text = String::new();
    archive.by_name(name).unwrap().read_to_string(&mut text).unwrap();
    text
}

/// Estimator that records lifecycle calls and can refuse to begin or resume.
#[derive(Clone, Default)]
pub struct RecordingEstimator {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail_begin: bool,
    pub fail_resume: bool,
}

impl RecordingEstimator {
    pub fn failing() -> Self {
        Self {
            fail_begin: true,
            ..Self::default()
        }
    }

    pub fn without_resume() -> Self {
        Self {
            fail_resume: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

impl GazeEstimator for RecordingEstimator {
    fn configure(&mut self, _options: &EstimatorOptions) {
        self.record("configure");
    }

    fn set_listener(&mut self, _listener: GazeListener) {
        self.record("set_listener");
    }

    fn begin(&mut self) -> Result<()> {
        self.record("begin");
        if self.fail_begin {
            Err(anyhow!("webcam access denied"))
        } else {
            Ok(())
        }
    }

    fn pause(&mut self) {
        self.record("pause");
    }

    fn resume(&mut self) -> Result<()> {
        self.record("resume");
        if self.fail_resume {
            Err(anyhow!("camera stream lost"))
        } else {
            Ok(())
        }
    }

    fn end(&mut self) {
        self.record("end");
    }

    fn clear_data(&mut self) {
        self.record("clear_data");
    }

    fn show_prediction_points(&mut self, visible: bool) {
        self.record(format!("prediction_points:{visible}"));
    }
}

/// Capture that blocks inside `capture()` until the test releases it.
pub struct GatedCapture {
    pub started: Arc<AtomicBool>,
    release: mpsc::Receiver<()>,
}

impl GatedCapture {
    pub fn with_release() -> (Self, mpsc::Sender<()>) {
        let (release_tx, release) = mpsc::channel();
        let capture = Self {
            started: Arc::new(AtomicBool::new(false)),
            release,
        };
        (capture, release_tx)
    }
}

impl SnapshotCapture for GatedCapture {
    fn capture(&mut self) -> Result<Option<CapturedFrame>> {
        self.started.store(true, Ordering::SeqCst);
        self.release
            .recv_timeout(Duration::from_secs(5))
            .map_err(|_| anyhow!("capture was never released"))?;
        Ok(Some(CapturedFrame {
            data_url: "data:image/jpeg;base64,AAAA".into(),
            extension: "jpg",
        }))
    }
}

pub async fn wait_until(flag: &AtomicBool) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !flag.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "flag never raised");
}
