use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

/// Flags handed to the gaze estimator once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorOptions {
    pub show_video_preview: bool,
    pub show_prediction_points: bool,
    pub apply_kalman_filter: bool,
}

impl Default for EstimatorOptions {
    fn default() -> Self {
        Self {
            show_video_preview: true,
            show_prediction_points: false,
            apply_kalman_filter: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Both frame dimensions are divided by this (rounded down).
    pub downscale_factor: u32,
    /// JPEG quality, 1..=100.
    pub jpeg_quality: u8,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            downscale_factor: 5,
            jpeg_quality: 70,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapSettings {
    pub radius: u32,
    pub min_opacity: f32,
    pub max_opacity: f32,
    pub blur: f32,
    pub point_weight: u32,
    pub max_intensity: u32,
    /// Border added on every side of the report canvas so off-screen gaze stays visible.
    pub report_margin: u32,
}

impl Default for HeatmapSettings {
    fn default() -> Self {
        Self {
            radius: 30,
            min_opacity: 0.0,
            max_opacity: 0.6,
            blur: 0.85,
            point_weight: 10,
            max_intensity: 100,
            report_margin: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProctorSettings {
    pub estimator: EstimatorOptions,
    pub capture: CaptureSettings,
    pub heatmap: HeatmapSettings,
    /// Settle delay for renderers that cannot signal completion.
    pub render_settle_ms: u64,
}

impl Default for ProctorSettings {
    fn default() -> Self {
        Self {
            estimator: EstimatorOptions::default(),
            capture: CaptureSettings::default(),
            heatmap: HeatmapSettings::default(),
            render_settle_ms: 300,
        }
    }
}

impl ProctorSettings {
    pub fn render_settle(&self) -> Duration {
        Duration::from_millis(self.render_settle_ms)
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<ProctorSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!(
                    "Ignoring unreadable settings in {} ({err}); using defaults",
                    path.display()
                );
                ProctorSettings::default()
            })
        } else {
            ProctorSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> ProctorSettings {
        self.read().clone()
    }

    pub fn update(&self, settings: ProctorSettings) -> Result<()> {
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &ProctorSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, ProctorSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, ProctorSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
