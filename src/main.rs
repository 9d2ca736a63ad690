use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use gazeproctor_lib::{
    gaze::is_off_screen, init_logging, FrameSource, GazeSample, JpegSnapshotCapture,
    ProctorController, ProctorSettings, ScriptedEstimator, SettingsStore, StillFrameSource,
    Viewport,
};

const REPLAY_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(name = "gazeproctor", version, about = "Gaze-based exam proctoring pipeline")]
struct Cli {
    #[arg(long, global = true, help = "Settings JSON file (defaults apply when missing)")]
    settings: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a recorded sample file through calibration, one exam, and export.
    Replay {
        /// JSON-lines file, one `{"x":..,"y":..,"elapsedTime":..}` per line.
        samples: PathBuf,
        #[arg(long, default_value = "1920x1080", help = "Viewport as WIDTHxHEIGHT")]
        viewport: String,
        #[arg(long, help = "Still image used as the webcam frame for snapshots")]
        frame: Option<PathBuf>,
        #[arg(long, default_value = "proctoring_report.zip")]
        out: PathBuf,
    },
    /// Classify a single point against a viewport.
    Classify {
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
        #[arg(long, default_value = "1920x1080")]
        viewport: String,
    },
    /// Print the default settings as JSON.
    DefaultSettings,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            samples,
            viewport,
            frame,
            out,
        } => {
            let settings = load_settings(cli.settings.as_deref())?;
            replay(&samples, parse_viewport(&viewport)?, frame.as_deref(), &out, settings).await
        }
        Commands::Classify { x, y, viewport } => {
            let viewport = parse_viewport(&viewport)?;
            let (x, y) = GazeSample::new(x, y, 0.0).rounded();
            let verdict = serde_json::json!({
                "x": x,
                "y": y,
                "offScreen": is_off_screen(x, y, viewport),
            });
            println!("{verdict}");
            Ok(())
        }
        Commands::DefaultSettings => {
            println!("{}", serde_json::to_string_pretty(&ProctorSettings::default())?);
            Ok(())
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<ProctorSettings> {
    match path {
        Some(path) => Ok(SettingsStore::new(path.to_path_buf())?.settings()),
        None => Ok(ProctorSettings::default()),
    }
}

fn parse_viewport(value: &str) -> Result<Viewport> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("viewport must look like 1920x1080, got '{value}'"))?;
    Ok(Viewport::new(
        width.trim().parse().context("invalid viewport width")?,
        height.trim().parse().context("invalid viewport height")?,
    ))
}

fn read_samples(path: &Path) -> Result<Vec<GazeSample>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read samples from {}", path.display()))?;

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid gaze sample", path.display(), index + 1))
        })
        .collect()
}

async fn replay(
    samples_path: &Path,
    viewport: Viewport,
    frame_path: Option<&Path>,
    out: &Path,
    settings: ProctorSettings,
) -> Result<()> {
    let samples = read_samples(samples_path)?;
    let expected = samples.len();

    let source: Option<Box<dyn FrameSource>> = match frame_path {
        Some(path) => {
            let frame = image::open(path)
                .with_context(|| format!("failed to open frame image {}", path.display()))?
                .to_rgb8();
            Some(Box::new(StillFrameSource::new(frame)))
        }
        None => None,
    };

    let feeder = ScriptedEstimator::new();
    let controller = ProctorController::new(
        Box::new(feeder.clone()),
        Box::new(JpegSnapshotCapture::new(source, settings.capture.clone())),
        viewport,
        settings,
    );

    controller.start().await?;
    controller.start_calibration().await?;
    for index in 0..gazeproctor_lib::calibration::CALIBRATION_POINT_COUNT {
        controller.click_calibration_point(index).await;
    }
    controller.close_calibration_overlay().await;
    controller.start_exam().await?;

    feeder.push(samples);
    wait_for_samples(&controller, expected).await?;

    controller.stop_exam().await?;
    let report = controller.download_report().await?;
    fs::write(out, &report.bytes)
        .with_context(|| format!("failed to write archive to {}", out.display()))?;

    let summary = controller.summary().await;
    info!("wrote {} ({} bytes)", out.display(), report.bytes.len());
    println!("{}", serde_json::to_string_pretty(&summary)?);

    controller.shutdown().await
}

async fn wait_for_samples(controller: &ProctorController, expected: usize) -> Result<()> {
    let deadline = tokio::time::Instant::now() + REPLAY_TIMEOUT;
    loop {
        let logged = controller.summary().await.total_samples;
        if logged >= expected {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            bail!("timed out after logging {logged} of {expected} samples");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
