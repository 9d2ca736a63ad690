use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::heatmap::{
    await_render_completion, build_report_view, compose_report_image, encode_png,
    RendererConfig, RendererFactory,
};
use crate::models::Viewport;
use crate::session::Session;
use crate::settings::ProctorSettings;

use super::text::build_report_text;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub const REPORT_FILE: &str = "report.txt";
pub const SNAPSHOT_DIR: &str = "snapshots";
pub const HEATMAP_FILE: &str = "heatmap_with_screen_outline.png";

/// Everything exported for one stopped session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvidenceArchive {
    pub report_text: String,
    /// Keyed by snapshot filename, ordered by name.
    pub snapshot_files: BTreeMap<String, Vec<u8>>,
    pub heatmap_image: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveEntry {
    Folder(String),
    File { path: String, bytes: Vec<u8> },
}

impl EvidenceArchive {
    /// Archive layout: report, snapshot folder (always present), optional heatmap.
    pub fn entries(&self) -> Vec<ArchiveEntry> {
        let mut entries = vec![
            ArchiveEntry::File {
                path: REPORT_FILE.to_string(),
                bytes: self.report_text.clone().into_bytes(),
            },
            ArchiveEntry::Folder(SNAPSHOT_DIR.to_string()),
        ];

        entries.extend(self.snapshot_files.iter().map(|(name, bytes)| ArchiveEntry::File {
            path: format!("{SNAPSHOT_DIR}/{name}"),
            bytes: bytes.clone(),
        }));

        if let Some(heatmap) = &self.heatmap_image {
            entries.push(ArchiveEntry::File {
                path: HEATMAP_FILE.to_string(),
                bytes: heatmap.clone(),
            });
        }

        entries
    }
}

/// Packs named entries into one downloadable blob.
pub trait ArchiveBundler: Send + Sync {
    fn bundle(&self, entries: &[ArchiveEntry]) -> Result<Vec<u8>>;
}

pub struct ZipBundler;

impl ArchiveBundler for ZipBundler {
    fn bundle(&self, entries: &[ArchiveEntry]) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in entries {
            match entry {
                ArchiveEntry::Folder(name) => {
                    writer
                        .add_directory(format!("{name}/"), options)
                        .with_context(|| format!("failed to add folder {name}"))?;
                }
                ArchiveEntry::File { path, bytes } => {
                    writer
                        .start_file(path.as_str(), options)
                        .with_context(|| format!("failed to start {path}"))?;
                    writer
                        .write_all(bytes)
                        .with_context(|| format!("failed to write {path}"))?;
                }
            }
        }

        let cursor = writer.finish().context("failed to finalize zip archive")?;
        Ok(cursor.into_inner())
    }
}

/// Raw bytes behind a `data:<mime>;base64,<payload>` URL.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>> {
    let (header, payload) = data_url
        .split_once(',')
        .ok_or_else(|| anyhow!("malformed data url"))?;
    if !header.ends_with(";base64") {
        bail!("data url is not base64 encoded");
    }
    STANDARD
        .decode(payload.trim())
        .context("invalid base64 snapshot payload")
}

/// Build the archive for a stopped session.
///
/// Only the report text can fail the export. Undecodable snapshots are
/// skipped and a heatmap that cannot be rendered is left out.
pub async fn assemble(
    session: &Session,
    viewport: Viewport,
    settings: &ProctorSettings,
    renderers: &dyn RendererFactory,
) -> Result<EvidenceArchive> {
    if session.tracking() {
        bail!("cannot assemble evidence while the exam is still being tracked");
    }

    let report_text = build_report_text(session).context("failed to build report text")?;

    let mut snapshot_files = BTreeMap::new();
    for event in session.log().filter(true) {
        let Some(snapshot) = &event.snapshot else {
            continue;
        };
        match decode_data_url(&snapshot.data_url) {
            Ok(bytes) => {
                snapshot_files.insert(snapshot.id.clone(), bytes);
            }
            Err(err) => log_warn!("skipping snapshot {}: {err:#}", snapshot.id),
        }
    }

    let heatmap_image = if session.log().is_empty() {
        None
    } else {
        match render_report_heatmap(session, viewport, settings, renderers).await {
            Ok(png) => Some(png),
            Err(err) => {
                log_warn!("heatmap omitted from evidence archive: {err:#}");
                None
            }
        }
    };

    log_info!(
        "assembled evidence: {} off-screen events, {} snapshots, heatmap={}",
        session.off_screen_count(),
        snapshot_files.len(),
        heatmap_image.is_some()
    );

    Ok(EvidenceArchive {
        report_text,
        snapshot_files,
        heatmap_image,
    })
}

async fn render_report_heatmap(
    session: &Session,
    viewport: Viewport,
    settings: &ProctorSettings,
    renderers: &dyn RendererFactory,
) -> Result<Vec<u8>> {
    let view = build_report_view(session.log().events(), viewport, &settings.heatmap);
    let mut renderer = renderers.create(
        view.canvas_width,
        view.canvas_height,
        RendererConfig::from(&settings.heatmap),
    )?;

    let data = view.data.clone();
    let renderer = tokio::task::spawn_blocking(move || {
        renderer.set_data(&data)?;
        Ok::<_, anyhow::Error>(renderer)
    })
    .await
    .context("heatmap render worker join failed")??;

    await_render_completion(renderer.sync(), settings.render_settle()).await;

    let layer = renderer.canvas().context("heatmap canvas readback failed")?;
    let page = compose_report_image(&view, &layer)?;
    encode_png(&page)
}

/// Compress the archive off the async runtime.
pub async fn bundle(archive: &EvidenceArchive, bundler: Arc<dyn ArchiveBundler>) -> Result<Vec<u8>> {
    let entries = archive.entries();
    tokio::task::spawn_blocking(move || bundler.bundle(&entries))
        .await
        .context("archive worker join failed")?
}
