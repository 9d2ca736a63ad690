pub mod archive;
pub mod text;

pub use archive::{
    assemble, bundle, decode_data_url, ArchiveBundler, ArchiveEntry, EvidenceArchive, ZipBundler,
    HEATMAP_FILE, REPORT_FILE, SNAPSHOT_DIR,
};
pub use text::build_report_text;
