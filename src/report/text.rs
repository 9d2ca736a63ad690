use std::fmt::Write as _;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::session::{Session, SessionSummary};

const TITLE: &str = "Exam Proctoring Report";

fn format_instant(instant: Option<DateTime<Utc>>) -> String {
    instant
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Plain-text report: the off-screen total first, session details, then one
/// line per off-screen event in arrival order.
pub fn build_report_text(session: &Session) -> Result<String> {
    let summary = SessionSummary::from_log(session.log());
    let mut out = String::new();

    writeln!(out, "{TITLE}")?;
    writeln!(out, "{}", "=".repeat(TITLE.len()))?;
    writeln!(out, "Total off-screen events: {}", session.off_screen_count())?;
    writeln!(out)?;
    writeln!(out, "Session: {}", session.id.as_deref().unwrap_or("-"))?;
    writeln!(out, "Started: {}", format_instant(session.started_at))?;
    writeln!(out, "Stopped: {}", format_instant(session.stopped_at))?;
    writeln!(
        out,
        "Samples logged: {} (on-screen {}, off-screen {}, {:.1}% off-screen)",
        summary.total_samples,
        summary.on_screen,
        summary.off_screen,
        summary.off_screen_ratio * 100.0
    )?;
    writeln!(
        out,
        "Snapshots captured: {} (no frame available: {})",
        summary.snapshots_captured, summary.capture_gaps
    )?;
    writeln!(out)?;

    if summary.off_screen == 0 {
        writeln!(out, "No off-screen events recorded.")?;
        return Ok(out);
    }

    writeln!(out, "Off-screen events:")?;
    for (ordinal, event) in session.log().filter(true).enumerate() {
        write!(
            out,
            "{}. [{}] ({}, {})",
            ordinal + 1,
            event.observed_at.format("%H:%M:%S%.3f"),
            event.x,
            event.y
        )?;
        if let Some(id) = event.snapshot_id() {
            write!(out, " snapshot: {id}")?;
        }
        writeln!(out)?;
    }

    Ok(out)
}
