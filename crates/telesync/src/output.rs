//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one record per line.

use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use telesync_core::{Channel, ConnectionState, DataPoint, Mode, Snapshot, SyncError, SyncState};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, plain uses `plain_fn`.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize + ?Sized,
{
    Ok(match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Yaml => serde_yaml::to_string(data)?,
        OutputFormat::Plain => plain_fn(data),
    })
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

// ── Snapshot ─────────────────────────────────────────────────────────

#[derive(Tabled)]
struct ChannelRow {
    #[tabled(rename = "Channel")]
    channel: &'static str,
    #[tabled(rename = "Points")]
    points: usize,
    #[tabled(rename = "Latest ID")]
    latest_id: String,
    #[tabled(rename = "Latest Timestamp")]
    latest_timestamp: String,
}

/// Row with the highest numeric `id`, if any row carries one.
fn latest(points: &[DataPoint]) -> Option<&DataPoint> {
    points
        .iter()
        .filter_map(|p| p.field("id").and_then(serde_json::Value::as_i64).map(|id| (id, p)))
        .max_by_key(|(id, _)| *id)
        .map(|(_, p)| p)
}

/// A JSON field as display text: strings unquoted, null/missing empty.
pub fn field_text(point: &DataPoint, name: &str) -> String {
    match point.field(name) {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn snapshot_table(snapshot: &Snapshot) -> String {
    let rows: Vec<ChannelRow> = Channel::ALL
        .into_iter()
        .map(|channel| {
            let points = snapshot.points(channel);
            let newest = latest(points);
            ChannelRow {
                channel: channel.label(),
                points: points.len(),
                latest_id: newest.map(|p| field_text(p, "id")).unwrap_or_default(),
                latest_timestamp: newest
                    .map(|p| field_text(p, "timestamp"))
                    .unwrap_or_default(),
            }
        })
        .collect();
    render_table(&rows)
}

fn snapshot_plain(snapshot: &Snapshot) -> String {
    Channel::ALL
        .into_iter()
        .map(|channel| format!("{channel}\t{}", snapshot.len(channel)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_snapshot(format: OutputFormat, snapshot: &Snapshot) -> Result<String, CliError> {
    render_single(format, snapshot, snapshot_table, snapshot_plain)
}

// ── Sync status ──────────────────────────────────────────────────────

/// Serializable view of the store state for `watch`.
#[derive(Debug, Serialize)]
pub struct StatusView {
    pub mode: Mode,
    pub connection: ConnectionState,
    pub loading: bool,
    pub stale: bool,
    pub battery: usize,
    pub motor: usize,
    pub mppt: usize,
    pub vehicle: usize,
    pub retry_count: u32,
    pub max_retries: u32,
    pub last_fetch_at: Option<DateTime<Utc>>,
    /// Whole seconds since the last fetch.
    pub age_secs: Option<u64>,
    pub last_error: Option<SyncError>,
}

impl StatusView {
    pub fn from_state(state: &SyncState, max_retries: u32) -> Self {
        let current = &state.current;
        Self {
            mode: state.mode,
            connection: state.connection,
            loading: state.loading,
            stale: state.is_stale(),
            battery: current.len(Channel::Battery),
            motor: current.len(Channel::Motor),
            mppt: current.len(Channel::Mppt),
            vehicle: current.len(Channel::Vehicle),
            retry_count: state.retry_count,
            max_retries,
            last_fetch_at: state.last_fetch_at,
            age_secs: state.age().map(|age| age.as_secs()),
            last_error: state.last_error.clone(),
        }
    }

    /// One-line human summary.
    pub fn line(&self, color: bool) -> String {
        let mode = match (self.mode, color) {
            (Mode::Live, true) => "LIVE".green().bold().to_string(),
            (Mode::Paused, true) => "PAUSED".yellow().bold().to_string(),
            (Mode::Live, false) => "LIVE".into(),
            (Mode::Paused, false) => "PAUSED".into(),
        };
        let connection = match (self.connection, color) {
            (ConnectionState::Connected, true) => self.connection.green().to_string(),
            (ConnectionState::Errored, true) => self.connection.red().to_string(),
            (_, true) => self.connection.dimmed().to_string(),
            (_, false) => self.connection.to_string(),
        };

        let mut line = format!(
            "{mode} | {connection} | battery {} motor {} mppt {} vehicle {}",
            self.battery, self.motor, self.mppt, self.vehicle
        );

        match self.age_secs {
            Some(secs) => {
                let age = humantime::format_duration(std::time::Duration::from_secs(secs));
                line.push_str(&format!(" | age {age}"));
            }
            None => line.push_str(" | no data"),
        }
        if self.stale {
            line.push_str(" (stale)");
        }
        if self.loading {
            line.push_str(" | loading");
        }
        if self.retry_count > 0 {
            line.push_str(&format!(" | retry {}/{}", self.retry_count, self.max_retries));
        }
        if let Some(ref err) = self.last_error {
            let text = format!("error: {err}");
            if color {
                line.push_str(&format!(" | {}", text.red()));
            } else {
                line.push_str(&format!(" | {text}"));
            }
        }
        line
    }
}

pub fn render_status(
    format: OutputFormat,
    status: &StatusView,
    color: bool,
) -> Result<String, CliError> {
    // One record per line even when pretty JSON is requested.
    let format = match format {
        OutputFormat::Json => OutputFormat::JsonCompact,
        other => other,
    };
    render_single(format, status, |s| s.line(color), |s| s.line(false))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> Snapshot {
        Snapshot {
            battery_data: vec![
                DataPoint::new(json!({ "id": 7, "timestamp": "2024-05-01 10:00:00" })),
                DataPoint::new(json!({ "id": 9, "timestamp": "2024-05-01 10:00:02" })),
            ],
            vehicle_data: vec![DataPoint::new(json!({ "speed": 42 }))],
            ..Snapshot::default()
        }
    }

    #[test]
    fn latest_picks_highest_id() {
        let snapshot = sample();
        let newest = latest(&snapshot.battery_data).unwrap();
        assert_eq!(field_text(newest, "timestamp"), "2024-05-01 10:00:02");
        assert!(latest(&snapshot.vehicle_data).is_none());
    }

    #[test]
    fn field_text_formats_values() {
        let point = DataPoint::new(json!({ "a": "x", "b": 1.5, "c": null }));
        assert_eq!(field_text(&point, "a"), "x");
        assert_eq!(field_text(&point, "b"), "1.5");
        assert_eq!(field_text(&point, "c"), "");
        assert_eq!(field_text(&point, "missing"), "");
    }

    #[test]
    fn snapshot_plain_lists_every_channel() {
        let text = render_snapshot(OutputFormat::Plain, &sample()).unwrap();
        assert_eq!(text, "battery\t2\nmotor\t0\nmppt\t0\nvehicle\t1");
    }

    #[test]
    fn snapshot_table_has_channel_labels() {
        let text = render_snapshot(OutputFormat::Table, &sample()).unwrap();
        assert!(text.contains("Battery"));
        assert!(text.contains("MPPT"));
        assert!(text.contains("Latest Timestamp"));
    }

    #[test]
    fn status_line_without_color() {
        let status = StatusView {
            mode: Mode::Paused,
            connection: ConnectionState::Errored,
            loading: false,
            stale: true,
            battery: 2,
            motor: 0,
            mppt: 0,
            vehicle: 1,
            retry_count: 3,
            max_retries: 3,
            last_fetch_at: None,
            age_secs: Some(45),
            last_error: Some(SyncError::Server {
                message: "database unavailable".into(),
            }),
        };

        assert_eq!(
            status.line(false),
            "PAUSED | errored | battery 2 motor 0 mppt 0 vehicle 1 | age 45s (stale) \
             | retry 3/3 | error: database unavailable"
        );
    }
}
