//! `export`: battery and motor rows of a fresh pull as CSV.

use std::fmt::Write as _;

use telesync_core::{Channel, DataPoint, Snapshot, SyncStore};
use tracing::info;

use crate::cli::{ExportArgs, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, field_text};

const HEADER: &str = "Table,ID,Timestamp,Value1,Value2";

/// Channels included in the export with their two value columns.
const COLUMNS: [(Channel, &str, &str); 2] = [
    (Channel::Battery, "battery_volt", "battery_current"),
    (Channel::Motor, "motor_current", "motor_temp"),
];

pub async fn handle(
    store: &SyncStore,
    args: ExportArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let limit = args.limit.unwrap_or(store.config().default_limit);
    store.refresh(limit).await?;

    let csv = render_csv(&store.current());

    match args.out {
        Some(path) => {
            tokio::fs::write(&path, &csv).await?;
            info!(path = %path.display(), "exported CSV");
            if !global.quiet {
                eprintln!("Wrote {}", path.display());
            }
        }
        None => output::print_output(csv.trim_end(), global.quiet),
    }
    Ok(())
}

/// Render the export: header, then battery rows, then motor rows.
pub fn render_csv(snapshot: &Snapshot) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');

    for (channel, first, second) in COLUMNS {
        for point in snapshot.points(channel) {
            let _ = writeln!(
                out,
                "{},{},{},{},{}",
                channel.label(),
                cell(point, "id"),
                cell(point, "timestamp"),
                cell(point, first),
                cell(point, second),
            );
        }
    }
    out
}

/// One CSV cell, quoted when it contains a separator, quote or newline.
fn cell(point: &DataPoint, field: &str) -> String {
    let text = field_text(point, field);
    if text.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn exports_battery_then_motor_rows() {
        let snapshot = Snapshot {
            battery_data: vec![DataPoint::new(json!({
                "id": 3,
                "timestamp": "2024-05-01 10:00:00",
                "battery_volt": 51.2,
                "battery_current": -3.5
            }))],
            motor_data: vec![DataPoint::new(json!({
                "id": 8,
                "timestamp": "2024-05-01 10:00:01",
                "motor_current": 12,
                "motor_temp": 41.0
            }))],
            mppt_data: vec![DataPoint::new(json!({ "id": 1 }))],
            vehicle_data: vec![DataPoint::new(json!({ "id": 2 }))],
        };

        assert_eq!(
            render_csv(&snapshot),
            "Table,ID,Timestamp,Value1,Value2\n\
             Battery,3,2024-05-01 10:00:00,51.2,-3.5\n\
             Motor,8,2024-05-01 10:00:01,12,41.0\n"
        );
    }

    #[test]
    fn empty_snapshot_is_header_only() {
        assert_eq!(render_csv(&Snapshot::default()), "Table,ID,Timestamp,Value1,Value2\n");
    }

    #[test]
    fn missing_and_awkward_values() {
        let snapshot = Snapshot {
            battery_data: vec![DataPoint::new(json!({
                "id": 1,
                "timestamp": "May 1, 2024",
                "battery_volt": null
            }))],
            ..Snapshot::default()
        };

        assert_eq!(
            render_csv(&snapshot).lines().nth(1),
            Some("Battery,1,\"May 1, 2024\",,")
        );
    }
}
