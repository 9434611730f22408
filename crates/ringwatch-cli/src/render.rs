use anyhow::Result;
use ringwatch_core::{MonitorSnapshot, SampleRecord};

use crate::OutputFormat;

pub(crate) fn heart_rate_label(sample: &SampleRecord) -> String {
    format!("{} BPM", sample.heart_rate.round() as u32)
}

pub(crate) fn oxygen_label(sample: &SampleRecord) -> String {
    format!("{}%", sample.oxygen_level.round() as u32)
}

pub(crate) fn device_label(snapshot: &MonitorSnapshot) -> String {
    match &snapshot.device {
        Some(device) => format!("{} ({})", device.name, device.id),
        None => "none".to_string(),
    }
}

pub(crate) fn human_lines(snapshot: &MonitorSnapshot) -> Vec<String> {
    let current = &snapshot.current;
    let mut lines = vec![
        "=== Smart Ring Snapshot ===".to_string(),
        format!("Time:       {}", snapshot.ts.to_rfc3339()),
        format!("Device:     {}", device_label(snapshot)),
        format!(
            "State:      {} samples={} decode_errors={} skipped_ticks={} link_losses={}",
            snapshot.status,
            snapshot.quality.samples,
            snapshot.quality.decode_errors,
            snapshot.quality.skipped_ticks,
            snapshot.quality.link_losses,
        ),
        format!("Heart Rate: {}", heart_rate_label(current)),
        format!("Blood O2:   {}", oxygen_label(current)),
        format!("Sleep:      {}", current.sleep_phase),
        format!("Steps:      {}", current.steps),
        format!(
            "History:    {}/{}",
            snapshot.history.len(),
            snapshot.quality.capacity
        ),
    ];

    if !snapshot.history.is_empty() && !snapshot.status.is_connected() {
        lines.push(format!(
            "Note:       values are from {} (stale)",
            current.recorded_at.to_rfc3339()
        ));
    }

    lines
}

pub(crate) fn print_snapshot(snapshot: &MonitorSnapshot, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(snapshot)?);
        }
        OutputFormat::Ndjson => {
            println!("{}", serde_json::to_string(snapshot)?);
        }
        OutputFormat::Human => {
            for line in human_lines(snapshot) {
                println!("{line}");
            }
        }
    }

    Ok(())
}
