use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::metrics::rewards::{summarize, RewardLog};

/// Export a reward log to CSV, one row per step and one column per agent
///
/// Agents with shorter logs leave their cells empty.
pub fn export_rewards_csv<P: AsRef<Path>>(log: &RewardLog, path: P) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);

    // Write header
    let header: Vec<String> = log.keys().map(|id| format!("drone_{}", id)).collect();
    writeln!(file, "step,{}", header.join(","))?;

    let steps = log.values().map(Vec::len).max().unwrap_or(0);
    for step in 0..steps {
        let cells: Vec<String> = log
            .values()
            .map(|rewards| rewards.get(step).map_or_else(String::new, |r| r.to_string()))
            .collect();
        writeln!(file, "{},{}", step + 1, cells.join(","))?;
    }

    file.flush()?;
    Ok(())
}

/// Export per-agent reward summaries in JSON format
pub fn export_summaries_json<P: AsRef<Path>>(log: &RewardLog, path: P) -> Result<()> {
    let json = serde_json::to_string_pretty(&summarize(log))?;
    std::fs::write(path, json)?;
    Ok(())
}
