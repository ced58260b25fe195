use crate::error::Result;
use crate::metrics::rewards::{cumulative_sum, default_window, rolling_mean, RewardLog, RewardSummary};
use crate::multi_agent::AgentId;

const MARKERS: [char; 8] = ['*', '+', 'o', 'x', '#', '@', '%', '&'];

/// One line of a multi-series plot; `None` points are not drawn
struct Series {
    label: String,
    values: Vec<Option<f32>>,
}

fn selected(log: &RewardLog, subset: Option<&[AgentId]>) -> Vec<(AgentId, Vec<f32>)> {
    log.iter()
        .filter(|(id, _)| subset.map_or(true, |ids| ids.contains(id)))
        .map(|(&id, rewards)| (id, rewards.clone()))
        .collect()
}

/// Plot the running total of each agent's rewards as ASCII art
///
/// The legend reports mean±std reward, pickup and crash rates per agent. `subset`
/// restricts the plot to some agents.
pub fn plot_cumulative_rewards(
    log: &RewardLog,
    subset: Option<&[AgentId]>,
    width: usize,
    height: usize,
) -> String {
    let series: Vec<Series> = selected(log, subset)
        .into_iter()
        .map(|(id, rewards)| {
            let summary = RewardSummary::from_rewards(&rewards);
            Series {
                label: format!(
                    "Drone {} - reward: {:.3}±{:.3}, pickup: {:.2}% ({}) crash: {:.2}% ({})",
                    id,
                    summary.mean,
                    summary.std,
                    100.0 * summary.pickup_rate,
                    summary.pickups,
                    100.0 * summary.crash_rate,
                    summary.crashes
                ),
                values: cumulative_sum(&rewards).into_iter().map(Some).collect(),
            }
        })
        .collect();

    plot_multi_series(&series, "Cumulative reward", "Step", None, width, height)
}

/// Plot the rolling mean of each agent's rewards as ASCII art
///
/// `window` defaults to a tenth of the longest selected log. `hline` draws a horizontal
/// target line.
pub fn plot_rolling_rewards(
    log: &RewardLog,
    window: Option<usize>,
    hline: Option<f32>,
    subset: Option<&[AgentId]>,
    width: usize,
    height: usize,
) -> Result<String> {
    let selection = selected(log, subset);
    let longest = selection.iter().map(|(_, rewards)| rewards.len()).max().unwrap_or(0);
    let window = window.unwrap_or_else(|| default_window(longest));

    let mut series = Vec::with_capacity(selection.len());
    for (id, rewards) in selection {
        let summary = RewardSummary::from_rewards(&rewards);
        series.push(Series {
            label: format!("Drone {} - pickup: {} crash: {}", id, summary.pickups, summary.crashes),
            values: rolling_mean(&rewards, window)?,
        });
    }

    let x_label = format!("Steps (rolling window: {})", window);
    Ok(plot_multi_series(&series, "Rewards", &x_label, hline, width, height))
}

/// Generic multi-series plotter
fn plot_multi_series(
    series: &[Series],
    title: &str,
    x_label: &str,
    hline: Option<f32>,
    width: usize,
    height: usize,
) -> String {
    if width < 10 || height < 5 {
        return format!("{}: Invalid dimensions", title);
    }
    let points = series.iter().map(|s| s.values.len()).max().unwrap_or(0);
    let defined = series.iter().flat_map(|s| s.values.iter().flatten().copied());
    let (mut min_val, mut max_val) = defined
        .chain(hline)
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if points == 0 || !min_val.is_finite() {
        return format!("{}: No reward data available", title);
    }
    if (max_val - min_val).abs() < f32::EPSILON {
        min_val -= 0.5;
        max_val += 0.5;
    }

    let mut plot = vec![vec![' '; width]; height];

    // Add axes
    for row in plot.iter_mut() {
        row[0] = '|';
    }
    for cell in plot[height - 1].iter_mut() {
        *cell = '-';
    }
    plot[height - 1][0] = '+';

    let y_span = (height - 2) as f32;
    let row_of = |value: f32| -> usize {
        let offset = ((value - min_val) / (max_val - min_val) * y_span).round() as usize;
        (height - 2).saturating_sub(offset)
    };
    let x_span = (width - 3) as f32;
    let col_of = |index: usize| -> usize {
        let fraction = if points > 1 { index as f32 / (points - 1) as f32 } else { 0.0 };
        ((fraction * x_span) as usize + 2).min(width - 1)
    };

    if let Some(target) = hline {
        let row = row_of(target);
        for cell in plot[row].iter_mut().skip(1) {
            *cell = '=';
        }
    }

    for (s, marker) in series.iter().zip(MARKERS.iter().cycle()) {
        for (i, value) in s.values.iter().enumerate() {
            if let Some(value) = value {
                plot[row_of(*value)][col_of(i)] = *marker;
            }
        }
    }

    // Build output string
    let mut output = format!("{}\n", title);
    output.push_str(&format!("Max: {:.3}\n", max_val));
    for row in plot.iter() {
        output.push_str(&row.iter().collect::<String>());
        output.push('\n');
    }
    output.push_str(&format!("Min: {:.3}\n", min_val));
    output.push_str(&format!("{} (1..{})\n", x_label, points));
    for (s, marker) in series.iter().zip(MARKERS.iter().cycle()) {
        output.push_str(&format!("  {} {}\n", marker, s.label));
    }
    if hline.is_some() {
        output.push_str("  = target value\n");
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log() -> RewardLog {
        let mut log = RewardLog::new();
        log.insert(0, vec![0.0, 1.0, 0.0, -1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        log.insert(1, vec![-2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        log
    }

    #[test]
    fn test_cumulative_legend() {
        let plot = plot_cumulative_rewards(&log(), None, 40, 10);
        assert!(plot.starts_with("Cumulative reward\n"));
        assert!(plot.contains("Drone 0 - reward: 0.200±0.600, pickup: 30.00% (3) crash: 10.00% (1)"));
        assert!(plot.contains("Drone 1 - reward: -0.100"));
        assert!(plot.contains("Step (1..10)"));
    }

    #[test]
    fn test_subset() {
        let plot = plot_cumulative_rewards(&log(), Some(&[1]), 40, 10);
        assert!(!plot.contains("Drone 0"));
        assert!(plot.contains("Drone 1"));
    }

    #[test]
    fn test_rolling_window_and_hline() {
        let plot = plot_rolling_rewards(&log(), None, Some(0.5), None, 40, 10).unwrap();
        assert!(plot.contains("Steps (rolling window: 1)"));
        assert!(plot.contains("Drone 0 - pickup: 3 crash: 1"));
        assert!(plot.contains("= target value"));
        assert!(plot.lines().any(|line| line.contains("====")));

        let plot = plot_rolling_rewards(&log(), Some(4), None, None, 40, 10).unwrap();
        assert!(plot.contains("Steps (rolling window: 4)"));
        assert!(plot_rolling_rewards(&log(), Some(0), None, None, 40, 10).is_err());
    }

    #[test]
    fn test_plot_dimensions() {
        let plot = plot_cumulative_rewards(&log(), None, 30, 8);
        let body: Vec<&str> = plot.lines().skip(2).take(8).collect();
        assert!(body.iter().all(|line| line.chars().count() == 30));
        assert!(body[7].starts_with('+'));
    }

    #[test]
    fn test_empty_log() {
        let plot = plot_cumulative_rewards(&RewardLog::new(), None, 40, 10);
        assert_eq!(plot, "Cumulative reward: No reward data available");
        assert!(plot_cumulative_rewards(&log(), None, 5, 10).contains("Invalid dimensions"));
    }
}
