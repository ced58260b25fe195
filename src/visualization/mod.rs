//! Text rendering and export of reward logs.
//!
//! Plots are plain ASCII so they work in a terminal or a log file.

pub mod export;
pub mod text_plots;

pub use export::{export_rewards_csv, export_summaries_json};
pub use text_plots::{plot_cumulative_rewards, plot_rolling_rewards};
