//! Reward bookkeeping for training and evaluation runs.
//!
//! A [`RewardLog`] records every reward each agent received, one entry per step. The
//! helpers here summarise those logs the way the delivery-drone experiments report them:
//! mean reward, pickups (reward `1`) and crashes (reward `-1` or `-2`).

pub mod rewards;

pub use rewards::{
    cumulative_sum, default_window, is_crash, is_pickup, rolling_mean, summarize, RewardLog, RewardSummary,
};
