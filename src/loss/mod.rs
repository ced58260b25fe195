//! Loss functions for value regression

pub mod functions;

pub use functions::{Loss, Mse};
