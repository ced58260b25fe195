//! # Activation Functions Module
//!
//! Element-wise non-linearities used by the Q-network layers. Every function works on
//! arrays of any dimension, so the same activation serves dense `(batch, features)`
//! outputs and convolutional `(batch, channels, height, width)` feature maps.
//!
//! - **ReLU**: `max(0, x)`, used after every hidden layer
//! - **Linear**: identity, used on the output layer producing Q-values

pub mod functions;

pub use functions::Activation;
