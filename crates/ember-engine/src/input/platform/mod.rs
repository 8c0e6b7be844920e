//! Platform adapters for the input layer.

pub mod winit;
