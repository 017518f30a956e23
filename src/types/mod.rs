//! Core types shared by the model runtime.
//!
//! - [`ModelConfig`]: Architecture parameters of the ONNX model ensemble

mod config;

pub use config::{ModelConfig, CODEBOOKS};
