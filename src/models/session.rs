//! ONNX Runtime session construction.
//!
//! Maps the configured [`Device`] onto execution providers and builds
//! sessions with a shared provider list and thread count.

use std::path::Path;

use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, CoreMLExecutionProvider,
    ExecutionProviderDispatch,
};
use ort::session::Session;

use crate::config::Device;
use crate::error::{AudioGenError, Result};

/// Session settings shared by every model in the ensemble.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Execution providers in priority order. Empty means ONNX Runtime's default.
    pub providers: Vec<ExecutionProviderDispatch>,
    /// Intra-op thread count. `None` keeps the runtime default.
    pub threads: Option<u32>,
}

impl SessionOptions {
    /// Builds options for a device and optional thread count.
    pub fn new(device: Device, threads: Option<u32>) -> Self {
        Self {
            providers: execution_providers(device),
            threads,
        }
    }
}

/// Returns the execution providers to try for `device`, in priority order.
///
/// ONNX Runtime skips providers that are unavailable on this machine, so
/// every list ends with the CPU provider.
pub fn execution_providers(device: Device) -> Vec<ExecutionProviderDispatch> {
    match device {
        Device::Auto => vec![
            CUDAExecutionProvider::default().build(),
            CoreMLExecutionProvider::default().build(),
            CPUExecutionProvider::default().build(),
        ],
        Device::Cpu => vec![CPUExecutionProvider::default().build()],
        Device::Cuda => vec![
            CUDAExecutionProvider::default().build(),
            CPUExecutionProvider::default().build(),
        ],
        Device::CoreMl => vec![
            CoreMLExecutionProvider::default().build(),
            CPUExecutionProvider::default().build(),
        ],
    }
}

/// Loads one ONNX graph from `path`.
pub fn load_session(path: &Path, options: &SessionOptions) -> Result<Session> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mut builder = Session::builder()
        .map_err(|e| AudioGenError::model_load_failed(format!("Failed to create session: {}", e)))?;

    if !options.providers.is_empty() {
        builder = builder
            .with_execution_providers(options.providers.to_vec())
            .map_err(|e| {
                AudioGenError::model_load_failed(format!(
                    "Failed to set execution providers: {}",
                    e
                ))
            })?;
    }

    if let Some(threads) = options.threads {
        builder = builder.with_intra_threads(threads as usize).map_err(|e| {
            AudioGenError::model_load_failed(format!("Failed to set thread count: {}", e))
        })?;
    }

    builder.commit_from_file(path).map_err(|e| {
        AudioGenError::model_load_failed(format!("Failed to load {}: {}", file_name, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_device_falls_back_to_cpu() {
        assert_eq!(execution_providers(Device::Cpu).len(), 1);
        assert_eq!(execution_providers(Device::Cuda).len(), 2);
        assert_eq!(execution_providers(Device::CoreMl).len(), 2);
        assert_eq!(execution_providers(Device::Auto).len(), 3);
    }

    #[test]
    fn missing_graph_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let options = SessionOptions::new(Device::Cpu, Some(1));
        let err = load_session(&dir.path().join("absent.onnx"), &options).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ModelLoadFailed);
    }
}
