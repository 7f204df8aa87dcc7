// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Compute device resolution for captioning backends
//!
//! An explicit override always wins. Otherwise the ONNX Runtime execution
//! providers are probed in priority order: CUDA, then CoreML (macOS only),
//! then CPU.

use std::fmt;
use std::str::FromStr;

use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, ExecutionProvider, ExecutionProviderDispatch,
};
#[cfg(target_os = "macos")]
use ort::execution_providers::CoreMLExecutionProvider;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::CaptionError;

/// Device a backend is placed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cuda,
    #[serde(rename = "coreml")]
    CoreMl,
    Cpu,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Cuda => "cuda",
            Device::CoreMl => "coreml",
            Device::Cpu => "cpu",
        }
    }

    /// Execution providers to register, most preferred first
    ///
    /// CPU is always appended so ONNX Runtime can place operators the
    /// accelerator does not support.
    pub fn execution_providers(&self) -> Vec<ExecutionProviderDispatch> {
        match self {
            Device::Cuda => vec![
                CUDAExecutionProvider::default().build(),
                CPUExecutionProvider::default().build(),
            ],
            #[cfg(target_os = "macos")]
            Device::CoreMl => vec![
                CoreMLExecutionProvider::default().build(),
                CPUExecutionProvider::default().build(),
            ],
            #[cfg(not(target_os = "macos"))]
            Device::CoreMl => vec![CPUExecutionProvider::default().build()],
            Device::Cpu => vec![CPUExecutionProvider::default().build()],
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Device {
    type Err = CaptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cuda" | "gpu" => Ok(Device::Cuda),
            // "mps" is accepted for parity with the PyTorch device names
            "coreml" | "mps" => Ok(Device::CoreMl),
            "cpu" => Ok(Device::Cpu),
            other => Err(CaptionError::InvalidInput(format!(
                "Unknown device '{}' (expected cuda, coreml or cpu)",
                other
            ))),
        }
    }
}

/// Pick the device to load backends on
pub fn resolve_device(explicit: Option<Device>) -> Device {
    if let Some(device) = explicit {
        info!("Using requested device: {}", device);
        return device;
    }

    let device = probe_device();
    info!("Auto-detected device: {}", device);
    device
}

fn probe_device() -> Device {
    match CUDAExecutionProvider::default().is_available() {
        Ok(true) => return Device::Cuda,
        Ok(false) => debug!("CUDA execution provider not available"),
        Err(e) => debug!("CUDA probe failed: {}", e),
    }

    #[cfg(target_os = "macos")]
    match CoreMLExecutionProvider::default().is_available() {
        Ok(true) => return Device::CoreMl,
        Ok(false) => debug!("CoreML execution provider not available"),
        Err(e) => debug!("CoreML probe failed: {}", e),
    }

    Device::Cpu
}
