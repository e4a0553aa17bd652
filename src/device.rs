//! # Device Detection and Management
//!
//! Handles automatic detection and selection of compute devices (CPU/GPU)
//! for ML inference, plus the accelerator probe used by the `gpu-check`
//! diagnostic. Provides fallback mechanisms and device availability
//! checking.

use crate::error::{AppError, AppResult};
use candle_core::{Device, DeviceLocation};
use std::sync::OnceLock;
use tracing::{debug, info};

/// Cached best available device to avoid repeated detection
static BEST_DEVICE: OnceLock<Device> = OnceLock::new();

/// Highest CUDA ordinal probed when counting devices.
const MAX_PROBE_ORDINALS: usize = 16;

/// Device preferences for model inference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevicePreference {
    /// Automatically select the best available device
    Auto,
    /// Force CPU usage
    Cpu,
    /// Force CUDA GPU usage (will fallback to CPU if not available)
    Cuda,
    /// Force Metal GPU usage (will fallback to CPU if not available)
    Metal,
}

impl std::str::FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" | "automatic" => Ok(DevicePreference::Auto),
            "cpu" => Ok(DevicePreference::Cpu),
            "cuda" | "gpu" => Ok(DevicePreference::Cuda),
            "metal" => Ok(DevicePreference::Metal),
            _ => Err(format!("Unknown device preference: {}", s)),
        }
    }
}

impl Default for DevicePreference {
    fn default() -> Self {
        DevicePreference::Auto
    }
}

/// Result of probing the CUDA runtime.
///
/// ## Invariant:
/// `device_count` and `device_name` are only populated when `available`
/// is true; an unavailable runtime is never queried further.
#[derive(Debug, Clone)]
pub struct AcceleratorReport {
    pub available: bool,
    pub device_count: usize,
    pub device_name: Option<String>,
}

/// Device detection and selection utilities
pub struct DeviceManager;

impl DeviceManager {
    /// Get the best available device based on preference
    pub fn get_device(preference: DevicePreference) -> Device {
        match preference {
            DevicePreference::Auto => Self::get_best_device(),
            DevicePreference::Cpu => Device::Cpu,
            DevicePreference::Cuda => Self::get_cuda_device().unwrap_or(Device::Cpu),
            DevicePreference::Metal => Self::get_metal_device().unwrap_or(Device::Cpu),
        }
    }

    /// Get the best available device (cached)
    pub fn get_best_device() -> Device {
        BEST_DEVICE.get_or_init(Self::detect_best_device).clone()
    }

    /// Detect the best available device
    fn detect_best_device() -> Device {
        info!("Detecting best available compute device...");

        // Try CUDA first (NVIDIA GPUs)
        if let Some(cuda_device) = Self::get_cuda_device() {
            info!("Selected CUDA GPU for ML inference");
            return cuda_device;
        }

        // Try Metal (Apple Silicon)
        if let Some(metal_device) = Self::get_metal_device() {
            info!("Selected Metal GPU for ML inference");
            return metal_device;
        }

        // Fallback to CPU
        info!("Using CPU for ML inference (no GPU acceleration available)");
        Device::Cpu
    }

    /// Try to get a CUDA device
    fn get_cuda_device() -> Option<Device> {
        match Device::new_cuda(0) {
            Ok(device) => {
                debug!("CUDA device 0 available");
                Some(device)
            }
            Err(e) => {
                debug!("CUDA not available: {}", e);
                None
            }
        }
    }

    /// Try to get a Metal device
    fn get_metal_device() -> Option<Device> {
        match Device::new_metal(0) {
            Ok(device) => {
                debug!("Metal device 0 available");
                Some(device)
            }
            Err(e) => {
                debug!("Metal not available: {}", e);
                None
            }
        }
    }

    /// Construct the device named by a configuration string.
    pub fn from_config_string(device_str: &str) -> AppResult<Device> {
        let preference = device_str
            .parse::<DevicePreference>()
            .map_err(AppError::Device)?;
        Ok(Self::get_device(preference))
    }

    /// Probe the CUDA runtime for the diagnostic report.
    ///
    /// ## Probe Process:
    /// 1. Try to construct device ordinal 0; failure means unavailable
    /// 2. Count devices by constructing ascending ordinals until one fails
    /// 3. Name device 0 from the identity the runtime exposes
    pub fn probe_cuda() -> AcceleratorReport {
        let first = match Device::new_cuda(0) {
            Ok(device) => device,
            Err(e) => {
                debug!("CUDA probe failed: {}", e);
                return AcceleratorReport {
                    available: false,
                    device_count: 0,
                    device_name: None,
                };
            }
        };

        let mut device_count = 1;
        for ordinal in 1..MAX_PROBE_ORDINALS {
            match Device::new_cuda(ordinal) {
                Ok(_) => device_count += 1,
                Err(_) => break,
            }
        }

        AcceleratorReport {
            available: true,
            device_count,
            device_name: Some(Self::describe_device(&first)),
        }
    }

    /// Get device information for logging/debugging
    pub fn describe_device(device: &Device) -> String {
        match device.location() {
            DeviceLocation::Cpu => "CPU".to_string(),
            DeviceLocation::Cuda { gpu_id } => {
                format!("NVIDIA CUDA GPU (ordinal {})", gpu_id)
            }
            DeviceLocation::Metal { gpu_id } => {
                format!("Metal GPU (ordinal {})", gpu_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_preference_parsing() {
        assert_eq!("auto".parse::<DevicePreference>().unwrap(), DevicePreference::Auto);
        assert_eq!("cpu".parse::<DevicePreference>().unwrap(), DevicePreference::Cpu);
        assert_eq!("cuda".parse::<DevicePreference>().unwrap(), DevicePreference::Cuda);
        assert_eq!("metal".parse::<DevicePreference>().unwrap(), DevicePreference::Metal);
        assert!("invalid".parse::<DevicePreference>().is_err());
    }

    #[test]
    fn test_device_manager_cpu_fallback() {
        // Should always work
        let device = DeviceManager::get_device(DevicePreference::Cpu);
        assert!(matches!(device, Device::Cpu));
    }

    #[test]
    fn test_describe_cpu_device() {
        let info = DeviceManager::describe_device(&Device::Cpu);
        assert_eq!(info, "CPU");
    }

    /// Without a CUDA build the probe must report unavailable and leave
    /// count/name unpopulated; with one it must report a named device.
    #[test]
    fn test_probe_report_invariant() {
        let report = DeviceManager::probe_cuda();
        if report.available {
            assert!(report.device_count >= 1);
            assert!(report.device_name.is_some());
        } else {
            assert_eq!(report.device_count, 0);
            assert!(report.device_name.is_none());
        }
    }
}
