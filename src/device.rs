//! # Device Detection and Management
//!
//! Handles automatic detection and selection of compute devices (CPU/GPU) for ML inference.
//! Provides fallback mechanisms and device availability checking.

#[cfg(feature = "cuda")]
use ort::ep::{self, ExecutionProvider};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Cached best available device to avoid repeated detection
static BEST_DEVICE: OnceLock<Device> = OnceLock::new();

/// Compute device a model session runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda,
}

impl Device {
    /// Name used in wire responses ("cpu" / "cuda")
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
        }
    }

    pub fn is_cuda(&self) -> bool {
        matches!(self, Device::Cuda)
    }
}

/// Device preferences for model inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePreference {
    /// Automatically select the best available device
    #[default]
    Auto,
    /// Force CPU usage
    Cpu,
    /// Force CUDA GPU usage (will fallback to CPU if not available)
    Cuda,
}

impl std::str::FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" | "automatic" => Ok(DevicePreference::Auto),
            "cpu" => Ok(DevicePreference::Cpu),
            "cuda" | "gpu" => Ok(DevicePreference::Cuda),
            _ => Err(format!("Unknown device preference: {}", s)),
        }
    }
}

/// Device detection and selection utilities
pub struct DeviceManager;

impl DeviceManager {
    /// Get the best available device based on preference
    pub fn get_device(preference: DevicePreference) -> Device {
        match preference {
            DevicePreference::Auto => Self::get_best_device(),
            DevicePreference::Cpu => Device::Cpu,
            DevicePreference::Cuda => {
                if Self::is_cuda_available() {
                    Device::Cuda
                } else {
                    warn!("CUDA requested but not available, falling back to CPU");
                    Device::Cpu
                }
            }
        }
    }

    /// Get the best available device (cached)
    pub fn get_best_device() -> Device {
        *BEST_DEVICE.get_or_init(Self::detect_best_device)
    }

    /// Detect the best available device
    fn detect_best_device() -> Device {
        info!("Detecting best available compute device...");

        // Try CUDA first (NVIDIA GPUs)
        if Self::is_cuda_available() {
            info!("Selected CUDA GPU for ML inference");
            return Device::Cuda;
        }

        // Fallback to CPU
        info!("Using CPU for ML inference (no GPU acceleration available)");
        Device::Cpu
    }

    /// Check whether the CUDA execution provider can be registered
    #[cfg(feature = "cuda")]
    pub fn is_cuda_available() -> bool {
        match ep::CUDA::default().is_available() {
            Ok(true) => {
                debug!("CUDA execution provider available");
                true
            }
            Ok(false) => {
                debug!("CUDA execution provider not available");
                false
            }
            Err(e) => {
                debug!("CUDA availability probe failed: {}", e);
                false
            }
        }
    }

    /// Check whether the CUDA execution provider can be registered
    ///
    /// The provider is only compiled in when the `cuda` feature is enabled,
    /// so in this build registration can never succeed.
    #[cfg(not(feature = "cuda"))]
    pub fn is_cuda_available() -> bool {
        debug!("CUDA execution provider not compiled in (build with the `cuda` feature)");
        false
    }
}

/// Create a device based on string preference with fallback
pub fn create_device_from_string(device_str: &str) -> Device {
    match device_str.parse::<DevicePreference>() {
        Ok(preference) => DeviceManager::get_device(preference),
        Err(_) => {
            warn!("Invalid device preference '{}', using auto", device_str);
            DeviceManager::get_best_device()
        }
    }
}
