//! # Configuration Management
//!
//! This module handles loading and managing worker configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with DENOISER_ prefix)
//! - Default values (built into the code)
//!
//! ## Key Rust Concepts Used:
//! - **Serde**: Serialization/deserialization library for converting between Rust structs and data formats
//! - **derive macros**: Automatically generate code for common traits (Debug, Clone, Serialize, Deserialize)
//! - **struct**: Custom data types that group related fields together
//! - **impl blocks**: Add methods to structs
//! - **Result<T, E>**: Error handling that forces you to handle potential failures
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (DENOISER_DEVICE, DENOISER_CACHE_DIR, etc.)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)

use anyhow::Result;              // Better error handling with context
use serde::{Deserialize, Serialize};  // For converting to/from TOML, JSON, etc.
use std::env;                    // For reading environment variables

/// Main worker configuration that contains all settings.
///
/// ## Rust Concepts:
/// - **#[derive(...)]**: Automatically implements common traits:
///   - `Debug`: Allows printing with {:?} for debugging
///   - `Clone`: Allows making copies of the struct
///   - `Serialize`: Can convert this struct to JSON, TOML, etc.
///   - `Deserialize`: Can create this struct from JSON, TOML, etc.
/// - **pub struct**: Public struct that other modules can use
/// - **pub fields**: Public fields that can be accessed directly
///
/// ## Why separate config structs:
/// Breaking configuration into logical groups (model, audio, device,
/// performance) makes it easier to understand and maintain as the worker grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub model: ModelConfig,
    pub audio: AudioConfig,
    pub device: DeviceConfig,
    pub performance: PerformanceConfig,
}

/// Denoising model sources on the Hugging Face Hub.
///
/// ## Fields:
/// - `primary_repo` / `primary_file`: First model the init chain tries (DNS64)
/// - `fallback_repo` / `fallback_file`: Second attempt if the primary fails (MetricGAN+)
/// - `cache_dir`: Optional override for the Hub download cache location
///
/// ## Why two models:
/// The primary model gives the best denoising quality; the fallback is a
/// lighter speech-enhancement model that keeps the worker usable when the
/// primary cannot be fetched or loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub primary_repo: String,
    pub primary_file: String,
    pub fallback_repo: String,
    pub fallback_file: String,
    pub cache_dir: Option<String>,
}

/// Audio stream settings.
///
/// ## Fields:
/// - `sample_rate`: Sample rate in Hz the caller is expected to send (the
///   worker neither resamples nor verifies it; this documents the contract
///   for operators and shows up in the startup log)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
}

/// Compute device selection.
///
/// ## Fields:
/// - `preference`: "auto" (CUDA when available), "cpu", or "cuda"
///
/// Unknown values degrade to "auto" with a warning instead of failing the
/// worker: a typo in a deploy manifest should not take the service down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub preference: String,
}

/// Performance tuning configuration.
///
/// ## Fields:
/// - `intra_threads`: ONNX Runtime intra-op thread count per inference call
///
/// ## Tuning guidelines:
/// - 1 keeps the whole process single-threaded (predictable CPU usage when
///   a parent runs several workers)
/// - Higher values speed up a single inference on big machines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    pub intra_threads: usize,  // usize = platform-specific unsigned integer (usually 64-bit)
}

/// Provides default configuration values.
///
/// ## Rust Concepts:
/// - **impl Default**: Implements the Default trait, which provides a `default()` method
/// - **Self**: Refers to the current type (WorkerConfig)
/// - **to_string()**: Converts string literals (&str) to owned String objects
///
/// ## Why defaults matter:
/// Default values ensure the worker can start even if no configuration file exists.
/// They also serve as documentation of reasonable starting values.
impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig {
                primary_repo: "facebook/denoiser-dns64".to_string(),     // DNS64 ONNX export
                primary_file: "dns64.onnx".to_string(),
                fallback_repo: "speechbrain/metricgan-plus-voicebank".to_string(),  // MetricGAN+ enhancement
                fallback_file: "metricgan_plus.onnx".to_string(),
                cache_dir: None,               // Use the hf-hub default cache
            },
            audio: AudioConfig {
                sample_rate: 16000,            // Speech models are trained at 16 kHz
            },
            device: DeviceConfig {
                preference: "auto".to_string(),  // CUDA when available, CPU otherwise
            },
            performance: PerformanceConfig {
                intra_threads: 1,              // Keep the worker fully single-threaded
            },
        }
    }
}

/// Implementation block for WorkerConfig - adds methods to the struct.
impl WorkerConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with DENOISER_
    /// 4. Handle special cases for DENOISER_DEVICE and DENOISER_CACHE_DIR
    ///
    /// ## Rust Concepts:
    /// - **Builder pattern**: Chain method calls to configure the config loader
    /// - **?**: Early return on error (if any step fails, return the error)
    /// - **env::var()**: Read environment variables, returns Result<String, VarError>
    /// - **if let Ok(...)**: Only execute if the environment variable exists
    ///
    /// ## Environment Variable Examples:
    /// - `DENOISER_DEVICE=cpu`: Force CPU inference
    /// - `DENOISER_CACHE_DIR=/var/cache/models`: Relocate the model cache
    /// - `DENOISER_DEVICE_PREFERENCE=cuda`: Generic prefixed override (section_key form)
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            // 1. Start with defaults - converts our Default impl to config format
            .add_source(config::Config::try_from(&WorkerConfig::default())?)
            // 2. Load from config.toml file (if it exists) - required(false) means "don't error if missing"
            .add_source(config::File::with_name("config").required(false))
            // 3. Load from environment variables with DENOISER_ prefix
            .add_source(config::Environment::with_prefix("DENOISER").separator("_"));

        // Direct overrides for the settings operators touch most. The generic
        // prefixed mapping cannot express multi-word field names like
        // cache_dir, so these get explicit handling.
        if let Ok(device) = env::var("DENOISER_DEVICE") {
            settings = settings.set_override("device.preference", device)?;
        }

        if let Ok(cache_dir) = env::var("DENOISER_CACHE_DIR") {
            settings = settings.set_override("model.cache_dir", cache_dir)?;
        }

        // Build the final configuration and convert it back to our WorkerConfig struct
        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Model repos and file names are not empty (the init chain needs them)
    /// - Sample rate is not 0
    /// - Intra-op thread count is not 0 (ONNX Runtime rejects it)
    ///
    /// ## Rust Concepts:
    /// - **&self**: Borrowed reference (read-only access to the struct)
    /// - **anyhow::anyhow!**: Creates an error with a custom message
    /// - **Early return**: Return immediately if validation fails
    ///
    /// ## Why validate:
    /// Catching configuration errors early prevents runtime failures and
    /// provides clear error messages about what's wrong.
    pub fn validate(&self) -> Result<()> {
        if self.model.primary_repo.is_empty() || self.model.primary_file.is_empty() {
            return Err(anyhow::anyhow!("Primary model repo and file cannot be empty"));
        }

        if self.model.fallback_repo.is_empty() || self.model.fallback_file.is_empty() {
            return Err(anyhow::anyhow!("Fallback model repo and file cannot be empty"));
        }

        if self.audio.sample_rate == 0 {
            return Err(anyhow::anyhow!("Audio sample rate must be greater than 0"));
        }

        if self.performance.intra_threads == 0 {
            return Err(anyhow::anyhow!("Intra-op thread count must be greater than 0"));
        }

        Ok(())  // All validation passed
    }
}

/// Tests for the configuration module.
///
/// ## Rust Concepts:
/// - **#[cfg(test)]**: Only compile this code when running tests
/// - **mod tests**: A module containing test functions
/// - **#[test]**: Marks a function as a test case
/// - **assert_eq!**: Checks that two values are equal
/// - **assert!**: Checks that a condition is true
/// - **is_ok(), is_err()**: Check if a Result is success or error
#[cfg(test)]
mod tests {
    use super::*;  // Import everything from the parent module

    /// Test that the default configuration is valid and has expected values.
    #[test]
    fn test_default_config() {
        let config = WorkerConfig::default();
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.device.preference, "auto");
        assert_eq!(config.performance.intra_threads, 1);
        // Ensure the default config passes validation
        assert!(config.validate().is_ok());
    }

    /// Test that validation catches invalid configurations.
    #[test]
    fn test_config_validation() {
        let mut config = WorkerConfig::default();
        config.model.primary_repo = String::new();  // Invalid: no repo to fetch
        assert!(config.validate().is_err());

        let mut config = WorkerConfig::default();
        config.audio.sample_rate = 0;  // Invalid sample rate
        assert!(config.validate().is_err());

        let mut config = WorkerConfig::default();
        config.performance.intra_threads = 0;  // ONNX Runtime would reject this
        assert!(config.validate().is_err());
    }

    /// Test that the default model chain is fully specified.
    #[test]
    fn test_default_model_chain() {
        let config = WorkerConfig::default();
        assert!(!config.model.primary_repo.is_empty());
        assert!(!config.model.fallback_repo.is_empty());
        // The two entries must differ, otherwise the fallback is pointless
        assert_ne!(config.model.primary_repo, config.model.fallback_repo);
    }
}
