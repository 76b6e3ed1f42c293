//! # Denoising Engine
//!
//! Core processing engine that coordinates model lifecycle, the per-chunk
//! denoising pipeline, and statistics. The engine speaks sample vectors and
//! outcomes; wire formats live one layer up.
//!
//! ## Key Responsibilities:
//! - **Model lifecycle**: Initialize via the provider chain, replace on success
//! - **Denoising pipeline**: Renormalize, infer, force output length
//! - **Fail-soft processing**: Inference errors become outcomes, not panics
//! - **Performance monitoring**: Per-chunk timing feeds the running statistics

use crate::audio::marshal;
use crate::denoise::model::DenoiserModel;
use crate::denoise::providers::{self, ModelProvider};
use crate::device::Device;
use crate::state::ProcessingStats;
use anyhow::Result;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

/// Summary of a successful initialization, reported back to the caller.
#[derive(Debug, Clone)]
pub struct InitSummary {
    /// Wire identifier of the model family that loaded ("dns64" / "speechbrain_dns")
    pub model_type: &'static str,

    /// Wall time the initialization took, in seconds
    pub init_time_secs: f64,
}

/// Outcome of one processing request.
///
/// Every case maps onto a distinct response shape, so the protocol layer can
/// build exact wire envelopes without re-deriving what happened.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// No model has been initialized yet
    NotInitialized,

    /// The caller sent zero samples
    EmptyInput,

    /// Denoising succeeded
    Denoised {
        samples: Vec<f32>,
        processing_ms: f64,
    },

    /// Inference failed after `processing_ms`
    Failed {
        message: String,
        processing_ms: f64,
    },
}

/// The denoising engine: one optional model, a device, and statistics.
///
/// ## Resource Management:
/// - Holds at most one loaded model; re-initialization swaps it atomically
///   from the caller's perspective (a failed reload keeps the old model)
/// - No interior mutability: the dispatch loop owns the engine via state
///   and lends it out one command at a time
pub struct DenoiseEngine {
    /// Currently loaded model, None until the first successful `init`
    model: Option<DenoiserModel>,

    /// Device inference runs on, fixed at worker startup
    device: Device,

    /// Cumulative processing statistics
    stats: ProcessingStats,
}

// Session handles have no Debug, so summarize instead of deriving
impl fmt::Debug for DenoiseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DenoiseEngine")
            .field("model_loaded", &self.model.is_some())
            .field("device", &self.device)
            .field("stats", &self.stats)
            .finish()
    }
}

impl DenoiseEngine {
    /// Create an engine with no model loaded.
    pub fn new(device: Device) -> Self {
        Self {
            model: None,
            device,
            stats: ProcessingStats::default(),
        }
    }

    /// Initialize (or re-initialize) the model via a provider chain.
    ///
    /// ## Model Management:
    /// - Walks the providers in order; the first successful load wins
    /// - Replace-on-success: the old model is dropped only after the new one
    ///   is ready, so a failed re-initialization leaves the engine serving
    ///   with whatever it had before
    ///
    /// ## Returns:
    /// - **Ok(InitSummary)**: Which model family loaded and how long it took
    /// - **Err(anyhow::Error)**: Every provider failed
    pub fn initialize(
        &mut self,
        chain: &[Box<dyn ModelProvider>],
        intra_threads: usize,
    ) -> Result<InitSummary> {
        info!("Initializing denoising model on {}...", self.device.as_str());
        let start_time = Instant::now();

        let new_model = providers::load_first(chain, self.device, intra_threads)?;
        let model_type = new_model.kind().model_type();
        info!("Active model: {}", new_model.kind().description());
        self.model = Some(new_model);

        let init_time_secs = start_time.elapsed().as_secs_f64();
        info!("Model initialized in {:.2}s", init_time_secs);

        Ok(InitSummary {
            model_type,
            init_time_secs,
        })
    }

    /// Denoise one chunk of samples.
    ///
    /// ## Process:
    /// 1. Reject when no model is loaded or the input is empty
    /// 2. Renormalize out-of-range input by its peak
    /// 3. Run inference
    /// 4. Force the output length to the input length
    /// 5. Record timing into the statistics
    ///
    /// Inference failures are recorded and returned as `Failed`; the engine
    /// stays usable for the next request.
    pub fn process(&mut self, samples: &[f32]) -> ProcessOutcome {
        let Some(model) = self.model.as_mut() else {
            return ProcessOutcome::NotInitialized;
        };

        if samples.is_empty() {
            return ProcessOutcome::EmptyInput;
        }

        let start_time = Instant::now();

        let mut input = samples.to_vec();
        if let Some(peak) = marshal::renormalize_peak(&mut input) {
            debug!("Renormalized input by peak {:.3}", peak);
        }

        match model.denoise(&input) {
            Ok(denoised) => {
                let output = marshal::fit_length(denoised, samples.len());
                let processing_ms = start_time.elapsed().as_secs_f64() * 1000.0;
                self.stats.record_success(processing_ms);
                ProcessOutcome::Denoised {
                    samples: output,
                    processing_ms,
                }
            }
            Err(e) => {
                let processing_ms = start_time.elapsed().as_secs_f64() * 1000.0;
                self.stats.record_failure();
                ProcessOutcome::Failed {
                    message: e.to_string(),
                    processing_ms,
                }
            }
        }
    }

    /// Check whether a model is loaded and ready.
    pub fn is_initialized(&self) -> bool {
        self.model.is_some()
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn stats(&self) -> &ProcessingStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_engine_has_no_model() {
        let engine = DenoiseEngine::new(Device::Cpu);
        assert!(!engine.is_initialized());
        assert_eq!(engine.device(), Device::Cpu);
        assert_eq!(engine.stats().total_processed, 0);
    }

    #[test]
    fn test_process_before_init_is_rejected() {
        let mut engine = DenoiseEngine::new(Device::Cpu);
        let outcome = engine.process(&[0.1, 0.2, 0.3]);
        assert!(matches!(outcome, ProcessOutcome::NotInitialized));

        // Rejections happen before any work, so the statistics stay untouched
        assert_eq!(engine.stats().total_processed, 0);
        assert_eq!(engine.stats().errors, 0);
    }

    #[test]
    fn test_missing_model_wins_over_empty_input() {
        // The not-initialized check comes first, matching the response the
        // caller needs to act on (an empty chunk is useless until a model
        // exists anyway)
        let mut engine = DenoiseEngine::new(Device::Cpu);
        assert!(matches!(engine.process(&[]), ProcessOutcome::NotInitialized));
    }

    #[test]
    fn test_failed_init_reports_chain_error() {
        let mut engine = DenoiseEngine::new(Device::Cpu);
        let chain: Vec<Box<dyn ModelProvider>> = Vec::new();
        let err = engine.initialize(&chain, 1).unwrap_err();
        assert!(err.to_string().contains("Failed to load any denoising model"));
        assert!(!engine.is_initialized());
    }
}
