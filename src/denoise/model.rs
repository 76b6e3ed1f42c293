//! # Denoising Model Management
//!
//! Handles fetching and loading denoising models as ONNX sessions, and runs
//! single-utterance inference over them.
//!
//! ## Model Loading Process:
//! 1. Download the ONNX file from the HuggingFace Hub if not cached locally
//! 2. Build an ONNX Runtime session (optimization level 3, configured threads)
//! 3. Register the CUDA execution provider when the worker selected the GPU
//! 4. Read input/output tensor names from the session metadata
//!
//! ## Memory Management:
//! - Models are loaded on demand at `init` time
//! - Only one model is held at a time; a successful reload replaces it

use crate::device::Device;
use anyhow::{anyhow, Context, Result};
#[cfg(feature = "cuda")]
use ort::ep;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::{Session, SessionInputValue, SessionInputs};
use ort::value::Value;
use std::borrow::Cow;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// The denoising model families the worker knows how to serve.
///
/// ## Trade-offs:
/// - **Dns64**: Full denoiser, best quality, larger download
/// - **MetricGan**: Spectral-mask speech enhancement, lighter, the fallback
///   when DNS64 cannot be fetched or loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Dns64,
    MetricGan,
}

impl ModelKind {
    /// Identifier reported in `init` responses.
    pub fn model_type(&self) -> &'static str {
        match self {
            ModelKind::Dns64 => "dns64",
            ModelKind::MetricGan => "speechbrain_dns",
        }
    }

    /// Get a human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            ModelKind::Dns64 => "DNS64 denoiser, best quality",
            ModelKind::MetricGan => "MetricGAN+ speech enhancement, lightweight fallback",
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelKind::Dns64 => "dns64",
            ModelKind::MetricGan => "metricgan",
        };
        write!(f, "{}", name)
    }
}

/// A loaded denoising model ready for inference.
///
/// The ONNX graph is treated as opaque: the worker never inspects or defines
/// the architecture, it only feeds `[1, 1, N]` f32 tensors through whatever
/// input the session metadata names first.
#[derive(Debug)]
pub struct DenoiserModel {
    /// The ONNX Runtime session
    session: Session,

    /// Which model family this session serves
    kind: ModelKind,

    /// Input tensor name from session metadata
    input_name: String,

    /// Output tensor name from session metadata
    output_name: String,
}

impl DenoiserModel {
    /// Load a denoising model from the HuggingFace Hub.
    ///
    /// ## Parameters:
    /// - **kind**: Which model family this is (affects reporting only)
    /// - **repo** / **file**: Hub coordinates of the ONNX artifact
    /// - **cache_dir**: Optional cache override from configuration
    /// - **device**: Where inference should run
    /// - **intra_threads**: ONNX Runtime intra-op thread count
    ///
    /// ## Returns:
    /// - **Ok(DenoiserModel)**: Session built and metadata read
    /// - **Err(anyhow::Error)**: Download or session construction failed
    pub fn load(
        kind: ModelKind,
        repo: &str,
        file: &str,
        cache_dir: Option<&str>,
        device: Device,
        intra_threads: usize,
    ) -> Result<Self> {
        info!("Loading {} denoising model from {}...", kind, repo);
        let start_time = std::time::Instant::now();

        let model_path = fetch_model_file(repo, file, cache_dir)?;
        debug!("Model file resolved to {:?}", model_path);

        let mut builder = Session::builder()
            .map_err(|e| anyhow!("Failed to create session builder: {}", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| anyhow!("Failed to set optimization level: {}", e))?
            .with_intra_threads(intra_threads)
            .map_err(|e| anyhow!("Failed to set intra-op threads: {}", e))?;

        #[cfg(feature = "cuda")]
        if device.is_cuda() {
            debug!("Registering CUDA execution provider");
            builder = builder
                .with_execution_providers([ep::CUDA::default().build()])
                .map_err(|e| anyhow!("Failed to configure CUDA execution provider: {}", e))?;
        }

        let session = builder
            .commit_from_file(&model_path)
            .map_err(|e| anyhow!("Failed to load ONNX model {:?}: {}", model_path, e))?;

        let input_name = session
            .inputs()
            .first()
            .map(|input| input.name().to_string())
            .ok_or_else(|| anyhow!("Model reports no inputs"))?;
        let output_name = session
            .outputs()
            .first()
            .map(|output| output.name().to_string())
            .ok_or_else(|| anyhow!("Model reports no outputs"))?;
        debug!("Model tensors: input '{}', output '{}'", input_name, output_name);

        info!(
            "{} model loaded on {} in {:.2}s",
            kind,
            device.as_str(),
            start_time.elapsed().as_secs_f64()
        );

        Ok(Self {
            session,
            kind,
            input_name,
            output_name,
        })
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Run one utterance through the model.
    ///
    /// Takes a mono sample vector, feeds it as a `[1, 1, N]` tensor, and
    /// flattens whatever tensor comes back into a sample vector. The caller
    /// owns renormalization and length forcing.
    pub fn denoise(&mut self, samples: &[f32]) -> Result<Vec<f32>> {
        let input = ndarray::Array3::from_shape_vec((1, 1, samples.len()), samples.to_vec())
            .context("Failed to shape input tensor")?;
        let input_value =
            Value::from_array(input).map_err(|e| anyhow!("Failed to create input tensor: {}", e))?;

        let inputs: Vec<(Cow<'_, str>, SessionInputValue<'_>)> =
            vec![(Cow::Owned(self.input_name.clone()), input_value.into())];

        let outputs = self
            .session
            .run(SessionInputs::from(inputs))
            .map_err(|e| anyhow!("Inference failed: {}", e))?;

        let output_value = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| anyhow!("Model output '{}' missing from results", self.output_name))?;
        let output_array = output_value
            .try_extract_array::<f32>()
            .map_err(|e| anyhow!("Failed to extract output tensor: {}", e))?;

        // Logical-order iteration flattens [1, 1, N] (or any other rank the
        // graph emits) back into a plain sample vector
        Ok(output_array.iter().copied().collect())
    }
}

/// Resolve a model file through the Hub cache, downloading on a miss.
fn fetch_model_file(repo_id: &str, file: &str, cache_dir: Option<&str>) -> Result<PathBuf> {
    use hf_hub::api::sync::{Api, ApiBuilder};

    debug!("Hub environment:");
    debug!("  HF_TOKEN: {:?}", std::env::var("HF_TOKEN").map(|_| "***SET***"));
    debug!("  HF_HUB_CACHE: {:?}", std::env::var("HF_HUB_CACHE"));
    debug!("  HF_HOME: {:?}", std::env::var("HF_HOME"));

    let builder_result = {
        let mut builder = ApiBuilder::new();

        if let Ok(token) = std::env::var("HF_TOKEN") {
            builder = builder.with_token(Some(token));
        } else {
            builder = builder.with_token(None);
        }

        // Configured cache wins over the Hub's own environment conventions
        if let Some(dir) = cache_dir {
            debug!("Using configured cache dir: {}", dir);
            builder = builder.with_cache_dir(dir.into());
        } else if let Ok(cache) = std::env::var("HF_HUB_CACHE") {
            builder = builder.with_cache_dir(cache.into());
        } else if let Ok(hf_home) = std::env::var("HF_HOME") {
            builder = builder.with_cache_dir(PathBuf::from(hf_home).join("hub"));
        }

        builder = builder.with_progress(false);
        builder.build()
    };

    let api = match builder_result {
        Ok(api) => api,
        Err(e) => {
            warn!("ApiBuilder failed: {}, trying fallback to Api::new()", e);
            Api::new().map_err(|e2| {
                anyhow!(
                    "Both ApiBuilder and Api::new() failed. ApiBuilder error: {}. Api::new() error: {}",
                    e,
                    e2
                )
            })?
        }
    };

    let repo = api.model(repo_id.to_string());
    repo.get(file)
        .map_err(|e| anyhow!("Failed to download {} from {}: {}", file, repo_id, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_identifiers() {
        // These strings are part of the wire contract
        assert_eq!(ModelKind::Dns64.model_type(), "dns64");
        assert_eq!(ModelKind::MetricGan.model_type(), "speechbrain_dns");
    }

    #[test]
    fn test_model_kind_display() {
        assert_eq!(ModelKind::Dns64.to_string(), "dns64");
        assert_eq!(ModelKind::MetricGan.to_string(), "metricgan");
        assert!(!ModelKind::Dns64.description().is_empty());
        assert!(!ModelKind::MetricGan.description().is_empty());
    }
}
