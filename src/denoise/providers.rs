//! # Model Provider Chain
//!
//! `init` never loads one hardcoded model. It walks an ordered list of
//! provider strategies and keeps the first model that loads, so a broken or
//! unreachable primary degrades to the fallback instead of failing the
//! worker. Only when every provider fails does `init` report an error.

use crate::config::ModelConfig;
use crate::denoise::model::{DenoiserModel, ModelKind};
use crate::device::Device;
use anyhow::{anyhow, Result};
use tracing::{info, warn};

/// A strategy for producing a ready-to-use denoising model.
pub trait ModelProvider {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Attempt to produce a loaded model.
    fn load(&self, device: Device, intra_threads: usize) -> Result<DenoiserModel>;
}

/// Loads a denoising model from a HuggingFace Hub repository.
pub struct HubModelProvider {
    kind: ModelKind,
    repo: String,
    file: String,
    cache_dir: Option<String>,
}

impl HubModelProvider {
    pub fn new(kind: ModelKind, repo: &str, file: &str, cache_dir: Option<&str>) -> Self {
        Self {
            kind,
            repo: repo.to_string(),
            file: file.to_string(),
            cache_dir: cache_dir.map(|dir| dir.to_string()),
        }
    }
}

impl ModelProvider for HubModelProvider {
    fn name(&self) -> &'static str {
        match self.kind {
            ModelKind::Dns64 => "dns64-hub",
            ModelKind::MetricGan => "metricgan-hub",
        }
    }

    fn load(&self, device: Device, intra_threads: usize) -> Result<DenoiserModel> {
        DenoiserModel::load(
            self.kind,
            &self.repo,
            &self.file,
            self.cache_dir.as_deref(),
            device,
            intra_threads,
        )
    }
}

/// Build the default chain from configuration: DNS64 first, MetricGAN+ fallback.
pub fn default_chain(config: &ModelConfig) -> Vec<Box<dyn ModelProvider>> {
    vec![
        Box::new(HubModelProvider::new(
            ModelKind::Dns64,
            &config.primary_repo,
            &config.primary_file,
            config.cache_dir.as_deref(),
        )),
        Box::new(HubModelProvider::new(
            ModelKind::MetricGan,
            &config.fallback_repo,
            &config.fallback_file,
            config.cache_dir.as_deref(),
        )),
    ]
}

/// Walk the chain in order; the first provider that loads wins.
pub fn load_first(
    providers: &[Box<dyn ModelProvider>],
    device: Device,
    intra_threads: usize,
) -> Result<DenoiserModel> {
    let mut last_error = anyhow!("No model providers configured");

    for provider in providers {
        info!("Trying model provider '{}'", provider.name());
        match provider.load(device, intra_threads) {
            Ok(model) => return Ok(model),
            Err(e) => {
                warn!("Provider '{}' failed: {}", provider.name(), e);
                last_error = e;
            }
        }
    }

    Err(anyhow!("Failed to load any denoising model: {}", last_error))
}
