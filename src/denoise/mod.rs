//! # Denoising Module
//!
//! Removes noise from speech audio using pretrained ONNX models via the ort
//! runtime. The graphs are opaque artifacts fetched from the HuggingFace Hub;
//! nothing in here defines or trains an architecture.
//!
//! ## Key Components:
//! - **Model Management**: Fetching and loading ONNX denoising models
//! - **Provider Chain**: Ordered load strategies, first success wins
//! - **Denoise Engine**: Sample-vector in, denoised sample-vector out
//!
//! ## Model Families:
//! - **dns64**: Full denoiser, best quality, tried first
//! - **metricgan**: MetricGAN+ speech enhancement, lightweight fallback
//!
//! ## ONNX Runtime Integration:
//! Uses ort sessions instead of an in-process ML framework for:
//! - Opaque model artifacts (no architecture code to maintain)
//! - One runtime for every model family
//! - CPU by default, CUDA via execution-provider registration

pub mod engine;      // Denoising pipeline and statistics
pub mod model;       // ONNX model loading and inference
pub mod providers;   // Ordered model load strategies

pub use engine::{DenoiseEngine, InitSummary, ProcessOutcome};
