//! # Wire Protocol
//!
//! Types for the line-delimited JSON protocol: the loosely-typed command
//! envelope read from stdin and the exact response shapes written to stdout.
//!
//! ## Envelope philosophy:
//! Commands parse into optional fields rather than a tagged enum on purpose.
//! An unknown `command` value must produce an "Unknown command" response,
//! not a parse error, and a missing `audio` field must be distinguishable
//! from a present-but-invalid one. Responses, in contrast, are fully typed:
//! every field the caller sees is spelled out here.

use crate::state::ProcessingStats;
use serde::{Deserialize, Serialize};

/// One parsed stdin line.
///
/// Unknown fields are ignored so callers can extend their side first.
#[derive(Debug, Deserialize)]
pub struct CommandEnvelope {
    /// Which operation to run ("init", "process", "health")
    pub command: Option<String>,

    /// Accepted on `init` for compatibility; model selection is
    /// configuration-driven
    pub model_path: Option<String>,

    /// Base64 little-endian f32 samples for `process`
    pub audio: Option<String>,
}

/// Every response the worker can emit, exactly one per input line.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Response {
    Init(InitResponse),
    Process(ProcessResponse),
    Health(HealthResponse),
    Error(ErrorResponse),
}

/// Successful `init` response.
#[derive(Debug, Serialize)]
pub struct InitResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub device: &'static str,
    pub model_type: &'static str,
    /// Seconds the initialization took
    pub init_time: f64,
}

impl InitResponse {
    pub fn success(device: &'static str, model_type: &'static str, init_time: f64) -> Response {
        Response::Init(Self {
            status: "success",
            message: "Model initialized successfully",
            device,
            model_type,
            init_time,
        })
    }
}

/// `process` response, covering the success and fail-soft shapes.
///
/// The `audio` field is always serialized: it carries the denoised payload
/// on success, the caller's original payload on an inference failure, and
/// an explicit null on requests rejected before inference.
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub audio: Option<String>,
    /// Milliseconds spent processing (0 when rejected before inference)
    pub processing_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_samples: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_samples: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ProcessingStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessResponse {
    pub fn success(
        audio: String,
        processing_time: f64,
        input_samples: usize,
        output_samples: usize,
        stats: ProcessingStats,
    ) -> Response {
        Response::Process(Self {
            status: "success",
            message: None,
            audio: Some(audio),
            processing_time,
            input_samples: Some(input_samples),
            output_samples: Some(output_samples),
            stats: Some(stats),
            error: None,
        })
    }

    pub fn not_initialized() -> Response {
        Self::rejected("Model not initialized")
    }

    pub fn empty_audio() -> Response {
        Self::rejected("Empty audio data")
    }

    /// Fail-soft shape: echo the caller's audio so it can fall back to the
    /// unprocessed signal.
    pub fn failed(original_audio: String, processing_time: f64, error: String) -> Response {
        Response::Process(Self {
            status: "error",
            message: Some(format!("Audio processing failed: {}", error)),
            audio: Some(original_audio),
            processing_time,
            input_samples: None,
            output_samples: None,
            stats: None,
            error: Some(error),
        })
    }

    fn rejected(message: &str) -> Response {
        Response::Process(Self {
            status: "error",
            message: Some(message.to_string()),
            audio: None,
            processing_time: 0.0,
            input_samples: None,
            output_samples: None,
            stats: None,
            error: None,
        })
    }
}

/// `health` response. Never an error shape; see the health module.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub device: &'static str,
    pub stats: ProcessingStats,
    pub memory_usage: serde_json::Value,
}

/// Generic error envelope for dispatch-level failures.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Response {
        Response::Error(Self {
            status: "error",
            message: message.into(),
            error: None,
        })
    }

    /// Error envelope that also carries the underlying error detail.
    pub fn with_detail(message: impl Into<String>, detail: impl Into<String>) -> Response {
        Response::Error(Self {
            status: "error",
            message: message.into(),
            error: Some(detail.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_value(response: &Response) -> serde_json::Value {
        serde_json::to_value(response).unwrap()
    }

    #[test]
    fn test_envelope_tolerates_sparse_input() {
        let envelope: CommandEnvelope = serde_json::from_str(r#"{"command": "health"}"#).unwrap();
        assert_eq!(envelope.command.as_deref(), Some("health"));
        assert!(envelope.audio.is_none());
        assert!(envelope.model_path.is_none());

        // Missing command and unknown fields both parse
        let envelope: CommandEnvelope =
            serde_json::from_str(r#"{"something": 1, "audio": "AAAA"}"#).unwrap();
        assert!(envelope.command.is_none());
        assert_eq!(envelope.audio.as_deref(), Some("AAAA"));
    }

    #[test]
    fn test_init_success_shape() {
        let value = to_value(&InitResponse::success("cpu", "dns64", 1.25));
        assert_eq!(value["status"], "success");
        assert_eq!(value["message"], "Model initialized successfully");
        assert_eq!(value["device"], "cpu");
        assert_eq!(value["model_type"], "dns64");
        assert_eq!(value["init_time"], 1.25);
    }

    #[test]
    fn test_process_success_shape() {
        let value = to_value(&ProcessResponse::success(
            "QUJD".to_string(),
            12.5,
            3,
            3,
            ProcessingStats::default(),
        ));
        assert_eq!(value["status"], "success");
        assert_eq!(value["audio"], "QUJD");
        assert_eq!(value["input_samples"], 3);
        assert_eq!(value["output_samples"], 3);
        assert!(value.get("stats").is_some());
        // Success carries no message and no error detail
        assert!(value.get("message").is_none());
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_process_rejection_shape() {
        let value = to_value(&ProcessResponse::not_initialized());
        assert_eq!(value["status"], "error");
        assert_eq!(value["message"], "Model not initialized");
        // Audio is present as an explicit null, timing is zero
        assert!(value["audio"].is_null());
        assert_eq!(value["processing_time"], 0.0);
        assert!(value.get("stats").is_none());
        assert!(value.get("input_samples").is_none());

        let value = to_value(&ProcessResponse::empty_audio());
        assert_eq!(value["message"], "Empty audio data");
    }

    #[test]
    fn test_process_failure_echoes_audio() {
        let value = to_value(&ProcessResponse::failed(
            "b3JpZw==".to_string(),
            7.0,
            "shape mismatch".to_string(),
        ));
        assert_eq!(value["status"], "error");
        assert_eq!(value["message"], "Audio processing failed: shape mismatch");
        assert_eq!(value["audio"], "b3JpZw==");
        assert_eq!(value["error"], "shape mismatch");
        assert!(value.get("stats").is_none());
    }

    #[test]
    fn test_error_envelope_detail_is_optional() {
        let value = to_value(&ErrorResponse::new("Unknown command: stop"));
        assert_eq!(value["status"], "error");
        assert!(value.get("error").is_none());

        let value = to_value(&ErrorResponse::with_detail("Invalid JSON: boom", "boom"));
        assert_eq!(value["error"], "boom");
    }
}
