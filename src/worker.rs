//! # Command Loop
//!
//! Reads line-delimited JSON commands from the input stream and writes exactly
//! one JSON response line per command, flushed immediately so a parent process
//! can correlate requests and responses by line order.
//!
//! ## Error Discipline:
//! - Per-command failures (malformed JSON, unknown commands, bad payloads)
//!   become error responses on the output stream and never break the loop
//! - Only transport failures (reading a line, writing a response) escape as
//!   errors and terminate the worker

use crate::audio::marshal;
use crate::denoise::{providers, ProcessOutcome};
use crate::error::WorkerResult;
use crate::health;
use crate::protocol::{CommandEnvelope, ErrorResponse, InitResponse, ProcessResponse, Response};
use crate::state::WorkerState;
use std::io::{BufRead, Write};
use tracing::{debug, error};

/// Drive the worker until the input stream closes.
///
/// Every input line, including blank ones, produces exactly one response line.
pub fn run_loop<R: BufRead, W: Write>(
    input: R,
    output: &mut W,
    state: &mut WorkerState,
) -> WorkerResult<()> {
    for line in input.lines() {
        let line = line?;
        let response = dispatch(line.trim(), state);
        write_response(output, &response)?;
    }
    Ok(())
}

/// Parse one line and route it to its handler.
fn dispatch(line: &str, state: &mut WorkerState) -> Response {
    let envelope: CommandEnvelope = match serde_json::from_str(line) {
        Ok(envelope) => envelope,
        Err(e) => return ErrorResponse::new(format!("Invalid JSON: {}", e)),
    };

    match envelope.command.as_deref() {
        Some("init") => handle_init(&envelope, state),
        Some("process") => handle_process(&envelope, state),
        Some("health") => health::build_health(state),
        other => ErrorResponse::new(format!("Unknown command: {}", other.unwrap_or("none"))),
    }
}

fn handle_init(envelope: &CommandEnvelope, state: &mut WorkerState) -> Response {
    // Model selection is configuration-driven; the field is accepted so
    // older callers keep working
    if let Some(path) = &envelope.model_path {
        debug!("Ignoring model_path override: {}", path);
    }

    let chain = providers::default_chain(&state.config.model);
    match state
        .engine
        .initialize(&chain, state.config.performance.intra_threads)
    {
        Ok(summary) => InitResponse::success(
            state.engine.device().as_str(),
            summary.model_type,
            summary.init_time_secs,
        ),
        Err(e) => ErrorResponse::with_detail(
            format!("Model initialization failed: {}", e),
            e.to_string(),
        ),
    }
}

fn handle_process(envelope: &CommandEnvelope, state: &mut WorkerState) -> Response {
    // Absent and empty-string payloads are the same caller mistake
    let audio_b64 = match envelope.audio.as_deref() {
        Some(audio) if !audio.is_empty() => audio,
        _ => return ErrorResponse::new("No audio data provided"),
    };

    let samples = match marshal::decode_samples(audio_b64) {
        Ok(samples) => samples,
        Err(e) => {
            return ErrorResponse::with_detail(format!("Audio decoding/encoding failed: {}", e), e)
        }
    };

    match state.engine.process(&samples) {
        ProcessOutcome::NotInitialized => ProcessResponse::not_initialized(),
        ProcessOutcome::EmptyInput => ProcessResponse::empty_audio(),
        ProcessOutcome::Denoised {
            samples: denoised,
            processing_ms,
        } => {
            let stats = state.engine.stats().clone();
            ProcessResponse::success(
                marshal::encode_samples(&denoised),
                processing_ms,
                samples.len(),
                denoised.len(),
                stats,
            )
        }
        // Fail-soft: the caller gets its original audio back
        ProcessOutcome::Failed {
            message,
            processing_ms,
        } => ProcessResponse::failed(marshal::encode_samples(&samples), processing_ms, message),
    }
}

/// Serialize and emit one response line.
///
/// A response that will not serialize still gets the caller an answer, as a
/// service error envelope. Only a broken output stream is fatal.
fn write_response<W: Write>(output: &mut W, response: &Response) -> WorkerResult<()> {
    let line = match serde_json::to_string(response) {
        Ok(line) => line,
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            serde_json::to_string(&ErrorResponse::new(format!("Service error: {}", e)))?
        }
    };
    writeln!(output, "{}", line)?;
    output.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;

    /// Feed input lines through a fresh worker and parse every response line.
    fn run(input: &str) -> Vec<serde_json::Value> {
        let mut state = WorkerState::new(WorkerConfig::default());
        let mut output = Vec::new();
        run_loop(input.as_bytes(), &mut output, &mut state).unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_health_command_roundtrip() {
        let responses = run("{\"command\": \"health\"}\n");
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["status"], "not_initialized");
        assert_eq!(responses[0]["model_loaded"], false);
        assert!(responses[0].get("memory_usage").is_some());
    }

    #[test]
    fn test_process_before_init_leaves_stats_untouched() {
        // "AAAAAA==" is four zero bytes, one f32 sample
        let responses = run(concat!(
            "{\"command\": \"process\", \"audio\": \"AAAAAA==\"}\n",
            "{\"command\": \"health\"}\n",
        ));
        assert_eq!(responses.len(), 2);

        assert_eq!(responses[0]["status"], "error");
        assert_eq!(responses[0]["message"], "Model not initialized");
        assert!(responses[0]["audio"].is_null());
        assert_eq!(responses[0]["processing_time"], 0.0);

        // Rejected requests never count as processing attempts
        assert_eq!(responses[1]["stats"]["total_processed"], 0);
        assert_eq!(responses[1]["stats"]["errors"], 0);
    }

    #[test]
    fn test_malformed_lines_do_not_break_the_loop() {
        let responses = run("this is not json\n\n{\"command\": \"health\"}\n");
        assert_eq!(responses.len(), 3);

        // Garbage and blank lines both answer with a JSON error envelope
        for response in &responses[..2] {
            assert_eq!(response["status"], "error");
            let message = response["message"].as_str().unwrap();
            assert!(message.starts_with("Invalid JSON:"), "got: {}", message);
        }
        assert_eq!(responses[2]["status"], "not_initialized");
    }

    #[test]
    fn test_unknown_and_missing_commands() {
        let responses = run(concat!(
            "{\"command\": \"shutdown\"}\n",
            "{\"audio\": \"AAAAAA==\"}\n",
        ));
        assert_eq!(responses[0]["message"], "Unknown command: shutdown");
        assert_eq!(responses[1]["message"], "Unknown command: none");
    }

    #[test]
    fn test_process_requires_audio() {
        let responses = run(concat!(
            "{\"command\": \"process\"}\n",
            "{\"command\": \"process\", \"audio\": \"\"}\n",
        ));
        for response in &responses {
            assert_eq!(response["status"], "error");
            assert_eq!(response["message"], "No audio data provided");
        }
    }

    #[test]
    fn test_process_rejects_undecodable_audio() {
        let responses = run(concat!(
            // Not base64 at all
            "{\"command\": \"process\", \"audio\": \"!!!\"}\n",
            // Valid base64 but two bytes, not a whole f32
            "{\"command\": \"process\", \"audio\": \"AAA=\"}\n",
        ));
        for response in &responses {
            assert_eq!(response["status"], "error");
            let message = response["message"].as_str().unwrap();
            assert!(
                message.starts_with("Audio decoding/encoding failed:"),
                "got: {}",
                message
            );
            assert!(response.get("error").is_some());
        }
    }
}
