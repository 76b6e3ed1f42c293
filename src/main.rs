//! # Denoiser Worker - Main Application Entry Point
//!
//! This is the main entry point for the denoiser-worker process.
//! It runs a long-lived command loop over standard input with the following
//! key features:
//!
//! ## Key Rust Concepts Used:
//! - **modules**: Code is organized into separate modules (mod statements)
//! - **Result<T, E>**: Error handling using Rust's Result type
//! - **Ownership**: The session state is owned here and lent to the loop,
//!   so no locks or shared-state wrappers are needed
//! - **Trait objects**: Model loading is abstracted behind a provider trait
//!
//! ## Application Architecture:
//! - **config**: Handles worker configuration (TOML file + environment variables)
//! - **state**: Owns the per-session state (engine, statistics, start time)
//! - **worker**: The stdin/stdout command loop
//! - **protocol**: Wire types for commands and responses
//! - **denoise**: ONNX model loading and inference
//! - **audio**: Base64 audio payload marshalling
//! - **device**: CPU/CUDA device selection
//! - **health**: Health snapshots for the health command
//! - **error**: Custom error types for the worker

// Module declarations - These tell Rust about our other source files
mod audio; // Audio payload marshalling (audio/ directory)
mod config; // Configuration management (config.rs)
mod denoise; // Model loading and inference (denoise/ directory)
mod device; // Device selection (device.rs)
mod error; // Error handling types (error.rs)
mod health; // Health snapshots (health.rs)
mod protocol; // Wire command and response types (protocol.rs)
mod state; // Session state management (state.rs)
mod worker; // The stdin/stdout command loop (worker.rs)

// External crate imports - These are dependencies from Cargo.toml
use anyhow::Result; // Better error handling with context
use config::WorkerConfig; // Our custom configuration struct
use state::WorkerState; // Our custom session state
use std::io; // Standard input/output handles
use tracing::info; // Structured logging
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt}; // Logging setup

/// The main worker entry point.
///
/// ## What this function does:
/// 1. **Loads configuration** from files and environment variables
/// 2. **Sets up logging** on stderr, keeping stdout clean for responses
/// 3. **Creates the session state** the command loop drives
/// 4. **Runs the command loop** until stdin reaches end-of-file
///
/// ## Key Rust Concepts:
/// - `fn main() -> Result<()>`: Returning an error here prints it and exits
///   with a non-zero status, which is how fatal failures are reported
/// - `?`: The question mark operator automatically returns early on error
/// - **Lock once**: stdin and stdout are locked for the whole process life,
///   since this worker is the only reader and writer
///
/// ## Error Handling:
/// Per-command problems never reach this function; they are answered on
/// stdout by the loop. Only startup failures and broken standard streams
/// land here and terminate the worker.
fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    // .ok() means "ignore errors" - it's fine if there's no .env file
    dotenv::dotenv().ok();

    // Set up structured logging (tracing) for debugging and monitoring
    // The ? operator means "if this fails, return the error immediately"
    init_tracing()?;

    // Load worker configuration from config.toml and environment variables
    let config = WorkerConfig::load()?;
    // Validate that the configuration makes sense (e.g., no empty repo names)
    config.validate()?;

    // Log startup information - these appear on stderr when the worker runs
    info!("Starting denoiser-worker v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: model={}, fallback={}, device preference={}, sample rate={} Hz",
        config.model.primary_repo,
        config.model.fallback_repo,
        config.device.preference,
        config.audio.sample_rate
    );

    // Create the session state the command loop will drive
    // The device is resolved once here; init loads the model onto it later
    let mut state = WorkerState::new(config);
    info!(
        "Worker ready on {} (model loads on the first init command)",
        state.engine.device().as_str()
    );

    // Lock the standard streams once for the lifetime of the process
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut output = stdout.lock();

    worker::run_loop(stdin.lock(), &mut output, &mut state)?;

    // End-of-file on stdin is the one clean shutdown path
    info!(
        "Input stream closed after {}s uptime, shutting down",
        state.get_uptime_seconds()
    );
    Ok(())
}

/// Initialize the tracing (logging) system for the worker.
///
/// ## What this does:
/// - Sets up structured logging that outputs to stderr
/// - Configures log levels (debug, info, warn, error)
/// - Reads log configuration from environment variables
///
/// ## Environment Variables:
/// - `RUST_LOG`: Controls what gets logged (e.g., "debug", "denoiser_worker=debug")
/// - If not set, defaults to "denoiser_worker=info"
///
/// ## Why stderr:
/// stdout carries exactly one JSON response per command, so every diagnostic
/// line has to go elsewhere or it would corrupt the protocol.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            // Try to read RUST_LOG environment variable, or use defaults
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "denoiser_worker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr)) // Format logs for stderr
        .init(); // Actually start the logging system

    Ok(())
}
