//! # Worker State Management
//!
//! This module owns the state that lives across commands: configuration, the
//! denoising engine, and processing statistics. Unlike a web server, where
//! shared state needs `Arc<RwLock<T>>` so many request handlers can touch it
//! at once, this worker handles exactly one command at a time. That lets the
//! state be a plain struct passed `&mut` into the dispatch loop.
//!
//! ## Key Rust Concepts (IMPORTANT for beginners):
//!
//! ### Ownership instead of locking
//! - **Purpose**: The dispatch loop owns the state and lends it out per command
//! - **Why it works**: One command at a time means no concurrent access, ever
//! - **Benefit**: No lock guards to `.unwrap()` and no poisoning to recover from
//! - **Compile-time checked**: The borrow checker enforces exclusive access
//!
//! ### &mut references
//! - **&mut WorkerState**: Exclusive, mutable access for the duration of one command
//! - **Handlers borrow, never own**: The state outlives every individual command
//!
//! ## Why no global singleton:
//! A global mutable model object makes re-initialization and testing messy.
//! An explicit state value can be constructed fresh in every test and fed
//! through the same code paths production uses.

use crate::config::WorkerConfig;     // Our configuration types
use crate::denoise::DenoiseEngine;   // Model + device + inference pipeline
use crate::device;                   // Compute device selection
use serde::Serialize;                // Stats snapshots serialize into responses
use std::time::Instant;              // For tracking worker uptime
use tracing::info;                   // Structured logging

/// The state threaded through the dispatch loop.
///
/// ## Rust Concepts:
/// - **#[derive(Debug)]**: Allows printing with {:?} for debugging
/// - **pub struct**: Public struct that other modules can use
/// - **Instant**: A point in time (for measuring duration)
#[derive(Debug)]
pub struct WorkerState {
    /// Worker configuration loaded at startup
    pub config: WorkerConfig,

    /// The denoising engine: optional model, device, statistics
    pub engine: DenoiseEngine,

    /// When the worker started (never changes)
    pub start_time: Instant,
}

impl WorkerState {
    /// Create the worker state from loaded configuration.
    ///
    /// ## What this does:
    /// 1. Resolves the compute device from the configured preference
    ///    (this is why `health` can report the device before any `init`)
    /// 2. Creates an engine with no model loaded
    /// 3. Records the current time as the worker start time
    pub fn new(config: WorkerConfig) -> Self {
        let device = device::create_device_from_string(&config.device.preference);
        Self {
            engine: DenoiseEngine::new(device),
            config,
            start_time: Instant::now(),
        }
    }

    /// Get worker uptime in seconds.
    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// Cumulative processing statistics, serialized verbatim into responses.
///
/// ## Rust Concepts:
/// - **#[derive(Debug, Default, Clone, Serialize)]**: Automatically implements:
///   - `Debug`: Can be printed with {:?} for debugging
///   - `Default`: Creates an all-zero instance
///   - `Clone`: Snapshots copy into responses without moving the original
///   - `Serialize`: Converts straight to the wire JSON shape
///
/// ## Why these metrics matter:
/// - **total_processed / total_time / avg_time / max_time**: Throughput and
///   latency picture of the denoising pipeline
/// - **errors**: Inference failures (dispatch-level rejections do not count)
#[derive(Debug, Default, Clone, Serialize)]
pub struct ProcessingStats {
    /// Number of chunks denoised successfully since startup
    pub total_processed: u64,

    /// Cumulative successful processing time in milliseconds
    pub total_time: f64,

    /// Average processing time per chunk in milliseconds
    pub avg_time: f64,

    /// Longest single processing time in milliseconds
    pub max_time: f64,

    /// Number of failed processing attempts
    pub errors: u64,
}

impl ProcessingStats {
    /// Record one successful processing run.
    ///
    /// Updates the counters, recomputes the running average, and every 50th
    /// success emits a throughput summary so long-running workers leave a
    /// trace in the logs without flooding them.
    pub fn record_success(&mut self, elapsed_ms: f64) {
        self.total_processed += 1;
        self.total_time += elapsed_ms;
        self.avg_time = self.total_time / self.total_processed as f64;
        self.max_time = self.max_time.max(elapsed_ms);

        if self.total_processed % 50 == 0 {
            info!(
                "Processed {} chunks, avg={:.1}ms, max={:.1}ms",
                self.total_processed, self.avg_time, self.max_time
            );
        }
    }

    /// Record one failed processing run.
    pub fn record_failure(&mut self) {
        self.errors += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_average_math() {
        let mut stats = ProcessingStats::default();
        stats.record_success(10.0);
        stats.record_success(20.0);
        stats.record_success(30.0);

        assert_eq!(stats.total_processed, 3);
        assert_eq!(stats.total_time, 60.0);
        // The running average must always equal total / count
        assert_eq!(stats.avg_time, stats.total_time / stats.total_processed as f64);
        assert_eq!(stats.avg_time, 20.0);
    }

    #[test]
    fn test_stats_max_is_monotone() {
        let mut stats = ProcessingStats::default();
        stats.record_success(40.0);
        stats.record_success(5.0);
        assert_eq!(stats.max_time, 40.0);

        stats.record_success(80.0);
        assert_eq!(stats.max_time, 80.0);
    }

    #[test]
    fn test_failures_do_not_touch_success_counters() {
        let mut stats = ProcessingStats::default();
        stats.record_failure();
        stats.record_failure();

        assert_eq!(stats.errors, 2);
        assert_eq!(stats.total_processed, 0);
        assert_eq!(stats.total_time, 0.0);
        assert_eq!(stats.avg_time, 0.0);
    }

    #[test]
    fn test_stats_serialize_shape() {
        let stats = ProcessingStats::default();
        let value = serde_json::to_value(&stats).unwrap();
        // Exact wire field names
        for field in ["total_processed", "total_time", "avg_time", "max_time", "errors"] {
            assert!(value.get(field).is_some(), "missing field {}", field);
        }
    }
}
