//! # Audio Module
//!
//! Wire-format handling for the audio payloads that ride inside the JSON
//! protocol. Callers send and receive raw sample vectors; everything about
//! containers, resampling, or format conversion stays out of scope.
//!
//! ## Key Components:
//! - **Marshal**: base64 <-> little-endian f32 PCM codec, peak
//!   renormalization, output length forcing
//!
//! ## Audio Format Requirements:
//! - **Samples**: 32-bit IEEE 754 floats, nominal range [-1.0, 1.0]
//! - **Encoding**: Little-endian, base64 (standard alphabet) on the wire
//! - **Channels**: Mono (1 channel)

pub mod marshal;   // Wire codec and sample-vector shaping
