#![deny(missing_docs)]
//! Whisper relay core library.
//!
//! Relay pipeline, admission gate and the remote transcription client,
//! independent of any messaging platform.

/// Configuration management.
pub mod config;
/// Attachment relay pipeline.
pub mod relay;
/// Remote transcription service client.
pub mod transcription;
/// Utility functions.
pub mod utils;

#[cfg(test)]
pub mod testing;
