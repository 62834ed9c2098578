//! Error types for kernel loading, compute setup and per-frame dispatch.

use std::path::PathBuf;

use thiserror::Error;

/// The kernel source could not be produced.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error(
        "Could not open kernel file: {filename}. Current working directory: {}",
        .cwd.display()
    )]
    NotFound { filename: String, cwd: PathBuf },

    #[error("Could not read kernel file {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A step of compute setup failed. Compute stays unusable afterwards.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Failed to get platform: {0}")]
    Platform(String),

    #[error("Failed to get GPU device: {0}")]
    Device(String),

    #[error("Failed to create context: {0}")]
    Context(String),

    #[error("Failed to create command queue: {0}")]
    Queue(String),

    /// Carries the complete compiler output.
    #[error("Failed to build program")]
    Program { log: String },

    #[error("Failed to create kernel `{entry_point}`: {reason}")]
    KernelNotFound { entry_point: String, reason: String },

    #[error("Failed to create particle buffer: {0}")]
    BufferAllocation(String),
}

impl SetupError {
    pub fn code(&self) -> i32 {
        match self {
            SetupError::Source(_) => 1,
            SetupError::Platform(_) => 2,
            SetupError::Device(_) => 3,
            SetupError::Context(_) => 4,
            SetupError::Queue(_) => 5,
            SetupError::Program { .. } => 6,
            SetupError::KernelNotFound { .. } => 7,
            SetupError::BufferAllocation(_) => 8,
        }
    }
}

/// A step of the per-frame dispatch failed. The frame is skipped.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Compute context is not set up")]
    NotReady,

    #[error("Failed to set kernel argument: {0}")]
    SetArgument(String),

    #[error("Failed to enqueue kernel: {0}")]
    Enqueue(String),

    #[error("Failed waiting for kernel: {0}")]
    Finish(String),

    #[error("Failed to read buffer: {0}")]
    Readback(String),
}

impl DispatchError {
    pub fn code(&self) -> i32 {
        match self {
            DispatchError::NotReady => 20,
            DispatchError::SetArgument(_) => 21,
            DispatchError::Enqueue(_) => 22,
            DispatchError::Finish(_) => 23,
            DispatchError::Readback(_) => 24,
        }
    }
}
