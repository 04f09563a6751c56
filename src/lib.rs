// src/lib.rs
// UpgradeSage - breaking-change analysis between two refs of a git repository

#![cfg_attr(not(test), warn(clippy::unwrap_used, clippy::expect_used))]

pub mod analysis;
pub mod config;
pub mod error;
pub mod git;
pub mod llm;
pub mod pipeline;
pub mod usage;
pub mod utils;
pub mod web;

pub use error::{AnalysisError, FailureKind, Result, SageError};
