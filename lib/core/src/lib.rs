//! Core domain types and utilities for campaign-flow.
//!
//! This crate provides the identifiers and error handling shared by the
//! connection-rules engine and its front ends.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{EdgeId, NodeId};
