//! Core type definitions used across the attachment workspace.

pub mod id;

pub use id::*;
