//! Shared types for the meshops toolkit.

pub mod types;
