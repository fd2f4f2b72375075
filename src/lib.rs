//! Scenegen - semantic scenario-generation service
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod engine;
pub mod semantic;
pub mod server;
