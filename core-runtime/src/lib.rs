//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the playback engine:
//! - Logging and tracing infrastructure
//! - Engine configuration (capability injection)
//! - Playback event bus
//!
//! ## Overview
//!
//! The engine crates depend on this crate for their logging conventions,
//! the capabilities they run against, and the channel they report progress
//! on. Nothing here knows about segments or sessions.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
