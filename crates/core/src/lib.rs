#![warn(clippy::all, missing_docs)]

//! Core lifecycle logic for Vibr.
//!
//! This crate turns game descriptions into generated code, keeps saved
//! projects in a durable store, animates a simplified preview, and packages
//! code for export. It has no UI of its own; frontends drive it through
//! [`LifecycleController`].

pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod generator;
pub mod models;
pub mod preview;
pub mod repository;
pub mod store;

pub use config::AppConfig;
pub use controller::{GenerationOutcome, GenerationTicket, LifecycleController};
pub use error::{LifecycleError, Result};
pub use export::Artifact;
pub use generator::GenerationClient;
pub use models::{Draft, GameRecord};
pub use preview::{Canvas, FrameOutcome, PreviewHandle, PreviewState, Surface};
pub use repository::Repository;
pub use store::{FileStore, KeyValueStore, MemoryStore};
