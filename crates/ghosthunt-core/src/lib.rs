//! Core types, storage traits and the contest engine for Ghosthunt.
//!
//! The weekly "Hunters vs Ghosts" contest lives entirely in this crate. It is
//! free of HTTP and database dependencies; storage is reached through the
//! traits in [`store`], which `ghosthunt-store-sqlite` and [`memory`]
//! implement.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod config;
pub mod contest;
pub mod engine;
pub mod error;
pub mod geo;
pub mod memory;
pub mod notification;
pub mod store;
pub mod user;
pub mod window;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{Error, Result};
