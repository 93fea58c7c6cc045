//! Core types and trait definitions for faceroll.
//!
//! This crate is deliberately free of HTTP, image-decoding and database
//! dependencies. It holds the descriptor matcher, the overlay placement
//! geometry, and the traits behind which the external collaborators (face
//! detector, descriptor store, attendance recorder) are plugged in.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod attendance;
pub mod descriptor;
pub mod detection;
pub mod detector;
pub mod error;
pub mod identity;
pub mod matcher;
pub mod overlay;
pub mod store;

pub use error::{Error, Result};
