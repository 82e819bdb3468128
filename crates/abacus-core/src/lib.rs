//! Core types and trait definitions for the Abacus calculator service.
//!
//! This crate has no HTTP or database dependencies.
//! It owns the operation registry, request validation and evaluation, and the
//! storage abstraction every backend implements.

// Native `async fn` in traits (stable since Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod calculation;
pub mod error;
pub mod operation;
pub mod store;
pub mod user;

pub use error::{Error, Result};
