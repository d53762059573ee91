//! Core types and trait definitions for the landing report store.
//!
//! This crate has no database dependencies. It knows how to turn an upstream
//! eLandings document into normalized rows and declares the
//! [`store::LandingStore`] contract that storage backends implement.

// Native `async fn` in traits; silence the lint about `Send` bounds.
#![allow(async_fn_in_trait)]

pub mod document;
pub mod error;
pub mod report;
pub mod schema;
pub mod store;
pub mod sync;
pub mod xml;

pub use error::{Error, Result};
