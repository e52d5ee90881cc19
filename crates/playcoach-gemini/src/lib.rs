//! Client for the remote video-understanding service.
//!
//! This crate provides:
//! - The `VideoService` trait the pipeline is written against
//! - `GeminiClient`, which implements it with the Gemini File API
//!   (resumable upload, status, listing, delete) and `generateContent`

pub mod client;
pub mod error;
pub mod service;
pub mod types;

pub use client::{GeminiClient, GeminiConfig};
pub use error::{GeminiError, GeminiResult};
pub use service::VideoService;
