//! Request handlers.

pub mod api_key;
pub mod health;
pub mod videos;

pub use api_key::*;
pub use health::*;
pub use videos::*;
