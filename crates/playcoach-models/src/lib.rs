//! Shared data models for PlayCoach.
//!
//! This crate provides Serde-serializable types for:
//! - The structured gameplay critique returned by the model
//! - Per-video ledger records and their lifecycle status
//! - Remote asset handles and lifecycle states
//! - Prompt parameters and video file naming rules

pub mod analysis;
pub mod asset;
pub mod error;
pub mod prompt;
pub mod record;
pub mod video;

// Re-export common types
pub use analysis::{render_analysis, MissedOpportunity, Mistake, RepeatedError, StructuredAnalysis};
pub use asset::{AssetHandle, AssetState};
pub use error::{ModelError, ModelResult};
pub use prompt::PromptSpec;
pub use record::{AnalysisRecord, AnalysisStatus};
pub use video::{is_allowed_video, sanitize_filename, video_mime_type, VIDEO_EXTENSIONS};
