//! Clients for the OpenAI-compatible speech and chat endpoints (Groq).
//!
//! - [`GroqTranscriber`] uploads extracted audio and returns a timed [`Transcript`]
//! - [`GroqRanker`] asks a chat model for the single most engaging window
//!
//! Both sit behind traits so the pipeline can swap them for fakes.
//!
//! [`Transcript`]: vshort_models::Transcript

pub mod client;
pub mod config;
pub mod error;
pub mod ranking;
pub mod transcription;

pub use client::GroqClient;
pub use config::GroqConfig;
pub use error::{MlError, MlResult};
pub use ranking::{GroqRanker, SegmentRanker};
pub use transcription::{GroqTranscriber, Transcriber};
