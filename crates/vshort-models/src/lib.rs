//! Shared data models for the vshort pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Job identity, pipeline checkpoints and the pollable job status
//! - Transcripts, timed words and caption chunks
//! - The ranked viral segment and its validation
//! - Face boxes and crop windows used by reframing
//! - Output encoding configuration

pub mod caption;
pub mod encoding;
pub mod job;
pub mod job_status;
pub mod rect;
pub mod segment;
pub mod timestamp;
pub mod transcript;

pub use caption::{CaptionChunk, CaptionStyle, DEFAULT_CHUNK_SIZE};
pub use encoding::{EncodingConfig, OUTPUT_FPS, OUTPUT_HEIGHT, OUTPUT_WIDTH};
pub use job::{progress_for_step, JobId, PipelineStep, TOTAL_STEPS};
pub use job_status::{JobPhase, JobStatus};
pub use rect::{CropWindow, FaceBox};
pub use segment::{SegmentError, ViralSegment};
pub use transcript::{TimedWord, Transcript, TranscriptSegment};
