//! Face-tracked vertical reframing.
//!
//! Each frame of the selected window goes through the same steps: locate a
//! face, feed its horizontal center to a [`CropTracker`], cut a 9:16 window
//! around the smoothed center and resample it to the output size.

mod crop;
mod face;
mod frames;
mod onnx;
mod reframer;
mod tracker;
mod transform;

pub use crop::{crop_window, target_width};
pub use face::{CenterLocator, FaceDetection, FaceLocator};
pub use frames::{FfmpegFrameReader, FfmpegFrameWriter, FrameSink, FrameSource};
pub use onnx::{UltraFaceConfig, UltraFaceLocator};
pub use reframer::{run_reframe, ClipReframer, FfmpegReframer, ReframeRequest, ReframeStats};
pub use tracker::{CropTracker, DEFAULT_SMOOTHING_WINDOW};
pub use transform::FrameTransform;
