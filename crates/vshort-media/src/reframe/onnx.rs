//! Face detection using an UltraFace (RFB-320) ONNX model.
//!
//! The model takes a 320x240 RGB image normalized as `(p - 127) / 128` in
//! NCHW layout and returns:
//! - `scores`: `[1, N, 2]` background/face probabilities
//! - `boxes`: `[1, N, 4]` normalized `x1, y1, x2, y2` corners

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array2;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};
use vshort_models::FaceBox;

use super::face::{FaceDetection, FaceLocator};
use crate::error::{MediaError, MediaResult};

/// Configuration for the UltraFace detector.
#[derive(Debug, Clone)]
pub struct UltraFaceConfig {
    /// Path to ONNX model file
    pub model_path: PathBuf,
    /// Minimum face probability
    pub confidence_threshold: f32,
    pub input_width: u32,
    pub input_height: u32,
}

impl Default for UltraFaceConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/face/version-RFB-320.onnx"),
            confidence_threshold: 0.5,
            input_width: 320,
            input_height: 240,
        }
    }
}

/// A candidate face with its probability.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ScoredFace {
    face: FaceBox,
    confidence: f32,
}

/// [`FaceLocator`] backed by ONNX Runtime.
///
/// When several faces are present the most confident one is followed.
pub struct UltraFaceLocator {
    session: Mutex<Session>,
    config: UltraFaceConfig,
}

impl UltraFaceLocator {
    /// Load the model. Fails with `ModelNotFound` when the file is missing.
    pub fn new(config: UltraFaceConfig) -> MediaResult<Self> {
        if !config.model_path.exists() {
            return Err(MediaError::model_not_found(
                config.model_path.to_string_lossy(),
            ));
        }

        let session = Mutex::new(create_session(&config.model_path)?);
        info!(
            model_path = %config.model_path.display(),
            confidence = config.confidence_threshold,
            "Face detector initialized"
        );

        Ok(Self { session, config })
    }

    pub fn config(&self) -> &UltraFaceConfig {
        &self.config
    }

    fn preprocess(&self, frame: &RgbImage) -> MediaResult<Value> {
        let (w, h) = (self.config.input_width, self.config.input_height);
        let resized = image::imageops::resize(frame, w, h, FilterType::Triangle);

        let (w, h) = (w as usize, h as usize);
        let mut chw_data: Vec<f32> = Vec::with_capacity(3 * h * w);
        for c in 0..3 {
            for y in 0..h {
                for x in 0..w {
                    let pixel = resized.get_pixel(x as u32, y as u32);
                    chw_data.push((f32::from(pixel[c]) - 127.0) / 128.0);
                }
            }
        }

        let shape = vec![1usize, 3, h, w];
        Tensor::from_array((shape, chw_data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| MediaError::detection_failed(format!("Failed to create tensor: {}", e)))
    }

    fn run_inference(&self, input: Value) -> MediaResult<(Vec<f32>, Vec<f32>)> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| MediaError::internal("Session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| MediaError::detection_failed(format!("ONNX inference failed: {}", e)))?;

        let extract = |name: &str| -> MediaResult<Vec<f32>> {
            let output = outputs
                .get(name)
                .ok_or_else(|| MediaError::detection_failed(format!("Missing {} tensor", name)))?;
            let tensor = output.try_extract_tensor::<f32>().map_err(|e| {
                MediaError::detection_failed(format!("Failed to extract {}: {}", name, e))
            })?;
            Ok(tensor.1.iter().copied().collect())
        };

        Ok((extract("scores")?, extract("boxes")?))
    }
}

impl FaceLocator for UltraFaceLocator {
    fn locate(&self, frame: &RgbImage) -> MediaResult<FaceDetection> {
        let input = self.preprocess(frame)?;
        let (scores, boxes) = self.run_inference(input)?;
        let best = best_face(&scores, &boxes, self.config.confidence_threshold)?;

        debug!(
            confidence = best.map(|b| b.confidence),
            "Face detection completed"
        );

        Ok(best
            .map(|b| FaceDetection::Found(b.face))
            .unwrap_or(FaceDetection::NoFace))
    }

    fn name(&self) -> &'static str {
        "ultraface"
    }
}

/// Most confident face in the raw model outputs, if any clears the threshold.
fn best_face(
    scores: &[f32],
    boxes: &[f32],
    confidence_threshold: f32,
) -> MediaResult<Option<ScoredFace>> {
    let num_boxes = scores.len() / 2;
    if scores.len() % 2 != 0 || boxes.len() != num_boxes * 4 {
        return Err(MediaError::detection_failed(format!(
            "Unexpected output sizes: scores {}, boxes {}",
            scores.len(),
            boxes.len()
        )));
    }

    let scores = Array2::from_shape_vec((num_boxes, 2), scores.to_vec())
        .map_err(|e| MediaError::detection_failed(format!("Failed to reshape scores: {}", e)))?;
    let boxes = Array2::from_shape_vec((num_boxes, 4), boxes.to_vec())
        .map_err(|e| MediaError::detection_failed(format!("Failed to reshape boxes: {}", e)))?;

    let best = scores
        .outer_iter()
        .zip(boxes.outer_iter())
        .filter(|(score, _)| score[1] >= confidence_threshold)
        .map(|(score, bbox)| ScoredFace {
            face: FaceBox::new(bbox[0], bbox[1], bbox[2] - bbox[0], bbox[3] - bbox[1]).clamped(),
            confidence: score[1],
        })
        .filter(|candidate| candidate.face.area() > 0.0)
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence));

    Ok(best)
}

fn create_session(model_path: &Path) -> MediaResult<Session> {
    let model_bytes = std::fs::read(model_path)
        .map_err(|e| MediaError::internal(format!("Failed to read model file: {}", e)))?;

    let builder = Session::builder()
        .map_err(|e| MediaError::internal(format!("Failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| MediaError::internal(format!("Failed to set optimization level: {}", e)))?;

    #[cfg(all(target_os = "linux", feature = "cuda"))]
    {
        use ort::execution_providers::CUDAExecutionProvider;
        if let Ok(cuda_builder) = builder
            .clone()
            .with_execution_providers([CUDAExecutionProvider::default().build()])
        {
            if let Ok(session) = cuda_builder.commit_from_memory(&model_bytes) {
                info!("Using CUDA execution provider for face detection");
                return Ok(session);
            }
        }
        debug!("CUDA execution provider not available, using CPU");
    }

    builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| MediaError::internal(format!("Failed to load ONNX model: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = UltraFaceConfig::default();
        assert_eq!((config.input_width, config.input_height), (320, 240));
        assert!((config.confidence_threshold - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_missing_model() {
        let config = UltraFaceConfig {
            model_path: PathBuf::from("/nonexistent/face.onnx"),
            ..Default::default()
        };
        assert!(matches!(
            UltraFaceLocator::new(config),
            Err(MediaError::ModelNotFound(_))
        ));
    }

    #[test]
    fn test_best_face_skips_low_confidence() {
        let scores = [0.9, 0.1, 0.2, 0.8, 0.6, 0.4];
        let boxes = [
            0.0, 0.0, 0.1, 0.1, // below threshold
            0.6, 0.2, 0.8, 0.5, // face at 0.8
            0.1, 0.1, 0.3, 0.4, // below threshold (0.4)
        ];
        let face = best_face(&scores, &boxes, 0.5).unwrap().unwrap();
        assert!((face.confidence - 0.8).abs() < 1e-6);
        assert!((face.face.center_x() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_best_face_picks_most_confident() {
        let scores = [0.1, 0.7, 0.05, 0.95, 0.2, 0.8];
        let boxes = [
            0.10, 0.10, 0.30, 0.40, //
            0.60, 0.20, 0.80, 0.50, // most confident
            0.11, 0.10, 0.31, 0.40, //
        ];
        let face = best_face(&scores, &boxes, 0.5).unwrap().unwrap();
        assert!((face.confidence - 0.95).abs() < 1e-6);
        assert!((face.face.center_x() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_best_face_none_below_threshold() {
        let scores = [0.9, 0.1, 0.6, 0.4];
        let boxes = [0.0, 0.0, 0.5, 0.5, 0.5, 0.5, 1.0, 1.0];
        assert_eq!(best_face(&scores, &boxes, 0.5).unwrap(), None);
    }

    #[test]
    fn test_best_face_rejects_mismatched_outputs() {
        assert!(best_face(&[0.1, 0.9], &[0.0, 0.0, 1.0], 0.5).is_err());
    }
}
