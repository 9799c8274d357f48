use image::RgbImage;
use vshort_models::FaceBox;

use crate::error::MediaResult;

/// Outcome of looking for a face in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FaceDetection {
    Found(FaceBox),
    NoFace,
}

impl FaceDetection {
    /// Horizontal pixel the crop should center on; the frame center when no face was found.
    pub fn center_x(&self, frame_width: u32) -> f64 {
        match self {
            FaceDetection::Found(face) => f64::from(face.center_x()) * f64::from(frame_width),
            FaceDetection::NoFace => f64::from(frame_width) / 2.0,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, FaceDetection::Found(_))
    }
}

/// Finds the face to follow in a frame.
///
/// Called once per frame from a blocking context.
pub trait FaceLocator: Send + Sync {
    fn locate(&self, frame: &RgbImage) -> MediaResult<FaceDetection>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Locator that never reports a face, producing a steady center crop.
#[derive(Debug, Clone, Copy, Default)]
pub struct CenterLocator;

impl FaceLocator for CenterLocator {
    fn locate(&self, _frame: &RgbImage) -> MediaResult<FaceDetection> {
        Ok(FaceDetection::NoFace)
    }

    fn name(&self) -> &'static str {
        "center"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_from_face() {
        let detection = FaceDetection::Found(FaceBox::new(0.25, 0.1, 0.1, 0.2));
        assert!((detection.center_x(1920) - 576.0).abs() < 0.01);
        assert!(detection.is_found());
    }

    #[test]
    fn test_center_without_face() {
        assert_eq!(FaceDetection::NoFace.center_x(1920), 960.0);
        let frame = RgbImage::new(4, 4);
        assert_eq!(CenterLocator.locate(&frame).unwrap(), FaceDetection::NoFace);
    }
}
