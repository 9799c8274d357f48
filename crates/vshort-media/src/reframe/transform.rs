use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::RgbImage;
use tracing::debug;
use vshort_models::CropWindow;

use super::crop::{crop_window, target_width};
use super::face::{FaceDetection, FaceLocator};
use super::tracker::CropTracker;
use crate::error::{MediaError, MediaResult};

/// Per-clip state turning source frames into smoothed vertical frames.
pub struct FrameTransform {
    locator: Arc<dyn FaceLocator>,
    tracker: CropTracker,
    source_width: u32,
    source_height: u32,
    target_width: u32,
    output_width: u32,
    output_height: u32,
    face_misses: u64,
    last_window: Option<CropWindow>,
}

impl FrameTransform {
    pub fn new(
        locator: Arc<dyn FaceLocator>,
        tracker: CropTracker,
        source_width: u32,
        source_height: u32,
        output_width: u32,
        output_height: u32,
    ) -> Self {
        Self {
            locator,
            tracker,
            source_width,
            source_height,
            target_width: target_width(source_width, source_height),
            output_width,
            output_height,
            face_misses: 0,
            last_window: None,
        }
    }

    /// Crop one frame around the smoothed face center and resample it.
    ///
    /// Detector failures count as frames without a face.
    pub fn apply(&mut self, frame: &RgbImage) -> MediaResult<RgbImage> {
        if frame.dimensions() != (self.source_width, self.source_height) {
            return Err(MediaError::FrameSize {
                expected: self.source_width as usize * self.source_height as usize * 3,
                actual: frame.as_raw().len(),
            });
        }

        let detection = match self.locator.locate(frame) {
            Ok(detection) => detection,
            Err(e) => {
                debug!(locator = self.locator.name(), "Face detection failed: {}", e);
                FaceDetection::NoFace
            }
        };
        if !detection.is_found() {
            self.face_misses += 1;
        }

        let smoothed = self.tracker.observe(detection.center_x(self.source_width));
        let window = crop_window(smoothed, self.source_width, self.target_width);
        self.last_window = Some(window);

        let cropped = imageops::crop_imm(frame, window.left, 0, window.width(), self.source_height)
            .to_image();

        Ok(imageops::resize(
            &cropped,
            self.output_width,
            self.output_height,
            FilterType::Triangle,
        ))
    }

    pub fn face_misses(&self) -> u64 {
        self.face_misses
    }

    pub fn target_width(&self) -> u32 {
        self.target_width
    }

    pub fn last_window(&self) -> Option<CropWindow> {
        self.last_window
    }

    pub fn source_dimensions(&self) -> (u32, u32) {
        (self.source_width, self.source_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reframe::CenterLocator;
    use image::Rgb;
    use vshort_models::FaceBox;

    struct FixedLocator(FaceDetection);

    impl FaceLocator for FixedLocator {
        fn locate(&self, _frame: &RgbImage) -> MediaResult<FaceDetection> {
            Ok(self.0)
        }
        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    struct BrokenLocator;

    impl FaceLocator for BrokenLocator {
        fn locate(&self, _frame: &RgbImage) -> MediaResult<FaceDetection> {
            Err(MediaError::detection_failed("boom"))
        }
        fn name(&self) -> &'static str {
            "broken"
        }
    }

    fn transform(locator: Arc<dyn FaceLocator>) -> FrameTransform {
        FrameTransform::new(locator, CropTracker::default(), 320, 180, 90, 160)
    }

    #[test]
    fn test_output_dimensions() {
        let mut t = transform(Arc::new(CenterLocator));
        let out = t.apply(&RgbImage::new(320, 180)).unwrap();
        assert_eq!(out.dimensions(), (90, 160));
        assert_eq!(t.target_width(), 101);
        assert_eq!(t.face_misses(), 1);
    }

    #[test]
    fn test_center_crop_without_face() {
        let mut t = transform(Arc::new(CenterLocator));
        t.apply(&RgbImage::new(320, 180)).unwrap();
        // trunc(160 - 50.5) = 109
        assert_eq!(t.last_window(), Some(CropWindow { left: 109, right: 210 }));
    }

    #[test]
    fn test_follows_face_and_clamps() {
        let face = FaceBox::new(0.95, 0.2, 0.05, 0.1);
        let mut t = transform(Arc::new(FixedLocator(FaceDetection::Found(face))));

        // Right half of the frame is white, crop should land on it.
        let mut frame = RgbImage::new(320, 180);
        for x in 219..320 {
            for y in 0..180 {
                frame.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }

        let out = t.apply(&frame).unwrap();
        assert_eq!(t.last_window(), Some(CropWindow { left: 219, right: 320 }));
        assert!(out.get_pixel(45, 80).0.iter().all(|&c| c >= 250));
        assert_eq!(t.face_misses(), 0);
    }

    #[test]
    fn test_detector_errors_fall_back_to_center() {
        let mut t = transform(Arc::new(BrokenLocator));
        t.apply(&RgbImage::new(320, 180)).unwrap();
        assert_eq!(t.face_misses(), 1);
        assert_eq!(t.last_window().unwrap().left, 109);
    }

    #[test]
    fn test_wrong_frame_size_is_rejected() {
        let mut t = transform(Arc::new(CenterLocator));
        assert!(matches!(
            t.apply(&RgbImage::new(10, 10)),
            Err(MediaError::FrameSize { .. })
        ));
    }
}
