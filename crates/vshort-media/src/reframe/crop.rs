use vshort_models::CropWindow;

/// Width of the 9:16 window cut from a source frame, capped to the source width.
pub fn target_width(source_width: u32, source_height: u32) -> u32 {
    let width = (u64::from(source_height) * 9 / 16) as u32;
    width.min(source_width)
}

/// Place a window of `target_width` pixels around `center_x`, kept inside the frame.
pub fn crop_window(center_x: f64, source_width: u32, target_width: u32) -> CropWindow {
    let target_width = target_width.min(source_width);
    let max_left = f64::from(source_width - target_width);

    let raw_left = (center_x - f64::from(target_width) / 2.0).trunc();
    let left = if raw_left.is_finite() {
        raw_left.clamp(0.0, max_left)
    } else {
        0.0
    };

    let left = left as u32;
    CropWindow {
        left,
        right: left + target_width,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_width_landscape() {
        assert_eq!(target_width(1920, 1080), 607);
        assert_eq!(target_width(1280, 720), 405);
    }

    #[test]
    fn test_target_width_capped_for_narrow_sources() {
        assert_eq!(target_width(720, 1920), 720);
    }

    #[test]
    fn test_centered_window() {
        let window = crop_window(960.0, 1920, 607);
        assert_eq!(window.left, 656);
        assert_eq!(window.width(), 607);
    }

    #[test]
    fn test_window_clamped_at_edges() {
        let left = crop_window(10.0, 1920, 607);
        assert_eq!(left.left, 0);
        assert_eq!(left.right, 607);

        let right = crop_window(1915.0, 1920, 607);
        assert_eq!(right.right, 1920);
        assert_eq!(right.left, 1313);
    }

    #[test]
    fn test_window_stays_inside_for_any_center() {
        for center in [-5000.0, -1.0, 0.0, 303.5, 959.9, 1920.0, 1e9, f64::NAN] {
            let window = crop_window(center, 1920, 607);
            assert!(window.right <= 1920, "center {center}");
            assert_eq!(window.width(), 607);
        }
    }
}
