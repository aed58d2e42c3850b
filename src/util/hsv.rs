//! HSV to RGB conversion for the per-layer peg rainbow.

use glam::Vec3;

/// Convert an HSV color to RGB.
///
/// `hue` is in degrees (0–360), `saturation` and `value` in [0, 1]. The
/// returned channels are in 0–255, matching the range instance colors are
/// stored in host-side (they are normalized to [0, 1] only when packed for
/// the GPU).
#[must_use]
pub fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> Vec3 {
    let chroma = 255.0 * saturation * value;
    let face = hue / 60.0;
    let x = chroma * (1.0 - ((face % 2.0) - 1.0).abs());

    if face < 1.0 {
        Vec3::new(chroma, x, 0.0)
    } else if face < 2.0 {
        Vec3::new(x, chroma, 0.0)
    } else if face < 3.0 {
        Vec3::new(0.0, chroma, x)
    } else if face < 4.0 {
        Vec3::new(0.0, x, chroma)
    } else if face < 5.0 {
        Vec3::new(x, 0.0, chroma)
    } else {
        Vec3::new(chroma, 0.0, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_hues() {
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), Vec3::new(255.0, 0.0, 0.0));
        assert_eq!(hsv_to_rgb(120.0, 1.0, 1.0), Vec3::new(0.0, 255.0, 0.0));
        assert_eq!(hsv_to_rgb(240.0, 1.0, 1.0), Vec3::new(0.0, 0.0, 255.0));
    }

    #[test]
    fn test_channels_stay_in_byte_range() {
        let mut hue = 0.0;
        while hue < 360.0 {
            let rgb = hsv_to_rgb(hue, 1.0, 1.0);
            for channel in [rgb.x, rgb.y, rgb.z] {
                assert!((0.0..=255.0).contains(&channel), "hue {hue}: {channel}");
            }
            hue += 7.5;
        }
    }

    #[test]
    fn test_zero_value_is_black() {
        assert_eq!(hsv_to_rgb(200.0, 1.0, 0.0), Vec3::ZERO);
    }
}
