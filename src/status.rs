// Status bar text

fn to_8bit(v: f32) -> i32 {
    (v * 255.0).clamp(0.0, 255.0).round() as i32
}

/// Hovered pixel readout: linear values followed by the exposed 8-bit values
pub fn pixel_readout(x: i64, y: i64, rgba: [f32; 4], exposure: f32) -> String {
    let gain = 2.0f32.powf(exposure);
    let [r, g, b, a] = rgba;
    format!(
        "({:>4},{:>4}) = ({:>6.3},{:>6.3},{:>6.3},{:>6.3})/({:>3},{:>3},{:>3},{:>3})",
        x,
        y,
        r,
        g,
        b,
        a,
        to_8bit(r * gain),
        to_8bit(g * gain),
        to_8bit(b * gain),
        to_8bit(a)
    )
}

/// Zoom percentage with the nearest integer ratio, e.g. ` 200.00% (2:1)`
pub fn zoom_readout(real_zoom: f32) -> String {
    let (numer, denom) = if real_zoom < 1.0 {
        (1, (1.0 / real_zoom).round() as i64)
    } else {
        (real_zoom.round() as i64, 1)
    };
    format!("{:7.2}% ({}:{})", real_zoom * 100.0, numer, denom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readout_pads_columns() {
        let text = pixel_readout(12, 7, [0.5, 1.0, 2.0, 1.0], 0.0);
        assert_eq!(
            text,
            "(  12,   7) = ( 0.500, 1.000, 2.000, 1.000)/(128,255,255,255)"
        );
    }

    #[test]
    fn readout_applies_exposure_to_color_only() {
        let text = pixel_readout(0, 0, [0.25, 0.0, -1.0, 0.5], 1.0);
        assert!(text.ends_with("/(128,  0,  0,128)"), "{}", text);
    }

    #[test]
    fn zoom_ratios() {
        assert_eq!(zoom_readout(1.0), " 100.00% (1:1)");
        assert_eq!(zoom_readout(4.0), " 400.00% (4:1)");
        assert_eq!(zoom_readout(0.25), "  25.00% (1:4)");
        assert_eq!(zoom_readout(0.3), "  30.00% (1:3)");
    }
}
