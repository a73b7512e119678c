// Overlay rendering
// Background, pixel grid, per-pixel value labels and the image border, all
// issued as immediate-mode draw calls on top of the image

use crate::image_loader::HdrImage;
use crate::view::{PixelRange, ViewTransform};
use eframe::egui::{vec2, Align2, Color32, FontId, Painter, Pos2, Rect, Stroke, Vec2};

/// Zoom above which the pixel grid starts fading in
pub const GRID_THRESHOLD: f32 = 10.0;

const GRID_MAX_ALPHA: f32 = 0.2;
const GRID_LINE_WIDTH: f32 = 2.0;
const BORDER_WIDTH: f32 = 2.0;
const CHECKER_SIZE: f32 = 8.0;

/// Font size of the pixel value labels
pub const INFO_FONT_SIZE: f32 = 14.0;

/// Widest label drawn for a channel value, used to decide when labels fit
const WIDEST_INFO_LABEL: &str = "R: 1.000";

const SHADOW_OFFSET: Vec2 = Vec2::new(1.0, 2.0);

/// Upper bound on labelled pixels per frame
const MAX_INFO_PIXELS: usize = 4096;

const CHANNEL_PREFIXES: [&str; 4] = ["R:", "G:", "B:", "A:"];
const CHANNEL_COLORS: [[f32; 3]; 4] = [
    [0.7, 0.15, 0.15],
    [0.1, 0.5, 0.1],
    [0.2, 0.2, 0.9],
    [0.8, 0.8, 0.8],
];

/// What to draw under the image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BackgroundMode {
    Black,
    White,
    #[default]
    DarkChecker,
    LightChecker,
    CustomColor,
}

impl BackgroundMode {
    pub const ALL: [BackgroundMode; 5] = [
        BackgroundMode::Black,
        BackgroundMode::White,
        BackgroundMode::DarkChecker,
        BackgroundMode::LightChecker,
        BackgroundMode::CustomColor,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BackgroundMode::Black => "Black",
            BackgroundMode::White => "White",
            BackgroundMode::DarkChecker => "Dark checker",
            BackgroundMode::LightChecker => "Light checker",
            BackgroundMode::CustomColor => "Custom color",
        }
    }

    /// The two checker colors, or a single fill
    fn colors(self, custom: [f32; 4]) -> (Color32, Option<Color32>) {
        match self {
            BackgroundMode::Black => (Color32::BLACK, None),
            BackgroundMode::White => (Color32::WHITE, None),
            BackgroundMode::DarkChecker => (Color32::from_gray(40), Some(Color32::from_gray(64))),
            BackgroundMode::LightChecker => (Color32::from_gray(204), Some(Color32::from_gray(230))),
            BackgroundMode::CustomColor => (
                color32([custom[0], custom[1], custom[2]], custom[3]),
                None,
            ),
        }
    }
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    (1.0 - t) * a + t * b
}

/// Hermite interpolation between 0 and 1 as `x` goes from `a` to `b`
pub fn smoothstep(a: f32, b: f32, x: f32) -> f32 {
    let t = ((x - a) / (b - a)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Opacity of the pixel grid at the given zoom
pub fn grid_alpha(zoom: f32) -> f32 {
    if zoom <= GRID_THRESHOLD {
        return 0.0;
    }
    let factor = ((zoom - GRID_THRESHOLD) / (2.0 * GRID_THRESHOLD)).clamp(0.0, 1.0);
    lerp(0.0, GRID_MAX_ALPHA, smoothstep(0.0, 1.0, factor))
}

/// Opacity of a label that appears once the zoom exceeds `threshold`
pub fn fade_alpha(zoom: f32, threshold: f32) -> f32 {
    if threshold <= 0.0 {
        return 1.0;
    }
    let factor = ((zoom - threshold) / (1.25 * threshold)).clamp(0.0, 1.0);
    lerp(0.0, 1.0, smoothstep(0.0, 1.0, factor))
}

/// Zoom levels at which the per-pixel labels fit inside a pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InfoThresholds {
    /// The four channel values
    pub rgba: f32,
    /// The channel values plus the coordinate label above them
    pub xy: f32,
}

impl InfoThresholds {
    pub fn from_text_metrics(label_width: f32, line_height: f32) -> Self {
        Self {
            rgba: label_width.max(4.0 * line_height),
            xy: label_width.max(6.0 * line_height),
        }
    }
}

/// Text shown for one pixel: the coordinate label and one line per channel
pub fn pixel_info_lines(x: i64, y: i64, value: [f32; 4]) -> (String, [String; 4]) {
    let coords = format!("({},{})", x, y);
    let lines = std::array::from_fn(|c| format!("{}{:>6.3}", CHANNEL_PREFIXES[c], value[c]));
    (coords, lines)
}

/// Grid line end points in pixel coordinates, vertical lines first
pub fn grid_lines(range: PixelRange, image_size: Vec2) -> Vec<(Vec2, Vec2)> {
    let last_x = (range.max_x + 1).min(image_size.x as i64);
    let last_y = (range.max_y + 1).min(image_size.y as i64);
    let (left, top) = (range.min_x as f32, range.min_y as f32);
    let (right, bottom) = (last_x as f32, last_y as f32);

    let vertical = (range.min_x..=last_x).map(|i| (vec2(i as f32, top), vec2(i as f32, bottom)));
    let horizontal = (range.min_y..=last_y).map(|j| (vec2(left, j as f32), vec2(right, j as f32)));
    vertical.chain(horizontal).collect()
}

/// Alternate checker squares inside `clip`, anchored at `origin`
pub fn checker_squares(origin: Pos2, clip: Rect, size: f32) -> Vec<Rect> {
    if !clip.is_positive() || size <= 0.0 {
        return Vec::new();
    }
    let first_i = ((clip.min.x - origin.x) / size).floor() as i64;
    let last_i = ((clip.max.x - origin.x) / size).ceil() as i64;
    let first_j = ((clip.min.y - origin.y) / size).floor() as i64;
    let last_j = ((clip.max.y - origin.y) / size).ceil() as i64;

    let mut squares = Vec::new();
    for j in first_j..last_j {
        for i in first_i..last_i {
            if (i + j).rem_euclid(2) == 0 {
                continue;
            }
            let min = origin + vec2(i as f32 * size, j as f32 * size);
            let square = Rect::from_min_size(min, Vec2::splat(size)).intersect(clip);
            if square.is_positive() {
                squares.push(square);
            }
        }
    }
    squares
}

fn color32(rgb: [f32; 3], alpha: f32) -> Color32 {
    let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color32::from_rgba_unmultiplied(to_u8(rgb[0]), to_u8(rgb[1]), to_u8(rgb[2]), to_u8(alpha))
}

/// Fill the part of the viewport covered by the image
pub fn draw_background(painter: &Painter, view: &ViewTransform, mode: BackgroundMode, custom: [f32; 4]) {
    let image_rect = view.image_rect();
    let clip = image_rect.intersect(view.viewport());
    if !clip.is_positive() {
        return;
    }

    let (base, alternate) = mode.colors(custom);
    painter.rect_filled(clip, 0.0, base);
    if let Some(alternate) = alternate {
        for square in checker_squares(image_rect.min, clip, CHECKER_SIZE) {
            painter.rect_filled(square, 0.0, alternate);
        }
    }
}

/// Stroke for the pixel grid at the given zoom, `None` while it is invisible
pub fn grid_stroke(zoom: f32) -> Option<Stroke> {
    let alpha = grid_alpha(zoom);
    (alpha > 0.0).then(|| Stroke::new(GRID_LINE_WIDTH, color32([1.0, 1.0, 1.0], alpha)))
}

/// Draw white lines along pixel boundaries once zoomed in far enough
pub fn draw_pixel_grid(painter: &Painter, view: &ViewTransform) {
    let Some(stroke) = grid_stroke(view.zoom()) else {
        return;
    };
    let Some(range) = view.visible_pixels() else {
        return;
    };

    for (a, b) in grid_lines(range, view.image_size()) {
        painter.line_segment(
            [view.screen_position_at_pixel(a), view.screen_position_at_pixel(b)],
            stroke,
        );
    }
}

/// Text with a black drop shadow
fn draw_text(painter: &Painter, pos: Pos2, text: &str, color: Color32, font: &FontId, alpha: f32) {
    painter.text(
        pos + SHADOW_OFFSET,
        Align2::CENTER_CENTER,
        text,
        font.clone(),
        color32([0.0, 0.0, 0.0], alpha),
    );
    painter.text(pos, Align2::CENTER_CENTER, text, font.clone(), color);
}

/// Label every visible pixel with its channel values, and its coordinates at higher zoom
pub fn draw_pixel_info(painter: &Painter, view: &ViewTransform, image: &HdrImage) {
    let font = FontId::monospace(INFO_FONT_SIZE);
    let label = painter.layout_no_wrap(WIDEST_INFO_LABEL.to_string(), font.clone(), Color32::WHITE);
    let line_height = label.size().y;
    let thresholds = InfoThresholds::from_text_metrics(label.size().x, line_height);

    let zoom = view.zoom();
    if zoom <= thresholds.rgba {
        return;
    }
    let alpha = fade_alpha(zoom, thresholds.rgba);
    let alpha_xy = fade_alpha(zoom, thresholds.xy);
    if alpha <= 0.0 {
        return;
    }
    let Some(range) = view.visible_pixels() else {
        return;
    };
    if range.count() > MAX_INFO_PIXELS {
        return;
    }

    for j in range.ys() {
        for i in range.xs() {
            let center = view.screen_position_at_pixel(vec2(i as f32 + 0.5, j as f32 + 0.5));
            let (coords, lines) = pixel_info_lines(i, j, image.pixel(i, j));

            if alpha_xy > 0.0 {
                let pos = center + vec2(0.0, (-1.0 - 1.5) * line_height);
                draw_text(painter, pos, &coords, color32(CHANNEL_COLORS[3], alpha_xy), &font, alpha_xy);
            }

            for (c, line) in lines.iter().enumerate() {
                let pos = center + vec2(0.0, (c as f32 - 1.5) * line_height);
                draw_text(painter, pos, line, color32(CHANNEL_COLORS[c], alpha), &font, alpha);
            }
        }
    }
}

/// Gray outline around the image
pub fn draw_image_border(painter: &Painter, view: &ViewTransform) {
    if view.image_size().min_elem() <= 0.0 {
        return;
    }
    painter.rect_stroke(
        view.image_rect(),
        0.0,
        Stroke::new(BORDER_WIDTH, Color32::from_gray(128)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::pos2;

    #[test]
    fn smoothstep_is_clamped_and_symmetric() {
        assert_eq!(smoothstep(0.0, 1.0, -1.0), 0.0);
        assert_eq!(smoothstep(0.0, 1.0, 2.0), 1.0);
        assert!((smoothstep(0.0, 1.0, 0.5) - 0.5).abs() < 1e-6);
        let a = smoothstep(0.0, 1.0, 0.2);
        let b = smoothstep(0.0, 1.0, 0.8);
        assert!((a + b - 1.0).abs() < 1e-6);
    }

    #[test]
    fn grid_fades_in_above_threshold() {
        assert_eq!(grid_alpha(1.0), 0.0);
        assert_eq!(grid_alpha(GRID_THRESHOLD), 0.0);
        let mid = grid_alpha(20.0);
        assert!(mid > 0.0 && mid < GRID_MAX_ALPHA);
        assert!((grid_alpha(30.0) - GRID_MAX_ALPHA).abs() < 1e-6);
        assert!((grid_alpha(500.0) - GRID_MAX_ALPHA).abs() < 1e-6);
    }

    #[test]
    fn grid_stroke_matches_border_width() {
        assert!(grid_stroke(GRID_THRESHOLD).is_none());
        let stroke = grid_stroke(40.0).unwrap();
        assert_eq!(stroke.width, BORDER_WIDTH);
        // 0.2 alpha, white
        assert_eq!(stroke.color, color32([1.0, 1.0, 1.0], GRID_MAX_ALPHA));
    }

    #[test]
    fn labels_fade_over_a_quarter_past_threshold() {
        assert_eq!(fade_alpha(50.0, 50.0), 0.0);
        assert!((fade_alpha(50.0 + 1.25 * 50.0, 50.0) - 1.0).abs() < 1e-6);
        let half = fade_alpha(50.0 + 0.625 * 50.0, 50.0);
        assert!((half - 0.5).abs() < 1e-6);
    }

    #[test]
    fn thresholds_use_the_larger_extent() {
        let wide = InfoThresholds::from_text_metrics(100.0, 10.0);
        assert_eq!(wide.rgba, 100.0);
        assert_eq!(wide.xy, 100.0);

        let tall = InfoThresholds::from_text_metrics(50.0, 20.0);
        assert_eq!(tall.rgba, 80.0);
        assert_eq!(tall.xy, 120.0);
    }

    #[test]
    fn info_lines_are_fixed_width() {
        let (coords, lines) = pixel_info_lines(3, 14, [0.5, 12.25, -1.0, 1.0]);
        assert_eq!(coords, "(3,14)");
        assert_eq!(lines[0], "R: 0.500");
        assert_eq!(lines[1], "G:12.250");
        assert_eq!(lines[2], "B:-1.000");
        assert_eq!(lines[3], "A: 1.000");
    }

    #[test]
    fn grid_lines_cover_visible_cells() {
        let range = PixelRange {
            min_x: 2,
            min_y: 0,
            max_x: 3,
            max_y: 1,
        };
        let lines = grid_lines(range, vec2(4.0, 2.0));
        // vertical lines at x = 2, 3, 4 and horizontal at y = 0, 1, 2
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], (vec2(2.0, 0.0), vec2(2.0, 2.0)));
        assert_eq!(lines[2], (vec2(4.0, 0.0), vec2(4.0, 2.0)));
        assert_eq!(lines[5], (vec2(2.0, 2.0), vec2(4.0, 2.0)));
    }

    #[test]
    fn checker_alternates_and_stays_clipped() {
        let clip = Rect::from_min_max(pos2(0.0, 0.0), pos2(32.0, 16.0));
        let squares = checker_squares(pos2(0.0, 0.0), clip, 8.0);
        // 4 x 2 cells, half of them alternate
        assert_eq!(squares.len(), 4);
        assert!(squares.iter().all(|r| clip.contains_rect(*r)));
        assert_eq!(squares[0], Rect::from_min_size(pos2(8.0, 0.0), Vec2::splat(8.0)));
    }

    #[test]
    fn checker_squares_are_anchored_to_image_origin() {
        let clip = Rect::from_min_max(pos2(0.0, 0.0), pos2(10.0, 10.0));
        let squares = checker_squares(pos2(-4.0, 0.0), clip, 8.0);
        // first alternate cell starts at x = 4 and is clipped on the right
        assert_eq!(squares[0].min, pos2(4.0, 0.0));
        assert_eq!(squares[0].max, pos2(10.0, 8.0));
    }

    #[test]
    fn empty_clip_has_no_squares() {
        let clip = Rect::from_min_max(pos2(5.0, 5.0), pos2(5.0, 10.0));
        assert!(checker_squares(Pos2::ZERO, clip, 8.0).is_empty());
    }
}
