// Display pipeline
// Turns linear HDR pixels into 8-bit display values: exposure, channel
// selection, transfer curve and ordered dithering

use crate::image_loader::HdrImage;
use log::debug;

/// Exposure slider range in stops
pub const EXPOSURE_RANGE: std::ops::RangeInclusive<f32> = -9.0..=9.0;

/// Gamma slider range
pub const GAMMA_RANGE: std::ops::RangeInclusive<f32> = 0.02..=9.0;

pub const DEFAULT_GAMMA: f32 = 2.2;

/// Rec. 709 luminance weights
const LUMINANCE_WEIGHTS: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// D65 reference white in XYZ
const WHITE_D65: [f32; 3] = [0.950_47, 1.0, 1.088_83];

/// 8x8 ordered dither matrix
const BAYER_8X8: [[u8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

/// Which channel (or derived quantity) to display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Channel {
    #[default]
    Rgb,
    Red,
    Green,
    Blue,
    Alpha,
    Luminance,
    Gray,
    CieL,
    CieA,
    CieB,
    CieChromaticity,
    FalseColor,
    NegativePositive,
}

impl Channel {
    pub const ALL: [Channel; 13] = [
        Channel::Rgb,
        Channel::Red,
        Channel::Green,
        Channel::Blue,
        Channel::Alpha,
        Channel::Luminance,
        Channel::Gray,
        Channel::CieL,
        Channel::CieA,
        Channel::CieB,
        Channel::CieChromaticity,
        Channel::FalseColor,
        Channel::NegativePositive,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Rgb => "RGB",
            Channel::Red => "Red",
            Channel::Green => "Green",
            Channel::Blue => "Blue",
            Channel::Alpha => "Alpha",
            Channel::Luminance => "Luminance",
            Channel::Gray => "Gray",
            Channel::CieL => "CIE L*",
            Channel::CieA => "CIE a*",
            Channel::CieB => "CIE b*",
            Channel::CieChromaticity => "CIE chromaticity",
            Channel::FalseColor => "False color",
            Channel::NegativePositive => "Negative-positive",
        }
    }
}

/// Tonemapping parameters controlled from the toolbar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSettings {
    /// Exposure in stops
    pub exposure: f32,
    pub gamma: f32,
    /// Use the sRGB curve instead of a plain gamma
    pub srgb: bool,
    pub clamp_to_ldr: bool,
    pub dither: bool,
    pub channel: Channel,
}

impl Default for ToneSettings {
    fn default() -> Self {
        Self {
            exposure: 0.0,
            gamma: DEFAULT_GAMMA,
            srgb: false,
            clamp_to_ldr: false,
            dither: true,
            channel: Channel::Rgb,
        }
    }
}

impl ToneSettings {
    /// Linear multiplier for the current exposure
    pub fn gain(&self) -> f32 {
        2.0f32.powf(self.exposure)
    }

    /// Back to neutral exposure with the sRGB curve
    pub fn reset(&mut self) {
        self.exposure = 0.0;
        self.gamma = DEFAULT_GAMMA;
        self.srgb = true;
    }

    pub fn set_exposure(&mut self, exposure: f32) {
        self.exposure = exposure.clamp(*EXPOSURE_RANGE.start(), *EXPOSURE_RANGE.end());
    }

    pub fn adjust_exposure(&mut self, delta: f32) {
        self.set_exposure(self.exposure + delta);
    }

    pub fn set_gamma(&mut self, gamma: f32) {
        self.gamma = gamma.clamp(*GAMMA_RANGE.start(), *GAMMA_RANGE.end());
    }

    pub fn adjust_gamma(&mut self, delta: f32) {
        self.set_gamma(self.gamma + delta);
    }

    /// Pick the exposure that maps the brightest value to 1.0
    pub fn normalize_exposure(&mut self, max_value: f32) {
        if max_value > 0.0 && max_value.is_finite() {
            self.set_exposure(-max_value.log2());
            debug!("Normalized exposure to {:.3} EV", self.exposure);
        }
    }

    fn transfer(&self, v: f32) -> f32 {
        if self.srgb {
            linear_to_srgb(v)
        } else {
            v.signum() * v.abs().powf(1.0 / self.gamma)
        }
    }
}

/// sRGB opto-electronic transfer function
pub fn linear_to_srgb(v: f32) -> f32 {
    if v <= 0.003_130_8 {
        12.92 * v
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

pub fn luminance(rgb: [f32; 3]) -> f32 {
    rgb[0] * LUMINANCE_WEIGHTS[0] + rgb[1] * LUMINANCE_WEIGHTS[1] + rgb[2] * LUMINANCE_WEIGHTS[2]
}

/// Linear sRGB to CIE XYZ (D65)
pub fn rgb_to_xyz(rgb: [f32; 3]) -> [f32; 3] {
    let [r, g, b] = rgb;
    [
        0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b,
        0.212_672_9 * r + 0.715_152_2 * g + 0.072_175 * b,
        0.019_333_9 * r + 0.119_192 * g + 0.950_304_1 * b,
    ]
}

/// CIE XYZ to L*a*b* relative to D65
pub fn xyz_to_lab(xyz: [f32; 3]) -> [f32; 3] {
    const DELTA: f32 = 6.0 / 29.0;
    let f = |t: f32| {
        if t > DELTA * DELTA * DELTA {
            t.cbrt()
        } else {
            t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
        }
    };
    let fx = f(xyz[0] / WHITE_D65[0]);
    let fy = f(xyz[1] / WHITE_D65[1]);
    let fz = f(xyz[2] / WHITE_D65[2]);
    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

/// Viridis approximation, `t` in [0, 1]
pub fn false_color(t: f32) -> [f32; 3] {
    const C: [[f32; 3]; 7] = [
        [0.277_727_33, 0.005_407_344_5, 0.334_099_8],
        [0.105_093_04, 1.404_613_5, 1.384_590_2],
        [-0.330_861_83, 0.214_847_56, 0.095_095_16],
        [-4.634_230_6, -5.799_101, -19.332_441],
        [6.228_27, 14.179_933, 56.690_55],
        [4.776_385, -13.745_145, -65.353_03],
        [-5.435_456, 4.645_852_6, 26.312_435],
    ];
    let t = t.clamp(0.0, 1.0);
    let mut out = [0.0f32; 3];
    for (c, value) in out.iter_mut().enumerate() {
        let mut acc = C[6][c];
        for k in (0..6).rev() {
            acc = C[k][c] + t * acc;
        }
        *value = acc.clamp(0.0, 1.0);
    }
    out
}

/// Ordered dither threshold in (0, 1) for a display pixel
pub fn dither_value(x: usize, y: usize) -> f32 {
    (BAYER_8X8[y % 8][x % 8] as f32 + 0.5) / 64.0
}

fn quantize(v: f32, dither_offset: f32) -> u8 {
    ((v + dither_offset).clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Tonemap a single linear RGBA pixel
///
/// `dither` is the ordered-dither threshold for this pixel, ignored when
/// dithering is off.
pub fn tonemap_pixel(rgba: [f32; 4], settings: &ToneSettings, dither: f32) -> [u8; 4] {
    let gain = settings.gain();
    let mut rgb = [rgba[0] * gain, rgba[1] * gain, rgba[2] * gain];
    if settings.clamp_to_ldr {
        rgb = rgb.map(|v| v.clamp(0.0, 1.0));
    }
    let alpha = rgba[3];

    let t = |v: f32| settings.transfer(v);
    let gray = |v: f32| [v, v, v];

    let (out, out_alpha) = match settings.channel {
        Channel::Rgb => (rgb.map(t), alpha),
        Channel::Red => (gray(t(rgb[0])), alpha),
        Channel::Green => (gray(t(rgb[1])), alpha),
        Channel::Blue => (gray(t(rgb[2])), alpha),
        Channel::Alpha => (gray(alpha), 1.0),
        Channel::Luminance => (gray(t(luminance(rgb))), alpha),
        Channel::Gray => (gray(t((rgb[0] + rgb[1] + rgb[2]) / 3.0)), alpha),
        Channel::CieL => (gray(xyz_to_lab(rgb_to_xyz(rgb))[0] / 100.0), alpha),
        Channel::CieA => (gray(0.5 + xyz_to_lab(rgb_to_xyz(rgb))[1] / 256.0), alpha),
        Channel::CieB => (gray(0.5 + xyz_to_lab(rgb_to_xyz(rgb))[2] / 256.0), alpha),
        Channel::CieChromaticity => {
            let [x, y, z] = rgb_to_xyz(rgb);
            let sum = x + y + z;
            if sum > 0.0 {
                let (cx, cy) = (x / sum, y / sum);
                ([cx, cy, 1.0 - cx - cy], alpha)
            } else {
                ([0.0; 3], alpha)
            }
        }
        Channel::FalseColor => (false_color(luminance(rgb)), alpha),
        Channel::NegativePositive => (rgb.map(|v| 1.0 - t(v)), alpha),
    };

    let offset = if settings.dither {
        (dither - 0.5) / 255.0
    } else {
        0.0
    };

    [
        quantize(out[0], offset),
        quantize(out[1], offset),
        quantize(out[2], offset),
        quantize(out_alpha, 0.0),
    ]
}

/// 8-bit RGBA image ready for upload as a texture
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayImage {
    pub width: usize,
    pub height: usize,
    /// Source pixels per display pixel along each axis
    pub stride: usize,
    pub rgba: Vec<u8>,
}

impl DisplayImage {
    pub fn size(&self) -> [usize; 2] {
        [self.width, self.height]
    }

    /// True when the texture shows every `stride`-th source pixel
    pub fn is_subsampled(&self) -> bool {
        self.stride > 1
    }
}

/// Smallest integer subsampling stride that fits `width` x `height` into `max_side`
pub fn subsample_stride(width: usize, height: usize, max_side: usize) -> usize {
    let max_side = max_side.max(1);
    let longest = width.max(height);
    longest.div_ceil(max_side).max(1)
}

/// Tonemap a whole image
pub fn render_display_image(
    image: &HdrImage,
    settings: &ToneSettings,
    max_side: usize,
) -> DisplayImage {
    let (src_w, src_h) = (image.width as usize, image.height as usize);
    let stride = subsample_stride(src_w, src_h, max_side);
    let width = src_w.div_ceil(stride);
    let height = src_h.div_ceil(stride);

    let mut rgba = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        let row = &image.pixels[y * stride * src_w..];
        for x in 0..width {
            let pixel = row[x * stride];
            rgba.extend_from_slice(&tonemap_pixel(pixel, settings, dither_value(x, y)));
        }
    }

    DisplayImage {
        width,
        height,
        stride,
        rgba,
    }
}
