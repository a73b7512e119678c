// Command line interface module
// Handles parsing of command line arguments into the viewer configuration

use crate::overlay::BackgroundMode;
use crate::tonemap::{Channel, ToneSettings, EXPOSURE_RANGE, GAMMA_RANGE};
use clap::Parser;
use std::path::PathBuf;

/// hdrpeek - An HDR/LDR image viewer with a pixel inspector
#[derive(Parser, Debug)]
#[command(name = "hdrpeek")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Image to open (PNG, JPEG, BMP, HDR, EXR, GIF, WebP, TIFF)
    #[arg(value_name = "IMAGE")]
    pub image_path: Option<PathBuf>,

    /// Initial exposure in stops (-9 to 9)
    #[arg(short, long, default_value = "0.0", value_parser = parse_exposure, allow_negative_numbers = true)]
    pub exposure: f32,

    /// Display gamma used when the sRGB curve is off (0.02 to 9)
    #[arg(short, long, default_value = "2.2", value_parser = parse_gamma)]
    pub gamma: f32,

    /// Use the sRGB transfer curve instead of a plain gamma
    #[arg(long)]
    pub srgb: bool,

    /// Clamp exposed values to [0, 1] before display
    #[arg(long)]
    pub clamp_to_ldr: bool,

    /// Disable ordered dithering of the 8-bit output
    #[arg(long)]
    pub no_dither: bool,

    /// Hide the pixel grid
    #[arg(long)]
    pub no_grid: bool,

    /// Hide per-pixel channel values
    #[arg(long)]
    pub no_pixel_info: bool,

    /// Channel to display
    #[arg(short, long, value_enum, default_value_t = Channel::Rgb)]
    pub channel: Channel,

    /// Background drawn behind transparent pixels
    #[arg(short, long, value_enum, default_value_t = BackgroundMode::DarkChecker)]
    pub background: BackgroundMode,

    /// Initial window width
    #[arg(long, default_value = "1200")]
    pub width: u32,

    /// Initial window height
    #[arg(long, default_value = "800")]
    pub height: u32,
}

/// Settings the viewer starts with
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub image_path: Option<PathBuf>,
    pub tone: ToneSettings,
    pub draw_grid: bool,
    pub draw_pixel_info: bool,
    pub background: BackgroundMode,
    pub window_size: [f32; 2],
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            image_path: None,
            tone: ToneSettings::default(),
            draw_grid: true,
            draw_pixel_info: true,
            background: BackgroundMode::default(),
            window_size: [1200.0, 800.0],
        }
    }
}

impl From<Args> for ViewerConfig {
    fn from(args: Args) -> Self {
        Self {
            image_path: args.image_path,
            tone: ToneSettings {
                exposure: args.exposure,
                gamma: args.gamma,
                srgb: args.srgb,
                clamp_to_ldr: args.clamp_to_ldr,
                dither: !args.no_dither,
                channel: args.channel,
            },
            draw_grid: !args.no_grid,
            draw_pixel_info: !args.no_pixel_info,
            background: args.background,
            window_size: [args.width.max(1) as f32, args.height.max(1) as f32],
        }
    }
}

fn parse_in_range(
    s: &str,
    what: &str,
    range: std::ops::RangeInclusive<f32>,
) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|_| format!("Invalid {} value", what))?;
    if !range.contains(&value) {
        return Err(format!(
            "{} must be between {} and {}",
            what,
            range.start(),
            range.end()
        ));
    }
    Ok(value)
}

/// Parse exposure value and ensure it's within the slider range
fn parse_exposure(s: &str) -> Result<f32, String> {
    parse_in_range(s, "exposure", EXPOSURE_RANGE)
}

/// Parse gamma value and ensure it's within the slider range
fn parse_gamma(s: &str) -> Result<f32, String> {
    parse_in_range(s, "gamma", GAMMA_RANGE)
}

/// Parse command line arguments
pub fn parse_args() -> ViewerConfig {
    Args::parse().into()
}
