// Image loading module
// Decodes image files into linear floating-point RGBA

use crate::error::LoadError;
use image::{ColorType, DynamicImage, GenericImageView, ImageReader};
use log::{debug, info};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Gamma used to promote 8/16 bit images to linear values
const LDR_TO_HDR_GAMMA: f32 = 2.2;

/// Scale applied to promoted 8/16 bit images
const LDR_TO_HDR_SCALE: f32 = 1.0;

/// Extensions accepted when files are dropped on the window
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "bmp", "hdr", "exr", "gif", "webp", "tif", "tiff",
];

/// Where an image came from
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSource {
    /// Display name (file name or the name of a dropped buffer)
    pub name: String,
    /// Path on disk, when there is one
    pub path: Option<PathBuf>,
}

/// Summary statistics over the finite R, G and B values of an image
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImageStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub nan_count: usize,
    pub inf_count: usize,
}

impl ImageStats {
    fn compute(pixels: &[[f32; 4]]) -> Self {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut count = 0usize;
        let mut nan_count = 0;
        let mut inf_count = 0;

        for &v in pixels.iter().flat_map(|p| &p[..3]) {
            if v.is_nan() {
                nan_count += 1;
            } else if v.is_infinite() {
                inf_count += 1;
            } else {
                min = min.min(v);
                max = max.max(v);
                sum += v as f64;
                count += 1;
            }
        }

        if count == 0 {
            return Self {
                nan_count,
                inf_count,
                ..Self::default()
            };
        }

        Self {
            min,
            max,
            mean: (sum / count as f64) as f32,
            nan_count,
            inf_count,
        }
    }
}

/// A decoded image in linear RGBA
#[derive(Debug, Clone)]
pub struct HdrImage {
    pub width: u32,
    pub height: u32,
    /// Row-major linear RGBA values
    pub pixels: Vec<[f32; 4]>,
    pub source: ImageSource,
    /// True when the file stored floating-point samples
    pub is_hdr: bool,
    pub stats: ImageStats,
}

impl HdrImage {
    /// Build an image from linear pixels. `pixels.len()` must equal `width * height`.
    pub fn from_pixels(
        width: u32,
        height: u32,
        pixels: Vec<[f32; 4]>,
        source: ImageSource,
        is_hdr: bool,
    ) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize);
        let stats = ImageStats::compute(&pixels);
        Self {
            width,
            height,
            pixels,
            source,
            is_hdr,
            stats,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pixel at `(x, y)`, or transparent black outside the image
    pub fn pixel(&self, x: i64, y: i64) -> [f32; 4] {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return [0.0; 4];
        }
        self.pixels[(y as usize) * self.width as usize + x as usize]
    }
}

/// Load an image from disk
pub fn load_image(path: &Path) -> Result<HdrImage, LoadError> {
    info!("Loading image {}", path.display());

    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let name = display_name(path);

    // open() picks the format from the extension, sniffing the content overrides it
    let reader = ImageReader::open(path)
        .map_err(io_err)?
        .with_guessed_format()
        .map_err(io_err)?;

    if reader.format().is_none() {
        return Err(LoadError::UnknownFormat { name });
    }

    let img = reader.decode().map_err(|source| LoadError::Decode {
        name: name.clone(),
        source,
    })?;

    let source = ImageSource {
        name,
        path: Some(path.to_path_buf()),
    };
    into_linear(img, source)
}

/// Load an image from raw bytes, auto-detecting the format
pub fn load_from_bytes(data: &[u8], name: &str) -> Result<HdrImage, LoadError> {
    info!("Loading image {} from {} bytes", name, data.len());

    let format = image::guess_format(data).map_err(|_| LoadError::UnknownFormat {
        name: name.to_string(),
    })?;

    let img = ImageReader::with_format(Cursor::new(data), format)
        .decode()
        .map_err(|source| LoadError::Decode {
            name: name.to_string(),
            source,
        })?;

    let source = ImageSource {
        name: name.to_string(),
        path: None,
    };
    into_linear(img, source)
}

/// Whether a path looks like something the viewer can open
pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Promote an 8/16 bit sample in `[0, 1]` to linear
pub fn ldr_to_linear(v: f32) -> f32 {
    v.powf(LDR_TO_HDR_GAMMA) * LDR_TO_HDR_SCALE
}

fn into_linear(img: DynamicImage, source: ImageSource) -> Result<HdrImage, LoadError> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(LoadError::Empty {
            name: source.name,
            width,
            height,
        });
    }

    let is_hdr = matches!(img.color(), ColorType::Rgb32F | ColorType::Rgba32F);
    debug!(
        "Decoded {} as {:?} ({}x{}, hdr: {})",
        source.name,
        img.color(),
        width,
        height,
        is_hdr
    );

    // to_rgba32f normalises integer samples to [0, 1] and fills missing alpha with 1
    let rgba = img.to_rgba32f();
    let pixels = rgba
        .pixels()
        .map(|p| {
            let [r, g, b, a] = p.0;
            if is_hdr {
                [r, g, b, a]
            } else {
                [ldr_to_linear(r), ldr_to_linear(g), ldr_to_linear(b), a]
            }
        })
        .collect();

    let image = HdrImage::from_pixels(width, height, pixels, source, is_hdr);
    info!(
        "Image loaded: {}x{} pixels, range [{:.4}, {:.4}]",
        image.width, image.height, image.stats.min, image.stats.max
    );
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb32FImage, Rgba32FImage, RgbaImage};

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format)
            .expect("encoding test image");
        bytes
    }

    #[test]
    fn ldr_png_is_promoted_to_linear() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([255, 128, 0, 255]));
        img.put_pixel(1, 0, image::Rgba([0, 0, 0, 128]));
        let bytes = encode(DynamicImage::ImageRgba8(img), ImageFormat::Png);

        let loaded = load_from_bytes(&bytes, "test.png").unwrap();
        assert_eq!(loaded.size(), (2, 1));
        assert!(!loaded.is_hdr);

        let p = loaded.pixel(0, 0);
        assert!((p[0] - 1.0).abs() < 1e-6);
        let expected = (128.0f32 / 255.0).powf(2.2);
        assert!(
            (p[1] - expected).abs() < 1e-4,
            "green should be gamma-decoded: {} vs {}",
            p[1],
            expected
        );
        assert_eq!(p[2], 0.0);

        // alpha is not gamma-decoded
        let q = loaded.pixel(1, 0);
        assert!((q[3] - 128.0 / 255.0).abs() < 1e-4);
    }

    #[test]
    fn float_images_keep_values_above_one() {
        let mut img = Rgb32FImage::new(1, 1);
        img.put_pixel(0, 0, image::Rgb([4.0, 0.5, 0.25]));
        let loaded = into_linear(
            DynamicImage::ImageRgb32F(img),
            ImageSource {
                name: "mem".into(),
                path: None,
            },
        )
        .unwrap();

        assert!(loaded.is_hdr);
        assert_eq!(loaded.pixel(0, 0), [4.0, 0.5, 0.25, 1.0]);
        assert_eq!(loaded.stats.max, 4.0);
        assert_eq!(loaded.stats.min, 0.25);
    }

    #[test]
    fn radiance_hdr_bytes_load_as_float() {
        let mut img = Rgb32FImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgb([4.0, 0.5, 0.25]));
        img.put_pixel(1, 0, image::Rgb([0.0, 0.0, 0.0]));
        let bytes = encode(DynamicImage::ImageRgb32F(img), ImageFormat::Hdr);

        let loaded = load_from_bytes(&bytes, "sky.hdr").unwrap();
        assert!(loaded.is_hdr);
        let p = loaded.pixel(0, 0);
        assert!((p[0] - 4.0).abs() < 1e-2, "{:?}", p);
        assert!((p[1] - 0.5).abs() < 1e-2, "{:?}", p);
        assert!((p[2] - 0.25).abs() < 1e-2, "{:?}", p);
        assert_eq!(p[3], 1.0);
        assert!(loaded.stats.max > 1.0);
    }

    #[test]
    fn openexr_bytes_keep_alpha_and_range() {
        let mut img = Rgba32FImage::new(1, 2);
        img.put_pixel(0, 0, image::Rgba([4.0, 0.5, 0.25, 0.5]));
        img.put_pixel(0, 1, image::Rgba([1.0, 1.0, 1.0, 1.0]));
        let bytes = encode(DynamicImage::ImageRgba32F(img), ImageFormat::OpenExr);

        let loaded = load_from_bytes(&bytes, "render.exr").unwrap();
        assert!(loaded.is_hdr);
        assert_eq!(loaded.size(), (1, 2));
        assert_eq!(loaded.pixel(0, 0), [4.0, 0.5, 0.25, 0.5]);
        assert_eq!(loaded.pixel(0, 1), [1.0; 4]);
    }

    #[test]
    fn truncated_png_fails_to_decode() {
        let img = RgbaImage::from_fn(32, 32, |x, y| image::Rgba([x as u8, y as u8, 7, 255]));
        let bytes = encode(DynamicImage::ImageRgba8(img), ImageFormat::Png);

        let err = load_from_bytes(&bytes[..bytes.len() / 2], "cut.png").unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }), "{:?}", err);
    }

    #[test]
    fn zero_sized_image_is_rejected() {
        let err = into_linear(
            DynamicImage::new_rgb8(0, 0),
            ImageSource {
                name: "void".into(),
                path: None,
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Empty {
                width: 0,
                height: 0,
                ..
            }
        ));
    }

    #[test]
    fn pixel_outside_image_is_zero() {
        let image = HdrImage::from_pixels(
            1,
            1,
            vec![[1.0; 4]],
            ImageSource {
                name: "one".into(),
                path: None,
            },
            true,
        );
        assert_eq!(image.pixel(-1, 0), [0.0; 4]);
        assert_eq!(image.pixel(0, 1), [0.0; 4]);
        assert_eq!(image.pixel(0, 0), [1.0; 4]);
    }

    #[test]
    fn stats_skip_non_finite_values() {
        let pixels = vec![
            [f32::NAN, 1.0, 2.0, 1.0],
            [f32::INFINITY, 3.0, -1.0, 1.0],
        ];
        let stats = ImageStats::compute(&pixels);
        assert_eq!(stats.nan_count, 1);
        assert_eq!(stats.inf_count, 1);
        assert_eq!(stats.min, -1.0);
        assert_eq!(stats.max, 3.0);
        assert!((stats.mean - 1.25).abs() < 1e-6);
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let err = load_from_bytes(b"definitely not an image", "junk").unwrap_err();
        assert!(matches!(err, LoadError::UnknownFormat { .. }));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = load_image(Path::new("/nonexistent/dir/image.png")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn extension_filter_is_case_insensitive() {
        assert!(has_image_extension(Path::new("shot.HDR")));
        assert!(has_image_extension(Path::new("a/b/c.exr")));
        assert!(!has_image_extension(Path::new("notes.txt")));
        assert!(!has_image_extension(Path::new("no_extension")));
    }
}
