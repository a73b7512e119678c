// Viewer state
// Everything the GUI mutates between frames, independent of egui itself

use crate::cli::ViewerConfig;
use crate::error::LoadError;
use crate::image_loader::HdrImage;
use crate::overlay::BackgroundMode;
use crate::status;
use crate::tonemap::ToneSettings;
use crate::view::ViewTransform;
use eframe::egui::Vec2;
use log::{error, info};

/// Exposure change per key press, in stops
pub const EXPOSURE_STEP: f32 = 0.25;

/// Gamma change per key press
pub const GAMMA_STEP: f32 = 0.02;

/// Default color for [`BackgroundMode::CustomColor`]
pub const DEFAULT_BACKGROUND_COLOR: [f32; 4] = [0.3, 0.3, 0.3, 1.0];

/// Discrete commands triggered by hotkeys and toolbar buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ZoomIn,
    ZoomOut,
    ExposureUp,
    ExposureDown,
    GammaUp,
    GammaDown,
    Fit,
    Center,
    ResetTonemap,
    NormalizeExposure,
}

pub struct ViewerState {
    pub view: ViewTransform,
    pub tone: ToneSettings,
    pub draw_grid: bool,
    pub draw_pixel_info: bool,
    pub background: BackgroundMode,
    pub background_color: [f32; 4],
    /// Last load failure, shown to the user
    pub error: Option<String>,
    image: Option<HdrImage>,
    /// Fit the image once the viewport size is known
    pending_fit: bool,
}

impl ViewerState {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            view: ViewTransform::new(),
            tone: config.tone,
            draw_grid: config.draw_grid,
            draw_pixel_info: config.draw_pixel_info,
            background: config.background,
            background_color: DEFAULT_BACKGROUND_COLOR,
            error: None,
            image: None,
            pending_fit: false,
        }
    }

    pub fn image(&self) -> Option<&HdrImage> {
        self.image.as_ref()
    }

    /// Replace the current image; it is fitted to the viewport on the next frame
    pub fn set_image(&mut self, image: HdrImage) {
        info!(
            "Showing {} ({}x{})",
            image.source.name, image.width, image.height
        );
        self.view.set_image_size(image.width, image.height);
        self.image = Some(image);
        self.error = None;
        self.pending_fit = true;
    }

    /// Record a failed load. The previous image, if any, stays on screen.
    pub fn load_failed(&mut self, err: LoadError) {
        let err = anyhow::Error::new(err);
        error!("{:#}", err);
        self.error = Some(format!("{:#}", err));
    }

    /// Apply a deferred fit. Call after the viewport has been updated.
    pub fn fit_if_pending(&mut self) {
        if self.pending_fit && self.image.is_some() {
            self.view.fit();
            self.pending_fit = false;
        }
    }

    /// Perform an action. Returns false when there is no image to act on.
    pub fn apply(&mut self, action: Action) -> bool {
        let Some(image) = &self.image else {
            return false;
        };

        match action {
            Action::ZoomIn => self.view.zoom_in(),
            Action::ZoomOut => self.view.zoom_out(),
            Action::ExposureUp => self.tone.adjust_exposure(EXPOSURE_STEP),
            Action::ExposureDown => self.tone.adjust_exposure(-EXPOSURE_STEP),
            Action::GammaUp => self.tone.adjust_gamma(GAMMA_STEP),
            Action::GammaDown => self.tone.adjust_gamma(-GAMMA_STEP),
            Action::Fit => self.view.fit(),
            Action::Center => self.view.center(),
            Action::ResetTonemap => self.tone.reset(),
            Action::NormalizeExposure => self.tone.normalize_exposure(image.stats.max),
        }
        true
    }

    /// Status bar text for the pixel under a viewport position
    pub fn hovered_readout(&self, position: Vec2) -> Option<String> {
        let image = self.image.as_ref()?;
        let (x, y) = self.view.hovered_pixel(position)?;
        Some(status::pixel_readout(
            x,
            y,
            image.pixel(x, y),
            self.tone.exposure,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_loader::ImageSource;
    use eframe::egui::{pos2, vec2, Rect};

    fn config() -> ViewerConfig {
        ViewerConfig::default()
    }

    fn image(width: u32, height: u32) -> HdrImage {
        let pixels = (0..width * height)
            .map(|i| [i as f32, 0.5, 0.25, 1.0])
            .collect();
        HdrImage::from_pixels(
            width,
            height,
            pixels,
            ImageSource {
                name: "test".into(),
                path: None,
            },
            true,
        )
    }

    fn state_with_image() -> ViewerState {
        let mut state = ViewerState::new(&config());
        state
            .view
            .set_viewport(Rect::from_min_size(pos2(0.0, 0.0), vec2(100.0, 100.0)));
        state.set_image(image(4, 2));
        state.fit_if_pending();
        state
    }

    #[test]
    fn actions_need_an_image() {
        let mut state = ViewerState::new(&config());
        assert!(!state.apply(Action::ExposureUp));
        assert_eq!(state.tone.exposure, 0.0);
    }

    #[test]
    fn new_image_is_fitted_once_viewport_is_known() {
        let state = state_with_image();
        assert!((state.view.zoom() - 25.0).abs() < 1e-4);
    }

    #[test]
    fn exposure_and_gamma_hotkeys() {
        let mut state = state_with_image();
        state.apply(Action::ExposureUp);
        state.apply(Action::ExposureUp);
        state.apply(Action::ExposureDown);
        assert!((state.tone.exposure - 0.25).abs() < 1e-6);

        state.tone.set_gamma(0.03);
        state.apply(Action::GammaDown);
        state.apply(Action::GammaDown);
        assert!((state.tone.gamma - 0.02).abs() < 1e-6);
        state.apply(Action::GammaUp);
        assert!((state.tone.gamma - 0.04).abs() < 1e-6);
    }

    #[test]
    fn normalize_uses_image_maximum() {
        let mut state = state_with_image();
        // brightest value is pixel index 7
        state.apply(Action::NormalizeExposure);
        assert!((state.tone.exposure + 7.0f32.log2()).abs() < 1e-5);
    }

    #[test]
    fn zoom_keys_and_fit() {
        let mut state = state_with_image();
        state.apply(Action::ZoomIn);
        assert!((state.view.zoom() - 32.0).abs() < 1e-4);
        state.apply(Action::Fit);
        assert!((state.view.zoom() - 25.0).abs() < 1e-4);
        state.apply(Action::ZoomOut);
        assert!((state.view.zoom() - 16.0).abs() < 1e-4);
    }

    #[test]
    fn failed_load_keeps_previous_image() {
        let mut state = state_with_image();
        state.load_failed(LoadError::UnknownFormat {
            name: "broken.xyz".into(),
        });
        assert!(state.image().is_some());
        let message = state.error.clone().unwrap();
        assert!(message.contains("broken.xyz"), "{}", message);

        state.set_image(image(1, 1));
        assert!(state.error.is_none());
    }

    #[test]
    fn readout_only_inside_image() {
        let state = state_with_image();
        // fitted 4x2 image at zoom 25 sits at y = 25..75
        let inside = state.hovered_readout(vec2(30.0, 30.0)).unwrap();
        assert!(inside.starts_with("(   1,   0)"), "{}", inside);
        assert!(state.hovered_readout(vec2(30.0, 10.0)).is_none());
    }
}
