// Viewer application
// The eframe app: panels, input routing, texture upload and overlay drawing

use crate::cli::ViewerConfig;
use crate::image_loader::{self, HdrImage};
use crate::overlay::{self, BackgroundMode};
use crate::state::{Action, ViewerState};
use crate::status;
use crate::tonemap::{self, Channel, ToneSettings, EXPOSURE_RANGE, GAMMA_RANGE};
use eframe::egui::{self, Color32, Key, Vec2};
use log::{debug, warn};
use std::path::Path;

/// Scroll distance egui reports for one mouse wheel notch
const SCROLL_POINTS_PER_NOTCH: f32 = 50.0;

/// Zoom levels per mouse wheel notch
const ZOOM_LEVELS_PER_NOTCH: f32 = 2.5;

/// Color of the viewport around the image
const CLEAR_COLOR: Color32 = Color32::from_gray(38);

/// Nearest-neighbour when magnified so individual pixels stay crisp
const TEXTURE_OPTIONS: egui::TextureOptions = egui::TextureOptions {
    minification: egui::TextureFilter::Linear,
    ..egui::TextureOptions::NEAREST
};

/// Keys checked each frame, in priority order
const HOTKEYS: [Key; 7] = [
    Key::Minus,
    Key::Equals,
    Key::Plus,
    Key::E,
    Key::G,
    Key::F,
    Key::C,
];

/// Map a key press to a viewer action
pub fn hotkey_action(key: Key, shift: bool) -> Option<Action> {
    match key {
        Key::Minus => Some(Action::ZoomOut),
        Key::Equals | Key::Plus => Some(Action::ZoomIn),
        Key::E if shift => Some(Action::ExposureUp),
        Key::E => Some(Action::ExposureDown),
        Key::G if shift => Some(Action::GammaUp),
        Key::G => Some(Action::GammaDown),
        Key::F => Some(Action::Fit),
        Key::C => Some(Action::Center),
        _ => None,
    }
}

pub struct HdrViewer {
    state: ViewerState,
    texture: Option<egui::TextureHandle>,
    /// Tone settings the current texture was rendered with
    rendered: Option<ToneSettings>,
}

impl HdrViewer {
    pub fn new(cc: &eframe::CreationContext<'_>, config: ViewerConfig) -> Self {
        let mut viewer = Self {
            state: ViewerState::new(&config),
            texture: None,
            rendered: None,
        };

        if let Some(path) = &config.image_path {
            viewer.open_path(&cc.egui_ctx, path);
        }

        viewer
    }

    fn open_path(&mut self, ctx: &egui::Context, path: &Path) {
        match image_loader::load_image(path) {
            Ok(image) => self.show_image(ctx, image),
            Err(e) => self.state.load_failed(e),
        }
    }

    fn show_image(&mut self, ctx: &egui::Context, image: HdrImage) {
        ctx.send_viewport_cmd(egui::ViewportCommand::Title(format!(
            "hdrpeek - {}",
            image.source.name
        )));
        self.state.set_image(image);
        self.rendered = None;
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        let Some(file) = dropped.into_iter().next() else {
            return;
        };

        if let Some(path) = &file.path {
            if !image_loader::has_image_extension(path) {
                warn!("Dropped file {} has an unfamiliar extension", path.display());
            }
            self.open_path(ctx, path);
        } else if let Some(bytes) = &file.bytes {
            match image_loader::load_from_bytes(bytes, &file.name) {
                Ok(image) => self.show_image(ctx, image),
                Err(e) => self.state.load_failed(e),
            }
        }
    }

    fn process_hotkeys(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() || self.state.image().is_none() {
            return;
        }

        let action = ctx.input(|i| {
            HOTKEYS
                .iter()
                .find(|&&key| i.key_pressed(key))
                .and_then(|&key| hotkey_action(key, i.modifiers.shift))
        });

        if let Some(action) = action {
            debug!("Hotkey action {:?}", action);
            self.state.apply(action);
        }
    }

    /// Re-tonemap the image into the texture when the image or the settings changed
    fn refresh_texture(&mut self, ctx: &egui::Context) {
        let Some(image) = self.state.image() else {
            return;
        };
        if self.texture.is_some() && self.rendered == Some(self.state.tone) {
            return;
        }

        let max_side = ctx.input(|i| i.max_texture_side);
        let display = tonemap::render_display_image(image, &self.state.tone, max_side);
        // rendered is reset for every new image, so this warns once per image
        if self.rendered.is_none() && display.is_subsampled() {
            warn!(
                "Image {}x{} exceeds the texture limit of {}, displaying every {} pixel",
                image.width, image.height, max_side, display.stride
            );
        }
        debug!(
            "Tonemapped {}x{} texture (stride {})",
            display.width, display.height, display.stride
        );
        let color_image = egui::ColorImage::from_rgba_unmultiplied(display.size(), &display.rgba);

        match &mut self.texture {
            Some(texture) => texture.set(color_image, TEXTURE_OPTIONS),
            None => {
                self.texture = Some(ctx.load_texture("image", color_image, TEXTURE_OPTIONS));
            }
        }
        self.rendered = Some(self.state.tone);
    }

    fn handle_pointer(&mut self, ctx: &egui::Context, response: &egui::Response) {
        let origin = self.state.view.viewport().min;

        if response.dragged_by(egui::PointerButton::Primary) {
            if let Some(pos) = response.interact_pointer_pos() {
                let delta = response.drag_delta();
                let p = pos - origin;
                self.state.view.pan_by(delta, p - delta);
            }
            return;
        }

        let Some(pos) = response.hover_pos() else {
            return;
        };
        let p = pos - origin;

        let (scroll, shift, zoom_delta) =
            ctx.input(|i| (i.raw_scroll_delta, i.modifiers.shift, i.zoom_delta()));

        if zoom_delta != 1.0 {
            self.state.view.zoom_by_factor(zoom_delta, p);
        } else if shift {
            if scroll != Vec2::ZERO {
                self.state.view.pan_by(scroll, p);
            }
        } else if scroll.y != 0.0 {
            let amount = scroll.y / SCROLL_POINTS_PER_NOTCH * ZOOM_LEVELS_PER_NOTCH;
            self.state.view.zoom_by(amount, p);
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        let has_image = self.state.image().is_some();
        let mut action = None;

        ui.horizontal(|ui| {
            let tone = &mut self.state.tone;

            ui.label("EV:");
            ui.add(egui::Slider::new(&mut tone.exposure, EXPOSURE_RANGE).fixed_decimals(2));

            if ui
                .add_enabled(has_image, egui::Button::new("Normalize"))
                .on_hover_text("Map the brightest value to 1.0")
                .clicked()
            {
                action = Some(Action::NormalizeExposure);
            }
            if ui
                .add_enabled(has_image, egui::Button::new("Reset"))
                .on_hover_text("Exposure 0, sRGB curve")
                .clicked()
            {
                action = Some(Action::ResetTonemap);
            }

            ui.separator();
            ui.checkbox(&mut tone.srgb, "sRGB");
            ui.add_enabled_ui(!tone.srgb, |ui| {
                ui.label("Gamma:");
                ui.add(egui::Slider::new(&mut tone.gamma, GAMMA_RANGE).fixed_decimals(3));
            });

            ui.separator();
            ui.checkbox(&mut self.state.draw_grid, "Grid");
            ui.checkbox(&mut self.state.draw_pixel_info, "RGB values");
        });

        if let Some(action) = action {
            self.state.apply(action);
        }
    }

    fn side_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("File");
        match self.state.image() {
            Some(image) => {
                let name = ui.label(&image.source.name);
                if let Some(path) = &image.source.path {
                    name.on_hover_text(path.display().to_string());
                }
                let (width, height) = image.size();
                ui.label(format!(
                    "{} x {} {}",
                    width,
                    height,
                    if image.is_hdr { "HDR" } else { "LDR" }
                ));
                let stats = &image.stats;
                egui::Grid::new("stats").num_columns(2).show(ui, |ui| {
                    ui.label("min");
                    ui.monospace(format!("{:.4}", stats.min));
                    ui.end_row();
                    ui.label("max");
                    ui.monospace(format!("{:.4}", stats.max));
                    ui.end_row();
                    ui.label("mean");
                    ui.monospace(format!("{:.4}", stats.mean));
                    ui.end_row();
                    if stats.nan_count > 0 || stats.inf_count > 0 {
                        ui.label("NaN / Inf");
                        ui.monospace(format!("{} / {}", stats.nan_count, stats.inf_count));
                        ui.end_row();
                    }
                });
            }
            None => {
                ui.label("No image loaded");
            }
        }

        ui.separator();
        ui.heading("View");
        ui.add_enabled_ui(self.state.image().is_some(), |ui| {
            let view = &mut self.state.view;
            let mut level = view.zoom_level();
            ui.horizontal(|ui| {
                ui.label("Zoom level");
                if ui
                    .add(egui::DragValue::new(&mut level).speed(0.1).fixed_decimals(1))
                    .changed()
                {
                    view.set_zoom_level(level);
                }
            });
            let offset = view.offset();
            ui.label(format!("Offset {:.0}, {:.0}", offset.x, offset.y));
            ui.label(format!("Pixel ratio {:.2}", view.pixel_ratio()));
            ui.horizontal(|ui| {
                if ui.button("Fit").clicked() {
                    view.fit();
                }
                if ui
                    .button("1:1")
                    .on_hover_text("One image pixel per screen pixel")
                    .clicked()
                {
                    view.set_zoom(1.0 / view.pixel_ratio());
                }
                if ui.button("Center").clicked() {
                    view.center();
                }
            });
        });

        ui.separator();
        ui.add_enabled_ui(self.state.image().is_some(), |ui| {
            let tone = &mut self.state.tone;
            egui::ComboBox::from_label("Channel")
                .selected_text(tone.channel.name())
                .show_ui(ui, |ui| {
                    for channel in Channel::ALL {
                        if ui
                            .selectable_value(&mut tone.channel, channel, channel.name())
                            .changed()
                        {
                            debug!("Switching to channel {}", channel.name());
                        }
                    }
                });

            egui::ComboBox::from_label("Background")
                .selected_text(self.state.background.name())
                .show_ui(ui, |ui| {
                    for mode in BackgroundMode::ALL {
                        if ui
                            .selectable_value(&mut self.state.background, mode, mode.name())
                            .changed()
                        {
                            debug!("Switching to background {}", mode.name());
                        }
                    }
                });

            if self.state.background == BackgroundMode::CustomColor {
                ui.horizontal(|ui| {
                    ui.label("Color");
                    ui.color_edit_button_rgba_unmultiplied(&mut self.state.background_color);
                });
            }

            ui.checkbox(&mut self.state.tone.clamp_to_ldr, "Clamp to LDR");
            ui.checkbox(&mut self.state.tone.dither, "Dither");
        });
    }

    fn status_bar(&self, ctx: &egui::Context, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if let Some(err) = &self.state.error {
                ui.colored_label(Color32::RED, err);
            } else if let Some(pos) = ctx.pointer_hover_pos() {
                let view = &self.state.view;
                if view.viewport().contains(pos) {
                    if let Some(text) = self.state.hovered_readout(pos - view.viewport().min) {
                        ui.monospace(text);
                    }
                }
            }

            if self.state.image().is_some() {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.monospace(status::zoom_readout(self.state.view.real_zoom()));
                });
            }
        });
    }

    fn viewport(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        if self.state.image().is_none() {
            ui.centered_and_justified(|ui| match &self.state.error {
                Some(err) => ui.colored_label(Color32::RED, err),
                None => ui.label("Drop an image here or pass one on the command line"),
            });
            return;
        }

        let available_size = ui.available_size();
        let (rect, response) = ui.allocate_exact_size(available_size, egui::Sense::drag());

        self.state.view.set_viewport(rect);
        self.state.view.set_pixel_ratio(ctx.pixels_per_point());
        self.state.fit_if_pending();
        self.handle_pointer(ctx, &response);

        let Some(image) = self.state.image() else {
            return;
        };
        let view = &self.state.view;
        let painter = ui.painter_at(rect);

        overlay::draw_background(&painter, view, self.state.background, self.state.background_color);
        if let Some(texture) = &self.texture {
            painter.image(
                texture.id(),
                view.image_rect(),
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }
        if self.state.draw_pixel_info {
            overlay::draw_pixel_info(&painter, view, image);
        }
        if self.state.draw_grid {
            overlay::draw_pixel_grid(&painter, view);
        }
        overlay::draw_image_border(&painter, view);
    }
}

impl eframe::App for HdrViewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_dropped_files(ctx);
        self.process_hotkeys(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.toolbar(ui));
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| self.status_bar(ctx, ui));
        egui::SidePanel::left("file")
            .resizable(true)
            .default_width(220.0)
            .show(ctx, |ui| self.side_panel(ui));

        self.refresh_texture(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(CLEAR_COLOR))
            .show(ctx, |ui| self.viewport(ctx, ui));
    }
}
