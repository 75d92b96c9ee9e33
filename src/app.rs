// src/app.rs
use std::time::{Duration, Instant};

use eframe::egui;
use image::{DynamicImage, RgbaImage};
use tracing::{error, info, warn};

use crate::face_mesh::ReplayFeed;
use crate::jewelry::{Catalog, JewelryItem, JewelryKind, JewelryLoader, Selection};
use crate::overlay;
use crate::settings::AppSettings;
use crate::snapshot::{SessionLog, SnapshotExporter};
use crate::tracking::{FaceTracker, TrackingResult};
use crate::ui::{UIComponents, VideoWidget};
use crate::video::VideoSource;

const STATUS_TIMEOUT: Duration = Duration::from_secs(6);

struct StatusMessage {
    text: String,
    is_error: bool,
    shown_at: Instant,
}

pub struct TryOnApp {
    // Core components
    video_source: VideoSource,
    tracker: FaceTracker,
    loader: JewelryLoader,
    catalog: Catalog,
    selection: Selection,
    exporter: SnapshotExporter,
    session_log: SessionLog,

    // UI State
    ui_components: UIComponents,
    video_widget: VideoWidget,
    show_settings: bool,
    show_about: bool,
    show_landmarks: bool,
    paused: bool,
    status: Option<StatusMessage>,

    // Latest frame
    last_result: Option<TrackingResult>,
    last_composite: Option<RgbaImage>,

    settings: AppSettings,
}

/// Uses the configured landmark replay when it loads, otherwise the
/// simulated face.
fn build_tracker(settings: &AppSettings) -> FaceTracker {
    let mut tracker = FaceTracker::simulated(settings.stability);
    if let Some(path) = &settings.replay_file {
        match ReplayFeed::load(path) {
            Ok(feed) => tracker.set_provider(Box::new(feed)),
            Err(e) => warn!("Falling back to simulated face: {}", e),
        }
    }
    tracker
}

impl TryOnApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: AppSettings, loader: JewelryLoader) -> Self {
        let mut app = Self {
            video_source: VideoSource::blank(),
            tracker: build_tracker(&settings),
            loader,
            catalog: Catalog::new(&settings.assets_dir),
            selection: Selection::default(),
            exporter: SnapshotExporter::new(&settings.output_directory),
            session_log: SessionLog::new(None, settings.log_capacity),
            ui_components: UIComponents::new(&cc.egui_ctx, &settings.assets_dir),
            video_widget: VideoWidget::default(),
            show_settings: false,
            show_about: false,
            show_landmarks: false,
            paused: false,
            status: None,
            last_result: None,
            last_composite: None,
            settings,
        };
        app.connect_camera();
        app
    }

    fn connect_camera(&mut self) {
        match VideoSource::new_camera(self.settings.camera_index, self.settings.mirror) {
            Ok(source) => {
                self.video_source = source;
                self.set_status(
                    format!("Camera {} connected", self.settings.camera_index),
                    false,
                );
            }
            Err(e) => {
                error!("Camera unavailable: {:#}", e);
                self.video_source = VideoSource::blank();
                self.set_status(
                    "Camera access denied or unavailable; showing a blank frame",
                    true,
                );
            }
        }
        self.tracker.reset();
    }

    fn set_status(&mut self, text: impl Into<String>, is_error: bool) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error,
            shown_at: Instant::now(),
        });
    }

    /// Grabs a frame, runs the tracker and composites the jewelry.
    fn process_next_frame(&mut self, ctx: &egui::Context) {
        let frame = match self.video_source.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Frame capture failed: {:#}", e);
                self.set_status(format!("Frame capture failed: {}", e), true);
                return;
            }
        };

        let result = self.tracker.process_frame(&frame);
        self.session_log.add_frame(&result);

        let composite = overlay::composite(
            &frame.to_rgba8(),
            result.render_set.as_ref(),
            &self.selection,
        );
        self.video_widget
            .update_frame(ctx, &DynamicImage::ImageRgba8(composite.clone()));

        self.last_composite = Some(composite);
        self.last_result = Some(result);
    }

    fn select_item(&mut self, item: &JewelryItem) {
        info!(item = %item.label(), "selected jewelry");
        self.loader.select(item, &mut self.selection);
    }

    fn take_snapshot(&mut self) {
        let Some(frame) = self.last_composite.as_ref() else {
            self.set_status("No frame to capture yet", true);
            return;
        };
        match self.exporter.save(frame) {
            Ok(path) => self.set_status(format!("Saved {}", path.display()), false),
            Err(e) => {
                warn!("Snapshot failed: {}", e);
                self.set_status(format!("Snapshot failed: {}", e), true);
            }
        }
    }

    fn share_snapshot(&mut self) {
        let Some(frame) = self.last_composite.clone() else {
            self.set_status("No frame to share yet", true);
            return;
        };

        let Some(path) = rfd::FileDialog::new()
            .set_title("Share snapshot")
            .set_file_name(SnapshotExporter::snapshot_file_name())
            .add_filter("PNG image", &["png"])
            .save_file()
        else {
            return;
        };

        match self.exporter.save_to(&frame, &path) {
            Ok(()) => self.set_status(format!("Saved {}", path.display()), false),
            Err(e) => {
                warn!("Share failed: {}", e);
                self.set_status(format!("Share failed: {}", e), true);
            }
        }
    }

    fn export_log(&mut self) {
        if self.session_log.is_empty() {
            self.set_status("Nothing to export yet", true);
            return;
        }
        match self.session_log.export_csv(self.exporter.output_dir()) {
            Ok(path) => self.set_status(format!("Exported {}", path.display()), false),
            Err(e) => {
                warn!("Log export failed: {}", e);
                self.set_status(format!("Log export failed: {}", e), true);
            }
        }
    }

    fn render_header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(8.0);
            egui::menu::bar(ui, |ui| {
                ui.horizontal(|ui| {
                    if let Some(logo) = self.ui_components.logo_texture.as_ref() {
                        ui.image((logo.id(), egui::vec2(32.0, 32.0)));
                    }
                    ui.heading("Jewelry Try-On");
                });

                ui.separator();

                ui.horizontal(|ui| {
                    for kind in JewelryKind::ALL {
                        ui.selectable_value(&mut self.selection.mode, kind, kind.label());
                    }
                });

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("ℹ About").clicked() {
                        self.show_about = !self.show_about;
                    }
                    if ui.button("⚙ Settings").clicked() {
                        self.show_settings = !self.show_settings;
                    }
                    ui.checkbox(&mut self.show_landmarks, "Anchors");
                    ui.checkbox(&mut self.paused, "Pause");
                });
            });
            ui.add_space(8.0);
        });
    }

    fn render_options(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("options").show(ctx, |ui| {
            ui.add_space(8.0);
            let mut clicked: Option<JewelryItem> = None;

            for kind in JewelryKind::ALL {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(format!("{}s", kind.label())).strong());
                    let items: Vec<JewelryItem> = self.catalog.items_of(kind).cloned().collect();
                    for item in items {
                        let response = match self.ui_components.thumbnail(ctx, &item) {
                            Some(texture) => ui
                                .add(egui::ImageButton::new((
                                    texture.id(),
                                    egui::vec2(40.0, 40.0),
                                )))
                                .on_hover_text(item.label()),
                            None => ui.add_sized([56.0, 46.0], egui::Button::new(item.label())),
                        };
                        if response.clicked() {
                            clicked = Some(item);
                        }
                    }
                });
            }

            if let Some(item) = clicked {
                self.select_item(&item);
            }

            ui.separator();

            ui.horizontal(|ui| {
                if ui.button("📷 Snapshot").clicked() {
                    self.take_snapshot();
                }
                if ui.button("📤 Share…").clicked() {
                    self.share_snapshot();
                }
                if ui.button("Export Log").clicked() {
                    self.export_log();
                }

                ui.separator();

                let max_hold = self.tracker.config().max_hold;
                let hold = self.last_result.as_ref().map_or(0, |r| r.hold_frames);
                self.ui_components.draw_hold_bar(ui, hold, max_hold);

                let metrics = self.tracker.metrics();
                ui.label(format!(
                    "{:.0} fps | rendering {:.0}% | {}",
                    metrics.avg_fps,
                    metrics.render_ratio * 100.0,
                    self.tracker.provider_name()
                ));

                if self.loader.pending() > 0 {
                    ui.spinner();
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if let Some(status) = &self.status {
                        let color = if status.is_error {
                            self.ui_components.theme.error
                        } else {
                            self.ui_components.theme.text_secondary
                        };
                        ui.colored_label(color, status.text.as_str());
                    }
                });
            });
            ui.add_space(8.0);
        });
    }

    fn render_main_content(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                let rect = self.video_widget.show(ui);
                if self.show_landmarks {
                    if let Some(landmarks) =
                        self.last_result.as_ref().and_then(|r| r.render_set.as_ref())
                    {
                        self.ui_components
                            .draw_anchor_markers(ui.painter(), rect, landmarks);
                    }
                }
            });
        });
    }

    fn render_settings_window(&mut self, ctx: &egui::Context) {
        let mut open = self.show_settings;
        let mut reconnect = false;
        let mut save = false;
        let mut browse = false;

        egui::Window::new("Settings")
            .open(&mut open)
            .resizable(true)
            .default_size([360.0, 420.0])
            .show(ctx, |ui| {
                ui.heading("Stability");

                ui.label("Stability threshold (mean landmark drift):");
                ui.add(
                    egui::Slider::new(
                        &mut self.settings.stability.stability_threshold,
                        0.0005..=0.05,
                    )
                    .logarithmic(true),
                );

                ui.label("Hold frames after losing a stable face:");
                ui.add(egui::Slider::new(&mut self.settings.stability.max_hold, 0..=30));

                ui.separator();
                ui.heading("Camera");

                ui.horizontal(|ui| {
                    ui.label("Camera index:");
                    ui.add(egui::DragValue::new(&mut self.settings.camera_index).clamp_range(0..=16));
                    if ui.button("Reconnect").clicked() {
                        reconnect = true;
                    }
                });
                ui.checkbox(&mut self.settings.mirror, "Mirror video");
                let info = self.video_source.info();
                ui.label(format!(
                    "{} ({}x{} @ {:.0} fps)",
                    info.label, info.width, info.height, info.fps
                ));

                ui.separator();
                ui.heading("Output");

                ui.label(self.settings.output_directory.display().to_string());
                if ui.button("Browse...").clicked() {
                    browse = true;
                }

                ui.separator();
                if ui.button("Save settings").clicked() {
                    save = true;
                }
            });
        self.show_settings = open;

        if browse {
            if let Some(dir) = rfd::FileDialog::new()
                .set_directory(&self.settings.output_directory)
                .pick_folder()
            {
                self.exporter.set_output_dir(&dir);
                self.settings.output_directory = dir;
            }
        }
        if reconnect {
            self.connect_camera();
        }
        if save {
            match self.settings.save_default_location() {
                Ok(Some(path)) => self.set_status(format!("Settings saved to {}", path.display()), false),
                Ok(None) => self.set_status("No settings directory on this platform", true),
                Err(e) => self.set_status(format!("Failed to save settings: {}", e), true),
            }
        }
    }

    fn render_about_window(&mut self, ctx: &egui::Context) {
        egui::Window::new("About")
            .open(&mut self.show_about)
            .resizable(false)
            .default_size([360.0, 240.0])
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.heading("Jewelry Try-On");
                    ui.label(format!("Version {}", env!("CARGO_PKG_VERSION")));
                    ui.add_space(16.0);
                    ui.label("Earrings and necklaces anchored to face landmarks,");
                    ui.label("held steady through jitter and brief dropouts.");
                });
            });
    }
}

impl eframe::App for TryOnApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.loader.poll(&mut self.selection);

        self.tracker.set_config(self.settings.stability);
        self.video_source.set_mirror(self.settings.mirror);

        if !self.paused {
            self.process_next_frame(ctx);
        }

        if self
            .status
            .as_ref()
            .is_some_and(|s| s.shown_at.elapsed() > STATUS_TIMEOUT)
        {
            self.status = None;
        }

        self.render_header(ctx);
        self.render_options(ctx);

        if self.show_settings {
            self.render_settings_window(ctx);
        }
        if self.show_about {
            self.render_about_window(ctx);
        }

        self.render_main_content(ctx);

        ctx.request_repaint();
    }
}
