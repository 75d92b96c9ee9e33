// src/ui.rs - Theme, textures and custom widgets
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use eframe::egui::{self, Color32, Pos2, Rect, Stroke, Vec2};
use image::DynamicImage;
use tracing::debug;
use usvg::TreeParsing;

use crate::face_mesh::{CHIN, LEFT_EAR, RIGHT_EAR};
use crate::jewelry::JewelryItem;
use crate::stability::LandmarkSet;

const THUMBNAIL_SIZE: u32 = 64;

#[derive(Debug, Clone)]
pub struct Theme {
    pub primary: Color32,
    pub secondary: Color32,
    pub surface: Color32,
    pub error: Color32,
    pub warning: Color32,
    pub success: Color32,
    pub text_primary: Color32,
    pub text_secondary: Color32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Color32::from_rgb(198, 160, 82),
            secondary: Color32::from_rgb(120, 170, 230),
            surface: Color32::from_rgb(30, 30, 35),
            error: Color32::from_rgb(244, 67, 54),
            warning: Color32::from_rgb(255, 152, 0),
            success: Color32::from_rgb(76, 175, 80),
            text_primary: Color32::WHITE,
            text_secondary: Color32::from_rgb(200, 200, 200),
        }
    }
}

pub struct UIComponents {
    pub logo_texture: Option<egui::TextureHandle>,
    pub theme: Theme,
    thumbnails: HashMap<PathBuf, Option<egui::TextureHandle>>,
}

impl UIComponents {
    pub fn new(ctx: &egui::Context, assets_dir: &Path) -> Self {
        let mut components = Self {
            logo_texture: None,
            theme: Theme::default(),
            thumbnails: HashMap::new(),
        };

        let logo_path = assets_dir.join("logo.svg");
        match load_svg_as_rgba(&logo_path, 256) {
            Ok(logo_rgba) => {
                let color_image = egui::ColorImage::from_rgba_unmultiplied([256, 256], &logo_rgba);
                components.logo_texture =
                    Some(ctx.load_texture("logo", color_image, Default::default()));
            }
            Err(e) => debug!(path = %logo_path.display(), "no logo: {}", e),
        }

        components
    }

    /// Forgets cached thumbnails so they are reloaded from disk.
    pub fn clear_thumbnails(&mut self) {
        self.thumbnails.clear();
    }

    /// Thumbnail for a catalog button; `None` when the image is missing.
    pub fn thumbnail(
        &mut self,
        ctx: &egui::Context,
        item: &JewelryItem,
    ) -> Option<&egui::TextureHandle> {
        self.thumbnails
            .entry(item.path.clone())
            .or_insert_with(|| {
                let img = image::open(&item.path).ok()?;
                let thumb = img.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE);
                Some(ctx.load_texture(
                    item.label(),
                    to_color_image(&thumb),
                    egui::TextureOptions::LINEAR,
                ))
            })
            .as_ref()
    }

    /// Bar showing how many more frames the last stable landmarks are used.
    pub fn draw_hold_bar(&self, ui: &mut egui::Ui, hold_frames: u32, max_hold: u32) {
        ui.horizontal(|ui| {
            ui.label("Hold:");

            let bar_width = 120.0;
            let bar_height = 14.0;
            let rect = ui.allocate_space(Vec2::new(bar_width, bar_height)).1;
            let painter = ui.painter();

            painter.rect_filled(rect, egui::Rounding::same(4.0), self.theme.surface);

            let value = if max_hold == 0 {
                0.0
            } else {
                hold_frames as f32 / max_hold as f32
            };
            let fill_rect = Rect::from_min_size(rect.min, Vec2::new(bar_width * value, bar_height));
            let color = if hold_frames == max_hold && max_hold > 0 {
                self.theme.success
            } else if hold_frames > 0 {
                self.theme.warning
            } else {
                self.theme.error
            };
            painter.rect_filled(fill_rect, egui::Rounding::same(4.0), color);

            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                format!("{}/{}", hold_frames, max_hold),
                egui::FontId::proportional(11.0),
                self.theme.text_primary,
            );
        });
    }

    /// Marks the anchor landmarks inside the video rectangle.
    pub fn draw_anchor_markers(&self, painter: &egui::Painter, rect: Rect, landmarks: &LandmarkSet) {
        for index in [LEFT_EAR, RIGHT_EAR, CHIN] {
            if let Some(point) = landmarks.get(index) {
                let pos = Pos2::new(
                    rect.left() + point.x as f32 * rect.width(),
                    rect.top() + point.y as f32 * rect.height(),
                );
                painter.circle_filled(pos, 3.0, self.theme.secondary);
                painter.circle_stroke(pos, 5.0, Stroke::new(1.0, self.theme.text_primary));
            }
        }
    }
}

pub fn to_color_image(frame: &DynamicImage) -> egui::ColorImage {
    let size = [frame.width() as usize, frame.height() as usize];
    let rgba = frame.to_rgba8();
    egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_flat_samples().as_slice())
}

fn load_svg_as_rgba(path: &Path, size: u32) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let svg_data = std::fs::read_to_string(path)?;
    let opt = usvg::Options::default();
    let tree = usvg::Tree::from_str(&svg_data, &opt)?;

    let pixmap_size = tree.size.to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size, size).ok_or("invalid pixmap size")?;

    let scale = size as f32 / pixmap_size.width().max(pixmap_size.height()) as f32;
    let transform = resvg::tiny_skia::Transform::from_scale(scale, scale);
    resvg::Tree::from_usvg(&tree).render(transform, &mut pixmap.as_mut());

    Ok(pixmap.data().to_vec())
}

/// Live video view backed by a single reusable texture.
pub struct VideoWidget {
    texture: Option<egui::TextureHandle>,
    aspect_ratio: f32,
}

impl Default for VideoWidget {
    fn default() -> Self {
        Self {
            texture: None,
            aspect_ratio: 4.0 / 3.0,
        }
    }
}

impl VideoWidget {
    pub fn update_frame(&mut self, ctx: &egui::Context, frame: &DynamicImage) {
        if frame.height() > 0 {
            self.aspect_ratio = frame.width() as f32 / frame.height() as f32;
        }

        let color_image = to_color_image(frame);
        match self.texture.as_mut() {
            Some(texture) => texture.set(color_image, egui::TextureOptions::LINEAR),
            None => {
                self.texture =
                    Some(ctx.load_texture("video_frame", color_image, egui::TextureOptions::LINEAR));
            }
        }
    }

    /// Draws the latest frame, scaled to fit, and returns the rectangle used.
    pub fn show(&self, ui: &mut egui::Ui) -> Rect {
        let available = ui.available_size();
        let mut size = Vec2::new(available.x, available.x / self.aspect_ratio);
        if size.y > available.y {
            size = Vec2::new(available.y * self.aspect_ratio, available.y);
        }

        let (rect, _response) = ui.allocate_exact_size(size, egui::Sense::hover());

        if let Some(texture) = &self.texture {
            ui.painter().image(
                texture.id(),
                rect,
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );
        } else {
            ui.painter()
                .rect_filled(rect, egui::Rounding::same(4.0), Color32::from_rgb(50, 50, 55));
            ui.painter().text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "No Video Signal",
                egui::FontId::proportional(16.0),
                Color32::from_rgb(150, 150, 155),
            );
        }
        rect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_image_matches_frame_size() {
        let frame = DynamicImage::new_rgba8(7, 3);
        let color = to_color_image(&frame);
        assert_eq!(color.size, [7, 3]);
    }

    #[test]
    fn missing_logo_is_an_error() {
        assert!(load_svg_as_rgba(Path::new("no/such/logo.svg"), 32).is_err());
    }
}
