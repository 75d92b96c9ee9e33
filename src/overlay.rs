// src/overlay.rs - Landmark-to-pixel mapping and jewelry compositing
use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::face_mesh::{CHIN, LEFT_EAR, RIGHT_EAR};
use crate::jewelry::{JewelryKind, Selection};
use crate::stability::LandmarkSet;

/// Where a kind of jewelry hangs relative to the face mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorStyle {
    pub landmarks: &'static [usize],
    /// Pixels below the landmark where the top edge of the image sits.
    pub offset_y: f32,
    /// Drawn size as a fraction of the image's natural size.
    pub scale: f32,
}

pub const EARRING_STYLE: AnchorStyle = AnchorStyle {
    landmarks: &[LEFT_EAR, RIGHT_EAR],
    offset_y: 18.0,
    scale: 0.04,
};

pub const NECKLACE_STYLE: AnchorStyle = AnchorStyle {
    landmarks: &[CHIN],
    offset_y: 42.0,
    scale: 0.1,
};

pub fn anchor_style(kind: JewelryKind) -> AnchorStyle {
    match kind {
        JewelryKind::Earring => EARRING_STYLE,
        JewelryKind::Necklace => NECKLACE_STYLE,
    }
}

/// Destination rectangle of one jewelry image, in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Computes where each image of `kind` is drawn for the given landmarks.
///
/// The image is centred horizontally on the anchor and hangs below it.
/// Anchors whose landmark index is outside the set are skipped.
pub fn placements(
    landmarks: &LandmarkSet,
    kind: JewelryKind,
    image_size: (u32, u32),
    frame_size: (u32, u32),
) -> Vec<Placement> {
    let style = anchor_style(kind);
    let (frame_w, frame_h) = (frame_size.0 as f32, frame_size.1 as f32);
    let width = image_size.0 as f32 * style.scale;
    let height = image_size.1 as f32 * style.scale;

    style
        .landmarks
        .iter()
        .filter_map(|&index| landmarks.get(index))
        .map(|point| {
            let anchor_x = point.x as f32 * frame_w;
            let anchor_y = point.y as f32 * frame_h + style.offset_y;
            Placement {
                x: anchor_x - width / 2.0,
                y: anchor_y,
                width,
                height,
            }
        })
        .collect()
}

/// Alpha-blends `image` into `canvas`, clipping at the frame edges.
pub fn draw_placement(canvas: &mut RgbaImage, image: &RgbaImage, placement: &Placement) {
    let width = placement.width.round() as u32;
    let height = placement.height.round() as u32;
    if width == 0 || height == 0 {
        return;
    }

    let resized = imageops::resize(image, width, height, FilterType::Triangle);
    imageops::overlay(
        canvas,
        &resized,
        placement.x.round() as i64,
        placement.y.round() as i64,
    );
}

/// Draws the selected jewelry onto a copy of `frame`.
///
/// Returns the frame unchanged when nothing should render or the image for
/// the current mode has not loaded.
pub fn composite(
    frame: &RgbaImage,
    render_set: Option<&LandmarkSet>,
    selection: &Selection,
) -> RgbaImage {
    let mut canvas = frame.clone();
    let (Some(landmarks), Some(image)) = (render_set, selection.active_image()) else {
        return canvas;
    };

    for placement in placements(landmarks, selection.mode, image.dimensions(), frame.dimensions()) {
        draw_placement(&mut canvas, image, &placement);
    }
    canvas
}
