// src/video.rs - Webcam capture and still-frame sources
use anyhow::{anyhow, Context, Result};
use image::{DynamicImage, RgbImage, RgbaImage};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::Camera;
use tracing::{debug, info, warn};

pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 480;

pub enum VideoSource {
    Camera { camera: Camera, mirror: bool },
    Still(DynamicImage),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub label: String,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

/// Names of the cameras the platform backend can see.
pub fn list_cameras() -> Result<Vec<String>> {
    let cameras = nokhwa::query(ApiBackend::Auto)
        .map_err(|e| anyhow!("Failed to query cameras: {}", e))?;
    Ok(cameras.iter().map(|c| c.human_name()).collect())
}

impl VideoSource {
    pub fn new_camera(index: u32, mirror: bool) -> Result<Self> {
        debug!(index, "opening camera");

        let format = CameraFormat::new(
            Resolution::new(DEFAULT_WIDTH, DEFAULT_HEIGHT),
            FrameFormat::MJPEG,
            30,
        );
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

        let mut camera = Camera::new(CameraIndex::Index(index), requested)
            .map_err(|e| anyhow!("Failed to open camera {}: {}", index, e))?;
        camera
            .open_stream()
            .map_err(|e| anyhow!("Failed to open camera stream: {}", e))?;

        let resolution = camera.resolution();
        info!(
            index,
            width = resolution.width(),
            height = resolution.height(),
            fps = camera.frame_rate(),
            "camera opened"
        );
        Ok(VideoSource::Camera { camera, mirror })
    }

    /// A source that returns the same frame forever.
    pub fn still(frame: DynamicImage) -> Self {
        VideoSource::Still(frame)
    }

    pub fn blank() -> Self {
        Self::still(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            DEFAULT_WIDTH,
            DEFAULT_HEIGHT,
            image::Rgba([24, 24, 28, 255]),
        )))
    }

    pub fn is_camera(&self) -> bool {
        matches!(self, VideoSource::Camera { .. })
    }

    pub fn set_mirror(&mut self, enabled: bool) {
        if let VideoSource::Camera { mirror, .. } = self {
            *mirror = enabled;
        }
    }

    pub fn read_frame(&mut self) -> Result<DynamicImage> {
        match self {
            VideoSource::Camera { camera, mirror } => {
                if !camera.is_stream_open() {
                    camera
                        .open_stream()
                        .map_err(|e| anyhow!("Failed to reopen camera stream: {}", e))?;
                }

                let frame = camera
                    .frame()
                    .map_err(|e| anyhow!("Failed to capture frame: {}", e))?;
                let decoded = frame
                    .decode_image::<RgbFormat>()
                    .map_err(|e| anyhow!("Failed to decode frame: {}", e))?;

                let (width, height) = (decoded.width(), decoded.height());
                let rgb = RgbImage::from_raw(width, height, decoded.into_raw())
                    .ok_or_else(|| anyhow!("Failed to create image buffer"))?;
                let rgba = DynamicImage::ImageRgb8(rgb).to_rgba8();
                let rgba = if *mirror {
                    image::imageops::flip_horizontal(&rgba)
                } else {
                    rgba
                };
                Ok(DynamicImage::ImageRgba8(rgba))
            }
            VideoSource::Still(frame) => Ok(frame.clone()),
        }
    }

    pub fn info(&self) -> VideoInfo {
        match self {
            VideoSource::Camera { camera, .. } => {
                let resolution = camera.resolution();
                VideoInfo {
                    label: camera.info().human_name(),
                    fps: camera.frame_rate() as f64,
                    width: resolution.width(),
                    height: resolution.height(),
                }
            }
            VideoSource::Still(frame) => VideoInfo {
                label: "still frame".to_string(),
                fps: 0.0,
                width: frame.width(),
                height: frame.height(),
            },
        }
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        if let VideoSource::Camera { camera, .. } = self {
            if let Err(e) = camera.stop_stream() {
                warn!("Failed to stop camera stream: {}", e);
            }
        }
    }
}

/// Loads an image file as a still video source.
pub fn still_from_file(path: &std::path::Path) -> Result<VideoSource> {
    let frame = image::open(path)
        .with_context(|| format!("Failed to open still frame {}", path.display()))?;
    Ok(VideoSource::still(frame))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn still_source_repeats_frame() {
        let mut source = VideoSource::blank();
        assert!(!source.is_camera());

        let a = source.read_frame().unwrap();
        let b = source.read_frame().unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());

        let info = source.info();
        assert_eq!((info.width, info.height), (DEFAULT_WIDTH, DEFAULT_HEIGHT));
    }

    #[test]
    fn missing_still_file_is_an_error() {
        assert!(still_from_file(std::path::Path::new("does/not/exist.png")).is_err());
    }
}
