//! 取景框采样
//!
//! 从视频源拿当前帧，按固定尺寸居中裁剪（可带外扩边距），输出 FrameBuffer。

use super::frame::{FrameBuffer, VideoFrame};
use crate::core::config::SamplerConfig;
use image::imageops::{self, FilterType};
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// 视频源（相机预览层实现）
pub trait VideoSource: Send + Sync {
    fn is_active(&self) -> bool;

    /// 当前帧；未就绪时返回 None
    fn current_frame(&self) -> Option<VideoFrame>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

pub struct FrameSampler {
    config: SamplerConfig,
}

impl FrameSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    pub fn target_size(&self) -> (u32, u32) {
        (self.config.target_width, self.config.target_height)
    }

    /// 源画面中的居中裁剪区域，超出部分按源尺寸截断
    pub fn crop_window(&self, src_width: u32, src_height: u32) -> Option<CropWindow> {
        if src_width == 0 || src_height == 0 {
            return None;
        }

        let margin = self.config.margin.saturating_mul(2);
        let width = self
            .config
            .target_width
            .saturating_add(margin)
            .min(src_width);
        let height = self
            .config
            .target_height
            .saturating_add(margin)
            .min(src_height);

        Some(CropWindow {
            x: (src_width - width) / 2,
            y: (src_height - height) / 2,
            width,
            height,
        })
    }

    pub fn sample(&self, source: &dyn VideoSource) -> Option<FrameBuffer> {
        let frame = source.current_frame()?;
        self.sample_frame(frame)
    }

    pub fn sample_frame(&self, frame: VideoFrame) -> Option<FrameBuffer> {
        let (src_width, src_height) = frame.dimensions();
        let window = self.crop_window(src_width, src_height)?;
        let frame_number = frame.frame_number();

        let Some(rgba) = frame.into_rgba() else {
            debug!("⚠️ Frame #{} payload does not match {}x{}", frame_number, src_width, src_height);
            return None;
        };

        let cropped = imageops::crop_imm(&rgba, window.x, window.y, window.width, window.height)
            .to_image();

        let (target_width, target_height) = self.target_size();
        let image = if cropped.dimensions() == (target_width, target_height) {
            cropped
        } else {
            imageops::resize(&cropped, target_width, target_height, FilterType::Triangle)
        };

        Some(FrameBuffer::new(image, frame_number))
    }
}

/// 由调用方推送帧的视频源（Flutter 相机回调、测试）
pub struct SharedFrameSource {
    active: AtomicBool,
    frame: Mutex<Option<VideoFrame>>,
}

impl SharedFrameSource {
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            frame: Mutex::new(None),
        }
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
        if !active {
            self.publish(None);
        }
    }

    pub fn publish(&self, frame: Option<VideoFrame>) {
        let mut slot = self.frame.lock().unwrap_or_else(|e| e.into_inner());
        *slot = frame;
    }
}

impl Default for SharedFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoSource for SharedFrameSource {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        if !self.is_active() {
            return None;
        }
        self.frame
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vision::frame::RgbaFrame;

    fn rgba_frame(width: u32, height: u32, fill: u8) -> VideoFrame {
        VideoFrame::Rgba(RgbaFrame {
            width,
            height,
            data: vec![fill; (width * height * 4) as usize],
            frame_number: 7,
        })
    }

    #[test]
    fn test_centered_crop_window() {
        let sampler = FrameSampler::new(SamplerConfig::default());
        let window = sampler.crop_window(1280, 720).unwrap();

        assert_eq!(
            window,
            CropWindow {
                x: 465,
                y: 115,
                width: 350,
                height: 490
            }
        );
    }

    #[test]
    fn test_crop_window_with_margin() {
        let sampler = FrameSampler::new(SamplerConfig {
            margin: 60,
            ..Default::default()
        });
        let window = sampler.crop_window(1280, 720).unwrap();

        assert_eq!(window.width, 470);
        assert_eq!(window.height, 610);
        assert_eq!(window.x, 405);
        assert_eq!(window.y, 55);
    }

    #[test]
    fn test_zero_dimensions_yield_no_frame() {
        let sampler = FrameSampler::new(SamplerConfig::default());
        assert!(sampler.crop_window(0, 720).is_none());
        assert!(sampler.sample_frame(rgba_frame(0, 0, 0)).is_none());
    }

    #[test]
    fn test_sample_has_target_dimensions() {
        let sampler = FrameSampler::new(SamplerConfig {
            margin: 60,
            ..Default::default()
        });

        let buffer = sampler.sample_frame(rgba_frame(1280, 720, 200)).unwrap();
        assert_eq!((buffer.width(), buffer.height()), (350, 490));
        assert_eq!(buffer.frame_number(), 7);

        // 源画面比取景框小时也拉伸到目标尺寸
        let small = sampler.sample_frame(rgba_frame(320, 240, 200)).unwrap();
        assert_eq!((small.width(), small.height()), (350, 490));
    }

    #[test]
    fn test_shared_source_inactive_returns_none() {
        let source = SharedFrameSource::new();
        source.publish(Some(rgba_frame(640, 640, 10)));
        assert!(source.current_frame().is_none());

        source.set_active(true);
        source.publish(Some(rgba_frame(640, 640, 10)));
        let sampler = FrameSampler::new(SamplerConfig::default());
        assert!(sampler.sample(&source).is_some());
    }
}
