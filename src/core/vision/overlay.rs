//! 检测结果叠加图与 JPEG 编码（只返回给调用方，不落盘）

use super::contours::{ContourAnalysis, SubRegionKind};
use super::frame::FrameBuffer;
use crate::core::error::DetectorError;
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_line_segment_mut;
use imageproc::point::Point;
use std::io::Cursor;

pub const JPEG_QUALITY: u8 = 90;

const OUTLINE_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);

fn kind_color(kind: SubRegionKind) -> Rgba<u8> {
    match kind {
        SubRegionKind::Photo => Rgba([255, 0, 0, 255]),
        SubRegionKind::Stamp => Rgba([0, 0, 255, 255]),
        SubRegionKind::TextField => Rgba([255, 255, 0, 255]),
        SubRegionKind::Unknown => Rgba([128, 128, 128, 255]),
    }
}

/// 外框绿色加粗，子区域按类型着色
pub fn render_overlay(frame: &FrameBuffer, analysis: &ContourAnalysis) -> RgbaImage {
    let mut canvas = frame.image().clone();

    if let Some(outer) = &analysis.outer {
        for offset in [-1.0f32, 0.0, 1.0] {
            draw_closed_path(&mut canvas, &outer.shape.points, OUTLINE_COLOR, offset);
        }
    }

    for region in &analysis.sub_regions {
        draw_closed_path(&mut canvas, &region.shape.points, kind_color(region.kind), 0.0);
    }

    canvas
}

fn draw_closed_path(canvas: &mut RgbaImage, points: &[Point<i32>], color: Rgba<u8>, offset: f32) {
    if points.len() < 2 {
        return;
    }
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        draw_line_segment_mut(
            canvas,
            (p.x as f32 + offset, p.y as f32 + offset),
            (q.x as f32 + offset, q.y as f32 + offset),
            color,
        );
    }
}

pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, DetectorError> {
    // JPEG 不带 alpha
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut buffer = Cursor::new(Vec::new());
    rgb.write_to(&mut buffer, ImageOutputFormat::Jpeg(quality))?;
    Ok(buffer.into_inner())
}
