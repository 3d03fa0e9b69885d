use crate::core::fuser::DetectionResult;
use crate::core::scheduler::SessionStats;
use crate::core::vision::{RawFrame, RgbaFrame, VideoFrame};
use serde::{Deserialize, Serialize};

/// Dart 侧传入的相机帧
#[derive(Debug, Clone)]
pub enum CameraFrame {
    Rgba(RgbaFrameData),
    Yuv420(YuvFrameData),
}

#[derive(Debug, Clone)]
pub struct RgbaFrameData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    pub frame_number: u64,
}

/// YUV420 三平面（Android CameraX / iOS 420f）
#[derive(Debug, Clone)]
pub struct YuvFrameData {
    pub width: u32,
    pub height: u32,
    pub y_plane: Vec<u8>,
    pub u_plane: Vec<u8>,
    pub v_plane: Vec<u8>,
    pub frame_number: u64,
}

impl From<CameraFrame> for VideoFrame {
    fn from(frame: CameraFrame) -> Self {
        match frame {
            CameraFrame::Rgba(f) => VideoFrame::Rgba(RgbaFrame {
                width: f.width,
                height: f.height,
                data: f.rgba,
                frame_number: f.frame_number,
            }),
            CameraFrame::Yuv420(f) => VideoFrame::Yuv420(RawFrame {
                width: f.width,
                height: f.height,
                y_plane: f.y_plane,
                u_plane: f.u_plane,
                v_plane: f.v_plane,
                frame_number: f.frame_number,
            }),
        }
    }
}

/// 检测报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    pub probability: u8,
    pub features: Vec<String>,
    /// DetectionStats 的 JSON
    #[serde(rename = "statsJson")]
    pub stats_json: String,
    pub accepted: bool,
    #[serde(rename = "frameNumber")]
    pub frame_number: u64,
    /// 取景框 JPEG（仅被接受或单次检测时）
    #[serde(skip)]
    pub jpeg_data: Option<Vec<u8>>,
    /// 叠加轮廓后的 JPEG
    #[serde(skip)]
    pub overlay_jpeg: Option<Vec<u8>>,
}

impl DetectionReport {
    pub fn from_result(result: &DetectionResult, frame_number: u64) -> Self {
        Self {
            probability: result.probability,
            features: result.features.clone(),
            stats_json: serde_json::to_string(&result.stats).unwrap_or_default(),
            accepted: false,
            frame_number,
            jpeg_data: None,
            overlay_jpeg: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanStats {
    pub cycles_started: u64,
    pub cycles_completed: u64,
    pub dropped_ticks: u64,
    pub discarded_results: u64,
}

impl From<SessionStats> for ScanStats {
    fn from(stats: SessionStats) -> Self {
        Self {
            cycles_started: stats.cycles_started,
            cycles_completed: stats.cycles_completed,
            dropped_ticks: stats.dropped_ticks,
            discarded_results: stats.discarded_results,
        }
    }
}
