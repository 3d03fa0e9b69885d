//! 证件扫描器 - Flutter 侧入口

use crate::api::models::{CameraFrame, DetectionReport, ScanStats};
use crate::core::config::DetectorConfig;
use crate::core::error::DetectorError;
use crate::core::pipeline::DetectionPipeline;
use crate::core::scheduler::{AcceptedDocument, CycleOutcome, DetectionSession, TickDecision};
use crate::core::vision::overlay::{encode_jpeg, render_overlay, JPEG_QUALITY};
use crate::core::vision::FrameBuffer;
use flutter_rust_bridge::frb;
use image::RgbaImage;
use log::{info, warn};
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};

static DEFAULT_CONFIG: Lazy<DetectorConfig> = Lazy::new(DetectorConfig::default);

/// 证件扫描器 - 由 Dart 的相机回调驱动 tick
///
/// ```dart
/// final scanner = DocumentScanner.create();
/// scanner.start(cameraActive: true);
/// // 每 500ms
/// final report = await scanner.onTick(frame: frame);
/// if (report?.accepted ?? false) upload(report!.jpegData!);
/// ```
#[frb(opaque)]
pub struct DocumentScanner {
    pipeline: DetectionPipeline,
    session: DetectionSession,
    accepted: Arc<Mutex<Option<AcceptedDocument>>>,
}

impl DocumentScanner {
    /// 创建扫描器，config_json5 为空时使用默认配置
    #[frb(sync)]
    pub fn create(config_json5: Option<String>) -> Result<Self, DetectorError> {
        crate::init_logging();

        let config = match config_json5 {
            Some(source) => DetectorConfig::from_json5(&source)?,
            None => DEFAULT_CONFIG.clone(),
        };
        let session = DetectionSession::new(config.scheduler.clone())?;
        let pipeline = DetectionPipeline::new(config)?;

        info!("🪪 DocumentScanner: created");
        Ok(Self {
            pipeline,
            session,
            accepted: Arc::new(Mutex::new(None)),
        })
    }

    /// 默认配置（JSON），方便 Dart 侧修改后传回
    #[frb(sync)]
    pub fn default_config_json() -> Result<String, DetectorError> {
        DEFAULT_CONFIG.to_json()
    }

    #[frb(sync)]
    pub fn start(&self, camera_active: bool) -> Result<(), DetectorError> {
        let slot = Arc::clone(&self.accepted);
        self.session.start_detection(camera_active, move |doc| {
            *slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(doc);
        })
    }

    #[frb(sync)]
    pub fn stop(&self) {
        self.session.stop_detection();
    }

    /// 处理一个 tick；上一个周期未结束或扫描器未启动时返回 None
    #[frb]
    pub fn on_tick(&self, frame: CameraFrame) -> Option<DetectionReport> {
        let ticket = match self.session.on_tick() {
            TickDecision::Start(ticket) => ticket,
            TickDecision::Dropped | TickDecision::Inactive => return None,
        };

        let Some(buffer) = self.pipeline.sampler().sample_frame(frame.into()) else {
            self.session.abort_cycle(ticket);
            return None;
        };

        let analysis = self.pipeline.inspect(&buffer);
        let mut report = DetectionReport::from_result(&analysis.result, buffer.frame_number());
        let overlay = (analysis.result.probability >= self.session.threshold())
            .then(|| render_overlay(&buffer, &analysis.contours));

        if self.session.complete_cycle(ticket, buffer, analysis.result) != CycleOutcome::Accepted {
            return Some(report);
        }

        let accepted = self
            .accepted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(doc) = accepted {
            report.accepted = true;
            report.jpeg_data = jpeg_or_none(doc.frame.image());
            report.overlay_jpeg = overlay.as_ref().and_then(jpeg_or_none);
        }
        Some(report)
    }

    /// 单次检测，不经过调度
    #[frb]
    pub fn capture_and_analyze(&self, frame: CameraFrame) -> Result<DetectionReport, DetectorError> {
        let buffer = self
            .pipeline
            .sampler()
            .sample_frame(frame.into())
            .ok_or_else(|| DetectorError::InvalidFrame("frame data does not match its size".into()))?;

        self.report_for(&buffer)
    }

    /// 最近一次结果（不含图片）
    #[frb(sync, getter)]
    pub fn last_result(&self) -> Option<DetectionReport> {
        self.session
            .last_result_with_frame()
            .map(|(result, frame_number)| DetectionReport::from_result(&result, frame_number))
    }

    #[frb(sync)]
    pub fn clear_result(&self) {
        self.session.clear_result();
    }

    #[frb(sync, getter)]
    pub fn is_running(&self) -> bool {
        self.session.is_active()
    }

    #[frb(sync, getter)]
    pub fn stats(&self) -> ScanStats {
        self.session.stats().into()
    }

    fn report_for(&self, buffer: &FrameBuffer) -> Result<DetectionReport, DetectorError> {
        let analysis = self.pipeline.inspect(buffer);
        let mut report = DetectionReport::from_result(&analysis.result, buffer.frame_number());
        report.accepted = analysis.result.probability >= self.session.threshold();
        report.jpeg_data = Some(encode_jpeg(buffer.image(), JPEG_QUALITY)?);
        report.overlay_jpeg = Some(encode_jpeg(
            &render_overlay(buffer, &analysis.contours),
            JPEG_QUALITY,
        )?);
        Ok(report)
    }
}

fn jpeg_or_none(image: &RgbaImage) -> Option<Vec<u8>> {
    match encode_jpeg(image, JPEG_QUALITY) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!("⚠️ JPEG encode failed: {}", e);
            None
        }
    }
}

impl Drop for DocumentScanner {
    fn drop(&mut self) {
        self.session.stop_detection();
        info!("🗑️ DocumentScanner: released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{RgbaFrameData, YuvFrameData};

    fn black_frame(frame_number: u64) -> CameraFrame {
        CameraFrame::Rgba(RgbaFrameData {
            width: 480,
            height: 640,
            rgba: vec![0u8; 480 * 640 * 4],
            frame_number,
        })
    }

    #[test]
    fn test_create_with_config() {
        assert!(DocumentScanner::create(None).is_ok());
        assert!(DocumentScanner::create(Some("{ scheduler: { interval_ms: 300 } }".into())).is_ok());
        assert!(matches!(
            DocumentScanner::create(Some("{ weights: { area: 99 } }".into())),
            Err(DetectorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_default_config_json() {
        let json = DocumentScanner::default_config_json().unwrap();
        assert!(json.contains("\"acceptance_threshold\": 70"));
    }

    #[test]
    fn test_tick_requires_start() {
        let scanner = DocumentScanner::create(None).unwrap();
        assert!(scanner.on_tick(black_frame(1)).is_none());

        assert!(matches!(scanner.start(false), Err(DetectorError::CameraInactive)));
        scanner.start(true).unwrap();
        assert!(scanner.is_running());

        let report = scanner.on_tick(black_frame(2)).unwrap();
        assert_eq!(report.probability, 0);
        assert!(!report.accepted);
        assert!(report.jpeg_data.is_none());
        assert_eq!(report.frame_number, 2);
        let last = scanner.last_result().unwrap();
        assert_eq!(last.probability, 0);
        assert_eq!(last.frame_number, 2);
        assert_eq!(scanner.stats().cycles_completed, 1);
    }

    #[test]
    fn test_accepted_report_carries_jpeg() {
        let scanner =
            DocumentScanner::create(Some("{ scheduler: { acceptance_threshold: 0 } }".into()))
                .unwrap();
        scanner.start(true).unwrap();

        let report = scanner.on_tick(black_frame(5)).unwrap();
        assert!(report.accepted);
        assert!(report.jpeg_data.is_some());
        assert!(report.overlay_jpeg.is_some());
        assert!(!scanner.is_running());
        assert!(scanner.on_tick(black_frame(6)).is_none());
    }

    #[test]
    fn test_invalid_frame_aborts_cycle() {
        let scanner = DocumentScanner::create(None).unwrap();
        scanner.start(true).unwrap();

        let broken = CameraFrame::Rgba(RgbaFrameData {
            width: 480,
            height: 640,
            rgba: vec![0u8; 16],
            frame_number: 1,
        });
        assert!(scanner.on_tick(broken).is_none());
        // 周期被放弃，下一个 tick 可以正常开始
        assert!(scanner.on_tick(black_frame(2)).is_some());
    }

    #[test]
    fn test_capture_and_analyze_yuv() {
        let scanner = DocumentScanner::create(None).unwrap();
        let frame = CameraFrame::Yuv420(YuvFrameData {
            width: 480,
            height: 640,
            y_plane: vec![16u8; 480 * 640],
            u_plane: vec![128u8; 240 * 320],
            v_plane: vec![128u8; 240 * 320],
            frame_number: 9,
        });

        let report = scanner.capture_and_analyze(frame).unwrap();
        assert_eq!(report.frame_number, 9);
        assert!(report.jpeg_data.is_some());

        let empty = CameraFrame::Rgba(RgbaFrameData {
            width: 0,
            height: 0,
            rgba: vec![],
            frame_number: 0,
        });
        assert!(matches!(
            scanner.capture_and_analyze(empty),
            Err(DetectorError::InvalidFrame(_))
        ));
    }
}
