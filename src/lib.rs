pub mod api;
pub mod core;

pub use crate::core::{
    AcceptedDocument, DetectionLoop, DetectionPipeline, DetectionResult, DetectionSession,
    DetectorConfig, DetectorError, LoopHandle, VideoSource,
};

pub fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("doc_scan_lib"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        // 桌面端由宿主进程安装 log 实现
    }
}
