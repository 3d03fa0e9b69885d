use thiserror::Error;

/// 调用方可见的错误（误用 / 配置错误）
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Camera is not active")]
    CameraInactive,
    #[error("Detection is already running")]
    AlreadyRunning,
    #[error("No frame available from video source")]
    NoFrame,
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] json5::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Image encode error: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Failed to spawn detection timer: {0}")]
    Spawn(#[from] std::io::Error),
}

/// 外部引擎（OCR / 分类器）错误，只在信号提取器内部处理
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Engine not ready")]
    NotReady,
    #[error("Engine failed: {0}")]
    Failed(String),
}
