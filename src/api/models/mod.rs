pub mod scan;

pub use scan::{CameraFrame, DetectionReport, RgbaFrameData, ScanStats, YuvFrameData};
