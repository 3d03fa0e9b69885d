pub mod contours;
pub mod frame;
pub mod geometry;
pub mod overlay;
pub mod preprocess;
pub mod sampler;

pub use contours::{ContourAnalysis, ContourExtractor, OuterCandidate, SubRegion, SubRegionKind};
pub use frame::{FrameBuffer, RawFrame, RgbaFrame, VideoFrame};
pub use overlay::{encode_jpeg, render_overlay};
pub use preprocess::Preprocessor;
pub use sampler::{FrameSampler, SharedFrameSource, VideoSource};
