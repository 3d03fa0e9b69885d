use image::{DynamicImage, RgbImage, RgbaImage};

/// 一个检测周期使用的帧（已裁剪到取景框尺寸），周期结束即释放
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    image: RgbaImage,
    frame_number: u64,
}

impl FrameBuffer {
    pub fn new(image: RgbaImage, frame_number: u64) -> Self {
        Self {
            image,
            frame_number,
        }
    }

    /// 从 RGBA 字节构造，长度不符返回 None
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>, frame_number: u64) -> Option<Self> {
        RgbaImage::from_raw(width, height, data).map(|image| Self::new(image, frame_number))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn pixel_count(&self) -> usize {
        (self.width() * self.height()) as usize
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn to_rgb(&self) -> RgbImage {
        DynamicImage::ImageRgba8(self.image.clone()).to_rgb8()
    }
}

/// 视频源交出来的原始帧
#[derive(Debug, Clone)]
pub enum VideoFrame {
    Rgba(RgbaFrame),
    Yuv420(RawFrame),
}

impl VideoFrame {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            VideoFrame::Rgba(f) => (f.width, f.height),
            VideoFrame::Yuv420(f) => (f.width, f.height),
        }
    }

    pub fn frame_number(&self) -> u64 {
        match self {
            VideoFrame::Rgba(f) => f.frame_number,
            VideoFrame::Yuv420(f) => f.frame_number,
        }
    }

    pub fn into_rgba(self) -> Option<RgbaImage> {
        match self {
            VideoFrame::Rgba(f) => RgbaImage::from_raw(f.width, f.height, f.data),
            VideoFrame::Yuv420(f) => f.to_rgba(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RgbaFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub frame_number: u64,
}

/// 从原生层传递的 YUV420 平面数据
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub y_plane: Vec<u8>,
    pub u_plane: Vec<u8>,
    pub v_plane: Vec<u8>,
    pub frame_number: u64,
}

impl RawFrame {
    pub fn to_rgba(&self) -> Option<RgbaImage> {
        let w = self.width as usize;
        let h = self.height as usize;
        let chroma_w = (w + 1) / 2;
        let chroma_len = chroma_w * ((h + 1) / 2);

        if self.y_plane.len() < w * h
            || self.u_plane.len() < chroma_len
            || self.v_plane.len() < chroma_len
        {
            return None;
        }

        let mut rgba_data = vec![0u8; w * h * 4];

        for y in 0..h {
            for x in 0..w {
                let y_idx = y * w + x;
                let uv_idx = (y / 2) * chroma_w + x / 2;

                let y_val = self.y_plane[y_idx] as f32;
                let u_val = self.u_plane[uv_idx] as f32 - 128.0;
                let v_val = self.v_plane[uv_idx] as f32 - 128.0;

                let r = (y_val + 1.402 * v_val).clamp(0.0, 255.0) as u8;
                let g = (y_val - 0.344136 * u_val - 0.714136 * v_val).clamp(0.0, 255.0) as u8;
                let b = (y_val + 1.772 * u_val).clamp(0.0, 255.0) as u8;

                let rgba_idx = y_idx * 4;
                rgba_data[rgba_idx] = r;
                rgba_data[rgba_idx + 1] = g;
                rgba_data[rgba_idx + 2] = b;
                rgba_data[rgba_idx + 3] = 255;
            }
        }

        RgbaImage::from_raw(self.width, self.height, rgba_data)
    }
}
