use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use ndarray::{Array3, ArrayView3};

use crate::config::ChannelLayout;
use crate::error::PreprocessError;

/// Spatial size both models were trained on.
pub const TARGET_SIZE: u32 = 200;

pub const ACCEPTED_FORMATS: [ImageFormat; 2] = [ImageFormat::Png, ImageFormat::Jpeg];

/// Grayscale image scaled to [0, 1], shape (1, H, W).
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessedTensor {
    data: Array3<f32>,
}

impl PreprocessedTensor {
    pub fn from_array(data: Array3<f32>) -> Self {
        Self { data }
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn height(&self) -> u32 {
        self.data.dim().1 as u32
    }

    pub fn width(&self) -> u32 {
        self.data.dim().2 as u32
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// Row-major values. A single channel means every layout shares this order.
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    pub fn dims(&self, layout: ChannelLayout) -> Vec<i64> {
        let (n, h, w) = self.data.dim();
        let (n, h, w) = (n as i64, h as i64, w as i64);
        match layout {
            ChannelLayout::Nhw => vec![n, h, w],
            ChannelLayout::Nhwc => vec![n, h, w, 1],
            ChannelLayout::Nchw => vec![n, 1, h, w],
        }
    }
}

pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, PreprocessError> {
    let format = image::guess_format(bytes)
        .map_err(|_| PreprocessError::Decode("data is not a recognised image".to_string()))?;

    if ACCEPTED_FORMATS.contains(&format) {
        Ok(format)
    } else {
        Err(PreprocessError::UnsupportedFormat(
            format!("{:?}", format).to_uppercase(),
        ))
    }
}

pub fn decode(bytes: &[u8]) -> Result<DynamicImage, PreprocessError> {
    let format = detect_format(bytes)?;
    image::load_from_memory_with_format(bytes, format)
        .map_err(|e| PreprocessError::Decode(e.to_string()))
}

/// ITU-R 601-2 luma, the same integer transform used when the models' training
/// images were converted. Alpha is dropped.
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    if let DynamicImage::ImageLuma8(gray) = image {
        return gray.clone();
    }

    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        Luma([luma_601(r, g, b)])
    })
}

fn luma_601(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16) as u8
}

pub fn preprocess_image(image: &DynamicImage) -> PreprocessedTensor {
    let gray = to_grayscale(image);
    let resized = imageops::resize(&gray, TARGET_SIZE, TARGET_SIZE, FilterType::CatmullRom);

    let size = TARGET_SIZE as usize;
    let data = Array3::from_shape_fn((1, size, size), |(_, y, x)| {
        resized.get_pixel(x as u32, y as u32).0[0] as f32 / 255.0
    });

    PreprocessedTensor::from_array(data)
}

pub fn preprocess(bytes: &[u8]) -> Result<PreprocessedTensor, PreprocessError> {
    let image = decode(bytes)?;
    Ok(preprocess_image(&image))
}
