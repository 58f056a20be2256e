//! Raster images prepared for embedding as PDF image XObjects
//!
//! JPEG data is embedded unchanged behind a DCTDecode filter. PNG data is
//! decoded to 8-bit samples, split into color and alpha planes and
//! Flate-compressed.

use crate::error::PdfStudioError;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    /// Identify an image by its leading magic bytes
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(JPEG_MAGIC) {
            Some(ImageKind::Jpeg)
        } else if bytes.starts_with(PNG_MAGIC) {
            Some(ImageKind::Png)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    DeviceGray,
    DeviceRgb,
    DeviceCmyk,
}

impl ColorSpace {
    pub fn pdf_name(&self) -> &'static [u8] {
        match self {
            ColorSpace::DeviceGray => b"DeviceGray",
            ColorSpace::DeviceRgb => b"DeviceRGB",
            ColorSpace::DeviceCmyk => b"DeviceCMYK",
        }
    }

    fn from_components(components: u8) -> Result<Self, PdfStudioError> {
        match components {
            1 => Ok(ColorSpace::DeviceGray),
            3 => Ok(ColorSpace::DeviceRgb),
            4 => Ok(ColorSpace::DeviceCmyk),
            n => Err(PdfStudioError::InvalidInput(format!(
                "Unsupported JPEG with {} color components",
                n
            ))),
        }
    }
}

/// Stream filter the image samples are stored under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFilter {
    DctDecode,
    FlateDecode,
}

impl ImageFilter {
    pub fn pdf_name(&self) -> &'static [u8] {
        match self {
            ImageFilter::DctDecode => b"DCTDecode",
            ImageFilter::FlateDecode => b"FlateDecode",
        }
    }
}

/// An image ready to become an XObject
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
    pub filter: ImageFilter,
    /// Encoded sample data, already under `filter`
    pub data: Vec<u8>,
    /// Flate-compressed 8-bit alpha plane
    pub soft_mask: Option<Vec<u8>>,
}

impl RasterImage {
    /// Decode a JPEG or PNG file
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfStudioError> {
        match ImageKind::sniff(bytes) {
            Some(ImageKind::Jpeg) => Self::from_jpeg(bytes),
            Some(ImageKind::Png) => Self::from_png(bytes),
            None => Err(PdfStudioError::InvalidInput(
                "Only JPEG and PNG images can be converted".into(),
            )),
        }
    }

    pub fn from_jpeg(bytes: &[u8]) -> Result<Self, PdfStudioError> {
        let (width, height, components) = read_jpeg_frame(bytes)?;
        Ok(Self {
            width,
            height,
            color_space: ColorSpace::from_components(components)?,
            filter: ImageFilter::DctDecode,
            data: bytes.to_vec(),
            soft_mask: None,
        })
    }

    pub fn from_png(bytes: &[u8]) -> Result<Self, PdfStudioError> {
        let mut decoder = png::Decoder::new(bytes);
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder
            .read_info()
            .map_err(|e| PdfStudioError::InvalidInput(format!("Unreadable PNG: {}", e)))?;

        let mut buffer = vec![0; reader.output_buffer_size()];
        let frame = reader
            .next_frame(&mut buffer)
            .map_err(|e| PdfStudioError::InvalidInput(format!("Unreadable PNG: {}", e)))?;
        buffer.truncate(frame.buffer_size());

        let (color_space, samples, alpha) = match frame.color_type {
            png::ColorType::Grayscale => (ColorSpace::DeviceGray, buffer, None),
            png::ColorType::Rgb => (ColorSpace::DeviceRgb, buffer, None),
            png::ColorType::GrayscaleAlpha => {
                let (gray, alpha) = split_alpha(&buffer, 1);
                (ColorSpace::DeviceGray, gray, Some(alpha))
            }
            png::ColorType::Rgba => {
                let (rgb, alpha) = split_alpha(&buffer, 3);
                (ColorSpace::DeviceRgb, rgb, Some(alpha))
            }
            png::ColorType::Indexed => {
                return Err(PdfStudioError::InvalidInput(
                    "Palette PNG could not be expanded".into(),
                ))
            }
        };

        // Fully opaque alpha planes are not worth a soft mask
        let alpha = alpha.filter(|plane| plane.iter().any(|&a| a != u8::MAX));

        Ok(Self {
            width: frame.width,
            height: frame.height,
            color_space,
            filter: ImageFilter::FlateDecode,
            data: deflate(&samples)?,
            soft_mask: alpha.map(|plane| deflate(&plane)).transpose()?,
        })
    }
}

/// Split interleaved 8-bit samples into color and alpha planes
fn split_alpha(samples: &[u8], color_channels: usize) -> (Vec<u8>, Vec<u8>) {
    let stride = color_channels + 1;
    let pixels = samples.len() / stride;
    let mut color = Vec::with_capacity(pixels * color_channels);
    let mut alpha = Vec::with_capacity(pixels);
    for pixel in samples.chunks_exact(stride) {
        color.extend_from_slice(&pixel[..color_channels]);
        alpha.push(pixel[color_channels]);
    }
    (color, alpha)
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, PdfStudioError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| PdfStudioError::Commit(format!("Image compression failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| PdfStudioError::Commit(format!("Image compression failed: {}", e)))
}

/// Width, height and component count from the first SOF segment
fn read_jpeg_frame(data: &[u8]) -> Result<(u32, u32, u8), PdfStudioError> {
    let truncated = || PdfStudioError::InvalidInput("Truncated JPEG header".into());

    if !data.starts_with(&JPEG_MAGIC[..2]) {
        return Err(PdfStudioError::InvalidInput("Not a JPEG image".into()));
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        let marker = data[pos + 1];
        pos += 2;

        match marker {
            // Fill bytes, stuffed zero, standalone markers
            0xFF | 0x00 | 0x01 | 0xD0..=0xD7 => continue,
            0xD9 | 0xDA => break,
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                let segment = data.get(pos..pos + 8).ok_or_else(truncated)?;
                let height = u16::from_be_bytes([segment[3], segment[4]]) as u32;
                let width = u16::from_be_bytes([segment[5], segment[6]]) as u32;
                let components = segment[7];
                if width == 0 || height == 0 {
                    return Err(PdfStudioError::InvalidInput(
                        "JPEG has zero width or height".into(),
                    ));
                }
                return Ok((width, height, components));
            }
            _ => {
                let length = data.get(pos..pos + 2).ok_or_else(truncated)?;
                pos += u16::from_be_bytes([length[0], length[1]]) as usize;
            }
        }
    }

    Err(PdfStudioError::InvalidInput(
        "Could not find JPEG dimensions".into(),
    ))
}
