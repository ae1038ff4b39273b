//! Texture images
//!
//! Decodes image files into CPU-side RGBA pixels. Upload happens later,
//! through [`RenderContext::create_texture`](super::RenderContext::create_texture),
//! when a material is first bound.

use std::path::Path;

use image::GenericImageView;

/// Decoded RGBA8 pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl TextureImage {
    /// Load an image from a file path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| TextureError::IoError(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Decode raw bytes (PNG, JPEG)
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes cannot be decoded as an image
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TextureError> {
        let img =
            image::load_from_memory(bytes).map_err(|e| TextureError::DecodeError(e.to_string()))?;
        Ok(Self::from_image(&img))
    }

    /// Convert a decoded image
    #[must_use]
    pub fn from_image(img: &image::DynamicImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            rgba: img.to_rgba8().into_raw(),
        }
    }

    /// Wrap raw RGBA data
    ///
    /// # Errors
    ///
    /// Returns an error if `rgba` does not hold exactly `width * height` pixels
    pub fn from_rgba(rgba: Vec<u8>, width: u32, height: u32) -> Result<Self, TextureError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(TextureError::DecodeError(format!(
                "expected {expected} bytes for {width}x{height}, got {}",
                rgba.len()
            )));
        }
        Ok(Self { width, height, rgba })
    }

    /// A 1x1 white image
    #[must_use]
    pub fn white() -> Self {
        Self::solid_color([255, 255, 255, 255])
    }

    /// A 1x1 image of the given color
    #[must_use]
    pub fn solid_color(color: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            rgba: color.to_vec(),
        }
    }

    /// Width in pixels
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Pixel data, row by row
    #[must_use]
    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }
}

/// Errors that can occur during image loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureError {
    /// IO error reading file
    IoError(String),
    /// Error decoding image data
    DecodeError(String),
}

impl std::fmt::Display for TextureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IoError(e) => write!(f, "IO error: {e}"),
            Self::DecodeError(e) => write!(f, "Decode error: {e}"),
        }
    }
}

impl std::error::Error for TextureError {}
