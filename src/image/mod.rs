//! Grayscale image views and owned buffers used by the correlation stages.
//!
//! `ImageView` borrows a 1D buffer as a 2D grid with an explicit stride (the
//! number of elements between row starts). ROI views share the backing slice
//! and keep the parent stride. `OwnedImage` is the contiguous grayscale
//! buffer produced by preprocessing and template scaling.
//!
//! Color input arrives as `image::RgbImage`; [`to_gray`] reduces it to the
//! single-channel form every correlation stage works on.

use crate::util::{ScreenMatchError, ScreenMatchResult};
use image::{GrayImage, RgbImage};

#[cfg(feature = "image-io")]
pub mod io;

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> ScreenMatchResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(
        data: &'a [T],
        width: usize,
        height: usize,
        stride: usize,
    ) -> ScreenMatchResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(ScreenMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.stride + x)
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.stride;
        self.data.get(start..start + self.width)
    }

    /// Iterates over all rows from top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &'a [T]> + '_ {
        // Construction guarantees every row lies inside `data`.
        (0..self.height).map(move |y| {
            let start = y * self.stride;
            &self.data[start..start + self.width]
        })
    }

    /// Returns a zero-copy ROI view into the same backing buffer.
    pub fn roi(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> ScreenMatchResult<ImageView<'a, T>> {
        if width == 0 || height == 0 {
            return Err(ScreenMatchError::InvalidDimensions { width, height });
        }
        let out_of_bounds = ScreenMatchError::RoiOutOfBounds {
            x,
            y,
            width,
            height,
            img_width: self.width,
            img_height: self.height,
        };
        let end_x = x.checked_add(width).ok_or_else(|| out_of_bounds.clone())?;
        let end_y = y.checked_add(height).ok_or_else(|| out_of_bounds.clone())?;
        if end_x > self.width || end_y > self.height {
            return Err(out_of_bounds);
        }

        let start = y * self.stride + x;
        let data = self
            .data
            .get(start..)
            .ok_or(ScreenMatchError::BufferTooSmall {
                needed: start.saturating_add(1),
                got: self.data.len(),
            })?;
        ImageView::new(data, width, height, self.stride)
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> ScreenMatchResult<usize> {
    if width == 0 || height == 0 {
        return Err(ScreenMatchError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(ScreenMatchError::InvalidStride { width, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(ScreenMatchError::InvalidDimensions { width, height })
}

/// Owned contiguous grayscale image buffer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OwnedImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl OwnedImage {
    /// Creates an owned image from a contiguous row-major buffer.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> ScreenMatchResult<Self> {
        if width == 0 || height == 0 {
            return Err(ScreenMatchError::InvalidDimensions { width, height });
        }
        let needed = width
            .checked_mul(height)
            .ok_or(ScreenMatchError::InvalidDimensions { width, height })?;
        if data.len() != needed {
            return Err(ScreenMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Copies a (possibly strided) view into a contiguous buffer.
    pub fn from_view(view: ImageView<'_, u8>) -> Self {
        let mut data = Vec::with_capacity(view.width() * view.height());
        for row in view.rows() {
            data.extend_from_slice(row);
        }
        Self {
            data,
            width: view.width(),
            height: view.height(),
        }
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_, u8> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the contiguous pixel buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Converts into an `image::GrayImage` without copying.
    pub fn into_gray_image(self) -> GrayImage {
        let (width, height) = (self.width as u32, self.height as u32);
        GrayImage::from_raw(width, height, self.data)
            .unwrap_or_else(|| GrayImage::new(width, height))
    }
}

/// Creates a borrowed view from a grayscale image buffer.
pub fn view_from_gray_image(img: &GrayImage) -> ScreenMatchResult<ImageView<'_, u8>> {
    ImageView::from_slice(img.as_raw(), img.width() as usize, img.height() as usize)
}

/// Creates an owned image from a grayscale image buffer.
pub fn owned_from_gray_image(img: &GrayImage) -> ScreenMatchResult<OwnedImage> {
    OwnedImage::new(
        img.as_raw().clone(),
        img.width() as usize,
        img.height() as usize,
    )
}

/// Converts a color image to grayscale.
///
/// Empty images are rejected so callers can treat the result as a valid
/// search input.
pub fn to_gray(img: &RgbImage) -> ScreenMatchResult<OwnedImage> {
    let gray = image::imageops::grayscale(img);
    owned_from_gray_image(&gray)
}

/// Copies a rectangular region out of a color image.
pub(crate) fn crop_rgb(
    img: &RgbImage,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
) -> ScreenMatchResult<RgbImage> {
    let img_width = img.width() as usize;
    let img_height = img.height() as usize;
    if width == 0 || height == 0 {
        return Err(ScreenMatchError::InvalidDimensions { width, height });
    }
    if x + width > img_width || y + height > img_height {
        return Err(ScreenMatchError::RoiOutOfBounds {
            x,
            y,
            width,
            height,
            img_width,
            img_height,
        });
    }
    Ok(image::imageops::crop_imm(img, x as u32, y as u32, width as u32, height as u32).to_image())
}
