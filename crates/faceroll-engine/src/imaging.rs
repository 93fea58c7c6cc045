//! Small helpers around the `image` crate.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};

use crate::error::EnrollmentError;

pub fn decode(bytes: &[u8]) -> Result<DynamicImage, EnrollmentError> {
  image::load_from_memory(bytes).map_err(|e| EnrollmentError::InvalidImage(e.to_string()))
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
  let mut buf = Vec::new();
  image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
  Ok(buf)
}
