//! HTTP clients for the external detector/encoder and segmentation services.
//!
//! Both services take `{"image": <base64>}`. The detector answers
//! `{"faces": [Detection, ...]}`, the segmenter `{"face": <base64>}`.

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use faceroll_core::{
  detection::Detection,
  detector::{DetectorError, FaceDetector, Segmenter},
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct ImageRequest {
  image: String,
}

#[derive(Deserialize)]
struct DetectResponse {
  faces: Vec<Detection>,
}

#[derive(Deserialize)]
struct SegmentResponse {
  face: String,
}

fn client(timeout: Duration) -> Result<Client, reqwest::Error> {
  Client::builder().timeout(timeout).build()
}

async fn post_image<T: for<'de> Deserialize<'de>>(
  client: &Client,
  url: &str,
  image: &[u8],
) -> Result<T, DetectorError> {
  let body = ImageRequest { image: STANDARD.encode(image) };

  let response = client
    .post(url)
    .json(&body)
    .send()
    .await
    .map_err(|e| DetectorError::Unavailable(e.to_string()))?;

  let status = response.status();
  if !status.is_success() {
    let text = response.text().await.unwrap_or_default();
    return Err(DetectorError::Unavailable(format!("{url} returned {status}: {text}")));
  }

  let bytes = response
    .bytes()
    .await
    .map_err(|e| DetectorError::Unavailable(e.to_string()))?;
  serde_json::from_slice(&bytes).map_err(|e| DetectorError::InvalidResponse(e.to_string()))
}

// ─── Detector ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HttpDetector {
  client: Client,
  url:    String,
}

impl HttpDetector {
  pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
    Ok(Self { client: client(timeout)?, url: url.into() })
  }
}

impl FaceDetector for HttpDetector {
  async fn detect(&self, image: &[u8]) -> Result<Vec<Detection>, DetectorError> {
    let response: DetectResponse = post_image(&self.client, &self.url, image).await?;
    tracing::debug!(url = %self.url, faces = response.faces.len(), "detector answered");
    Ok(response.faces)
  }
}

// ─── Segmenter ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HttpSegmenter {
  client: Client,
  url:    String,
}

impl HttpSegmenter {
  pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
    Ok(Self { client: client(timeout)?, url: url.into() })
  }
}

impl Segmenter for HttpSegmenter {
  async fn segment(&self, image: &[u8]) -> Result<Vec<u8>, DetectorError> {
    let response: SegmentResponse = post_image(&self.client, &self.url, image).await?;
    STANDARD
      .decode(response.face.as_bytes())
      .map_err(|e| DetectorError::InvalidResponse(format!("face is not base64: {e}")))
  }
}
