//! Enrollment and identification.
//!
//! [`EnrollmentService::enroll`] runs one reference photo through decode,
//! identity lookup, segmentation, detection, validation and persistence, in
//! that order, stopping at the first failing stage. Compositing and the
//! outbound notification come after the descriptor is safely stored and can
//! never undo it.

use std::{future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use faceroll_core::{
  descriptor::{Descriptor, FaceDescriptor},
  detection::{Detection, select_primary},
  detector::{DetectorError, FaceDetector, Segmenter},
  identity::Identity,
  matcher::{DEFAULT_REJECTION_CEILING, EuclideanMatcher, MatchResult, Matcher},
  overlay::OverlayKind,
  store::{CommitGate, FaceStore, TransientError},
};
use image::DynamicImage;
use tracing::instrument;
use uuid::Uuid;

use crate::{
  compositor::Compositor,
  delivery::{EnrollmentEvent, EventPublisher},
  error::EnrollmentError,
  imaging,
};

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EnrollmentConfig {
  pub detector_timeout:   Duration,
  pub store_timeout:      Duration,
  /// Extra attempts after a transient store failure.
  pub store_retries:      u32,
  /// First retry delay; doubles on every further attempt.
  pub retry_backoff:      Duration,
  /// Refuse photos with more than one face instead of picking the largest.
  pub strict_single_face: bool,
  pub rejection_ceiling:  f32,
}

impl Default for EnrollmentConfig {
  fn default() -> Self {
    Self {
      detector_timeout:   Duration::from_secs(10),
      store_timeout:      Duration::from_secs(5),
      store_retries:      2,
      retry_backoff:      Duration::from_millis(50),
      strict_single_face: false,
      rejection_ceiling:  DEFAULT_REJECTION_CEILING,
    }
  }
}

/// No-op segmenter used when no segmentation service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Segmenter for Passthrough {
  async fn segment(&self, image: &[u8]) -> Result<Vec<u8>, DetectorError> { Ok(image.to_vec()) }
}

/// Result of a successful enrollment.
#[derive(Debug, Clone)]
pub struct Enrollment {
  pub descriptor:      FaceDescriptor,
  /// PNG of the (segmented) face the descriptor was computed from.
  pub encoded_image:   Vec<u8>,
  /// PNG with the requested overlay, or the touched-up face when none was
  /// requested. `None` when compositing failed.
  pub decorated_image: Option<Vec<u8>>,
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct EnrollmentService<S, D, G = Passthrough> {
  store:      Arc<S>,
  detector:   Arc<D>,
  segmenter:  Option<Arc<G>>,
  compositor: Option<Arc<Compositor>>,
  publisher:  Option<EventPublisher>,
  matcher:    EuclideanMatcher,
  config:     EnrollmentConfig,
}

impl<S, D, G> Clone for EnrollmentService<S, D, G> {
  fn clone(&self) -> Self {
    Self {
      store:      self.store.clone(),
      detector:   self.detector.clone(),
      segmenter:  self.segmenter.clone(),
      compositor: self.compositor.clone(),
      publisher:  self.publisher.clone(),
      matcher:    self.matcher,
      config:     self.config.clone(),
    }
  }
}

impl<S, D> EnrollmentService<S, D, Passthrough> {
  pub fn new(store: Arc<S>, detector: Arc<D>, config: EnrollmentConfig) -> Self {
    Self {
      store,
      detector,
      segmenter: None,
      compositor: None,
      publisher: None,
      matcher: EuclideanMatcher::with_ceiling(config.rejection_ceiling),
      config,
    }
  }
}

impl<S, D, G> EnrollmentService<S, D, G> {
  pub fn with_segmenter<G2>(self, segmenter: G2) -> EnrollmentService<S, D, G2> {
    self.with_optional_segmenter(Some(segmenter))
  }

  pub fn with_optional_segmenter<G2>(self, segmenter: Option<G2>) -> EnrollmentService<S, D, G2> {
    EnrollmentService {
      store:      self.store,
      detector:   self.detector,
      segmenter:  segmenter.map(Arc::new),
      compositor: self.compositor,
      publisher:  self.publisher,
      matcher:    self.matcher,
      config:     self.config,
    }
  }

  pub fn with_compositor(mut self, compositor: Compositor) -> Self {
    self.compositor = Some(Arc::new(compositor));
    self
  }

  pub fn with_publisher(mut self, publisher: EventPublisher) -> Self {
    self.publisher = Some(publisher);
    self
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn detector(&self) -> &Arc<D> { &self.detector }

  pub fn config(&self) -> &EnrollmentConfig { &self.config }
}

impl<S, D, G> EnrollmentService<S, D, G>
where
  S: FaceStore,
  D: FaceDetector,
  G: Segmenter,
{
  /// Enroll `reference_image` as the new active descriptor of `identity_id`.
  #[instrument(skip_all, fields(identity_id = %identity_id))]
  pub async fn enroll(
    &self,
    identity_id: Uuid,
    reference_image: &[u8],
    overlay: Option<OverlayKind>,
  ) -> Result<Enrollment, EnrollmentError> {
    imaging::decode(reference_image)?;

    let identity = self.identity(identity_id).await?;

    let face_bytes = match &self.segmenter {
      Some(segmenter) => {
        with_deadline(self.config.detector_timeout, segmenter.segment(reference_image)).await?
      }
      None => reference_image.to_vec(),
    };
    let face = image::load_from_memory(&face_bytes).map_err(|e| {
      EnrollmentError::DetectorUnavailable(format!("segmenter returned an unreadable image: {e}"))
    })?;

    let detection = self.detect_one(&face_bytes).await?;
    let descriptor = validated(&detection)?;

    let encoded_image = imaging::encode_png(&face)
      .map_err(|e| EnrollmentError::InvalidImage(e.to_string()))?;

    let record = self
      .persist(identity_id, descriptor, encoded_image.clone())
      .await?;

    tracing::info!(
      descriptor_id = %record.descriptor_id,
      overlay = overlay.map(OverlayKind::as_str),
      "face enrolled"
    );

    let decorated_image = self.decorate(&face, &detection, overlay);
    self.announce(&identity, &record);

    Ok(Enrollment { descriptor: record, encoded_image, decorated_image })
  }

  /// Find the enrolled identity nearest to the primary face in `probe_image`.
  #[instrument(skip_all)]
  pub async fn identify(&self, probe_image: &[u8]) -> Result<MatchResult, EnrollmentError> {
    imaging::decode(probe_image)?;

    let detection = self.detect_one(probe_image).await?;
    let probe = validated(&detection)?;

    let pool = match tokio::time::timeout(self.config.store_timeout, self.store.active_descriptors())
      .await
    {
      Ok(Ok(pool)) => pool,
      Ok(Err(e)) => return Err(EnrollmentError::PersistenceFailure(e.to_string())),
      Err(_) => return Err(EnrollmentError::PersistenceFailure("store timed out".into())),
    };

    let result = self.matcher.best_match(&probe, &pool);
    tracing::debug!(
      pool = pool.len(),
      accepted = result.accepted,
      identity_id = ?result.identity_id,
      "probe matched"
    );
    Ok(result)
  }

  // ── Stages ────────────────────────────────────────────────────────────────

  async fn identity(&self, identity_id: Uuid) -> Result<Identity, EnrollmentError> {
    match tokio::time::timeout(self.config.store_timeout, self.store.get_identity(identity_id)).await {
      Ok(Ok(Some(identity))) => Ok(identity),
      Ok(Ok(None)) => Err(EnrollmentError::IdentityNotFound(identity_id)),
      Ok(Err(e)) => Err(EnrollmentError::PersistenceFailure(e.to_string())),
      Err(_) => Err(EnrollmentError::PersistenceFailure("store timed out".into())),
    }
  }

  async fn detect_one(&self, image: &[u8]) -> Result<Detection, EnrollmentError> {
    let faces = with_deadline(self.config.detector_timeout, self.detector.detect(image)).await?;
    let count = faces.len();
    if count > 1 {
      if self.config.strict_single_face {
        return Err(EnrollmentError::MultipleFacesAmbiguous(count));
      }
      tracing::info!(faces = count, "several faces detected; using the largest");
    }
    select_primary(faces).ok_or(EnrollmentError::NoFaceDetected)
  }

  /// Transient failures are retried with doubling backoff. On timeout the
  /// write's [`CommitGate`] is abandoned so it rolls back; if the backend had
  /// already started committing, its result is awaited instead.
  async fn persist(
    &self,
    identity_id: Uuid,
    descriptor: Descriptor,
    reference_image: Vec<u8>,
  ) -> Result<FaceDescriptor, EnrollmentError> {
    let mut attempt = 0;
    loop {
      let gate = CommitGate::new();
      let call = self.store.replace_active_descriptor(
        identity_id,
        descriptor.clone(),
        reference_image.clone(),
        gate.clone(),
      );
      tokio::pin!(call);

      let result = match tokio::time::timeout(self.config.store_timeout, &mut call).await {
        Ok(result) => result,
        Err(_) if gate.abandon() => {
          tracing::error!(
            timeout_ms = self.config.store_timeout.as_millis() as u64,
            "descriptor write timed out; abandoned"
          );
          return Err(EnrollmentError::PersistenceFailure("store timed out".into()));
        }
        Err(_) => {
          tracing::warn!("descriptor write past its deadline but already committing");
          call.await
        }
      };

      match result {
        Ok(record) => return Ok(record),
        Err(e) if e.is_transient() && attempt < self.config.store_retries => {
          let backoff = self.config.retry_backoff * 2u32.pow(attempt);
          attempt += 1;
          tracing::warn!(attempt, error = %e, "descriptor write failed; retrying");
          tokio::time::sleep(backoff).await;
        }
        Err(e) => {
          tracing::error!(attempts = attempt + 1, error = %e, "descriptor write failed");
          return Err(EnrollmentError::PersistenceFailure(e.to_string()));
        }
      }
    }
  }

  fn decorate(
    &self,
    face: &DynamicImage,
    detection: &Detection,
    overlay: Option<OverlayKind>,
  ) -> Option<Vec<u8>> {
    let decorated = match overlay {
      None => Compositor::touch_up(face),
      Some(kind) => {
        let Some(compositor) = &self.compositor else {
          tracing::warn!(overlay = %kind, "no overlay assets configured; skipping overlay");
          return None;
        };
        match compositor.composite(&face.to_rgba8(), detection.landmarks.as_ref(), kind) {
          Ok(img) => DynamicImage::ImageRgba8(img),
          Err(e) => {
            tracing::warn!(overlay = %kind, error = %e, "overlay failed");
            return None;
          }
        }
      }
    };
    imaging::encode_png(&decorated)
      .map_err(|e| tracing::warn!(error = %e, "could not encode decorated image"))
      .ok()
  }

  fn announce(&self, identity: &Identity, record: &FaceDescriptor) {
    if let Some(publisher) = &self.publisher {
      publisher.publish(EnrollmentEvent::Enrolled {
        identity_id:   identity.identity_id,
        descriptor_id: record.descriptor_id,
        display_name:  identity.display_name.clone(),
        email:         identity.email.clone(),
        phone:         identity.phone.clone(),
        occurred_at:   Utc::now(),
      });
    }
  }
}

fn validated(detection: &Detection) -> Result<Descriptor, EnrollmentError> {
  detection
    .descriptor()
    .map_err(|e| EnrollmentError::DetectorUnavailable(format!("detector returned a bad descriptor: {e}")))
}

async fn with_deadline<T>(
  deadline: Duration,
  call: impl Future<Output = Result<T, DetectorError>>,
) -> Result<T, EnrollmentError> {
  match tokio::time::timeout(deadline, call).await {
    Ok(Ok(value)) => Ok(value),
    Ok(Err(e)) => Err(EnrollmentError::DetectorUnavailable(e.to_string())),
    Err(_) => Err(EnrollmentError::DetectorUnavailable(format!(
      "no answer within {} ms",
      deadline.as_millis()
    ))),
  }
}
