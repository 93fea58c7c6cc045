//! Outbound notifications after a successful enrollment.
//!
//! Enrollment publishes onto a bounded queue and moves on. A [`DeliveryWorker`]
//! drains the queue on its own task and hands each event to a [`Notifier`].
//! A slow or broken notifier can delay delivery but can never fail or block an
//! enrollment.

use std::{future::Future, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use uuid::Uuid;

const RETRY_BACKOFF_BASE_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EnrollmentEvent {
  Enrolled {
    identity_id:   Uuid,
    descriptor_id: Uuid,
    display_name:  String,
    email:         Option<String>,
    phone:         Option<String>,
    occurred_at:   DateTime<Utc>,
  },
}

impl EnrollmentEvent {
  pub fn identity_id(&self) -> Uuid {
    match self {
      Self::Enrolled { identity_id, .. } => *identity_id,
    }
  }
}

// ─── Publisher ───────────────────────────────────────────────────────────────

/// Sending half of the delivery queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventPublisher {
  tx: mpsc::Sender<EnrollmentEvent>,
}

impl EventPublisher {
  /// Create a publisher and the receiver a [`DeliveryWorker`] should drain.
  pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<EnrollmentEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (Self { tx }, rx)
  }

  /// Queue `event` without waiting. Returns whether it was queued; a full or
  /// closed queue drops the event with a warning.
  pub fn publish(&self, event: EnrollmentEvent) -> bool {
    match self.tx.try_send(event) {
      Ok(()) => true,
      Err(mpsc::error::TrySendError::Full(event)) => {
        tracing::warn!(
          identity_id = %event.identity_id(),
          "delivery queue full; dropping enrollment event"
        );
        false
      }
      Err(mpsc::error::TrySendError::Closed(event)) => {
        tracing::warn!(
          identity_id = %event.identity_id(),
          "delivery worker gone; dropping enrollment event"
        );
        false
      }
    }
  }
}

// ─── Notifier ────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Transport that tells the enrolled person (mail, SMS, ...).
pub trait Notifier: Send + Sync + 'static {
  fn notify<'a>(
    &'a self,
    event: &'a EnrollmentEvent,
  ) -> impl Future<Output = Result<(), NotifyError>> + Send + 'a;
}

/// Writes one structured log line per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  async fn notify(&self, event: &EnrollmentEvent) -> Result<(), NotifyError> {
    match event {
      EnrollmentEvent::Enrolled { identity_id, descriptor_id, display_name, email, phone, .. } => {
        tracing::info!(
          %identity_id,
          %descriptor_id,
          display_name = %display_name,
          has_email = email.is_some(),
          has_phone = phone.is_some(),
          "enrollment notification"
        );
      }
    }
    Ok(())
  }
}

// ─── Worker ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
  pub delivered: u64,
  pub failed:    u64,
}

pub struct DeliveryWorker;

impl DeliveryWorker {
  /// Drain `rx` until every publisher is dropped. Each event gets one attempt
  /// plus up to `retries` more, with doubling backoff between them.
  pub fn spawn<N: Notifier>(
    mut rx: mpsc::Receiver<EnrollmentEvent>,
    notifier: N,
    retries: u32,
  ) -> JoinHandle<DeliveryStats> {
    tokio::spawn(async move {
      let mut stats = DeliveryStats::default();
      while let Some(event) = rx.recv().await {
        if deliver(&notifier, &event, retries).await {
          stats.delivered += 1;
        } else {
          stats.failed += 1;
        }
      }
      tracing::debug!(
        delivered = stats.delivered,
        failed = stats.failed,
        "delivery worker stopped"
      );
      stats
    })
  }
}

async fn deliver<N: Notifier>(notifier: &N, event: &EnrollmentEvent, retries: u32) -> bool {
  let mut attempt = 0;
  loop {
    match notifier.notify(event).await {
      Ok(()) => return true,
      Err(e) if attempt < retries => {
        attempt += 1;
        tracing::warn!(
          identity_id = %event.identity_id(),
          attempt,
          error = %e,
          "notification failed; retrying"
        );
        let backoff = Duration::from_millis(RETRY_BACKOFF_BASE_MS * 2u64.pow(attempt - 1));
        tokio::time::sleep(backoff).await;
      }
      Err(e) => {
        tracing::error!(
          identity_id = %event.identity_id(),
          error = %e,
          "notification failed; giving up"
        );
        return false;
      }
    }
  }
}
