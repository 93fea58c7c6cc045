//! Continuous recognition for an attendance point.
//!
//! A [`RecognitionLoop`] grabs a frame from a [`CaptureSource`] on a fixed
//! cadence, detects every face in it and matches each one against the
//! session's descriptor snapshot. A recognised face becomes an entry or exit
//! event, an unknown face a failed attempt. Events go to the recorder on
//! spawned tasks so a slow recorder never stretches the cadence; how each one
//! fared is reported on the handle's outcome channel.
//!
//! The loop owns its capture source. Stopping it lets the in-flight tick
//! finish, schedules nothing further and releases the source exactly once.

use std::{future::Future, sync::Arc, time::Duration};

use faceroll_core::{
  attendance::{
    AttendanceEvent, AttendanceKind, AttendanceRecorder, NewAttendanceEvent, REASON_UNREGISTERED,
  },
  descriptor::StoredDescriptor,
  detector::FaceDetector,
  matcher::{EuclideanMatcher, Matcher},
  store::FaceStore,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{
  sync::{mpsc, watch},
  task::{JoinError, JoinHandle},
  time::MissedTickBehavior,
};
use tokio_util::sync::{CancellationToken, DropGuard};
use uuid::Uuid;

// ─── Capture ─────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
#[error("capture failed: {0}")]
pub struct CaptureError(pub String);

/// A camera or any other source of encoded frames.
pub trait CaptureSource: Send + 'static {
  fn grab(&mut self) -> impl Future<Output = Result<Vec<u8>, CaptureError>> + Send + '_;

  /// Give the device back. Called once, when the loop ends.
  fn release(&mut self);
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceMode {
  Entry,
  Exit,
}

impl AttendanceMode {
  fn event(self, identity_id: Uuid, snapshot: Vec<u8>, device_code: &str) -> NewAttendanceEvent {
    match self {
      Self::Entry => NewAttendanceEvent::entry(identity_id, snapshot, device_code),
      Self::Exit => NewAttendanceEvent::exit(identity_id, snapshot, device_code),
    }
  }
}

/// Everything a recognition loop needs to know about who can be recognised
/// and what a recognition means.
#[derive(Debug, Clone)]
pub struct RecognitionSession {
  snapshot:    Arc<Vec<StoredDescriptor>>,
  mode:        AttendanceMode,
  device_code: String,
  matcher:     EuclideanMatcher,
}

impl RecognitionSession {
  /// Build a session from the store's current active descriptors.
  pub async fn load<S: FaceStore>(
    store: &S,
    mode: AttendanceMode,
    device_code: impl Into<String>,
    matcher: EuclideanMatcher,
  ) -> Result<Self, S::Error> {
    let snapshot = store.active_descriptors().await?;
    tracing::info!(descriptors = snapshot.len(), ?mode, "recognition session loaded");
    Ok(Self::from_snapshot(snapshot, mode, device_code, matcher))
  }

  pub fn from_snapshot(
    snapshot: Vec<StoredDescriptor>,
    mode: AttendanceMode,
    device_code: impl Into<String>,
    matcher: EuclideanMatcher,
  ) -> Self {
    Self {
      snapshot: Arc::new(snapshot),
      mode,
      device_code: device_code.into(),
      matcher,
    }
  }

  /// Swap in a fresh snapshot; returns its size.
  pub async fn reload<S: FaceStore>(&mut self, store: &S) -> Result<usize, S::Error> {
    let snapshot = store.active_descriptors().await?;
    let len = snapshot.len();
    self.snapshot = Arc::new(snapshot);
    tracing::debug!(descriptors = len, "recognition snapshot reloaded");
    Ok(len)
  }

  /// Whether there is anyone to recognise.
  pub fn is_ready(&self) -> bool { !self.snapshot.is_empty() }

  pub fn mode(&self) -> AttendanceMode { self.mode }

  pub fn device_code(&self) -> &str { &self.device_code }
}

// ─── Loop ────────────────────────────────────────────────────────────────────

/// Cadence and per-call limits for a [`RecognitionLoop`].
#[derive(Debug, Clone)]
pub struct LoopConfig {
  pub interval:         Duration,
  /// Upper bound on one frame grab.
  pub capture_timeout:  Duration,
  pub detector_timeout: Duration,
  /// Upper bound on one recorder call; a late call is reported as failed.
  pub record_timeout:   Duration,
}

impl Default for LoopConfig {
  fn default() -> Self {
    Self {
      interval:         Duration::from_millis(1000),
      capture_timeout:  Duration::from_secs(5),
      detector_timeout: Duration::from_secs(10),
      record_timeout:   Duration::from_secs(5),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopState {
  Idle,
  Detecting,
  Matched,
  Unmatched,
}

/// What happened to one event handed to the recorder.
#[derive(Debug)]
pub enum RecordOutcome {
  Recorded(AttendanceEvent),
  Failed {
    kind:        AttendanceKind,
    identity_id: Option<Uuid>,
    error:       String,
  },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
  /// Ticks that grabbed a frame.
  pub ticks:     u64,
  pub matched:   u64,
  pub unmatched: u64,
}

pub struct RecognitionLoop<C, D, R> {
  session:  RecognitionSession,
  source:   C,
  detector: Arc<D>,
  recorder: Arc<R>,
  state:    watch::Sender<LoopState>,
  outcomes: mpsc::UnboundedSender<RecordOutcome>,
  summary:  LoopSummary,
  config:   LoopConfig,
}

impl<C, D, R> RecognitionLoop<C, D, R>
where
  C: CaptureSource,
  D: FaceDetector + 'static,
  R: AttendanceRecorder + 'static,
{
  /// Spawn the loop. The first tick fires immediately.
  pub fn start(
    session: RecognitionSession,
    source: C,
    detector: Arc<D>,
    recorder: Arc<R>,
    config: LoopConfig,
  ) -> RecognitionHandle {
    let token = CancellationToken::new();
    let (state_tx, state_rx) = watch::channel(LoopState::Idle);
    let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

    let this = Self {
      session,
      source,
      detector,
      recorder,
      state: state_tx,
      outcomes: outcome_tx,
      summary: LoopSummary::default(),
      config,
    };
    let task = tokio::spawn(this.run(token.clone()));

    RecognitionHandle {
      state:    state_rx,
      outcomes: Some(outcome_rx),
      guard:    token.drop_guard(),
      task,
    }
  }

  async fn run(mut self, token: CancellationToken) -> LoopSummary {
    let interval = self.config.interval;
    tracing::info!(
      interval_ms = interval.as_millis() as u64,
      device_code = %self.session.device_code,
      mode = ?self.session.mode,
      "recognition loop started"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
      tokio::select! {
        biased;
        _ = token.cancelled() => break,
        _ = ticker.tick() => self.tick().await,
      }
    }

    self.source.release();
    self.state.send_replace(LoopState::Idle);
    tracing::info!(
      ticks = self.summary.ticks,
      matched = self.summary.matched,
      unmatched = self.summary.unmatched,
      "recognition loop stopped"
    );
    self.summary
  }

  async fn tick(&mut self) {
    if !self.session.is_ready() {
      tracing::trace!("no enrolled descriptors; skipping tick");
      self.state.send_replace(LoopState::Idle);
      return;
    }

    self.state.send_replace(LoopState::Detecting);

    let capture_timeout = self.config.capture_timeout;
    let frame = match tokio::time::timeout(capture_timeout, self.source.grab()).await {
      Ok(Ok(frame)) => frame,
      Ok(Err(e)) => {
        tracing::warn!(error = %e, "frame capture failed");
        self.state.send_replace(LoopState::Idle);
        return;
      }
      Err(_) => {
        tracing::warn!(
          timeout_ms = capture_timeout.as_millis() as u64,
          "frame capture timed out"
        );
        self.state.send_replace(LoopState::Idle);
        return;
      }
    };
    self.summary.ticks += 1;

    let detect = self.detector.detect(&frame);
    let faces = match tokio::time::timeout(self.config.detector_timeout, detect).await {
      Ok(Ok(faces)) => faces,
      Ok(Err(e)) => {
        tracing::warn!(error = %e, "detection failed; waiting for next tick");
        self.state.send_replace(LoopState::Idle);
        return;
      }
      Err(_) => {
        tracing::warn!("detector timed out; waiting for next tick");
        self.state.send_replace(LoopState::Idle);
        return;
      }
    };

    if faces.is_empty() {
      self.state.send_replace(LoopState::Idle);
      return;
    }

    for face in &faces {
      let probe = match face.descriptor() {
        Ok(probe) => probe,
        Err(e) => {
          tracing::warn!(error = %e, "detector returned an unusable descriptor");
          continue;
        }
      };

      let result = self.session.matcher.best_match(&probe, &self.session.snapshot);
      let event = match result.identity_id {
        Some(identity_id) if result.accepted => {
          self.summary.matched += 1;
          self.state.send_replace(LoopState::Matched);
          tracing::debug!(%identity_id, distance = result.distance, "face recognised");
          self
            .session
            .mode
            .event(identity_id, frame.clone(), &self.session.device_code)
        }
        _ => {
          self.summary.unmatched += 1;
          self.state.send_replace(LoopState::Unmatched);
          tracing::debug!("unknown face");
          NewAttendanceEvent::failed_attempt(
            REASON_UNREGISTERED,
            frame.clone(),
            self.session.device_code.as_str(),
          )
        }
      };
      self.dispatch(event);
    }
  }

  fn dispatch(&self, event: NewAttendanceEvent) {
    let recorder = self.recorder.clone();
    let outcomes = self.outcomes.clone();
    let limit = self.config.record_timeout;
    tokio::spawn(async move {
      let kind = event.kind;
      let identity_id = event.identity_id;
      let error = match tokio::time::timeout(limit, recorder.record(event)).await {
        Ok(Ok(recorded)) => {
          let _ = outcomes.send(RecordOutcome::Recorded(recorded));
          return;
        }
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!("recorder gave no answer within {} ms", limit.as_millis()),
      };
      tracing::warn!(%kind, ?identity_id, %error, "attendance event not recorded");
      let outcome = RecordOutcome::Failed { kind, identity_id, error };
      // Nobody listening is fine; the failure was logged above.
      let _ = outcomes.send(outcome);
    });
  }
}

// ─── Handle ──────────────────────────────────────────────────────────────────

/// Controls a running loop. Dropping the handle cancels the loop.
pub struct RecognitionHandle {
  state:    watch::Receiver<LoopState>,
  outcomes: Option<mpsc::UnboundedReceiver<RecordOutcome>>,
  guard:    DropGuard,
  task:     JoinHandle<LoopSummary>,
}

impl RecognitionHandle {
  pub fn state(&self) -> LoopState { *self.state.borrow() }

  pub fn subscribe(&self) -> watch::Receiver<LoopState> { self.state.clone() }

  /// Receiver for recorder outcomes. Only the first call gets it.
  pub fn take_outcomes(&mut self) -> Option<mpsc::UnboundedReceiver<RecordOutcome>> {
    self.outcomes.take()
  }

  /// Cancel the loop and wait for it to wind down.
  pub async fn stop(self) -> Result<LoopSummary, JoinError> {
    self.guard.disarm().cancel();
    self.task.await
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use faceroll_core::{identity::NewIdentity, store::CommitGate};
  use faceroll_store_sqlite::SqliteStore;
  use tokio::sync::Notify;

  use super::*;
  use crate::testing::{FakeDetector, MemoryRecorder, descriptor_values, face};

  const TICK: Duration = Duration::from_millis(10);
  const WAIT: Duration = Duration::from_secs(5);

  fn every(interval: Duration) -> LoopConfig { LoopConfig { interval, ..LoopConfig::default() } }

  #[derive(Clone, Default)]
  struct Counters {
    grabs:    Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
    started:  Arc<Notify>,
  }

  struct FakeCamera {
    counters: Counters,
    delay:    Duration,
  }

  impl FakeCamera {
    fn new(delay: Duration) -> (Self, Counters) {
      let counters = Counters::default();
      (Self { counters: counters.clone(), delay }, counters)
    }
  }

  impl CaptureSource for FakeCamera {
    async fn grab(&mut self) -> Result<Vec<u8>, CaptureError> {
      self.counters.grabs.fetch_add(1, Ordering::SeqCst);
      self.counters.started.notify_one();
      tokio::time::sleep(self.delay).await;
      Ok(b"frame".to_vec())
    }

    fn release(&mut self) { self.counters.releases.fetch_add(1, Ordering::SeqCst); }
  }

  fn stored(identity_id: Uuid, seed: f32) -> StoredDescriptor {
    StoredDescriptor {
      descriptor_id: Uuid::new_v4(),
      identity_id,
      raw: serde_json::to_string(&descriptor_values(seed)).unwrap(),
    }
  }

  fn session(snapshot: Vec<StoredDescriptor>, mode: AttendanceMode) -> RecognitionSession {
    RecognitionSession::from_snapshot(snapshot, mode, "02", EuclideanMatcher::default())
  }

  async fn next(rx: &mut mpsc::UnboundedReceiver<RecordOutcome>) -> RecordOutcome {
    tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap()
  }

  #[tokio::test]
  async fn empty_snapshot_stays_idle() {
    let (camera, counters) = FakeCamera::new(Duration::ZERO);
    let handle = RecognitionLoop::start(
      session(vec![], AttendanceMode::Entry),
      camera,
      Arc::new(FakeDetector::faces(vec![face(0.1, 40.0)])),
      Arc::new(MemoryRecorder::default()),
      every(TICK),
    );

    tokio::time::sleep(TICK * 5).await;
    assert_eq!(handle.state(), LoopState::Idle);
    let summary = handle.stop().await.unwrap();

    assert_eq!(summary, LoopSummary::default());
    assert_eq!(counters.grabs.load(Ordering::SeqCst), 0);
    assert_eq!(counters.releases.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn recognised_face_records_entry() {
    let ana = Uuid::new_v4();
    let recorder = MemoryRecorder::default();
    let (camera, _) = FakeCamera::new(Duration::ZERO);
    let mut handle = RecognitionLoop::start(
      session(vec![stored(ana, 0.1), stored(Uuid::new_v4(), 0.9)], AttendanceMode::Entry),
      camera,
      Arc::new(FakeDetector::faces(vec![face(0.1, 40.0)])),
      Arc::new(recorder.clone()),
      every(TICK),
    );
    let mut outcomes = handle.take_outcomes().unwrap();
    assert!(handle.take_outcomes().is_none());

    let RecordOutcome::Recorded(event) = next(&mut outcomes).await else {
      panic!("expected a recorded event");
    };
    assert_eq!(event.kind, AttendanceKind::Entry);
    assert_eq!(event.identity_id, Some(ana));
    assert_eq!(event.device_code, "02");

    let summary = handle.stop().await.unwrap();
    assert!(summary.matched >= 1);
    assert_eq!(summary.unmatched, 0);
    assert_eq!(recorder.events()[0].snapshot, b"frame");
  }

  #[tokio::test]
  async fn exit_mode_records_exit() {
    let ana = Uuid::new_v4();
    let (camera, _) = FakeCamera::new(Duration::ZERO);
    let mut handle = RecognitionLoop::start(
      session(vec![stored(ana, 0.1)], AttendanceMode::Exit),
      camera,
      Arc::new(FakeDetector::faces(vec![face(0.1, 40.0)])),
      Arc::new(MemoryRecorder::default()),
      every(TICK),
    );
    let mut outcomes = handle.take_outcomes().unwrap();
    let RecordOutcome::Recorded(event) = next(&mut outcomes).await else {
      panic!("expected a recorded event");
    };
    assert_eq!(event.kind, AttendanceKind::Exit);
    handle.stop().await.unwrap();
  }

  #[tokio::test]
  async fn unknown_face_records_failed_attempt() {
    let (camera, _) = FakeCamera::new(Duration::ZERO);
    let mut handle = RecognitionLoop::start(
      session(vec![stored(Uuid::new_v4(), 0.1)], AttendanceMode::Entry),
      camera,
      Arc::new(FakeDetector::faces(vec![face(5.0, 40.0)])),
      Arc::new(MemoryRecorder::default()),
      every(TICK),
    );
    let mut outcomes = handle.take_outcomes().unwrap();

    let RecordOutcome::Recorded(event) = next(&mut outcomes).await else {
      panic!("expected a recorded event");
    };
    assert_eq!(event.kind, AttendanceKind::FailedAttempt);
    assert_eq!(event.identity_id, None);
    assert_eq!(event.reason.as_deref(), Some(REASON_UNREGISTERED));

    let summary = handle.stop().await.unwrap();
    assert_eq!(summary.matched, 0);
    assert!(summary.unmatched >= 1);
  }

  #[tokio::test]
  async fn every_face_in_a_frame_gets_an_event() {
    let ana = Uuid::new_v4();
    let (camera, _) = FakeCamera::new(Duration::ZERO);
    let mut handle = RecognitionLoop::start(
      session(vec![stored(ana, 0.1)], AttendanceMode::Entry),
      camera,
      Arc::new(FakeDetector::faces(vec![face(0.1, 40.0), face(5.0, 30.0)])),
      Arc::new(MemoryRecorder::default()),
      // Long enough that only the first tick runs.
      every(Duration::from_secs(60)),
    );
    let mut outcomes = handle.take_outcomes().unwrap();

    let mut kinds = Vec::new();
    for _ in 0..2 {
      if let RecordOutcome::Recorded(event) = next(&mut outcomes).await {
        kinds.push(event.kind);
      }
    }
    kinds.sort_by_key(|k| k.as_str());
    assert_eq!(kinds, [AttendanceKind::Entry, AttendanceKind::FailedAttempt]);

    let summary = handle.stop().await.unwrap();
    assert_eq!(summary, LoopSummary { ticks: 1, matched: 1, unmatched: 1 });
  }

  #[tokio::test]
  async fn recorder_failures_are_reported() {
    let (camera, _) = FakeCamera::new(Duration::ZERO);
    let mut handle = RecognitionLoop::start(
      session(vec![stored(Uuid::new_v4(), 0.1)], AttendanceMode::Entry),
      camera,
      Arc::new(FakeDetector::faces(vec![face(0.1, 40.0)])),
      Arc::new(MemoryRecorder::offline()),
      every(TICK),
    );
    let mut outcomes = handle.take_outcomes().unwrap();

    let outcome = next(&mut outcomes).await;
    assert!(matches!(
      outcome,
      RecordOutcome::Failed { kind: AttendanceKind::Entry, .. }
    ));
    handle.stop().await.unwrap();
  }

  /// Never answers.
  struct HungRecorder;

  impl AttendanceRecorder for HungRecorder {
    type Error = std::convert::Infallible;

    async fn record(&self, _event: NewAttendanceEvent) -> Result<AttendanceEvent, Self::Error> {
      std::future::pending().await
    }
  }

  #[tokio::test]
  async fn hung_recorder_is_reported_as_failed() {
    let (camera, _) = FakeCamera::new(Duration::ZERO);
    let config = LoopConfig { record_timeout: Duration::from_millis(30), ..every(TICK) };
    let mut handle = RecognitionLoop::start(
      session(vec![stored(Uuid::new_v4(), 0.1)], AttendanceMode::Entry),
      camera,
      Arc::new(FakeDetector::faces(vec![face(0.1, 40.0)])),
      Arc::new(HungRecorder),
      config,
    );
    let mut outcomes = handle.take_outcomes().unwrap();

    let RecordOutcome::Failed { kind, error, .. } = next(&mut outcomes).await else {
      panic!("expected a failed outcome");
    };
    assert_eq!(kind, AttendanceKind::Entry);
    assert!(error.contains("no answer"));
    handle.stop().await.unwrap();
  }

  #[tokio::test]
  async fn hung_camera_does_not_block_stop() {
    let (camera, counters) = FakeCamera::new(Duration::from_secs(3600));
    let config = LoopConfig { capture_timeout: Duration::from_millis(30), ..every(TICK) };
    let handle = RecognitionLoop::start(
      session(vec![stored(Uuid::new_v4(), 0.1)], AttendanceMode::Entry),
      camera,
      Arc::new(FakeDetector::faces(vec![face(0.1, 40.0)])),
      Arc::new(MemoryRecorder::default()),
      config,
    );
    tokio::time::timeout(WAIT, counters.started.notified())
      .await
      .unwrap();

    let summary = tokio::time::timeout(WAIT, handle.stop())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(summary.ticks, 0);
    assert_eq!(counters.releases.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn hung_detector_times_out_per_tick() {
    let (camera, counters) = FakeCamera::new(Duration::ZERO);
    let config = LoopConfig { detector_timeout: Duration::from_millis(20), ..every(TICK) };
    let handle = RecognitionLoop::start(
      session(vec![stored(Uuid::new_v4(), 0.1)], AttendanceMode::Entry),
      camera,
      Arc::new(FakeDetector::hang()),
      Arc::new(MemoryRecorder::default()),
      config,
    );

    tokio::time::timeout(WAIT, async {
      while counters.grabs.load(Ordering::SeqCst) < 3 {
        tokio::time::sleep(TICK).await;
      }
    })
    .await
    .unwrap();

    let summary = handle.stop().await.unwrap();
    assert!(summary.ticks >= 3);
    assert_eq!(summary.matched + summary.unmatched, 0);
  }

  #[tokio::test]
  async fn detector_failure_does_not_stop_the_loop() {
    let (camera, counters) = FakeCamera::new(Duration::ZERO);
    let handle = RecognitionLoop::start(
      session(vec![stored(Uuid::new_v4(), 0.1)], AttendanceMode::Entry),
      camera,
      Arc::new(FakeDetector::down()),
      Arc::new(MemoryRecorder::default()),
      every(TICK),
    );

    tokio::time::timeout(WAIT, async {
      while counters.grabs.load(Ordering::SeqCst) < 3 {
        tokio::time::sleep(TICK).await;
      }
    })
    .await
    .unwrap();

    let summary = handle.stop().await.unwrap();
    assert!(summary.ticks >= 3);
    assert_eq!(summary.matched + summary.unmatched, 0);
  }

  #[tokio::test]
  async fn stop_mid_tick_finishes_tick_and_releases_once() {
    let (camera, counters) = FakeCamera::new(Duration::from_millis(200));
    let handle = RecognitionLoop::start(
      session(vec![stored(Uuid::new_v4(), 0.1)], AttendanceMode::Entry),
      camera,
      Arc::new(FakeDetector::faces(vec![])),
      Arc::new(MemoryRecorder::default()),
      every(TICK),
    );
    let mut states = handle.subscribe();

    tokio::time::timeout(WAIT, counters.started.notified())
      .await
      .unwrap();
    assert_eq!(handle.state(), LoopState::Detecting);

    let summary = handle.stop().await.unwrap();
    assert_eq!(summary.ticks, 1);
    assert_eq!(counters.grabs.load(Ordering::SeqCst), 1);
    assert_eq!(counters.releases.load(Ordering::SeqCst), 1);
    assert_eq!(*states.borrow_and_update(), LoopState::Idle);
  }

  #[tokio::test]
  async fn dropping_the_handle_stops_the_loop() {
    let (camera, counters) = FakeCamera::new(Duration::ZERO);
    let handle = RecognitionLoop::start(
      session(vec![stored(Uuid::new_v4(), 0.1)], AttendanceMode::Entry),
      camera,
      Arc::new(FakeDetector::faces(vec![])),
      Arc::new(MemoryRecorder::default()),
      every(TICK),
    );
    drop(handle);

    tokio::time::timeout(WAIT, async {
      while counters.releases.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(TICK).await;
      }
    })
    .await
    .unwrap();
    assert_eq!(counters.releases.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn session_loads_and_reloads_from_store() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let mut session =
      RecognitionSession::load(&store, AttendanceMode::Entry, "02", EuclideanMatcher::default())
        .await
        .unwrap();
    assert!(!session.is_ready());

    let who = store.create_identity(NewIdentity::new("Ana")).await.unwrap();
    let descriptor = faceroll_core::descriptor::Descriptor::new(descriptor_values(0.1)).unwrap();
    store
      .replace_active_descriptor(who.identity_id, descriptor, vec![], CommitGate::new())
      .await
      .unwrap();

    assert_eq!(session.reload(&store).await.unwrap(), 1);
    assert!(session.is_ready());
    assert_eq!(session.device_code(), "02");
    assert_eq!(session.mode(), AttendanceMode::Entry);
  }
}
