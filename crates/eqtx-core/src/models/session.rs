//! The per-view session aggregate and its state transitions.
//!
//! A session is created empty, mutated in place by each pipeline stage and
//! dropped with the view. Asynchronous stages hold a [`RequestTicket`]; a
//! result is applied only while its ticket is still current, so the most
//! recently started request always wins regardless of completion order.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::explain::RenderedSegment;
use crate::input::ImageInput;

/// Markup shown while recognition is in flight.
pub const RECOGNIZING_PLACEHOLDER: &str = "Recognizing equation...";

/// Markup shown when the service found no equation.
pub const NO_EQUATION_PLACEHOLDER: &str = "No equation was found in the image.";

/// Explanation shown while the explanation request is in flight.
pub const EXPLAINING_PLACEHOLDER: &str = "Generating explanation...";

/// Explanation shown when the service returned nothing.
pub const NO_EXPLANATION_PLACEHOLDER: &str = "No explanation was found.";

/// Where an export goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    #[default]
    Download,
    Clipboard,
}

/// What a clipboard export tries to place. Ignored for downloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Raster,
    Vector,
}

/// A transient success message that hides itself after a fixed duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub shown_at: DateTime<Utc>,
    pub duration: Duration,
}

impl Notification {
    /// Whether the notification is still visible at `now`.
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.shown_at && now - self.shown_at < self.duration
    }
}

/// Which kind of request a ticket belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Recognition,
    Explanation,
}

/// Proof that a request was started, used to detect stale results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    kind: RequestKind,
    generation: u64,
    explanation: u64,
}

impl RequestTicket {
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Root aggregate of one transcription view.
#[derive(Debug, Clone, Default)]
pub struct EquationSession {
    source_image: Option<ImageInput>,
    recognized_markup: String,
    typeset_preview: Option<String>,
    explanation_segments: Option<Vec<RenderedSegment>>,
    progress: u8,
    notification: Option<Notification>,
    alerts: Vec<String>,
    /// Export destination.
    pub export_mode: ExportMode,
    /// Clipboard export format.
    pub export_format: ExportFormat,
    generation: u64,
    explanation_seq: u64,
}

impl EquationSession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_image(&self) -> Option<&ImageInput> {
        self.source_image.as_ref()
    }

    pub fn recognized_markup(&self) -> &str {
        &self.recognized_markup
    }

    pub fn typeset_preview(&self) -> Option<&str> {
        self.typeset_preview.as_deref()
    }

    pub fn explanation_segments(&self) -> Option<&[RenderedSegment]> {
        self.explanation_segments.as_deref()
    }

    /// Progress indicator value, 0 to 100.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    /// Whether a notification is visible right now.
    pub fn notification_visible(&self) -> bool {
        self.notification
            .as_ref()
            .map(|n| n.is_visible_at(Utc::now()))
            .unwrap_or(false)
    }

    /// Pending one-shot alerts, oldest first.
    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    /// Drain pending alerts for display.
    pub fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alerts)
    }

    /// Queue a blocking user-facing alert.
    pub fn alert(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!("Alert: {}", message);
        self.alerts.push(message);
    }

    /// Show a transient notification for `duration_ms`.
    pub fn notify(&mut self, message: impl Into<String>, duration_ms: u64) {
        self.notification = Some(Notification {
            message: message.into(),
            shown_at: Utc::now(),
            duration: Duration::milliseconds(duration_ms as i64),
        });
    }

    /// Take the alerts and notification raised on `fork`, a clone of this
    /// session made while `alerts_at_fork` alerts were pending. Alerts raised
    /// here in the meantime are kept; nothing else is copied.
    pub fn merge_feedback(&mut self, mut fork: EquationSession, alerts_at_fork: usize) {
        let raised = fork.take_alerts().into_iter().skip(alerts_at_fork);
        self.alerts.extend(raised);

        let newer = match (&fork.notification, &self.notification) {
            (Some(theirs), Some(ours)) => theirs.shown_at > ours.shown_at,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if newer {
            self.notification = fork.notification;
        }
    }

    /// Replace the source image. Clears the recognition result (the
    /// explanation stays until overwritten) and invalidates in-flight
    /// recognition, whose progress can then no longer settle on its own.
    pub fn acquire(&mut self, image: ImageInput) {
        debug!("Acquired {:?}", image);
        self.source_image = Some(image);
        self.recognized_markup.clear();
        self.typeset_preview = None;
        self.generation += 1;
        self.progress = 0;
    }

    /// Set markup typed or supplied directly instead of recognized.
    pub fn set_markup(&mut self, markup: impl Into<String>, preview: Option<String>) {
        self.generation += 1;
        self.progress = 0;
        self.recognized_markup = markup.into();
        self.typeset_preview = preview;
    }

    /// Start a recognition request.
    ///
    /// Progress restarts at one; the markup shows a
    /// placeholder and the preview and explanation are cleared.
    pub fn begin_recognition(&mut self) -> RequestTicket {
        self.generation += 1;
        self.explanation_seq += 1;
        self.progress = 1;
        self.recognized_markup = RECOGNIZING_PLACEHOLDER.to_string();
        self.typeset_preview = None;
        self.explanation_segments = None;
        self.ticket(RequestKind::Recognition)
    }

    /// Start an explanation request.
    pub fn begin_explanation(&mut self) -> RequestTicket {
        self.explanation_seq += 1;
        self.explanation_segments = Some(vec![RenderedSegment::plain(EXPLAINING_PLACEHOLDER)]);
        self.ticket(RequestKind::Explanation)
    }

    fn ticket(&self, kind: RequestKind) -> RequestTicket {
        RequestTicket {
            kind,
            generation: self.generation,
            explanation: self.explanation_seq,
        }
    }

    /// Whether results for `ticket` may still be applied.
    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        match ticket.kind {
            RequestKind::Recognition => ticket.generation == self.generation,
            // A new image or typed markup leaves the explanation in place.
            RequestKind::Explanation => ticket.explanation == self.explanation_seq,
        }
    }

    /// Raise progress for a current request. Never decreases it.
    pub fn advance_progress(&mut self, ticket: &RequestTicket, value: u8) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.progress = self.progress.max(value.min(100));
        true
    }

    /// Reset progress to zero once a completed request has been shown.
    pub fn settle_progress(&mut self, ticket: &RequestTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.progress = 0;
        true
    }

    /// Apply a recognition outcome. Returns `false` for stale tickets.
    pub fn apply_recognition(
        &mut self,
        ticket: &RequestTicket,
        markup: String,
        preview: Option<String>,
    ) -> bool {
        if !self.is_current(ticket) {
            debug!("Discarding stale recognition result");
            return false;
        }
        self.recognized_markup = markup;
        self.typeset_preview = preview;
        true
    }

    /// Apply explanation segments. Returns `false` for stale tickets.
    pub fn apply_explanation(
        &mut self,
        ticket: &RequestTicket,
        segments: Vec<RenderedSegment>,
    ) -> bool {
        if !self.is_current(ticket) {
            debug!("Discarding stale explanation result");
            return false;
        }
        self.explanation_segments = Some(segments);
        true
    }
}
