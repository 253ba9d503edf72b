//! Session orchestration.
//!
//! [`Transcoder`] drives an [`EquationSession`] through acquisition,
//! recognition, explanation, copying and export. Each asynchronous action
//! is split into a synchronous `begin_*` step that validates preconditions
//! and takes a [`RequestTicket`], an awaitable step that does not touch the
//! session, and a synchronous `finish_*` step that applies the result only
//! if the ticket is still current. Hosts that interleave several actions
//! call the phases themselves; the rest use the combined methods.

use tracing::{debug, info, warn};

use eqtx_inference::InferenceService;

use crate::error::{EqtxError, ExportError, Result};
use crate::explain::{ExplanationComposer, RenderedSegment};
use crate::export::{
    DeliverySinks, ExportEngine, ExportOutcome, Rasterizer, RenderedPreview, TextClipboard,
};
use crate::input::{ImageInput, InputItem, InputSource, select_image};
use crate::models::config::EqtxConfig;
use crate::models::session::{
    EquationSession, NO_EQUATION_PLACEHOLDER, RECOGNIZING_PLACEHOLDER, RequestTicket,
};
use crate::recognition::{RecognitionClient, RecognitionResult};
use crate::typeset::{RenderOptions, TypesetAdapter, Typesetter};

/// Notification shown after the markup source was copied.
pub const COPIED_MARKUP_MESSAGE: &str = "Copied the TeX code to the clipboard!";

/// Alert shown when there is nothing to export or copy.
pub const NO_EQUATION_ALERT: &str = "No equation has been entered.";

/// Wrap markup as a display-math block for pasting into documents.
pub fn wrap_display_math(markup: &str) -> String {
    format!("$$ \n {} \n $$", markup)
}

const RECOGNITION_ERROR_PREFIX: &str = "An error occurred. Please try again.";

/// Recognized-markup text shown after a transport failure.
pub fn recognition_error_text(message: &str) -> String {
    format!("{}\n{}", RECOGNITION_ERROR_PREFIX, message)
}

/// Whether `markup` is status text written by recognition rather than an
/// equation.
pub fn is_status_text(markup: &str) -> bool {
    markup == RECOGNIZING_PLACEHOLDER
        || markup == NO_EQUATION_PLACEHOLDER
        || markup.starts_with(RECOGNITION_ERROR_PREFIX)
}

/// User-facing alert for an export failure.
fn export_alert(error: &ExportError) -> String {
    match error {
        ExportError::NothingToExport => NO_EQUATION_ALERT.to_string(),
        ExportError::CaptureFailure(_) | ExportError::Encode(_) => {
            "Failed to generate the image.".to_string()
        }
        ExportError::Save { .. } => "Failed to generate the SVG.".to_string(),
        ExportError::DeliveryExhausted(_) => {
            "The image could not be copied, shown or downloaded.".to_string()
        }
    }
}

/// Pipeline orchestrator.
pub struct Transcoder<S, T> {
    service: S,
    typesetter: TypesetAdapter<T>,
    config: EqtxConfig,
}

impl<S: InferenceService, T: Typesetter> Transcoder<S, T> {
    /// Create an orchestrator over `service` and the typesetting `engine`.
    pub fn new(service: S, engine: T, config: EqtxConfig) -> Self {
        Self {
            service,
            typesetter: TypesetAdapter::new(engine),
            config,
        }
    }

    pub fn config(&self) -> &EqtxConfig {
        &self.config
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn typesetter(&self) -> &TypesetAdapter<T> {
        &self.typesetter
    }

    /// Display-mode preview of `markup`, or `None` if it does not typeset.
    pub fn render_preview(&self, markup: &str) -> Option<String> {
        self.typesetter
            .render(markup, &RenderOptions::preview(&self.config.typeset))
    }

    /// Take the first image among `items` into the session.
    ///
    /// Returns `false` (and leaves the session alone) when none is an image.
    pub fn acquire(
        &self,
        session: &mut EquationSession,
        items: Vec<InputItem>,
        source: InputSource,
    ) -> bool {
        match select_image(items, source) {
            Some(image) => {
                session.acquire(image);
                true
            }
            None => {
                debug!("No image among items from {}", source);
                false
            }
        }
    }

    /// Replace the markup with text supplied directly, typesetting it.
    pub fn set_markup(&self, session: &mut EquationSession, markup: &str) {
        let preview = self.render_preview(markup);
        session.set_markup(markup, preview);
    }

    fn check_credential(&self, session: &mut EquationSession) -> Result<()> {
        if self.service.is_configured() {
            return Ok(());
        }
        let error = EqtxError::MissingCredential;
        session.alert(error.to_string());
        Err(error)
    }

    /// Validate and start a recognition request.
    ///
    /// A missing credential raises exactly one alert and leaves the rest of
    /// the session untouched.
    pub fn begin_recognition(
        &self,
        session: &mut EquationSession,
    ) -> Result<(RequestTicket, ImageInput)> {
        let image = session.source_image().cloned().ok_or(EqtxError::NoImage)?;
        self.check_credential(session)?;
        Ok((session.begin_recognition(), image))
    }

    /// Call the service. Does not touch the session.
    pub async fn run_recognition(&self, image: &ImageInput) -> RecognitionResult {
        let client = RecognitionClient::new(&self.service, &self.config.service.recognition_model);
        match client.recognize(image).await {
            Ok(result) => result,
            Err(e) => RecognitionResult::ServiceError(e.to_string()),
        }
    }

    /// Apply a recognition result if `ticket` is still current.
    pub fn finish_recognition(
        &self,
        session: &mut EquationSession,
        ticket: &RequestTicket,
        result: RecognitionResult,
    ) -> bool {
        if result.is_reply() {
            session.advance_progress(ticket, 50);
        }

        let (markup, preview) = match result {
            RecognitionResult::Markup(markup) => {
                let preview = self.render_preview(&markup);
                (markup, preview)
            }
            RecognitionResult::Empty => (NO_EQUATION_PLACEHOLDER.to_string(), None),
            RecognitionResult::ServiceError(message) => (recognition_error_text(&message), None),
        };

        let applied = session.apply_recognition(ticket, markup, preview);
        session.advance_progress(ticket, 100);
        applied
    }

    /// Recognize the session's image.
    ///
    /// On return progress is at 100; the host resets it with
    /// [`Transcoder::settle`] after `ui.progress_reset_ms`.
    pub async fn recognize(&self, session: &mut EquationSession) -> Result<RequestTicket> {
        let (ticket, image) = self.begin_recognition(session)?;
        let result = self.run_recognition(&image).await;
        if !self.finish_recognition(session, &ticket, result) {
            info!("Recognition result superseded by a newer request");
        }
        Ok(ticket)
    }

    /// Reset progress after a completed request, unless superseded.
    pub fn settle(&self, session: &mut EquationSession, ticket: &RequestTicket) -> bool {
        session.settle_progress(ticket)
    }

    /// Validate and start an explanation request.
    ///
    /// Placeholder and error text left by recognition counts as no markup,
    /// so it is never sent to the service.
    pub fn begin_explanation(
        &self,
        session: &mut EquationSession,
    ) -> Result<(RequestTicket, String)> {
        let markup = session.recognized_markup().to_string();
        if markup.is_empty() || is_status_text(&markup) {
            return Err(EqtxError::NoMarkup);
        }
        self.check_credential(session)?;
        Ok((session.begin_explanation(), markup))
    }

    /// Call the service and segment the reply. Does not touch the session.
    pub async fn run_explanation(&self, markup: &str) -> Vec<RenderedSegment> {
        let composer = ExplanationComposer::new(
            &self.service,
            &self.typesetter,
            &self.config.service.explanation_model,
            &self.config.service.explanation_language,
        );
        match composer.explain(markup).await {
            Ok(segments) => segments,
            Err(e) => vec![RenderedSegment::plain(format!("Error: {}", e))],
        }
    }

    /// Apply explanation segments if `ticket` is still current.
    pub fn finish_explanation(
        &self,
        session: &mut EquationSession,
        ticket: &RequestTicket,
        segments: Vec<RenderedSegment>,
    ) -> bool {
        session.apply_explanation(ticket, segments)
    }

    /// Explain the session's markup.
    pub async fn explain(&self, session: &mut EquationSession) -> Result<RequestTicket> {
        let (ticket, markup) = self.begin_explanation(session)?;
        let segments = self.run_explanation(&markup).await;
        if !self.finish_explanation(session, &ticket, segments) {
            info!("Explanation superseded by a newer request");
        }
        Ok(ticket)
    }

    /// Copy the markup source to the clipboard, wrapped as display math
    /// unless `raw`.
    pub async fn copy_markup(
        &self,
        session: &mut EquationSession,
        clipboard: &dyn TextClipboard,
        raw: bool,
    ) -> Result<()> {
        let markup = session.recognized_markup().to_string();
        if markup.is_empty() {
            session.alert(NO_EQUATION_ALERT);
            return Err(EqtxError::NoMarkup);
        }

        let text = if raw { markup } else { wrap_display_math(&markup) };
        match clipboard.write_text(&text).await {
            Ok(()) => {
                session.notify(COPIED_MARKUP_MESSAGE, self.config.ui.notification_ms);
                Ok(())
            }
            Err(e) => {
                warn!("Copying markup failed: {}", e);
                session.alert(format!("Failed to copy to the clipboard: {}", e));
                Err(e.into())
            }
        }
    }

    /// Export the session's equation as rendered in `preview`.
    ///
    /// Success on the clipboard raises a transient notification, a degraded
    /// delivery or any failure raises an alert.
    pub async fn export(
        &self,
        session: &mut EquationSession,
        preview: &dyn RenderedPreview,
        rasterizer: &dyn Rasterizer,
        sinks: DeliverySinks<'_>,
    ) -> Result<ExportOutcome> {
        let engine = ExportEngine::new(&self.config.export);
        let markup = session.recognized_markup().to_string();

        let outcome = engine
            .export(
                &markup,
                preview,
                session.export_mode,
                session.export_format,
                rasterizer,
                sinks,
            )
            .await;

        match outcome {
            Ok(outcome) => {
                if let Some(delivery) = &outcome.delivery {
                    if delivery.is_degraded() {
                        session.alert(delivery.message.clone());
                    } else {
                        session.notify(delivery.message.clone(), self.config.ui.notification_ms);
                    }
                }
                Ok(outcome)
            }
            Err(e) => {
                warn!("Export failed: {}", e);
                session.alert(export_alert(&e));
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use eqtx_inference::{GenerateRequest, GenerateResponse, InferenceError};

    use super::*;

    /// In-process inference service that replays canned replies and
    /// records every request it receives.
    #[derive(Default)]
    pub struct MockService {
        pub configured: bool,
        pub replies: RefCell<VecDeque<eqtx_inference::Result<GenerateResponse>>>,
        pub requests: RefCell<Vec<GenerateRequest>>,
    }

    impl MockService {
        pub fn replying(replies: Vec<eqtx_inference::Result<GenerateResponse>>) -> Self {
            Self {
                configured: true,
                replies: RefCell::new(replies.into()),
                requests: RefCell::new(Vec::new()),
            }
        }

        pub fn unconfigured() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> usize {
            self.requests.borrow().len()
        }
    }

    #[async_trait(?Send)]
    impl InferenceService for MockService {
        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn generate(
            &self,
            request: &GenerateRequest,
        ) -> eqtx_inference::Result<GenerateResponse> {
            self.requests.borrow_mut().push(request.clone());
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(InferenceError::Transport("no reply queued".to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockService;
    use super::*;
    use crate::error::SinkError;
    use crate::explain::ExplanationSegment;
    use crate::export::testing::{FailingRasterizer, FixedPreview, RecordingSink, SolidRasterizer};
    use crate::export::{DeliveryStep, Unsupported};
    use crate::models::session::{ExportFormat, ExportMode, RECOGNIZING_PLACEHOLDER};
    use crate::typeset::testing::BraceCheckingTypesetter;
    use eqtx_inference::{GenerateResponse, InferenceError, Part};
    use pretty_assertions::assert_eq;

    fn transcoder(service: MockService) -> Transcoder<MockService, BraceCheckingTypesetter> {
        Transcoder::new(service, BraceCheckingTypesetter, EqtxConfig::default())
    }

    fn png_item() -> InputItem {
        InputItem {
            name: Some("eq.png".to_string()),
            mime_type: Some("image/png".to_string()),
            bytes: vec![1, 2, 3],
            preview: None,
        }
    }

    fn session_with_image(t: &Transcoder<MockService, BraceCheckingTypesetter>) -> EquationSession {
        let mut session = EquationSession::new();
        assert!(t.acquire(&mut session, vec![png_item()], InputSource::FilePicker));
        session
    }

    #[tokio::test]
    async fn test_recognition_success() {
        let t = transcoder(MockService::replying(vec![Ok(GenerateResponse::from_text(
            "```latex\nE=mc^2\n```",
        ))]));
        let mut session = session_with_image(&t);

        let ticket = t.recognize(&mut session).await.unwrap();

        assert_eq!(session.recognized_markup(), "E=mc^2");
        assert_eq!(
            session.typeset_preview(),
            Some("<span class=\"katex-display\">E=mc^2</span>")
        );
        assert_eq!(session.progress(), 100);
        assert!(t.settle(&mut session, &ticket));
        assert_eq!(session.progress(), 0);

        let requests = t.service().requests.borrow();
        assert_eq!(requests[0].model, "gemini-2.0-flash");
        assert!(matches!(
            &requests[0].contents[0].parts[1],
            Part::InlineData { inline_data } if inline_data.mime_type == "image/png" && inline_data.data == "AQID"
        ));
    }

    #[tokio::test]
    async fn test_missing_credential_alerts_once_without_request() {
        let t = transcoder(MockService::unconfigured());
        let mut session = session_with_image(&t);
        session.set_markup("x", None);

        let err = t.recognize(&mut session).await.unwrap_err();

        assert!(matches!(err, EqtxError::MissingCredential));
        assert_eq!(session.progress(), 0);
        assert_eq!(session.recognized_markup(), "x");
        assert_eq!(session.alerts().len(), 1);
        assert!(session.alerts()[0].starts_with("Gemini API key is missing"));
        assert_eq!(t.service().calls(), 0);
    }

    #[tokio::test]
    async fn test_recognition_without_image() {
        let t = transcoder(MockService::replying(Vec::new()));
        let mut session = EquationSession::new();
        assert!(matches!(
            t.recognize(&mut session).await,
            Err(EqtxError::NoImage)
        ));
        assert_eq!(t.service().calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_reply_shows_placeholder() {
        let t = transcoder(MockService::replying(vec![Ok(GenerateResponse::default())]));
        let mut session = session_with_image(&t);

        t.recognize(&mut session).await.unwrap();

        assert_eq!(session.recognized_markup(), NO_EQUATION_PLACEHOLDER);
        assert_eq!(session.typeset_preview(), None);
        assert_eq!(session.progress(), 100);
    }

    #[tokio::test]
    async fn test_transport_error_replaces_markup() {
        let t = transcoder(MockService::replying(vec![Err(InferenceError::Service(
            "quota exceeded".to_string(),
        ))]));
        let mut session = session_with_image(&t);

        let (ticket, image) = t.begin_recognition(&mut session).unwrap();
        assert_eq!(session.recognized_markup(), RECOGNIZING_PLACEHOLDER);
        assert_eq!(session.progress(), 1);

        let result = t.run_recognition(&image).await;
        assert!(t.finish_recognition(&mut session, &ticket, result));

        assert_eq!(
            session.recognized_markup(),
            "An error occurred. Please try again.\nquota exceeded"
        );
        assert!(session.alerts().is_empty());
        assert_eq!(session.progress(), 100);
    }

    #[tokio::test]
    async fn test_malformed_markup_keeps_raw_text() {
        let t = transcoder(MockService::replying(vec![Ok(GenerateResponse::from_text(
            r"\frac{a}{b",
        ))]));
        let mut session = session_with_image(&t);

        t.recognize(&mut session).await.unwrap();

        assert_eq!(session.recognized_markup(), r"\frac{a}{b");
        assert_eq!(session.typeset_preview(), None);
    }

    #[tokio::test]
    async fn test_late_result_of_superseded_request_is_discarded() {
        let t = transcoder(MockService::replying(vec![
            Ok(GenerateResponse::from_text("b")),
            Ok(GenerateResponse::from_text("a")),
        ]));
        let mut session = session_with_image(&t);

        let (first, image) = t.begin_recognition(&mut session).unwrap();
        let (second, _) = t.begin_recognition(&mut session).unwrap();

        let second_result = t.run_recognition(&image).await;
        assert!(t.finish_recognition(&mut session, &second, second_result));
        let first_result = t.run_recognition(&image).await;
        assert!(!t.finish_recognition(&mut session, &first, first_result));

        assert_eq!(session.recognized_markup(), "b");
        assert!(!t.settle(&mut session, &first));
        assert_eq!(session.progress(), 100);
        assert!(t.settle(&mut session, &second));
    }

    #[tokio::test]
    async fn test_explanation_segments_and_local_failure() {
        let t = transcoder(MockService::replying(vec![Ok(GenerateResponse::from_text(
            "Energy $E$ equals $m{c$ squared.",
        ))]));
        let mut session = EquationSession::new();
        session.set_markup("E=mc^2", None);

        t.explain(&mut session).await.unwrap();

        let segments = session.explanation_segments().unwrap();
        let sources: Vec<_> = segments.iter().map(|s| s.segment.source()).collect();
        assert_eq!(
            sources,
            vec!["Energy ", "$E$", " equals ", "$m{c$", " squared."]
        );
        assert!(segments[1].html.is_some());
        assert!(segments[3].is_degraded());
        assert_eq!(segments[3].display_text(), "$m{c$");

        let requests = t.service().requests.borrow();
        assert_eq!(requests[0].model, "gemini-2.5-flash");
        assert_eq!(requests[0].contents[0].parts.len(), 1);
    }

    #[tokio::test]
    async fn test_explanation_failure_is_single_error_segment() {
        let t = transcoder(MockService::replying(vec![Err(InferenceError::Service(
            "overloaded".to_string(),
        ))]));
        let mut session = EquationSession::new();
        session.set_markup("x", None);

        t.explain(&mut session).await.unwrap();

        let segments = session.explanation_segments().unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(
            segments[0].segment,
            ExplanationSegment::PlainText("Error: overloaded".to_string())
        );
    }

    #[tokio::test]
    async fn test_explanation_requires_markup() {
        let t = transcoder(MockService::replying(Vec::new()));
        let mut session = EquationSession::new();
        assert!(matches!(t.explain(&mut session).await, Err(EqtxError::NoMarkup)));
        assert_eq!(t.service().calls(), 0);
    }

    #[tokio::test]
    async fn test_explanation_skips_recognition_status_text() {
        let t = transcoder(MockService::replying(vec![Ok(GenerateResponse::default())]));
        let mut session = session_with_image(&t);
        t.recognize(&mut session).await.unwrap();
        assert_eq!(session.recognized_markup(), NO_EQUATION_PLACEHOLDER);

        assert!(matches!(t.explain(&mut session).await, Err(EqtxError::NoMarkup)));
        assert_eq!(t.service().calls(), 1);

        session.set_markup(recognition_error_text("timeout"), None);
        assert!(matches!(t.explain(&mut session).await, Err(EqtxError::NoMarkup)));
        assert_eq!(t.service().calls(), 1);
    }

    #[tokio::test]
    async fn test_copy_markup_wraps_and_notifies() {
        let t = transcoder(MockService::default());
        let clipboard = RecordingSink::default();
        let mut session = EquationSession::new();
        session.set_markup("x^2", None);

        t.copy_markup(&mut session, &clipboard, false).await.unwrap();
        t.copy_markup(&mut session, &clipboard, true).await.unwrap();

        assert_eq!(
            *clipboard.texts.borrow(),
            vec!["$$ \n x^2 \n $$".to_string(), "x^2".to_string()]
        );
        assert!(session.notification_visible());
        assert_eq!(
            session.notification().map(|n| n.message.as_str()),
            Some(COPIED_MARKUP_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_copy_markup_failure_alerts() {
        let t = transcoder(MockService::default());
        let mut session = EquationSession::new();
        session.set_markup("x", None);

        let err = t.copy_markup(&mut session, &Unsupported, false).await.unwrap_err();

        assert!(matches!(err, EqtxError::Sink(SinkError::Unavailable(_))));
        assert_eq!(session.alerts().len(), 1);
        assert!(session.notification().is_none());
    }

    #[tokio::test]
    async fn test_export_without_markup_alerts() {
        let t = transcoder(MockService::default());
        let sink = RecordingSink::default();
        let mut session = EquationSession::new();

        let err = t
            .export(
                &mut session,
                &FixedPreview::equation(),
                &FailingRasterizer,
                DeliverySinks {
                    image_clipboard: &sink,
                    text_clipboard: &sink,
                    viewer: &sink,
                    files: &sink,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EqtxError::Export(ExportError::NothingToExport)));
        assert_eq!(session.take_alerts(), vec![NO_EQUATION_ALERT.to_string()]);
        assert_eq!(sink.calls(), 0);
    }

    #[tokio::test]
    async fn test_clipboard_export_notifies_on_success() {
        let t = transcoder(MockService::default());
        let sink = RecordingSink::default();
        let mut session = EquationSession::new();
        session.set_markup("E=mc^2", None);
        session.export_mode = ExportMode::Clipboard;
        session.export_format = ExportFormat::Vector;

        let outcome = t
            .export(
                &mut session,
                &FixedPreview::equation(),
                &SolidRasterizer { margin: 0 },
                DeliverySinks {
                    image_clipboard: &sink,
                    text_clipboard: &sink,
                    viewer: &sink,
                    files: &sink,
                },
            )
            .await
            .unwrap();

        assert_eq!(
            outcome.delivery.map(|d| d.step),
            Some(DeliveryStep::ImageClipboard)
        );
        assert!(session.notification_visible());
        assert!(session.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_degraded_export_alerts() {
        let t = transcoder(MockService::default());
        let files = RecordingSink::default();
        let mut session = EquationSession::new();
        session.set_markup("E=mc^2", None);
        session.export_mode = ExportMode::Clipboard;

        t.export(
            &mut session,
            &FixedPreview::equation(),
            &SolidRasterizer { margin: 0 },
            DeliverySinks {
                files: &files,
                ..DeliverySinks::none()
            },
        )
        .await
        .unwrap();

        assert_eq!(session.alerts().len(), 1);
        assert!(session.alerts()[0].contains("equation.png"));
        assert!(session.notification().is_none());
    }

    #[tokio::test]
    async fn test_capture_failure_aborts_with_alert() {
        let t = transcoder(MockService::default());
        let sink = RecordingSink::default();
        let mut session = EquationSession::new();
        session.set_markup("E=mc^2", None);
        session.export_mode = ExportMode::Clipboard;

        let err = t
            .export(
                &mut session,
                &FixedPreview::equation(),
                &FailingRasterizer,
                DeliverySinks {
                    image_clipboard: &sink,
                    text_clipboard: &sink,
                    viewer: &sink,
                    files: &sink,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EqtxError::Export(ExportError::CaptureFailure(_))));
        assert_eq!(session.take_alerts(), vec!["Failed to generate the image.".to_string()]);
        assert_eq!(sink.calls(), 0);
    }
}
