use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use qtube_gemini::AnswerEngine;
use qtube_gemini::ApiError;
use qtube_protocol::Citation;
use qtube_protocol::ExtensionMessage;
use qtube_protocol::ExtensionReply;
use qtube_protocol::ParsedAnswer;
use qtube_protocol::TabId;
use qtube_protocol::TranscriptReply;
use qtube_protocol::VideoData;
use tokio::sync::Notify;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::time::Instant;

use super::*;
use crate::channel::MessageError;
use crate::channel::RuntimeEnvelope;
use crate::error::HandshakeError;
use crate::error::QtubeErr;
use crate::tabs::TabInfo;

const TAB: TabId = TabId(7);
const WATCH_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

struct MockTabs {
    active: StdMutex<Option<TabInfo>>,
    listening: AtomicBool,
    ping_reply: StdMutex<Option<ExtensionReply>>,
    failures: StdMutex<VecDeque<MessageError>>,
    sent: StdMutex<Vec<ExtensionMessage>>,
    injections: AtomicUsize,
    injected: Notify,
    inject_error: StdMutex<Option<MessageError>>,
}

impl MockTabs {
    fn on(url: &str) -> Arc<Self> {
        Arc::new(Self {
            active: StdMutex::new(Some(TabInfo {
                id: TAB,
                url: url.to_string(),
            })),
            listening: AtomicBool::new(false),
            ping_reply: StdMutex::new(Some(ExtensionReply::pong())),
            failures: StdMutex::new(VecDeque::new()),
            sent: StdMutex::new(Vec::new()),
            injections: AtomicUsize::new(0),
            injected: Notify::new(),
            inject_error: StdMutex::new(None),
        })
    }

    fn listening(self: Arc<Self>) -> Arc<Self> {
        self.listening.store(true, Ordering::SeqCst);
        self
    }

    fn answering_pings_with(self: Arc<Self>, reply: Option<ExtensionReply>) -> Arc<Self> {
        *self.ping_reply.lock().expect("ping lock") = reply;
        self.listening()
    }

    fn fail_deliveries(&self, count: usize, err: MessageError) {
        let mut failures = self.failures.lock().expect("failures lock");
        failures.extend(std::iter::repeat_n(err, count));
    }

    fn sent(&self) -> Vec<ExtensionMessage> {
        self.sent.lock().expect("sent lock").clone()
    }

    fn sent_of(&self, kind: &str) -> usize {
        self.sent().iter().filter(|m| m.kind() == kind).count()
    }

    fn injections(&self) -> usize {
        self.injections.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TabsApi for MockTabs {
    async fn active_tab(&self) -> Option<TabInfo> {
        self.active.lock().expect("active lock").clone()
    }

    async fn send_message(
        &self,
        _tab: TabId,
        message: ExtensionMessage,
    ) -> std::result::Result<Option<ExtensionReply>, MessageError> {
        self.sent.lock().expect("sent lock").push(message.clone());
        if message == ExtensionMessage::Ping {
            return if self.listening.load(Ordering::SeqCst) {
                Ok(self.ping_reply.lock().expect("ping lock").clone())
            } else {
                Err(MessageError::NoReceivingEnd)
            };
        }
        match self.failures.lock().expect("failures lock").pop_front() {
            Some(err) => Err(err),
            None => Ok(None),
        }
    }

    async fn inject_content_script(&self, _tab: TabId) -> std::result::Result<(), MessageError> {
        self.injections.fetch_add(1, Ordering::SeqCst);
        self.injected.notify_one();
        match self.inject_error.lock().expect("inject lock").take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
struct RecordingPopup {
    statuses: StdMutex<Vec<(StatusKind, String)>>,
    busy: StdMutex<Vec<bool>>,
    closed: AtomicBool,
}

impl RecordingPopup {
    fn last_status(&self) -> Option<(StatusKind, String)> {
        self.statuses.lock().expect("statuses lock").last().cloned()
    }

    fn busy(&self) -> Vec<bool> {
        self.busy.lock().expect("busy lock").clone()
    }

    fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl PopupSurface for RecordingPopup {
    fn show_status(&self, kind: StatusKind, message: &str) {
        self.statuses
            .lock()
            .expect("statuses lock")
            .push((kind, message.to_string()));
    }

    fn set_busy(&self, busy: bool) {
        self.busy.lock().expect("busy lock").push(busy);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

struct FakeEngine {
    fail: bool,
    prompts: StdMutex<Vec<String>>,
}

impl FakeEngine {
    fn answering() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            prompts: StdMutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            prompts: StdMutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

#[async_trait]
impl AnswerEngine for FakeEngine {
    async fn ask(&self, prompt: &str) -> std::result::Result<ParsedAnswer, ApiError> {
        self.prompts
            .lock()
            .expect("prompts lock")
            .push(prompt.to_string());
        if self.fail {
            return Err(ApiError::MalformedResponse("no candidates".to_string()));
        }
        Ok(ParsedAnswer {
            answer: "The intro covers setup.".to_string(),
            timestamps: vec![Citation::new(0, 5, "Intro")],
        })
    }
}

struct Fixture {
    tabs: Arc<MockTabs>,
    popup: Arc<RecordingPopup>,
    engine: Arc<FakeEngine>,
    coordinator: SessionCoordinator,
}

fn fixture(tabs: Arc<MockTabs>, engine: Arc<FakeEngine>) -> Fixture {
    let popup = Arc::new(RecordingPopup::default());
    let coordinator = SessionCoordinator::new(
        Arc::clone(&tabs) as Arc<dyn TabsApi>,
        Arc::clone(&popup) as Arc<dyn PopupSurface>,
        Arc::clone(&engine) as Arc<dyn AnswerEngine>,
        CoordinatorSettings::default(),
    );
    Fixture {
        tabs,
        popup,
        engine,
        coordinator,
    }
}

fn video() -> VideoData {
    VideoData {
        video_title: "Rust in Production".to_string(),
        video_description: "manual".to_string(),
        video_transcript: "0:05 welcome".to_string(),
    }
}

#[tokio::test]
async fn invalid_question_sends_nothing() {
    let fx = fixture(MockTabs::on(WATCH_URL).listening(), FakeEngine::answering());

    for raw in ["", "   ", DEFAULT_PLACEHOLDER] {
        let err = fx
            .coordinator
            .submit_question(raw)
            .await
            .expect_err("invalid question");
        assert!(matches!(err, QtubeErr::Validation(_)), "{raw:?}: {err:?}");
    }
    let too_long = "a".repeat(201);
    assert!(matches!(
        fx.coordinator.submit_question(&too_long).await,
        Err(QtubeErr::Validation(ValidationError::TooLong { len: 201, max: 200 }))
    ));

    assert_eq!(fx.tabs.sent(), Vec::<ExtensionMessage>::new());
    assert_eq!(fx.tabs.injections(), 0);
    assert_eq!(fx.popup.busy(), Vec::<bool>::new());
    assert!(!fx.popup.closed());
    assert_eq!(
        fx.popup.last_status(),
        Some((
            StatusKind::Error,
            "Question is too long (201 characters, maximum 200).".to_string()
        ))
    );
}

#[tokio::test]
async fn non_watch_page_is_rejected_before_any_message() {
    let fx = fixture(
        MockTabs::on("https://www.youtube.com/feed/subscriptions").listening(),
        FakeEngine::answering(),
    );
    let err = fx
        .coordinator
        .submit_question("What is this about?")
        .await
        .expect_err("not a watch page");
    assert!(matches!(
        err,
        QtubeErr::Validation(ValidationError::NotWatchPage { .. })
    ));
    assert_eq!(fx.tabs.sent(), Vec::<ExtensionMessage>::new());
}

#[tokio::test]
async fn no_active_tab_is_a_validation_error() {
    let fx = fixture(MockTabs::on(WATCH_URL), FakeEngine::answering());
    *fx.tabs.active.lock().expect("active lock") = None;
    assert!(matches!(
        fx.coordinator.submit_question("Why?").await,
        Err(QtubeErr::Validation(ValidationError::NoActiveTab))
    ));
}

#[tokio::test]
async fn listening_tab_gets_overlay_without_injection() {
    let fx = fixture(MockTabs::on(WATCH_URL).listening(), FakeEngine::answering());

    fx.coordinator
        .submit_question("  What is covered first?  ")
        .await
        .expect("submission");

    assert_eq!(
        fx.tabs.sent(),
        vec![
            ExtensionMessage::Ping,
            ExtensionMessage::ShowOverlay {
                question: "What is covered first?".to_string(),
            },
        ]
    );
    assert_eq!(fx.tabs.injections(), 0);
    assert!(fx.popup.closed());
    assert!(!fx.coordinator.has_pending_session(TAB).await);
}

#[tokio::test]
async fn any_ping_reply_counts_as_listening() {
    for reply in [Some(ExtensionReply::ack()), None] {
        let fx = fixture(
            MockTabs::on(WATCH_URL).answering_pings_with(reply.clone()),
            FakeEngine::answering(),
        );

        assert_eq!(fx.coordinator.ensure_ready(TAB).await, Ok(()), "{reply:?}");
        assert_eq!(fx.tabs.sent(), vec![ExtensionMessage::Ping]);
        assert_eq!(fx.tabs.injections(), 0);
    }
}

#[tokio::test]
async fn missing_listener_injects_once_and_waits_for_announcement() {
    let fx = fixture(MockTabs::on(WATCH_URL), FakeEngine::answering());

    let waiter = tokio::spawn({
        let coordinator = fx.coordinator.clone();
        async move { coordinator.ensure_ready(TAB).await }
    });
    fx.tabs.injected.notified().await;
    assert!(fx.coordinator.has_pending_session(TAB).await);

    let reply = fx
        .coordinator
        .handle_runtime_message(Some(TAB), ExtensionMessage::ContentScriptReady)
        .await;
    assert_eq!(reply, None);

    assert_eq!(waiter.await.expect("join"), Ok(()));
    assert_eq!(fx.tabs.injections(), 1);
    assert!(!fx.coordinator.has_pending_session(TAB).await);
}

#[tokio::test(start_paused = true)]
async fn concurrent_requests_share_one_handshake() {
    let fx = fixture(MockTabs::on(WATCH_URL), FakeEngine::answering());

    let first = tokio::spawn({
        let coordinator = fx.coordinator.clone();
        async move { coordinator.ensure_ready(TAB).await }
    });
    fx.tabs.injected.notified().await;

    let second = tokio::spawn({
        let coordinator = fx.coordinator.clone();
        async move { coordinator.ensure_ready(TAB).await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    fx.coordinator
        .handle_runtime_message(Some(TAB), ExtensionMessage::ContentScriptReady)
        .await;

    assert_eq!(first.await.expect("join first"), Ok(()));
    assert_eq!(second.await.expect("join second"), Ok(()));
    assert_eq!(fx.tabs.injections(), 1);
    assert_eq!(fx.tabs.sent_of("ping"), 1);
}

#[tokio::test(start_paused = true)]
async fn handshake_times_out_without_announcement() {
    let fx = fixture(MockTabs::on(WATCH_URL), FakeEngine::answering());

    let started = Instant::now();
    let result = fx.coordinator.ensure_ready(TAB).await;
    assert_eq!(started.elapsed(), DEFAULT_HANDSHAKE_TIMEOUT);
    assert_eq!(
        result,
        Err(HandshakeError::Timeout {
            tab: TAB,
            timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        })
    );
    assert_eq!(fx.tabs.injections(), 1);
    assert!(!fx.coordinator.has_pending_session(TAB).await);

    // A late announcement is ignored and the next attempt starts over.
    fx.coordinator
        .handle_runtime_message(Some(TAB), ExtensionMessage::ContentScriptReady)
        .await;
    let _ = fx.coordinator.ensure_ready(TAB).await;
    assert_eq!(fx.tabs.injections(), 2);
}

#[tokio::test]
async fn injection_failure_fails_the_handshake() {
    let fx = fixture(MockTabs::on(WATCH_URL), FakeEngine::answering());
    *fx.tabs.inject_error.lock().expect("inject lock") =
        Some(MessageError::Rejected("Cannot access contents of the page".to_string()));

    let result = fx.coordinator.ensure_ready(TAB).await;
    assert_eq!(
        result,
        Err(HandshakeError::Injection {
            tab: TAB,
            message: "Cannot access contents of the page".to_string(),
        })
    );
    assert!(!fx.coordinator.has_pending_session(TAB).await);
}

#[tokio::test(start_paused = true)]
async fn connection_failures_are_retried_with_backoff() {
    let fx = fixture(MockTabs::on(WATCH_URL).listening(), FakeEngine::answering());
    fx.tabs.fail_deliveries(2, MessageError::NoReceivingEnd);

    let started = Instant::now();
    let reply = fx
        .coordinator
        .send_with_retry(TAB, ExtensionMessage::HideOverlay, 3, Duration::from_millis(500))
        .await
        .expect("delivered on third attempt");

    assert_eq!(reply, None);
    assert_eq!(fx.tabs.sent_of("hideOverlay"), 3);
    assert_eq!(started.elapsed(), Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn delivery_gives_up_after_max_retries_plus_one_attempts() {
    let fx = fixture(MockTabs::on(WATCH_URL).listening(), FakeEngine::answering());
    fx.tabs.fail_deliveries(10, MessageError::ChannelClosed);

    let started = Instant::now();
    let err = fx
        .coordinator
        .send_with_retry(TAB, ExtensionMessage::HideOverlay, 3, Duration::from_millis(500))
        .await
        .expect_err("exhausted");

    assert!(matches!(
        err,
        QtubeErr::DeliveryExhausted {
            attempts: 4,
            last_error: MessageError::ChannelClosed,
            ..
        }
    ));
    assert_eq!(fx.tabs.sent_of("hideOverlay"), 4);
    assert_eq!(started.elapsed(), Duration::from_millis(1500));
}

#[tokio::test(start_paused = true)]
async fn other_delivery_errors_are_not_retried() {
    let fx = fixture(MockTabs::on(WATCH_URL).listening(), FakeEngine::answering());
    fx.tabs
        .fail_deliveries(1, MessageError::Rejected("message too large".to_string()));

    let started = Instant::now();
    let err = fx
        .coordinator
        .send_with_retry(TAB, ExtensionMessage::HideOverlay, 3, Duration::from_millis(500))
        .await
        .expect_err("rejected");
    assert!(matches!(err, QtubeErr::Delivery { .. }));
    assert_eq!(fx.tabs.sent_of("hideOverlay"), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn failed_submission_reports_and_allows_resubmit() {
    let fx = fixture(MockTabs::on(WATCH_URL).listening(), FakeEngine::answering());
    fx.tabs.fail_deliveries(4, MessageError::NoReceivingEnd);

    let err = fx
        .coordinator
        .submit_question("Where is the demo?")
        .await
        .expect_err("delivery exhausted");
    assert!(matches!(err, QtubeErr::DeliveryExhausted { .. }));
    assert!(!fx.popup.closed());
    assert_eq!(fx.popup.busy(), vec![true, false]);
    assert_eq!(
        fx.popup.last_status(),
        Some((
            StatusKind::Error,
            "Could not reach the video page. Please try again.".to_string()
        ))
    );

    fx.coordinator
        .submit_question("Where is the demo?")
        .await
        .expect("second submission");
    assert!(fx.popup.closed());
}

#[tokio::test]
async fn transcript_requests_from_active_tab_are_answered() {
    let fx = fixture(MockTabs::on(WATCH_URL), FakeEngine::answering());

    let reply = fx
        .coordinator
        .handle_runtime_message(
            Some(TAB),
            ExtensionMessage::ProcessManualTranscript {
                question: "What comes first?".to_string(),
                video_data: video(),
            },
        )
        .await;

    assert_eq!(
        reply,
        Some(ExtensionReply::Transcript(TranscriptReply::answered(
            ParsedAnswer {
                answer: "The intro covers setup.".to_string(),
                timestamps: vec![Citation::new(0, 5, "Intro")],
            }
        )))
    );
    let prompts = fx.engine.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Rust in Production"));
    assert!(prompts[0].contains("What comes first?"));
}

#[tokio::test]
async fn transcript_requests_from_other_tabs_are_rejected() {
    let fx = fixture(MockTabs::on(WATCH_URL), FakeEngine::answering());

    for sender in [Some(TabId(8)), None] {
        let reply = fx
            .coordinator
            .handle_runtime_message(
                sender,
                ExtensionMessage::ProcessManualTranscript {
                    question: "What comes first?".to_string(),
                    video_data: video(),
                },
            )
            .await;
        assert_eq!(
            reply,
            Some(ExtensionReply::Transcript(TranscriptReply::failed(
                proxy::INACTIVE_SENDER_ERROR
            )))
        );
    }
    assert_eq!(fx.engine.prompts(), Vec::<String>::new());
}

#[tokio::test]
async fn runtime_listener_replies_with_engine_failure() {
    let fx = fixture(MockTabs::on(WATCH_URL), FakeEngine::failing());
    let (tx, rx) = mpsc::channel(4);
    let _listener = fx.coordinator.spawn_runtime_listener(rx);

    let (reply_tx, reply_rx) = oneshot::channel();
    tx.send(RuntimeEnvelope {
        sender: Some(TAB),
        message: ExtensionMessage::ProcessManualTranscript {
            question: "What comes first?".to_string(),
            video_data: video(),
        },
        reply: Some(reply_tx),
    })
    .await
    .expect("listener running");

    let reply = reply_rx.await.expect("reply");
    assert_eq!(
        reply,
        Some(ExtensionReply::Transcript(TranscriptReply::failed(
            "malformed API response: no candidates"
        )))
    );
}
