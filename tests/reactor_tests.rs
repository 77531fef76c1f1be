use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use avatar_voice::error::{AvatarError, RecognizerError, ServiceError};
use avatar_voice::kernel::event::{AvatarSignal, Event, InputEvent};
use avatar_voice::kernel::dispatcher::APOLOGY;
use avatar_voice::kernel::history::ChatMessage;
use avatar_voice::kernel::reactor::{MIC_PERMISSION_MESSAGE, SESSION_FAILED_MESSAGE};
use avatar_voice::kernel::session::SessionPhase;
use avatar_voice::protocol::{ChannelBus, HostEnvelope, OutboundMessage};
use avatar_voice::services::{
    AvatarClient, ChatRequest, ChatService, PromptRequest, Recognizer, SessionId, TokenService,
};
use avatar_voice::{Collaborators, Reactor, ReactorConfig, TurnState};
use serde_json::{json, Value};
use tokio::sync::mpsc;

const DEFAULT_REPLY: &str = "기본 답변";

struct Scripted {
    delay: Duration,
    reply: Result<String, ()>,
}

#[derive(Default)]
struct StubChat {
    requests: Mutex<Vec<ChatRequest>>,
    script: Mutex<VecDeque<Scripted>>,
}

impl StubChat {
    fn reply(&self, text: &str) {
        self.reply_after(Duration::ZERO, text);
    }

    fn reply_after(&self, delay: Duration, text: &str) {
        let reply = Ok(text.to_string());
        self.script.lock().unwrap().push_back(Scripted { delay, reply });
    }

    fn fail(&self) {
        let delay = Duration::ZERO;
        self.script.lock().unwrap().push_back(Scripted { delay, reply: Err(()) });
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatService for StubChat {
    async fn send(&self, request: &ChatRequest) -> Result<String, ServiceError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        let Some(scripted) = next else {
            return Ok(DEFAULT_REPLY.to_string());
        };
        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }
        scripted.reply.map_err(|_| ServiceError::Status(503))
    }
}

#[derive(Default)]
struct StubTokens {
    calls: AtomicUsize,
    fail: AtomicBool,
}

#[async_trait]
impl TokenService for StubTokens {
    async fn fetch_token(&self) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ServiceError::Status(500));
        }
        Ok("token".to_string())
    }
}

#[derive(Default)]
struct StubAvatar {
    log: Mutex<Vec<String>>,
    starts: AtomicUsize,
    stops: AtomicUsize,
    started: Mutex<Vec<SessionId>>,
    stopped: Mutex<Vec<SessionId>>,
    fail_speak: AtomicBool,
}

impl StubAvatar {
    fn spoken(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|entry| entry.strip_prefix("speak:").map(str::to_string))
            .collect()
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl AvatarClient for StubAvatar {
    async fn start_session(&self, token: &str) -> Result<SessionId, AvatarError> {
        assert_eq!(token, "token");
        self.starts.fetch_add(1, Ordering::SeqCst);
        let id = SessionId::new();
        self.started.lock().unwrap().push(id);
        Ok(id)
    }

    async fn speak(&self, text: &str) -> Result<(), AvatarError> {
        if self.fail_speak.load(Ordering::SeqCst) {
            return Err(AvatarError::Sdk("speak rejected".to_string()));
        }
        self.log.lock().unwrap().push(format!("speak:{}", text));
        Ok(())
    }

    async fn interrupt(&self) -> Result<(), AvatarError> {
        self.log.lock().unwrap().push("interrupt".to_string());
        Ok(())
    }

    async fn stop_session(&self, id: SessionId) -> Result<(), AvatarError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.stopped.lock().unwrap().push(id);
        Ok(())
    }
}

struct StubRecognizer {
    supported: bool,
    start_error: Option<RecognizerError>,
    starts: AtomicUsize,
    pauses: AtomicUsize,
    resumes: AtomicUsize,
    stops: AtomicUsize,
}

impl StubRecognizer {
    fn new() -> Self {
        Self {
            supported: true,
            start_error: None,
            starts: AtomicUsize::new(0),
            pauses: AtomicUsize::new(0),
            resumes: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        }
    }
}

impl Recognizer for StubRecognizer {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn start(&self) -> Result<(), RecognizerError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        match &self.start_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

struct Harness {
    reactor: Reactor,
    chat: Arc<StubChat>,
    tokens: Arc<StubTokens>,
    avatar: Arc<StubAvatar>,
    recognizer: Arc<StubRecognizer>,
    outbound: mpsc::UnboundedReceiver<OutboundMessage>,
}

impl Harness {
    fn new() -> Self {
        Self::with_recognizer(StubRecognizer::new())
    }

    fn with_recognizer(recognizer: StubRecognizer) -> Self {
        let (tx, rx) = mpsc::channel(100);
        let (bus, outbound) = ChannelBus::new();
        let chat = Arc::new(StubChat::default());
        let tokens = Arc::new(StubTokens::default());
        let avatar = Arc::new(StubAvatar::default());
        let recognizer = Arc::new(recognizer);

        let services = Collaborators {
            chat: chat.clone(),
            tokens: tokens.clone(),
            avatar: avatar.clone(),
            recognizer: recognizer.clone(),
            bus: Arc::new(bus),
        };
        let reactor = Reactor::new(rx, tx, ReactorConfig::default(), services);

        Self { reactor, chat, tokens, avatar, recognizer, outbound }
    }

    fn host(&mut self, data: Value) {
        self.host_from("http://localhost:5173", data);
    }

    fn host_from(&mut self, origin: &str, data: Value) {
        self.reactor
            .handle(Event::Input(InputEvent::Host(HostEnvelope::new(origin, data))));
    }

    fn say(&mut self, text: &str) {
        self.reactor.handle(Event::Input(InputEvent::final_transcript(text)));
    }

    fn active_session(&self) -> SessionId {
        match self.reactor.session.phase {
            SessionPhase::Active(id) => id,
            other => panic!("expected an active session, got {:?}", other),
        }
    }

    fn avatar_signal(&mut self, signal: AvatarSignal) {
        self.reactor.handle(Event::Input(InputEvent::Avatar(signal)));
    }

    /// Drain every event until the system goes quiet.
    async fn settle(&mut self) {
        let quiet = Duration::from_secs(30);
        while let Ok(true) = tokio::time::timeout(quiet, self.reactor.step()).await {}
    }

    async fn start(&mut self) {
        self.host(json!({ "type": "START_AVATAR" }));
        self.settle().await;
        assert!(self.reactor.session.is_active(), "session should be active");
    }

    fn outbound(&mut self) -> Vec<OutboundMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.outbound.try_recv() {
            messages.push(message);
        }
        messages
    }
}

fn voice_commands(messages: &[OutboundMessage]) -> Vec<(String, Option<String>)> {
    messages
        .iter()
        .filter_map(|m| match m {
            OutboundMessage::VoiceCommand { action, game, .. } => {
                Some((action.clone(), game.clone()))
            }
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_start_avatar_connects_listens_and_greets_once() {
    let mut h = Harness::new();
    h.chat.reply("안녕하세요, 민수님!");

    h.host(json!({ "type": "START_AVATAR", "name": "민수", "stats": { "played": 2 } }));
    h.settle().await;

    assert_eq!(h.tokens.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.avatar.starts.load(Ordering::SeqCst), 1);
    assert_eq!(h.recognizer.starts.load(Ordering::SeqCst), 1);
    assert_eq!(
        h.chat.requests(),
        vec![ChatRequest::Prompt(PromptRequest::Greeting {
            name: Some("민수".to_string()),
            stats: Some(json!({ "played": 2 })),
        })]
    );
    assert_eq!(h.avatar.spoken(), vec!["안녕하세요, 민수님!"]);

    h.host(json!({ "type": "START_AVATAR" }));
    h.settle().await;
    assert_eq!(h.avatar.starts.load(Ordering::SeqCst), 1, "session must not restart");
    assert_eq!(h.chat.requests().len(), 1, "greeting happens once per session");
}

#[tokio::test(start_paused = true)]
async fn test_game_start_posts_command_then_confirms() {
    let mut h = Harness::new();
    h.start().await;

    h.say("화투 시작");
    h.settle().await;

    let commands = voice_commands(&h.outbound());
    assert_eq!(commands, vec![("START_GAME_HWATU".to_string(), Some("hwatu".to_string()))]);

    let log = h.avatar.log();
    let last_two = &log[log.len() - 2..];
    assert_eq!(last_two, ["interrupt".to_string(), "speak:화투 게임을 시작할게요!".to_string()]);
    assert_eq!(h.reactor.turn.state(), TurnState::Listening);
    assert_eq!(h.chat.requests().len(), 1, "commands never reach the chat backend");
}

#[tokio::test(start_paused = true)]
async fn test_ui_control_posts_command_with_ack() {
    let mut h = Harness::new();
    h.start().await;

    h.say("화투 게임 그만할래");
    h.settle().await;

    assert_eq!(voice_commands(&h.outbound()), vec![("CLOSE_GAME".to_string(), None)]);
    assert_eq!(h.avatar.spoken().last().map(String::as_str), Some("게임을 종료할게요."));
}

#[tokio::test(start_paused = true)]
async fn test_transcripts_dropped_while_avatar_speaks() {
    let mut h = Harness::new();
    h.start().await;

    h.avatar_signal(AvatarSignal::StartTalking);
    assert_eq!(h.recognizer.pauses.load(Ordering::SeqCst), 1);
    assert_eq!(h.reactor.turn.state(), TurnState::Suppressed);

    h.say("화투 시작");
    h.settle().await;
    assert!(h.outbound().is_empty());

    h.avatar_signal(AvatarSignal::StopTalking);
    h.say("랭킹 보여줘");
    assert!(h.outbound().is_empty(), "tail guard still closed");

    h.settle().await;
    assert_eq!(h.recognizer.resumes.load(Ordering::SeqCst), 1);
    assert_eq!(h.reactor.turn.state(), TurnState::Listening);
    assert!(h.outbound().is_empty(), "dropped transcripts are never replayed");

    h.say("랭킹 보여줘");
    h.settle().await;
    assert_eq!(voice_commands(&h.outbound()), vec![("SHOW_RANKING".to_string(), None)]);
}

#[tokio::test(start_paused = true)]
async fn test_resume_waits_for_guard_delay() {
    let mut h = Harness::new();
    h.start().await;

    h.avatar_signal(AvatarSignal::StartTalking);
    h.avatar_signal(AvatarSignal::StopTalking);

    tokio::time::sleep(Duration::from_millis(499)).await;
    assert!(h.reactor.receiver.try_recv().is_err(), "resume fired early");

    tokio::time::sleep(Duration::from_millis(2)).await;
    let event = h.reactor.receiver.try_recv().expect("resume due");
    h.reactor.handle(event);
    assert_eq!(h.recognizer.resumes.load(Ordering::SeqCst), 1);
    assert_eq!(h.reactor.turn.state(), TurnState::Listening);
}

#[tokio::test(start_paused = true)]
async fn test_reentrant_transcripts_are_dropped() {
    let mut h = Harness::new();
    h.start().await;
    h.chat.reply_after(Duration::from_secs(1), "좋은 하루네요.");

    h.say("오늘 기분이 좋아");
    assert_eq!(h.reactor.turn.state(), TurnState::Processing);
    h.say("화투 시작");
    h.say("그리고 산책도 했어");
    h.settle().await;

    let requests = h.chat.requests();
    assert_eq!(requests.len(), 2, "greeting plus exactly one voice turn");
    assert!(matches!(
        &requests[1],
        ChatRequest::Message { message, .. } if message == "오늘 기분이 좋아"
    ));
    assert!(h.outbound().is_empty());
    assert_eq!(h.avatar.spoken().last().map(String::as_str), Some("좋은 하루네요."));
    assert_eq!(h.reactor.turn.state(), TurnState::Listening);
}

#[tokio::test(start_paused = true)]
async fn test_history_round_trip() {
    let mut h = Harness::new();
    h.start().await;
    h.chat.reply("첫 답변");
    h.chat.reply("두 번째 답변");

    h.say("첫 질문");
    h.settle().await;
    h.say("내 점수 알려줘");
    h.settle().await;

    let requests = h.chat.requests();
    assert_eq!(
        requests[1],
        ChatRequest::Message { message: "첫 질문".to_string(), history: vec![] }
    );
    assert_eq!(
        requests[2],
        ChatRequest::Message {
            message: "내 점수 알려줘".to_string(),
            history: vec![ChatMessage::user("첫 질문"), ChatMessage::assistant("첫 답변")],
        }
    );
    assert_eq!(
        h.reactor.history.snapshot(),
        vec![
            ChatMessage::user("첫 질문"),
            ChatMessage::assistant("첫 답변"),
            ChatMessage::user("내 점수 알려줘"),
            ChatMessage::assistant("두 번째 답변"),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_chat_failure_apologizes_and_keeps_listening() {
    let mut h = Harness::new();
    h.start().await;
    h.chat.fail();

    h.say("오늘 뭐 할까");
    h.settle().await;

    assert_eq!(h.avatar.spoken().last().map(String::as_str), Some(APOLOGY));
    assert!(h.reactor.history.is_empty());
    assert_eq!(h.reactor.turn.state(), TurnState::Listening);
}

#[tokio::test(start_paused = true)]
async fn test_speech_failure_fails_open() {
    let mut h = Harness::new();
    h.start().await;
    h.avatar.fail_speak.store(true, Ordering::SeqCst);

    h.say("랭킹 보여줘");
    h.avatar_signal(AvatarSignal::StartTalking);
    assert_eq!(h.recognizer.pauses.load(Ordering::SeqCst), 1);
    h.settle().await;

    assert_eq!(h.recognizer.resumes.load(Ordering::SeqCst), 1);
    assert!(!h.reactor.turn.is_avatar_speaking());
    assert_eq!(h.reactor.turn.state(), TurnState::Listening);
}

#[tokio::test(start_paused = true)]
async fn test_stale_reply_is_not_spoken() {
    let mut h = Harness::new();
    h.start().await;
    h.chat.reply_after(Duration::from_secs(2), "늦은 답변");
    h.chat.reply("랭킹 탭 설명");

    h.say("오늘 날씨 어때");
    let voice_epoch = h.reactor.epoch();
    h.host(json!({ "type": "TAB_CHANGED", "tabId": "ranking" }));
    assert!(h.reactor.epoch() > voice_epoch);
    h.settle().await;

    let spoken = h.avatar.spoken();
    assert!(spoken.contains(&"랭킹 탭 설명".to_string()));
    assert!(!spoken.contains(&"늦은 답변".to_string()));
    assert!(h.reactor.history.is_empty(), "discarded replies are not recorded");
    assert_eq!(h.reactor.turn.state(), TurnState::Listening);
    assert_eq!(
        h.chat.requests()[2],
        ChatRequest::Prompt(PromptRequest::TabExplain { tab_id: "ranking".to_string() })
    );
}

#[tokio::test(start_paused = true)]
async fn test_foreign_origin_is_rejected() {
    let mut h = Harness::new();

    h.host_from("https://evil.example.com", json!({ "type": "START_AVATAR" }));
    h.settle().await;

    assert_eq!(h.tokens.calls.load(Ordering::SeqCst), 0);
    assert!(h.reactor.session.is_idle());
}

#[tokio::test(start_paused = true)]
async fn test_microphone_denial_alerts_user() {
    let mut recognizer = StubRecognizer::new();
    recognizer.start_error = Some(RecognizerError::PermissionDenied);
    let mut h = Harness::with_recognizer(recognizer);

    h.start().await;

    assert!(!h.reactor.session.voice_enabled);
    assert!(h.outbound().contains(&OutboundMessage::UserAlert {
        message: MIC_PERMISSION_MESSAGE.to_string(),
    }));
    // Avatar still greets; only voice input is lost.
    assert_eq!(h.avatar.spoken(), vec![DEFAULT_REPLY]);
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_recognizer_disables_voice_silently() {
    let mut recognizer = StubRecognizer::new();
    recognizer.supported = false;
    let mut h = Harness::with_recognizer(recognizer);

    h.start().await;

    assert_eq!(h.recognizer.starts.load(Ordering::SeqCst), 0);
    assert!(!h.reactor.session.voice_enabled);
    assert!(h.outbound().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_token_failure_alerts_and_stays_idle() {
    let mut h = Harness::new();
    h.tokens.fail.store(true, Ordering::SeqCst);

    h.host(json!({ "type": "START_AVATAR" }));
    h.settle().await;

    assert!(h.reactor.session.is_idle());
    assert_eq!(h.avatar.starts.load(Ordering::SeqCst), 0);
    assert_eq!(
        h.outbound(),
        vec![OutboundMessage::UserAlert { message: SESSION_FAILED_MESSAGE.to_string() }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_and_reset() {
    let mut h = Harness::new();
    h.host(json!({ "type": "USER_INFO", "name": "지수" }));
    h.start().await;
    h.say("첫 질문");
    h.settle().await;
    assert_eq!(h.reactor.history.len(), 2);

    h.host(json!({ "type": "STOP_AVATAR" }));
    h.settle().await;
    assert!(h.reactor.session.is_idle());
    assert_eq!(h.avatar.stops.load(Ordering::SeqCst), 1);
    assert!(h.recognizer.stops.load(Ordering::SeqCst) >= 1);
    assert_eq!(h.reactor.history.len(), 2, "stop keeps the conversation");
    assert_eq!(h.reactor.session.user_name.as_deref(), Some("지수"));

    let before = h.chat.requests().len();
    h.say("화투 시작");
    h.settle().await;
    assert_eq!(h.chat.requests().len(), before, "no session, no voice handling");
    assert!(voice_commands(&h.outbound()).is_empty());

    h.start().await;
    h.host(json!({ "type": "RESET_AVATAR" }));
    h.settle().await;
    assert!(h.reactor.session.is_idle());
    assert!(h.reactor.history.is_empty());
    assert_eq!(h.reactor.session.user_name, None);
}

#[tokio::test(start_paused = true)]
async fn test_explain_game_uses_known_name() {
    let mut h = Harness::new();
    h.start().await;
    h.host(json!({ "type": "USER_INFO", "name": "지수" }));
    h.chat.reply("화투는 같은 달의 패를 맞추는 게임이에요.");

    h.host(json!({ "type": "EXPLAIN_GAME", "game": "hwatu" }));
    h.settle().await;

    assert_eq!(
        h.chat.requests().last(),
        Some(&ChatRequest::Prompt(PromptRequest::GameExplain {
            game: "hwatu".to_string(),
            name: Some("지수".to_string()),
        }))
    );
    assert_eq!(
        h.avatar.spoken().last().map(String::as_str),
        Some("화투는 같은 달의 패를 맞추는 게임이에요.")
    );
    assert!(h.reactor.history.is_empty(), "host prompts stay out of the conversation");
}

#[tokio::test(start_paused = true)]
async fn test_stream_disconnect_ends_session() {
    let mut h = Harness::new();
    h.start().await;

    let id = h.active_session();

    h.avatar_signal(AvatarSignal::StreamDisconnected(SessionId::new()));
    assert_eq!(h.reactor.session.phase, SessionPhase::Active(id), "foreign disconnect ignored");

    h.avatar_signal(AvatarSignal::StartTalking);
    h.avatar_signal(AvatarSignal::StreamDisconnected(id));

    assert!(h.reactor.session.is_idle());
    assert_eq!(h.reactor.turn.state(), TurnState::Listening);
    assert_eq!(h.recognizer.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_restart_while_starting_keeps_newest_session() {
    let mut h = Harness::new();

    h.host(json!({ "type": "START_AVATAR" }));
    h.host(json!({ "type": "STOP_AVATAR" }));
    h.host(json!({ "type": "START_AVATAR" }));
    h.settle().await;

    assert_eq!(h.avatar.starts.load(Ordering::SeqCst), 2);
    let started = h.avatar.started.lock().unwrap().clone();
    let stopped = h.avatar.stopped.lock().unwrap().clone();
    assert_eq!(started.len(), 2);

    let active = h.active_session();
    assert_eq!(stopped.len(), 1, "only the superseded session is stopped");
    assert_ne!(stopped[0], active);
    assert!(started.contains(&stopped[0]));
    assert_eq!(h.recognizer.starts.load(Ordering::SeqCst), 1);
    assert_eq!(h.chat.requests().len(), 1, "the surviving session greets once");
}

#[tokio::test(start_paused = true)]
async fn test_reset_while_starting_then_start() {
    let mut h = Harness::new();
    h.host(json!({ "type": "USER_INFO", "name": "지수" }));

    h.host(json!({ "type": "START_AVATAR" }));
    h.host(json!({ "type": "RESET_AVATAR" }));
    assert!(h.reactor.session.is_idle());
    assert_eq!(h.reactor.session.user_name, None);

    h.host(json!({ "type": "START_AVATAR", "name": "민수" }));
    h.settle().await;

    let active = h.active_session();
    let stopped = h.avatar.stopped.lock().unwrap().clone();
    assert_eq!(h.avatar.starts.load(Ordering::SeqCst), 2);
    assert_eq!(stopped.len(), 1);
    assert_ne!(stopped[0], active);
    assert_eq!(
        h.chat.requests(),
        vec![ChatRequest::Prompt(PromptRequest::Greeting {
            name: Some("민수".to_string()),
            stats: None,
        })]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_while_starting_stops_late_session() {
    let mut h = Harness::new();

    h.host(json!({ "type": "START_AVATAR" }));
    h.host(json!({ "type": "STOP_AVATAR" }));
    h.settle().await;

    assert!(h.reactor.session.is_idle());
    assert_eq!(h.avatar.starts.load(Ordering::SeqCst), 1);
    assert_eq!(*h.avatar.stopped.lock().unwrap(), *h.avatar.started.lock().unwrap());
    assert_eq!(h.recognizer.starts.load(Ordering::SeqCst), 0);
    assert!(h.chat.requests().is_empty(), "no greeting for a stopped session");
}

#[tokio::test(start_paused = true)]
async fn test_interim_transcripts_are_not_dispatched() {
    let mut h = Harness::new();
    h.start().await;

    h.reactor
        .handle(Event::Input(InputEvent::interim_transcript("화투 시작")));
    h.settle().await;

    assert!(h.outbound().is_empty());
    assert_eq!(h.chat.requests().len(), 1);
    assert_eq!(h.reactor.turn.state(), TurnState::Listening);
}
