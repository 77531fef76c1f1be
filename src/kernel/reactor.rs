use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::dispatcher::{DispatchPlan, Dispatcher, APOLOGY};
use super::event::{AvatarSignal, DriverEvent, Event, InputEvent, JobOrigin, JobTicket};
use super::history::{ChatHistory, DEFAULT_HISTORY_LIMIT};
use super::intent::IntentClassifier;
use super::session::{SessionPhase, SessionState};
use super::speech::speak_after_interrupt;
use super::turn::{TranscriptDecision, TurnAction, TurnCoordinator, TurnTiming};
use crate::config::AppConfig;
use crate::error::{AvatarError, RecognizerError, SessionError, ServiceError};
use crate::protocol::{EnvelopeError, HostBus, InboundMessage, OriginPolicy, OutboundMessage};
use crate::services::{
    AvatarClient, ChatRequest, ChatService, PromptRequest, Recognizer, SessionId, TokenService,
};

pub const MIC_PERMISSION_MESSAGE: &str = "마이크 권한이 필요해요. 브라우저 설정에서 마이크를 허용해 주세요.";
pub const SESSION_FAILED_MESSAGE: &str = "아바타를 시작하지 못했어요. 잠시 후 다시 시도해 주세요.";

#[derive(Debug, Clone)]
pub struct ReactorConfig {
    pub timing: TurnTiming,
    pub history_limit: usize,
    pub allowed_origins: Vec<String>,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            timing: TurnTiming::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            allowed_origins: vec!["http://localhost".to_string(), "https://localhost".to_string()],
        }
    }
}

impl From<&AppConfig> for ReactorConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            timing: config.timing,
            history_limit: config.history_limit,
            allowed_origins: config.allowed_origins.clone(),
        }
    }
}

/// External collaborators behind their trait seams.
#[derive(Clone)]
pub struct Collaborators {
    pub chat: Arc<dyn ChatService>,
    pub tokens: Arc<dyn TokenService>,
    pub avatar: Arc<dyn AvatarClient>,
    pub recognizer: Arc<dyn Recognizer>,
    pub bus: Arc<dyn HostBus>,
}

/// Single event loop owning all session and turn state.
///
/// `handle` never awaits: chat calls, token fetches, speech and guard timers run
/// in spawned tasks that report back as `DriverEvent`s on the same channel.
pub struct Reactor {
    pub receiver: mpsc::Receiver<Event>,
    tx: mpsc::Sender<Event>,
    pub turn: TurnCoordinator,
    pub session: SessionState,
    pub history: ChatHistory,
    classifier: IntentClassifier,
    dispatcher: Dispatcher,
    origins: OriginPolicy,
    services: Collaborators,
    // Bumped for every job and on teardown; replies from older epochs are stale.
    epoch: u64,
    voice_job: Option<u64>,
    // Session start attempts; only the latest pending one may become active.
    start_attempts: u64,
    pending_start: Option<u64>,
}

impl Reactor {
    pub fn new(
        receiver: mpsc::Receiver<Event>,
        tx: mpsc::Sender<Event>,
        config: ReactorConfig,
        services: Collaborators,
    ) -> Self {
        let classifier = IntentClassifier::new();
        Self {
            receiver,
            tx,
            turn: TurnCoordinator::new(config.timing),
            session: SessionState::new(),
            history: ChatHistory::with_limit(config.history_limit),
            classifier,
            dispatcher: Dispatcher::new(classifier.table()),
            origins: OriginPolicy::new(config.allowed_origins),
            services,
            epoch: 0,
            voice_job: None,
            start_attempts: 0,
            pending_start: None,
        }
    }

    pub fn sender(&self) -> mpsc::Sender<Event> {
        self.tx.clone()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Receive and handle one event. Returns false once the channel is closed.
    pub async fn step(&mut self) -> bool {
        match self.receiver.recv().await {
            Some(event) => {
                self.handle(event);
                true
            }
            None => false,
        }
    }

    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("reactor started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = self.receiver.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
            }
        }
        self.services.recognizer.stop();
        if let SessionPhase::Active(id) = self.session.phase {
            if let Err(e) = self.services.avatar.stop_session(id).await {
                warn!(error = %e, "avatar session did not stop cleanly");
            }
        }
        info!("reactor stopped");
    }

    pub fn handle(&mut self, event: Event) {
        // Inputs come from the outside world, driver events from our own tasks.
        match event {
            Event::Input(input) => self.on_input(input),
            Event::Driver(driver) => self.on_driver(driver),
        }
    }

    fn on_input(&mut self, input: InputEvent) {
        match input {
            InputEvent::Transcript { text, is_final } => self.on_transcript(&text, is_final),
            InputEvent::Avatar(signal) => self.on_avatar(signal),
            // ORIGIN CHECK: nothing from the host is trusted before this.
            InputEvent::Host(envelope) => match self.origins.open(envelope) {
                Ok(message) => self.on_host(message),
                Err(EnvelopeError::OriginRejected(origin)) => {
                    warn!(%origin, "host message from disallowed origin rejected");
                }
                Err(EnvelopeError::Unrecognized(reason)) => {
                    debug!(%reason, "unrecognized host message ignored");
                }
            },
        }
    }

    fn on_transcript(&mut self, text: &str, is_final: bool) {
        if !self.session.is_active() {
            debug!("transcript ignored without an active session");
            return;
        }
        match self.turn.on_transcript(text, is_final) {
            TranscriptDecision::Dispatch(transcript) => self.dispatch(transcript),
            TranscriptDecision::Dropped(reason) => debug!(?reason, "transcript dropped"),
        }
    }

    fn dispatch(&mut self, transcript: String) {
        // 1. Classify
        let intent = self.classifier.classify(&transcript);
        info!(
            kind = ?intent.kind,
            action = ?intent.action,
            confidence = intent.confidence,
            "voice intent classified"
        );

        // 2. Ticket; the voice job holds the reentrancy flag until it finishes
        let ticket = self.next_ticket(JobOrigin::Voice);
        self.voice_job = Some(ticket.epoch);

        // 3. Plan and hand off
        let plan = self
            .dispatcher
            .plan(&intent, &transcript, &self.history, Utc::now().timestamp_millis());
        match plan {
            DispatchPlan::Command { message, speech } => {
                self.post(message);
                self.spawn_speech(ticket, speech);
            }
            DispatchPlan::Converse { request } => {
                self.spawn_chat(ticket, Some(transcript), request);
            }
        }
    }

    fn on_avatar(&mut self, signal: AvatarSignal) {
        match signal {
            AvatarSignal::StartTalking => {
                let actions = self.turn.avatar_started_talking();
                self.apply(actions);
            }
            AvatarSignal::StopTalking => {
                let actions = self.turn.avatar_stopped_talking();
                self.apply(actions);
            }
            AvatarSignal::StreamReady(id) => info!(session = %id.0, "avatar stream ready"),
            AvatarSignal::StreamDisconnected(id) => {
                // Orphaned sessions disconnect too; only the active one matters.
                if self.session.phase == SessionPhase::Active(id) {
                    warn!(session = %id.0, "avatar stream disconnected");
                    self.end_session(false);
                } else {
                    debug!(session = %id.0, "disconnect for inactive session ignored");
                }
            }
            AvatarSignal::UserStartTalking | AvatarSignal::UserStopTalking => {
                debug!(?signal, "user voice activity");
            }
            AvatarSignal::UserMessage(text) => debug!(%text, "user message"),
            AvatarSignal::AvatarMessage(text) => debug!(%text, "avatar message"),
        }
    }

    fn on_host(&mut self, message: InboundMessage) {
        match message {
            InboundMessage::TabChanged { tab_id } => {
                self.spawn_prompt(PromptRequest::TabExplain { tab_id });
            }
            InboundMessage::StartAvatar { name, stats } => {
                if name.is_some() {
                    self.session.user_name = name;
                }
                if stats.is_some() {
                    self.session.stats = stats;
                }
                self.start_session();
            }
            InboundMessage::ResetAvatar => self.stop_session(true),
            InboundMessage::StopAvatar => self.stop_session(false),
            InboundMessage::ExplainGame { game } => {
                let name = self.session.user_name.clone();
                self.spawn_prompt(PromptRequest::GameExplain { game, name });
            }
            InboundMessage::ExplainDashboard { details } => {
                self.spawn_prompt(PromptRequest::DashboardExplain { details });
            }
            InboundMessage::UserInfo { name } => {
                info!("user identified");
                self.session.user_name = Some(name);
            }
        }
    }

    fn on_driver(&mut self, event: DriverEvent) {
        match event {
            DriverEvent::ChatReplied { ticket, user_text, result } => {
                self.on_chat_reply(ticket, user_text, result);
            }
            DriverEvent::SpeechFinished { ticket, result } => {
                self.on_speech_finished(ticket, result);
            }
            DriverEvent::ResumeDue { generation } => {
                let actions = self.turn.resume_due(generation);
                self.apply(actions);
            }
            DriverEvent::SessionStarted { attempt, result } => {
                self.on_session_started(attempt, result);
            }
        }
    }

    fn on_chat_reply(
        &mut self,
        ticket: JobTicket,
        user_text: Option<String>,
        result: Result<String, ServiceError>,
    ) {
        // STALE REJECTION: a newer job or a teardown happened while we waited.
        if ticket.epoch != self.epoch || !self.session.is_active() {
            info!(epoch = ticket.epoch, current = self.epoch, "stale chat reply discarded");
            self.finish_job(ticket);
            return;
        }

        // Failures are spoken as an apology and never enter the history.
        let speech = match result {
            Ok(reply) => {
                if let Some(user) = user_text {
                    self.history.record_exchange(&user, &reply);
                }
                reply
            }
            Err(e) => {
                warn!(error = %e, "chat request failed");
                APOLOGY.to_string()
            }
        };
        self.spawn_speech(ticket, speech);
    }

    fn on_speech_finished(&mut self, ticket: JobTicket, result: Result<(), AvatarError>) {
        if let Err(e) = result {
            warn!(error = %e, "avatar speech failed");
            let actions = self.turn.speech_failed();
            self.apply(actions);
        }
        self.finish_job(ticket);
    }

    fn finish_job(&mut self, ticket: JobTicket) {
        if ticket.origin == JobOrigin::Voice && self.voice_job == Some(ticket.epoch) {
            self.voice_job = None;
            self.turn.dispatch_finished();
        }
    }

    fn on_session_started(&mut self, attempt: u64, result: Result<SessionId, SessionError>) {
        if self.pending_start != Some(attempt) {
            // Superseded by a stop or a newer start while in flight.
            match result {
                Ok(id) => {
                    info!(attempt, session = %id.0, "orphaned avatar session stopped");
                    self.spawn_avatar_stop(id);
                }
                Err(e) => debug!(attempt, error = %e, "superseded session start failed"),
            }
            return;
        }
        self.pending_start = None;

        match result {
            Ok(id) => {
                info!(session = %id.0, "avatar session active");
                self.session.phase = SessionPhase::Active(id);
                self.start_listening();
                self.greet_once();
            }
            Err(e) => {
                error!(error = %e, "avatar session failed to start");
                self.session.phase = SessionPhase::Idle;
                self.post(OutboundMessage::UserAlert {
                    message: SESSION_FAILED_MESSAGE.to_string(),
                });
            }
        }
    }

    fn start_session(&mut self) {
        match self.session.phase {
            SessionPhase::Active(_) => {
                self.greet_once();
                return;
            }
            SessionPhase::Starting => {
                debug!("avatar session start already in progress");
                return;
            }
            SessionPhase::Idle => {}
        }

        self.start_attempts += 1;
        let attempt = self.start_attempts;
        info!(attempt, "starting avatar session");
        self.session.phase = SessionPhase::Starting;
        self.pending_start = Some(attempt);

        let tokens = Arc::clone(&self.services.tokens);
        let avatar = Arc::clone(&self.services.avatar);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = async {
                let token = tokens.fetch_token().await?;
                let id = avatar.start_session(&token).await?;
                Ok::<_, SessionError>(id)
            }
            .await;
            let _ = tx
                .send(DriverEvent::SessionStarted { attempt, result }.into())
                .await;
        });
    }

    fn stop_session(&mut self, forget: bool) {
        // A session still starting has no id yet; its result is stopped on arrival.
        let live = match self.session.phase {
            SessionPhase::Active(id) => Some(id),
            _ => None,
        };
        self.end_session(forget);
        if forget {
            self.history.clear();
        }
        if let Some(id) = live {
            self.spawn_avatar_stop(id);
        }
    }

    fn end_session(&mut self, forget: bool) {
        info!(forget, "avatar session ended");
        self.pending_start = None;
        self.session.end(forget);
        self.turn.reset();
        self.voice_job = None;
        self.epoch += 1;
        self.services.recognizer.stop();
    }

    fn start_listening(&mut self) {
        let recognizer = Arc::clone(&self.services.recognizer);
        if !recognizer.is_supported() {
            warn!("speech recognition unsupported, voice input disabled");
            self.session.voice_enabled = false;
            return;
        }
        match recognizer.start() {
            Ok(()) => {
                info!("speech recognizer listening");
                self.session.voice_enabled = true;
            }
            Err(RecognizerError::Unsupported) => {
                warn!("speech recognition unsupported, voice input disabled");
                self.session.voice_enabled = false;
            }
            Err(RecognizerError::PermissionDenied) => {
                warn!("microphone permission denied");
                self.session.voice_enabled = false;
                self.post(OutboundMessage::UserAlert {
                    message: MIC_PERMISSION_MESSAGE.to_string(),
                });
            }
            Err(e) => warn!(error = %e, "speech recognizer failed to start"),
        }
    }

    fn greet_once(&mut self) {
        if self.session.greeted {
            return;
        }
        self.session.greeted = true;
        let greeting = PromptRequest::Greeting {
            name: self.session.user_name.clone(),
            stats: self.session.stats.clone(),
        };
        self.spawn_prompt(greeting);
    }

    fn spawn_prompt(&mut self, prompt: PromptRequest) {
        if !self.session.is_active() {
            info!("host prompt ignored without an active session");
            return;
        }
        let ticket = self.next_ticket(JobOrigin::Host);
        self.spawn_chat(ticket, None, prompt.into());
    }

    fn next_ticket(&mut self, origin: JobOrigin) -> JobTicket {
        self.epoch += 1;
        JobTicket { epoch: self.epoch, origin }
    }

    fn spawn_chat(&self, ticket: JobTicket, user_text: Option<String>, request: ChatRequest) {
        let chat = Arc::clone(&self.services.chat);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = chat.send(&request).await;
            let _ = tx
                .send(DriverEvent::ChatReplied { ticket, user_text, result }.into())
                .await;
        });
    }

    fn spawn_speech(&self, ticket: JobTicket, text: String) {
        let avatar = Arc::clone(&self.services.avatar);
        let settle = self.turn.timing().speech_settle;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = speak_after_interrupt(avatar.as_ref(), &text, settle).await;
            let _ = tx.send(DriverEvent::SpeechFinished { ticket, result }.into()).await;
        });
    }

    fn spawn_avatar_stop(&self, id: SessionId) {
        let avatar = Arc::clone(&self.services.avatar);
        tokio::spawn(async move {
            if let Err(e) = avatar.stop_session(id).await {
                warn!(error = %e, session = %id.0, "avatar session did not stop cleanly");
            }
        });
    }

    fn apply(&self, actions: Vec<TurnAction>) {
        for action in actions {
            match action {
                TurnAction::PauseRecognizer => self.services.recognizer.pause(),
                TurnAction::ResumeRecognizer => {
                    if self.session.is_active() && self.session.voice_enabled {
                        self.services.recognizer.resume();
                    }
                }
                TurnAction::ScheduleResume { after, generation } => {
                    let tx = self.tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = tx.send(DriverEvent::ResumeDue { generation }.into()).await;
                    });
                }
            }
        }
    }

    fn post(&self, message: OutboundMessage) {
        if let Err(e) = self.services.bus.post(message) {
            warn!(error = %e, "host message not delivered");
        }
    }
}
