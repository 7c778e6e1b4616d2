//! Match state and the authoritative tick loop

use dashmap::DashMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{
    Config, DEFAULT_DIFFICULTY, DEFAULT_FIELD_HEIGHT, DEFAULT_FIELD_WIDTH, DEFAULT_MAX_SCORE,
};
use crate::lobby::LobbyRequest;
use crate::render::{self, DrawCmd, FrameBuffer, FrameCadence, RenderSink};
use crate::util::time::{ticks_for_millis, FRAME_INTERVAL_TICKS, TICK_INTERVAL_MICROS};
use crate::ws::protocol::{
    ClientCmd, Inbound, PlayerSide, ServerEvent, ServerMsg, Status, StatusEnvelope,
};

use super::ball::Ball;
use super::paddle::Paddle;
use super::PeerInput;

/// Where the paddles sit relative to the field edges
const LEFT_PADDLE_X: f32 = 30.0;
const RIGHT_PADDLE_MARGIN: f32 = 40.0;
/// Vertical offset of the paddle baseline at construction
const BASELINE_OFFSET: f32 = 40.0;

/// The serve fires this long after a start is accepted
const SERVE_DELAY_TICKS: u32 = ticks_for_millis(500);
/// Resize quiescence window; only the last event inside it is applied
const RESIZE_DEBOUNCE_TICKS: u32 = ticks_for_millis(300);

/// Match phase, classified once per tick from scores and the started flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// No ball in play
    Idle,
    /// Ball in play (or being served)
    Active,
    /// A player reached the max score; terminal for the session
    Finished,
}

/// Gameplay parameters a match is created with
#[derive(Debug, Clone, Copy)]
pub struct MatchSettings {
    pub field_width: f32,
    pub field_height: f32,
    pub difficulty: f32,
    pub max_score: u32,
}

impl MatchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            field_width: config.field_width,
            field_height: config.field_height,
            difficulty: config.difficulty,
            max_score: config.max_score,
        }
    }
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            field_width: DEFAULT_FIELD_WIDTH,
            field_height: DEFAULT_FIELD_HEIGHT,
            difficulty: DEFAULT_DIFFICULTY,
            max_score: DEFAULT_MAX_SCORE,
        }
    }
}

/// Match state (owned by the session task)
pub struct MatchState {
    pub id: Uuid,
    /// Identifier assigned by the lobby when a match is granted
    pub match_id: Option<String>,
    pub field_width: f32,
    pub field_height: f32,
    pub difficulty: f32,
    pub max_score: u32,
    /// True from start-acceptance until the next scoring/resize transition
    pub started: bool,
    pub tick: u64,
    pub first: Paddle,
    pub second: Paddle,
    pub ball: Ball,
    pub rng: ChaCha8Rng,
    pub serve_countdown: Option<u32>,
    pub pending_resize: Option<(f32, f32)>,
    pub resize_countdown: u32,
}

impl MatchState {
    pub fn new(id: Uuid, seed: u64, settings: MatchSettings) -> Self {
        let baseline = settings.field_height / 2.0 - BASELINE_OFFSET;

        let mut first = Paddle::new(PlayerSide::Left, LEFT_PADDLE_X, baseline);
        first.peer_id = Some(id);
        let second = Paddle::new(
            PlayerSide::Right,
            settings.field_width - RIGHT_PADDLE_MARGIN,
            baseline,
        );

        Self {
            id,
            match_id: None,
            field_width: settings.field_width,
            field_height: settings.field_height,
            difficulty: settings.difficulty,
            max_score: settings.max_score,
            started: false,
            tick: 0,
            first,
            second,
            ball: Ball::new(settings.field_width, settings.field_height),
            rng: ChaCha8Rng::seed_from_u64(seed),
            serve_countdown: None,
            pending_resize: None,
            resize_countdown: 0,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        if self.first.score >= self.max_score || self.second.score >= self.max_score {
            MatchPhase::Finished
        } else if self.started {
            MatchPhase::Active
        } else {
            MatchPhase::Idle
        }
    }

    pub fn paddle_mut(&mut self, side: PlayerSide) -> &mut Paddle {
        match side {
            PlayerSide::Left => &mut self.first,
            PlayerSide::Right => &mut self.second,
        }
    }
}

/// Handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub id: Uuid,
    pub input_tx: mpsc::Sender<PeerInput>,
    pub msg_tx: broadcast::Sender<ServerMsg>,
}

/// Registry of all active sessions
pub struct SessionRegistry {
    sessions: DashMap<Uuid, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.get(id).map(|s| s.value().clone())
    }

    pub fn insert(&self, handle: SessionHandle) {
        self.sessions.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.remove(id).map(|(_, h)| h)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The authoritative match for one session
pub struct PongMatch {
    state: MatchState,
    input_rx: mpsc::Receiver<PeerInput>,
    msg_tx: broadcast::Sender<ServerMsg>,
    cadence: FrameCadence,
    lobby_tx: mpsc::Sender<LobbyRequest>,
    /// One-shot sink signals (cursor affordance) carried by the next frame
    signals: Vec<DrawCmd>,
    closing: bool,
}

impl PongMatch {
    /// Create a new match task for a session
    pub fn new(
        id: Uuid,
        seed: u64,
        settings: MatchSettings,
        lobby_tx: mpsc::Sender<LobbyRequest>,
    ) -> (Self, SessionHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (msg_tx, _) = broadcast::channel(64);

        let handle = SessionHandle {
            id,
            input_tx,
            msg_tx: msg_tx.clone(),
        };

        let pong = Self {
            state: MatchState::new(id, seed, settings),
            input_rx,
            msg_tx,
            cadence: FrameCadence::new(FRAME_INTERVAL_TICKS),
            lobby_tx,
            signals: Vec::new(),
            closing: false,
        };

        (pong, handle)
    }

    /// Run the authoritative tick loop until the peer closes the session
    pub async fn run(mut self) {
        info!(session_id = %self.state.id, "session started");

        let mut ticker = interval(Duration::from_micros(TICK_INTERVAL_MICROS));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            // Entry points only set flags and positions consumed below, so
            // inbound messages are safe at any tick boundary.
            self.process_inputs();

            if self.closing {
                break;
            }

            let commands = self.run_tick();

            if self.cadence.should_send() {
                let _ = self.msg_tx.send(ServerMsg::Event(ServerEvent::Frame {
                    tick: self.state.tick,
                    commands,
                }));
            }
        }

        let _ = self
            .msg_tx
            .send(ServerMsg::Status(StatusEnvelope::new(Status::Close)));
        info!(session_id = %self.state.id, "session closed");
    }

    /// Drain all pending peer messages
    fn process_inputs(&mut self) {
        loop {
            match self.input_rx.try_recv() {
                Ok(input) => match input.msg {
                    Inbound::Command(cmd) => self.handle_command(cmd),
                    Inbound::Status(envelope) => self.handle_status(envelope),
                },
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.closing = true;
                    break;
                }
            }
        }
    }

    fn handle_command(&mut self, cmd: ClientCmd) {
        match cmd {
            ClientCmd::PaddleMove { side, velocity } => {
                self.state.paddle_mut(side).speed_y = velocity;
            }
            ClientCmd::StartRequest => self.handle_start_request(),
            ClientCmd::Resize { width, height } => {
                // Debounce: re-arming replaces any pending request, so only
                // the most recent resize survives the quiescence window.
                self.state.pending_resize = Some((width, height));
                self.state.resize_countdown = RESIZE_DEBOUNCE_TICKS;
            }
        }
    }

    fn handle_status(&mut self, envelope: StatusEnvelope) {
        let Some(status) = envelope.status() else {
            debug!(
                session_id = %self.state.id,
                ordinal = envelope.status,
                "unknown status ordinal, ignoring"
            );
            return;
        };

        match status {
            Status::MatchStart => {
                self.start_match(envelope.match_id().map(String::from));
            }
            Status::Close => {
                self.closing = true;
            }
            Status::Waiting | Status::Playing | Status::MatchEnd => {}
        }
    }

    /// Peer asked to play: surface it to the lobby, gated on the idle phase
    fn handle_start_request(&mut self) {
        if self.state.phase() != MatchPhase::Idle {
            debug!(session_id = %self.state.id, "start request ignored");
            return;
        }

        self.send_status(StatusEnvelope::new(Status::Waiting));

        let request = LobbyRequest {
            session_id: self.state.id,
        };
        if let Err(e) = self.lobby_tx.try_send(request) {
            warn!(
                session_id = %self.state.id,
                error = %e,
                "lobby unreachable, start request dropped"
            );
        }
    }

    /// Accept an inbound MATCH_START: record the match id, reposition the
    /// entities and arm the serve. A no-op while a point is live or once the
    /// match is finished.
    fn start_match(&mut self, match_id: Option<String>) {
        if self.state.started || self.state.phase() == MatchPhase::Finished {
            debug!(session_id = %self.state.id, "match start ignored");
            return;
        }

        if let Some(id) = match_id {
            self.state.match_id = Some(id);
        }

        let state = &mut self.state;
        state.first.y = state.field_height / 2.0 - state.first.height / 2.0;
        state.second.y = state.field_height / 2.0 - state.second.height / 2.0;
        state.ball.center(state.field_width, state.field_height);
        state.started = true;
        state.serve_countdown = Some(SERVE_DELAY_TICKS);

        self.signals.push(DrawCmd::Cursor { hidden: true });

        let envelope = match &self.state.match_id {
            Some(id) => StatusEnvelope::with_match_id(Status::MatchStart, id.clone()),
            None => StatusEnvelope::new(Status::MatchStart),
        };
        self.send_status(envelope);

        info!(
            session_id = %self.state.id,
            match_id = ?self.state.match_id,
            "match started"
        );
    }

    /// Run a single simulation tick and return its draw commands
    fn run_tick(&mut self) -> Vec<DrawCmd> {
        self.state.tick += 1;
        self.tick_timers();

        let mut frame = FrameBuffer::new();
        frame.submit(DrawCmd::Clear);

        // Paddles advance first; the ball reacts to their updated positions.
        let started = self.state.started;
        let field_height = self.state.field_height;
        self.state.first.advance(started, field_height);
        self.state.second.advance(started, field_height);

        let scored = self.state.ball.resolve(
            &mut self.state.first,
            &mut self.state.second,
            self.state.field_width,
            self.state.field_height,
            self.state.difficulty,
            &mut self.state.rng,
        );

        if let Some(scorer) = scored {
            self.state.started = false;
            self.signals.push(DrawCmd::Cursor { hidden: false });
            info!(
                session_id = %self.state.id,
                scorer = ?scorer,
                first = self.state.first.score,
                second = self.state.second.score,
                "point scored"
            );

            if self.state.phase() == MatchPhase::Finished {
                self.send_status(StatusEnvelope::new(Status::MatchEnd));
                info!(session_id = %self.state.id, "match over");
            }
        }

        // Physics is settled; the renderer only reads from here on.
        let phase = self.state.phase();
        self.state.first.draw(&mut frame);
        self.state.second.draw(&mut frame);
        self.state.ball.draw(&mut frame);
        render::draw_overlay(
            &mut frame,
            phase,
            self.state.first.score,
            self.state.second.score,
            self.state.field_width,
            self.state.field_height,
        );

        if !self.signals.is_empty() {
            // Make sure the frame carrying a one-shot signal is broadcast
            self.cadence.force_next();
            for signal in self.signals.drain(..) {
                frame.submit(signal);
            }
        }

        frame.into_commands()
    }

    /// Advance the serve and resize countdowns
    fn tick_timers(&mut self) {
        // The serve is fire-and-forget: it survives intervening transitions.
        if let Some(remaining) = self.state.serve_countdown {
            if remaining <= 1 {
                self.state.serve_countdown = None;
                self.state.ball.serve(&mut self.state.rng);
                self.send_status(StatusEnvelope::new(Status::Playing));
                debug!(session_id = %self.state.id, "serve fired");
            } else {
                self.state.serve_countdown = Some(remaining - 1);
            }
        }

        if self.state.pending_resize.is_some() {
            self.state.resize_countdown = self.state.resize_countdown.saturating_sub(1);
            if self.state.resize_countdown == 0 {
                if let Some((width, height)) = self.state.pending_resize.take() {
                    self.apply_resize(width, height);
                }
            }
        }
    }

    /// Apply a debounced resize: structural repositioning, scores untouched
    fn apply_resize(&mut self, width: f32, height: f32) {
        let state = &mut self.state;
        state.started = false;
        state.ball.stop();

        state.field_width = width;
        state.field_height = height;

        state.first.y = height / 2.0 - state.first.height / 2.0;
        state.second.y = height / 2.0 - state.second.height / 2.0;
        state.second.x = width - RIGHT_PADDLE_MARGIN;
        state.ball.center(width, height);

        info!(session_id = %state.id, width, height, "field resized");
    }

    fn send_status(&self, envelope: StatusEnvelope) {
        let _ = self.msg_tx.send(ServerMsg::Status(envelope));
    }
}
