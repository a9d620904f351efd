//! Session state and the frame-driven tick loop

use dashmap::DashMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dialogue::{DialogueBoard, DialogueEvent, DialogueGenerator};
use crate::util::time::{frame_duration, unix_millis};
use crate::ws::protocol::{ClientMsg, FighterInfo, GameEvent, ServerMsg};

use super::combat::HitResult;
use super::fighter::Fighter;
use super::input::{HeldKeys, InputIntent};
use super::particles::{Particle, ParticleSystem};
use super::physics::ARENA_WIDTH;
use super::roster;
use super::snapshot::SnapshotBuilder;
use super::PlayerInput;

/// Spawn x of player 1; player 2 mirrors it from the right wall
pub const SPAWN_MARGIN: f32 = 200.0;

/// Inputs older than this when drained are logged
const STALE_INPUT_MS: u64 = 100;

/// Which screen the session is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Menu,
    CharacterSelect,
    /// Fighting, or showing the winner overlay once a winner is set
    Battle,
}

/// Tunables for one session
#[derive(Debug, Clone, Copy)]
pub struct MatchSettings {
    /// Ticks per second of the frame clock
    pub frame_rate: u32,
    /// Send a snapshot every N ticks
    pub snapshot_every: u32,
    /// Minimum ticks between dialogue requests triggered by hits
    pub hit_dialogue_interval: u64,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            frame_rate: 60,
            snapshot_every: 1,
            hit_dialogue_interval: 180,
        }
    }
}

/// A dialogue line the session wants fetched
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueRequest {
    pub seq: u64,
    pub event: DialogueEvent,
    pub fighter1: String,
    pub fighter2: String,
}

/// Something the driver has to react to
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ScreenChanged(Screen),
    MatchStarted { round: u32 },
    Hit(HitResult),
    /// `winner` is the fighter id (1 or 2)
    Winner { winner: u8 },
    Dialogue(DialogueRequest),
}

/// Rejected session commands
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("Cannot {action} from the {from:?} screen")]
    InvalidTransition { from: Screen, action: &'static str },

    #[error("A battle is still in progress")]
    BattleInProgress,

    #[error("Unknown character index {0}")]
    UnknownCharacter(usize),
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::InvalidTransition { .. } => "invalid_transition",
            SessionError::BattleInProgress => "battle_in_progress",
            SessionError::UnknownCharacter(_) => "unknown_character",
        }
    }
}

/// Session state (owned by the session task)
pub struct MatchState {
    pub id: Uuid,
    pub seed: u64,
    pub screen: Screen,
    pub tick: u64,
    pub fighters: Option<[Fighter; 2]>,
    /// Roster indices of the current pairing
    pub selection: Option<(usize, usize)>,
    pub particles: Vec<Particle>,
    pub round: u32,
    /// Fighter id (1 or 2) of the winner, once decided
    pub winner: Option<u8>,
    pub dialogue: DialogueBoard,
    pub rng: ChaCha8Rng,
    hit_dialogue_interval: u64,
    last_dialogue_tick: Option<u64>,
}

impl MatchState {
    pub fn new(id: Uuid, seed: u64, hit_dialogue_interval: u64) -> Self {
        Self {
            id,
            seed,
            screen: Screen::Menu,
            tick: 0,
            fighters: None,
            selection: None,
            particles: Vec::new(),
            round: 1,
            winner: None,
            dialogue: DialogueBoard::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            hit_dialogue_interval,
            last_dialogue_tick: None,
        }
    }

    /// True while ticks should advance the simulation
    pub fn is_running(&self) -> bool {
        self.screen == Screen::Battle && self.fighters.is_some() && self.winner.is_none()
    }

    fn is_finished_battle(&self) -> bool {
        self.screen == Screen::Battle && self.winner.is_some()
    }

    fn change_screen(&mut self, screen: Screen, events: &mut Vec<SessionEvent>) {
        if screen != Screen::Battle {
            self.fighters = None;
            self.particles.clear();
            self.winner = None;
        }
        self.screen = screen;
        events.push(SessionEvent::ScreenChanged(screen));
    }

    /// MENU to CHARACTER_SELECT
    pub fn open_character_select(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        match self.screen {
            Screen::Menu => {}
            Screen::Battle if self.is_running() => return Err(SessionError::BattleInProgress),
            from => {
                return Err(SessionError::InvalidTransition {
                    from,
                    action: "open character select",
                })
            }
        }

        let mut events = Vec::new();
        self.change_screen(Screen::CharacterSelect, &mut events);
        Ok(events)
    }

    /// Finished BATTLE back to CHARACTER_SELECT to pick a new pairing
    pub fn leave_battle(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        match self.screen {
            Screen::Battle if self.is_finished_battle() => {}
            Screen::Battle => return Err(SessionError::BattleInProgress),
            from => {
                return Err(SessionError::InvalidTransition {
                    from,
                    action: "leave the battle",
                })
            }
        }

        let mut events = Vec::new();
        self.change_screen(Screen::CharacterSelect, &mut events);
        Ok(events)
    }

    /// CHARACTER_SELECT, or a finished battle, back to MENU
    pub fn back_to_menu(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        match self.screen {
            Screen::CharacterSelect => {}
            Screen::Battle if self.is_finished_battle() => {}
            Screen::Battle => return Err(SessionError::BattleInProgress),
            from => {
                return Err(SessionError::InvalidTransition {
                    from,
                    action: "return to menu",
                })
            }
        }

        let mut events = Vec::new();
        self.change_screen(Screen::Menu, &mut events);
        self.selection = None;
        Ok(events)
    }

    /// CHARACTER_SELECT to BATTLE with a fresh pairing. `p2` defaults to the
    /// roster entry after `p1`
    pub fn start_battle(
        &mut self,
        p1: usize,
        p2: Option<usize>,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        if self.screen != Screen::CharacterSelect {
            return Err(SessionError::InvalidTransition {
                from: self.screen,
                action: "start a battle",
            });
        }

        let p2 = p2.unwrap_or_else(|| roster::default_opponent(p1));
        for index in [p1, p2] {
            if roster::character(index).is_none() {
                return Err(SessionError::UnknownCharacter(index));
            }
        }

        self.selection = Some((p1, p2));
        self.round = 1;
        Ok(self.begin_round([0, 0]))
    }

    /// Finished BATTLE to the next round with the same pairing
    pub fn rematch(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        if !self.is_finished_battle() {
            return Err(if self.screen == Screen::Battle {
                SessionError::BattleInProgress
            } else {
                SessionError::InvalidTransition {
                    from: self.screen,
                    action: "rematch",
                }
            });
        }

        let wins = self
            .fighters
            .as_ref()
            .map(|[a, b]| [a.wins, b.wins])
            .unwrap_or_default();
        self.round += 1;
        Ok(self.begin_round(wins))
    }

    fn begin_round(&mut self, wins: [u32; 2]) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        // Selection is always set before a round begins
        let (i1, i2) = self.selection.unwrap_or((0, roster::default_opponent(0)));
        let (c1, c2) = (&roster::ROSTER[i1], &roster::ROSTER[i2]);

        let mut p1 = Fighter::new(1, c1.name, c1.color, SPAWN_MARGIN, &mut self.rng);
        let mut p2 = Fighter::new(
            2,
            c2.name,
            c2.color,
            ARENA_WIDTH - SPAWN_MARGIN - p1.width,
            &mut self.rng,
        );
        p1.wins = wins[0];
        p2.wins = wins[1];

        self.fighters = Some([p1, p2]);
        self.particles.clear();
        self.winner = None;

        if self.screen != Screen::Battle {
            self.change_screen(Screen::Battle, &mut events);
        }
        events.push(SessionEvent::MatchStarted { round: self.round });
        events.extend(self.request_dialogue(DialogueEvent::Start));

        info!(
            session_id = %self.id,
            p1 = c1.name,
            p2 = c2.name,
            round = self.round,
            "Battle started"
        );

        events
    }

    fn request_dialogue(&mut self, event: DialogueEvent) -> Option<SessionEvent> {
        let [p1, p2] = self.fighters.as_ref()?;
        let request = DialogueRequest {
            seq: self.dialogue.issue(),
            event,
            fighter1: p1.name.clone(),
            fighter2: p2.name.clone(),
        };
        self.last_dialogue_tick = Some(self.tick);
        Some(SessionEvent::Dialogue(request))
    }

    fn hit_dialogue_due(&self) -> bool {
        match self.last_dialogue_tick {
            Some(last) => self.tick.saturating_sub(last) >= self.hit_dialogue_interval,
            None => true,
        }
    }

    /// Apply a finished dialogue request. Replies to superseded requests are
    /// dropped
    pub fn accept_dialogue(&mut self, seq: u64, line: String) -> bool {
        self.dialogue.accept(seq, line)
    }

    /// Run one simulation tick.
    ///
    /// Both fighters are updated against the other's state from before the
    /// tick, then landed hits are applied. If both are knocked out in the
    /// same tick, player 2 is declared the winner.
    pub fn tick(&mut self, intents: [InputIntent; 2]) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if !self.is_running() {
            return events;
        }
        let Some([p1, p2]) = self.fighters.as_mut() else {
            return events;
        };

        self.tick += 1;
        self.particles = ParticleSystem::advance(std::mem::take(&mut self.particles));

        let before = [p1.clone(), p2.clone()];
        let on_p2 = p1.update(&intents[0], &before[1], &mut self.particles, &mut self.rng);
        let on_p1 = p2.update(&intents[1], &before[0], &mut self.particles, &mut self.rng);

        if let Some(hit) = &on_p2 {
            hit.apply_to(p2);
        }
        if let Some(hit) = &on_p1 {
            hit.apply_to(p1);
        }

        let winner = if p1.is_knocked_out() {
            Some(p2)
        } else if p2.is_knocked_out() {
            Some(p1)
        } else {
            None
        };
        let winner = winner.map(|w| {
            w.wins += 1;
            w.id
        });

        let hits: Vec<HitResult> = on_p2.into_iter().chain(on_p1).collect();
        let landed = !hits.is_empty();
        events.extend(hits.into_iter().map(SessionEvent::Hit));

        if let Some(id) = winner {
            self.winner = Some(id);
            events.push(SessionEvent::Winner { winner: id });
            events.extend(self.request_dialogue(DialogueEvent::Win));
            info!(session_id = %self.id, winner = id, tick = self.tick, "Battle decided");
        } else if landed && self.hit_dialogue_due() {
            events.extend(self.request_dialogue(DialogueEvent::Hit));
        }

        events
    }
}

/// Handle to a running session
#[derive(Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    pub input_tx: mpsc::Sender<PlayerInput>,
    pub output_tx: broadcast::Sender<ServerMsg>,
}

/// Registry of all active sessions
pub struct MatchRegistry {
    matches: DashMap<Uuid, MatchHandle>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
        }
    }

    pub fn insert(&self, handle: MatchHandle) {
        self.matches.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.remove(id).map(|(_, h)| h)
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A finished dialogue request
#[derive(Debug)]
struct DialogueReply {
    seq: u64,
    line: String,
}

/// The session task: owns the state, drives it from the frame clock
pub struct GameMatch {
    state: MatchState,
    settings: MatchSettings,
    keys: HeldKeys,
    input_rx: mpsc::Receiver<PlayerInput>,
    output_tx: broadcast::Sender<ServerMsg>,
    snapshot_builder: SnapshotBuilder,
    pending_events: Vec<GameEvent>,
    dialogue: Arc<dyn DialogueGenerator>,
    dialogue_tx: mpsc::Sender<DialogueReply>,
    dialogue_rx: mpsc::Receiver<DialogueReply>,
}

impl GameMatch {
    /// Create a new session
    pub fn new(
        id: Uuid,
        seed: u64,
        settings: MatchSettings,
        dialogue: Arc<dyn DialogueGenerator>,
    ) -> (Self, MatchHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (output_tx, _) = broadcast::channel(64);
        let (dialogue_tx, dialogue_rx) = mpsc::channel(16);

        let handle = MatchHandle {
            id,
            input_tx,
            output_tx: output_tx.clone(),
        };

        let game_match = Self {
            state: MatchState::new(id, seed, settings.hit_dialogue_interval),
            settings,
            keys: HeldKeys::new(),
            input_rx,
            output_tx,
            snapshot_builder: SnapshotBuilder::new(settings.snapshot_every),
            pending_events: Vec::new(),
            dialogue,
            dialogue_tx,
            dialogue_rx,
        };

        (game_match, handle)
    }

    /// Run the frame loop until every input sender has been dropped or the
    /// client asks for shutdown
    pub async fn run(mut self) {
        info!(session_id = %self.state.id, seed = self.state.seed, "Session started");

        let mut frame_interval = interval(frame_duration(self.settings.frame_rate));
        frame_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            frame_interval.tick().await;

            if !self.process_inputs() {
                break;
            }

            self.process_dialogue();

            let advanced = self.state.is_running();
            let events = self.state.tick(self.keys.intents());
            self.handle_events(events);

            if self.state.fighters.is_some() && self.snapshot_builder.should_send(advanced) {
                let events = std::mem::take(&mut self.pending_events);
                let snapshot = self.snapshot_builder.build(&self.state, events);
                let _ = self.output_tx.send(snapshot);
            }
        }

        info!(session_id = %self.state.id, ticks = self.state.tick, "Session closed");
    }

    /// Drain queued inputs. Returns false once the input channel is closed
    /// or a shutdown command arrives
    fn process_inputs(&mut self) -> bool {
        loop {
            match self.input_rx.try_recv() {
                Ok(PlayerInput {
                    msg: ClientMsg::Shutdown,
                    ..
                }) => {
                    info!(session_id = %self.state.id, "Shutdown requested by client");
                    return false;
                }
                Ok(input) => {
                    let queued_ms = unix_millis().saturating_sub(input.received_at);
                    if queued_ms > STALE_INPUT_MS {
                        debug!(session_id = %self.state.id, queued_ms, "Slow input delivery");
                    }
                    self.handle_message(input.msg);
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn handle_message(&mut self, msg: ClientMsg) {
        let result = match msg {
            ClientMsg::KeyDown { code } => {
                self.keys.press(&code);
                return;
            }
            ClientMsg::KeyUp { code } => {
                self.keys.release(&code);
                return;
            }
            ClientMsg::Ping { t } => {
                let _ = self.output_tx.send(ServerMsg::Pong { t });
                return;
            }
            // Handled by `process_inputs` before dispatch
            ClientMsg::Shutdown => return,
            ClientMsg::OpenCharacterSelect => self.state.open_character_select(),
            ClientMsg::BackToMenu => self.state.back_to_menu(),
            ClientMsg::LeaveBattle => self.state.leave_battle(),
            ClientMsg::SelectCharacters { p1, p2 } => self.state.start_battle(p1, p2),
            ClientMsg::Rematch => self.state.rematch(),
        };

        match result {
            Ok(events) => self.handle_events(events),
            Err(e) => {
                warn!(session_id = %self.state.id, error = %e, "Rejected session command");
                let _ = self.output_tx.send(ServerMsg::Error {
                    code: e.code().to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    fn handle_events(&mut self, events: Vec<SessionEvent>) {
        for event in events {
            match event {
                SessionEvent::ScreenChanged(screen) => {
                    // Releases missed while on a menu must not leak into the next battle
                    if screen != Screen::Battle {
                        self.keys.clear();
                    }
                    let _ = self.output_tx.send(ServerMsg::ScreenChanged { screen });
                }
                SessionEvent::MatchStarted { round } => {
                    self.pending_events.clear();
                    let fighters = self
                        .state
                        .fighters
                        .iter()
                        .flatten()
                        .map(FighterInfo::from)
                        .collect();
                    let _ = self.output_tx.send(ServerMsg::MatchStarted { round, fighters });
                    self.snapshot_builder.force_next();
                }
                SessionEvent::Hit(hit) => {
                    self.pending_events.push(GameEvent::Hit {
                        attacker_id: hit.attacker_id,
                        defender_id: hit.defender_id,
                        kind: hit.kind,
                        damage: hit.damage,
                    });
                }
                SessionEvent::Winner { winner } => {
                    self.pending_events.push(GameEvent::KnockOut {
                        winner_id: winner,
                    });
                    let _ = self.output_tx.send(self.match_end(winner));
                    self.snapshot_builder.force_next();
                }
                SessionEvent::Dialogue(request) => self.spawn_dialogue(request),
            }
        }
    }

    fn match_end(&self, winner: u8) -> ServerMsg {
        let fighters = self.state.fighters.as_ref();
        ServerMsg::MatchEnd {
            winner_id: winner,
            winner_name: fighters
                .and_then(|fs| fs.iter().find(|f| f.id == winner))
                .map(|f| f.name.clone())
                .unwrap_or_default(),
            round: self.state.round,
            wins: fighters.map(|fs| fs.iter().map(|f| f.wins).collect()).unwrap_or_default(),
        }
    }

    /// Fire-and-forget: the frame loop never waits for the reply
    fn spawn_dialogue(&self, request: DialogueRequest) {
        debug!(
            session_id = %self.state.id,
            seq = request.seq,
            event = request.event.as_str(),
            "Requesting dialogue"
        );

        let generator = self.dialogue.clone();
        let reply_tx = self.dialogue_tx.clone();
        tokio::spawn(async move {
            let line = generator
                .generate(&request.fighter1, &request.fighter2, request.event)
                .await;
            let _ = reply_tx
                .send(DialogueReply {
                    seq: request.seq,
                    line,
                })
                .await;
        });
    }

    fn process_dialogue(&mut self) {
        while let Ok(reply) = self.dialogue_rx.try_recv() {
            if self.state.accept_dialogue(reply.seq, reply.line) {
                let text = self.state.dialogue.line().to_string();
                let _ = self.output_tx.send(ServerMsg::Dialogue { text });
                self.snapshot_builder.force_next();
            } else {
                debug!(session_id = %self.state.id, seq = reply.seq, "Discarding stale dialogue");
            }
        }
    }
}
