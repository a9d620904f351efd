//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::combat::MoveKind;
use crate::game::fighter::{Fighter, FighterState};
use crate::game::particles::Particle;
use crate::game::physics::{ARENA_HEIGHT, ARENA_WIDTH, GROUND_Y};
use crate::game::roster::{CharacterTemplate, ROSTER};
use crate::game::Screen;

/// Messages sent from the browser to the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// A key went down (DOM `KeyboardEvent.code`)
    KeyDown { code: String },

    /// A key was released
    KeyUp { code: String },

    /// Leave the menu for character select
    OpenCharacterSelect,

    /// Return to the main menu
    BackToMenu,

    /// Start a battle with the given roster indices
    SelectCharacters {
        p1: usize,
        /// Defaults to the character after `p1`
        #[serde(default)]
        p2: Option<usize>,
    },

    /// Play another round with the same characters
    Rematch,

    /// Leave a finished battle for character select
    LeaveBattle,

    /// End the session; the server closes the socket
    Shutdown,

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        session_id: Uuid,
        server_time: u64,
        arena: ArenaInfo,
        roster: Vec<CharacterInfo>,
    },

    /// The session moved to another screen
    ScreenChanged { screen: Screen },

    /// Fresh fighters are in the arena
    MatchStarted {
        round: u32,
        fighters: Vec<FighterInfo>,
    },

    /// Simulation state for rendering
    Snapshot {
        tick: u64,
        round: u32,
        fighters: Vec<FighterSnapshot>,
        particles: Vec<ParticleSnapshot>,
        /// Fighter id of the winner, once decided
        winner_id: Option<u8>,
        /// Line currently on screen
        dialogue: String,
        /// Events since the last snapshot
        events: Vec<GameEvent>,
    },

    /// New dialogue line
    Dialogue { text: String },

    /// The battle has a winner
    MatchEnd {
        winner_id: u8,
        winner_name: String,
        round: u32,
        /// Rounds won per fighter, player 1 first
        wins: Vec<u32>,
    },

    /// Error message
    Error { code: String, message: String },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Arena dimensions the client scales its canvas to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArenaInfo {
    pub width: f32,
    pub height: f32,
    pub ground_y: f32,
}

impl Default for ArenaInfo {
    fn default() -> Self {
        Self {
            width: ARENA_WIDTH,
            height: ARENA_HEIGHT,
            ground_y: GROUND_Y,
        }
    }
}

/// Roster entry for the character select screen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterInfo {
    pub index: usize,
    pub name: String,
    pub color: String,
    pub personality: String,
}

impl CharacterInfo {
    pub fn new(index: usize, template: &CharacterTemplate) -> Self {
        Self {
            index,
            name: template.name.to_string(),
            color: template.color.to_string(),
            personality: template.personality.to_string(),
        }
    }

    /// The whole roster in select-screen order
    pub fn roster() -> Vec<Self> {
        ROSTER
            .iter()
            .enumerate()
            .map(|(i, c)| Self::new(i, c))
            .collect()
    }
}

/// Static fighter identity sent once per battle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FighterInfo {
    pub id: u8,
    pub name: String,
    pub color: String,
    pub max_health: f32,
    pub wins: u32,
}

impl From<&Fighter> for FighterInfo {
    fn from(f: &Fighter) -> Self {
        Self {
            id: f.id,
            name: f.name.clone(),
            color: f.color.clone(),
            max_health: f.max_health,
            wins: f.wins,
        }
    }
}

/// Fighter state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FighterSnapshot {
    pub id: u8,
    pub name: String,
    pub color: String,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub width: f32,
    pub height: f32,
    /// +1 right, -1 left
    pub facing: i8,
    /// May be negative after the final blow
    pub health: f32,
    pub max_health: f32,
    pub state: FighterState,
    pub is_jumping: bool,
    pub attack_cooldown: u32,
    pub hit_stun: u32,
    pub wins: u32,
    /// Body tilt in radians
    pub rotation: f32,
    /// Squash/stretch phase
    pub wobble_offset: f32,
}

impl From<&Fighter> for FighterSnapshot {
    fn from(f: &Fighter) -> Self {
        Self {
            id: f.id,
            name: f.name.clone(),
            color: f.color.clone(),
            x: f.pos.x,
            y: f.pos.y,
            vel_x: f.vel.x,
            vel_y: f.vel.y,
            width: f.width,
            height: f.height,
            facing: f.facing,
            health: f.health,
            max_health: f.max_health,
            state: f.state(),
            is_jumping: f.is_jumping,
            attack_cooldown: f.attack_cooldown,
            hit_stun: f.hit_stun,
            wins: f.wins,
            rotation: f.rotation,
            wobble_offset: f.wobble_offset,
        }
    }
}

/// Particle state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticleSnapshot {
    pub x: f32,
    pub y: f32,
    pub life: i32,
    pub color: String,
    pub size: f32,
}

impl From<&Particle> for ParticleSnapshot {
    fn from(p: &Particle) -> Self {
        Self {
            x: p.pos.x,
            y: p.pos.y,
            life: p.life,
            color: p.color.clone(),
            size: p.size,
        }
    }
}

/// Game events included in snapshots
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// A move connected
    Hit {
        attacker_id: u8,
        defender_id: u8,
        kind: MoveKind,
        damage: f32,
    },

    /// A fighter's health reached zero
    KnockOut { winner_id: u8 },
}
