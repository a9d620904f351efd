//! Game simulation modules

pub mod combat;
pub mod fighter;
pub mod input;
pub mod r#match;
pub mod particles;
pub mod physics;
pub mod roster;
pub mod snapshot;

pub use r#match::{GameMatch, MatchHandle, MatchRegistry, MatchSettings, Screen};

use crate::ws::protocol::ClientMsg;

/// Client message received from the WebSocket
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub msg: ClientMsg,
    pub received_at: u64,
}
