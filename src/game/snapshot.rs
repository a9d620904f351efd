//! Snapshot building for the rendering client

use crate::ws::protocol::{FighterSnapshot, GameEvent, ParticleSnapshot, ServerMsg};

use super::r#match::MatchState;

/// Decides when to send snapshots and builds them
pub struct SnapshotBuilder {
    /// Ticks since the last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
    /// Send on the next check regardless of the interval
    forced: bool,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
            forced: false,
        }
    }

    /// Check if it's time to send a snapshot. Frozen frames (`advanced ==
    /// false`) only produce a snapshot when one was forced
    pub fn should_send(&mut self, advanced: bool) -> bool {
        if advanced {
            self.ticks_since_snapshot += 1;
        }
        if self.forced || self.ticks_since_snapshot >= self.snapshot_interval {
            self.forced = false;
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used for important events)
    pub fn force_next(&mut self) {
        self.forced = true;
    }

    /// Build a snapshot message
    pub fn build(&self, state: &MatchState, events: Vec<GameEvent>) -> ServerMsg {
        let fighters = state
            .fighters
            .iter()
            .flatten()
            .map(FighterSnapshot::from)
            .collect();

        let particles = state.particles.iter().map(ParticleSnapshot::from).collect();

        ServerMsg::Snapshot {
            tick: state.tick,
            round: state.round,
            fighters,
            particles,
            winner_id: state.winner,
            dialogue: state.dialogue.line().to_string(),
            events,
        }
    }
}
