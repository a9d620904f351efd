//! Keyboard bindings and per-player intent derivation

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Boolean intent vector for one player for one tick.
/// Held keys repeat intent every tick; there is no edge detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputIntent {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub light_attack: bool,
    pub heavy_attack: bool,
}

/// Key codes (DOM `KeyboardEvent.code`) bound to one player's actions
#[derive(Debug, Clone, Copy)]
pub struct KeyBindings {
    pub up: &'static str,
    pub left: &'static str,
    pub right: &'static str,
    pub light_attack: &'static str,
    pub heavy_attack: &'static str,
}

impl KeyBindings {
    pub fn binds(&self, code: &str) -> bool {
        [
            self.up,
            self.left,
            self.right,
            self.light_attack,
            self.heavy_attack,
        ]
        .contains(&code)
    }
}

/// WASD to move and jump, F punches, G kicks
pub const P1_BINDINGS: KeyBindings = KeyBindings {
    up: "KeyW",
    left: "KeyA",
    right: "KeyD",
    light_attack: "KeyF",
    heavy_attack: "KeyG",
};

/// Arrows to move and jump, `/` punches, `.` kicks
pub const P2_BINDINGS: KeyBindings = KeyBindings {
    up: "ArrowUp",
    left: "ArrowLeft",
    right: "ArrowRight",
    light_attack: "Slash",
    heavy_attack: "Period",
};

/// The set of bound keys currently held on the shared keyboard.
/// Codes neither player uses are never stored.
#[derive(Debug, Clone, Default)]
pub struct HeldKeys {
    keys: HashSet<String>,
}

impl HeldKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, code: &str) {
        if P1_BINDINGS.binds(code) || P2_BINDINGS.binds(code) {
            self.keys.insert(code.to_string());
        }
    }

    pub fn release(&mut self, code: &str) {
        self.keys.remove(code);
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn is_held(&self, code: &str) -> bool {
        self.keys.contains(code)
    }

    /// Intent for the player using `bindings`
    pub fn intent(&self, bindings: &KeyBindings) -> InputIntent {
        InputIntent {
            left: self.is_held(bindings.left),
            right: self.is_held(bindings.right),
            up: self.is_held(bindings.up),
            light_attack: self.is_held(bindings.light_attack),
            heavy_attack: self.is_held(bindings.heavy_attack),
        }
    }

    /// Intents for both players, player 1 first
    pub fn intents(&self) -> [InputIntent; 2] {
        [self.intent(&P1_BINDINGS), self.intent(&P2_BINDINGS)]
    }
}
