//! Selectable characters

use serde::Serialize;

/// A selectable character template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CharacterTemplate {
    pub name: &'static str,
    /// CSS colour used for the body and hit particles
    pub color: &'static str,
    pub personality: &'static str,
}

pub const ROSTER: [CharacterTemplate; 6] = [
    CharacterTemplate {
        name: "Bean-o",
        color: "#f87171",
        personality: "Aggressive but clumsy",
    },
    CharacterTemplate {
        name: "Gloop",
        color: "#60a5fa",
        personality: "Relaxed and unpredictable",
    },
    CharacterTemplate {
        name: "Wobble-tron",
        color: "#fbbf24",
        personality: "Hyperactive and bouncy",
    },
    CharacterTemplate {
        name: "Sir Flops-a-lot",
        color: "#34d399",
        personality: "Regal yet unstable",
    },
    CharacterTemplate {
        name: "Pudding",
        color: "#a78bfa",
        personality: "Sweet but lethal",
    },
    CharacterTemplate {
        name: "Marshmallow",
        color: "#ffffff",
        personality: "Soft and defensive",
    },
];

pub fn character(index: usize) -> Option<&'static CharacterTemplate> {
    ROSTER.get(index)
}

/// Default opponent: the next roster entry, wrapping around
pub fn default_opponent(index: usize) -> usize {
    (index + 1) % ROSTER.len()
}
