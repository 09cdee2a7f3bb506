//! Scripted combat scenarios.
//!
//! A scenario is JSON lines, one step per line, in tick order:
//!
//! ```text
//! {"tick": 0, "action": "join", "player": "0192..."}
//! {"tick": 3, "action": "event", "event": {"type": "entity_damaged", ...}}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use cellblock_types::{CombatEvent, PlayerId};
use serde::Deserialize;

use crate::error::EngineError;

/// One scripted step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScenarioStep {
    /// Tick at which the step fires.
    pub tick: u64,
    /// What happens.
    #[serde(flatten)]
    pub action: ScenarioAction,
}

/// Something that happens during a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioAction {
    /// A player comes online.
    Join {
        /// The player.
        player: PlayerId,
    },
    /// A player goes offline without a quit event reaching the listener.
    Leave {
        /// The player.
        player: PlayerId,
    },
    /// A player enters combat.
    Tag {
        /// The player.
        player: PlayerId,
    },
    /// A player leaves combat.
    Untag {
        /// The player.
        player: PlayerId,
    },
    /// A combat event from the host.
    Event {
        /// The event.
        event: CombatEvent,
    },
}

/// Parse a JSON-lines scenario.
///
/// # Errors
///
/// [`EngineError::Scenario`] for a line that is not a valid step,
/// [`EngineError::OutOfOrder`] if ticks go backwards.
pub fn parse(text: &str) -> Result<Vec<ScenarioStep>, EngineError> {
    let mut steps: Vec<ScenarioStep> = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index.saturating_add(1);
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let step: ScenarioStep = serde_json::from_str(trimmed)
            .map_err(|source| EngineError::Scenario { line, source })?;
        let previous = steps.last().map_or(0, |last| last.tick);
        if step.tick < previous {
            return Err(EngineError::OutOfOrder {
                line,
                tick: step.tick,
                previous,
            });
        }
        steps.push(step);
    }

    Ok(steps)
}
