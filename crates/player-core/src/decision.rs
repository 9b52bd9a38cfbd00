//! Decisions and Actions
//!
//! A `Decision` is what the parser extracts from one backend reply: the model's
//! reasoning plus an ordered list of actions. Action names are kept verbatim so
//! the dispatcher can log-and-skip unknown ones instead of failing the reply.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One action requested by the model
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Action name as written by the model; never empty
    pub name: String,

    /// Parameters keyed by lower-cased name
    pub parameters: HashMap<String, String>,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: HashMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.parameters
            .insert(key.as_ref().to_lowercase(), value.into());
        self
    }

    /// Parameter lookup; keys are stored lower-cased
    pub fn param(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    /// Recognized action kind, if any
    pub fn kind(&self) -> Option<ActionKind> {
        ActionKind::from_name(&self.name)
    }
}

/// Parsed backend reply
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Free-form reasoning, kept for logging
    pub reasoning: String,

    /// Actions in the order the model listed them
    pub actions: Vec<Action>,
}

impl Decision {
    /// A decision with no actions is a no-op tick
    pub fn is_noop(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Fixed action vocabulary
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Move,
    Look,
    SelectSlot,
    Interact,
    Construct,
    Jump,
}

impl ActionKind {
    pub const ALL: [Self; 6] = [
        Self::Move,
        Self::Look,
        Self::SelectSlot,
        Self::Interact,
        Self::Construct,
        Self::Jump,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Move => "MOVE",
            Self::Look => "LOOK",
            Self::SelectSlot => "SELECT_SLOT",
            Self::Interact => "INTERACT",
            Self::Construct => "CONSTRUCT",
            Self::Jump => "JUMP",
        }
    }

    /// Case-insensitive lookup
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cardinal movement direction relative to facing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

impl Direction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "FORWARD",
            Self::Backward => "BACKWARD",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FORWARD" => Ok(Self::Forward),
            "BACKWARD" => Ok(Self::Backward),
            "LEFT" => Ok(Self::Left),
            "RIGHT" => Ok(Self::Right),
            other => Err(format!("unknown direction '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_kind_is_case_insensitive() {
        assert_eq!(ActionKind::from_name("move"), Some(ActionKind::Move));
        assert_eq!(ActionKind::from_name("Select_Slot"), Some(ActionKind::SelectSlot));
        assert_eq!(ActionKind::from_name(" JUMP "), Some(ActionKind::Jump));
        assert_eq!(ActionKind::from_name("DANCE"), None);
    }

    #[test]
    fn test_params_are_lowercased() {
        let action = Action::new("LOOK").with_param("Yaw", "10");
        assert_eq!(action.param("yaw"), Some("10"));
        assert_eq!(action.param("Yaw"), None);
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("forward".parse::<Direction>(), Ok(Direction::Forward));
        assert_eq!("LEFT".parse::<Direction>(), Ok(Direction::Left));
        assert!("UP".parse::<Direction>().is_err());
    }
}
