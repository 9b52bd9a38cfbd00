//! Action Dispatch
//!
//! Maps parsed actions onto the environment's capabilities. Every action is
//! executed independently: an unknown name, a bad parameter or a failing
//! capability skips that action only.

use std::sync::Arc;

use serde::Serialize;

use crate::decision::{Action, ActionKind, Decision, Direction};
use crate::environment::Capabilities;

/// What happened to one action
#[derive(Clone, Debug, PartialEq)]
pub enum ActionOutcome {
    Executed(ActionKind),
    Skipped { action: String, reason: String },
    Failed { action: String, error: String },
}

/// Per-decision tally
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub executed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl DispatchSummary {
    fn record(&mut self, outcome: &ActionOutcome) {
        match outcome {
            ActionOutcome::Executed(_) => self.executed += 1,
            ActionOutcome::Skipped { .. } => self.skipped += 1,
            ActionOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Routes actions to capability handlers
#[derive(Clone)]
pub struct ActionDispatcher {
    capabilities: Arc<dyn Capabilities>,
}

impl ActionDispatcher {
    pub fn new(capabilities: Arc<dyn Capabilities>) -> Self {
        Self { capabilities }
    }

    /// Execute every action of `decision` in order
    pub fn dispatch(&self, decision: &Decision) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        for action in &decision.actions {
            let outcome = self.execute(action);
            summary.record(&outcome);
        }
        summary
    }

    /// Execute a single action
    pub fn execute(&self, action: &Action) -> ActionOutcome {
        let Some(kind) = action.kind() else {
            tracing::warn!(action = %action.name, "unknown action");
            return skipped(action, "unknown action");
        };

        tracing::info!(action = %kind, "executing action");

        let caps = self.capabilities.as_ref();
        let result = match kind {
            ActionKind::Move => {
                let Some(direction) = action.param("direction") else {
                    return missing(action, "direction");
                };
                match direction.parse::<Direction>() {
                    Ok(direction) => caps.move_toward(direction),
                    Err(e) => return malformed(action, "direction", &e),
                }
            }
            ActionKind::Look => return self.look(action),
            ActionKind::SelectSlot => {
                let Some(raw) = action.param("index") else {
                    return missing(action, "index");
                };
                let index = match raw.trim().parse::<usize>() {
                    Ok(index) => index,
                    Err(e) => return malformed(action, "index", &e.to_string()),
                };
                let slots = caps.slot_count();
                if index >= slots {
                    return malformed(action, "index", &format!("{index} is outside 0..{slots}"));
                }
                caps.select_slot(index)
            }
            ActionKind::Interact => caps.interact(),
            ActionKind::Construct => caps.construct(),
            ActionKind::Jump => caps.jump(),
        };

        match result {
            Ok(()) => ActionOutcome::Executed(kind),
            Err(e) => {
                tracing::warn!(action = %kind, error = %e, "capability failed");
                ActionOutcome::Failed {
                    action: action.name.clone(),
                    error: e.to_string(),
                }
            }
        }
    }

    /// Yaw and pitch are applied independently; a bad axis doesn't block the other
    fn look(&self, action: &Action) -> ActionOutcome {
        let caps = self.capabilities.as_ref();
        let mut applied = false;
        let mut failure = None;

        let mut apply = |axis: &str, result: crate::error::Result<()>| match result {
            Ok(()) => applied = true,
            Err(e) => {
                tracing::warn!(action = %action.name, axis, error = %e, "capability failed");
                failure = Some(e.to_string());
            }
        };

        if let Some(yaw) = degrees(action, "yaw") {
            apply("yaw", caps.rotate_yaw(yaw));
        }
        if let Some(pitch) = degrees(action, "pitch") {
            apply("pitch", caps.rotate_pitch(pitch));
        }

        match (applied, failure) {
            (true, _) => ActionOutcome::Executed(ActionKind::Look),
            (false, Some(error)) => ActionOutcome::Failed {
                action: action.name.clone(),
                error,
            },
            (false, None) => skipped(action, "no usable yaw or pitch"),
        }
    }
}

/// Finite rotation in degrees, or `None` when absent or unparsable
fn degrees(action: &Action, axis: &str) -> Option<f32> {
    let raw = action.param(axis)?;
    match raw.trim().parse::<f32>() {
        Ok(d) if d.is_finite() => Some(d),
        _ => {
            tracing::debug!(action = %action.name, axis, value = raw, "unparsable rotation");
            None
        }
    }
}

fn skipped(action: &Action, reason: &str) -> ActionOutcome {
    ActionOutcome::Skipped {
        action: action.name.clone(),
        reason: reason.to_string(),
    }
}

fn missing(action: &Action, param: &str) -> ActionOutcome {
    tracing::debug!(action = %action.name, param, "missing required parameter");
    skipped(action, &format!("missing parameter '{param}'"))
}

fn malformed(action: &Action, param: &str, detail: &str) -> ActionOutcome {
    tracing::debug!(action = %action.name, param, detail, "malformed parameter");
    skipped(action, &format!("bad parameter '{param}': {detail}"))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::{AgentError, Result};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Move(Direction),
        Yaw(f32),
        Pitch(f32),
        Select(usize),
        Interact,
        Construct,
        Jump,
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Call>>,
        slots: usize,
        fail_yaw: bool,
    }

    impl Recorder {
        fn with_slots(slots: usize) -> Arc<Self> {
            Arc::new(Self {
                slots,
                ..Default::default()
            })
        }

        fn push(&self, call: Call) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            Ok(())
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Capabilities for Recorder {
        fn move_toward(&self, direction: Direction) -> Result<()> {
            self.push(Call::Move(direction))
        }

        fn rotate_yaw(&self, degrees: f32) -> Result<()> {
            if self.fail_yaw {
                return Err(AgentError::Capability("neck stuck".into()));
            }
            self.push(Call::Yaw(degrees))
        }

        fn rotate_pitch(&self, degrees: f32) -> Result<()> {
            self.push(Call::Pitch(degrees))
        }

        fn slot_count(&self) -> usize {
            self.slots
        }

        fn select_slot(&self, index: usize) -> Result<()> {
            self.push(Call::Select(index))
        }

        fn interact(&self) -> Result<()> {
            self.push(Call::Interact)
        }

        fn construct(&self) -> Result<()> {
            self.push(Call::Construct)
        }

        fn jump(&self) -> Result<()> {
            self.push(Call::Jump)
        }
    }

    fn decision(actions: Vec<Action>) -> Decision {
        Decision {
            reasoning: String::new(),
            actions,
        }
    }

    #[test]
    fn test_select_slot_bounds() {
        let recorder = Recorder::with_slots(5);
        let dispatcher = ActionDispatcher::new(recorder.clone());

        let summary = dispatcher.dispatch(&decision(vec![
            Action::new("SELECT_SLOT").with_param("index", "3"),
            Action::new("SELECT_SLOT").with_param("index", "7"),
            Action::new("SELECT_SLOT").with_param("index", "abc"),
            Action::new("SELECT_SLOT").with_param("index", "-1"),
            Action::new("SELECT_SLOT"),
        ]));

        assert_eq!(recorder.calls(), vec![Call::Select(3)]);
        assert_eq!(summary, DispatchSummary { executed: 1, skipped: 4, failed: 0 });
    }

    #[test]
    fn test_unknown_action_does_not_block_siblings() {
        let recorder = Recorder::with_slots(1);
        let dispatcher = ActionDispatcher::new(recorder.clone());

        let summary = dispatcher.dispatch(&decision(vec![
            Action::new("DANCE"),
            Action::new("jump"),
        ]));

        assert_eq!(recorder.calls(), vec![Call::Jump]);
        assert_eq!(summary.executed, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn test_move_directions() {
        let recorder = Recorder::with_slots(0);
        let dispatcher = ActionDispatcher::new(recorder.clone());

        dispatcher.dispatch(&decision(vec![
            Action::new("MOVE").with_param("direction", "forward"),
            Action::new("MOVE").with_param("direction", "UP"),
            Action::new("MOVE"),
            Action::new("Move").with_param("direction", "RIGHT"),
        ]));

        assert_eq!(
            recorder.calls(),
            vec![Call::Move(Direction::Forward), Call::Move(Direction::Right)]
        );
    }

    #[test]
    fn test_look_axes_are_independent() {
        let recorder = Recorder::with_slots(0);
        let dispatcher = ActionDispatcher::new(recorder.clone());

        let outcomes: Vec<_> = [
            Action::new("LOOK").with_param("yaw", "10").with_param("pitch", "0"),
            Action::new("LOOK").with_param("yaw", "left").with_param("pitch", "-20.5"),
            Action::new("LOOK").with_param("yaw", "45"),
            Action::new("LOOK").with_param("yaw", "NaN"),
        ]
        .iter()
        .map(|a| dispatcher.execute(a))
        .collect();

        assert_eq!(
            recorder.calls(),
            vec![Call::Yaw(10.0), Call::Pitch(0.0), Call::Pitch(-20.5), Call::Yaw(45.0)]
        );
        assert_eq!(outcomes[0], ActionOutcome::Executed(ActionKind::Look));
        assert!(matches!(outcomes[3], ActionOutcome::Skipped { .. }));
    }

    #[test]
    fn test_capability_failure_is_contained() {
        let recorder = Arc::new(Recorder {
            fail_yaw: true,
            ..Default::default()
        });
        let dispatcher = ActionDispatcher::new(recorder.clone());

        let summary = dispatcher.dispatch(&decision(vec![
            Action::new("LOOK").with_param("yaw", "10"),
            Action::new("LOOK").with_param("yaw", "10").with_param("pitch", "5"),
            Action::new("INTERACT"),
            Action::new("CONSTRUCT"),
        ]));

        assert_eq!(recorder.calls(), vec![Call::Pitch(5.0), Call::Interact, Call::Construct]);
        assert_eq!(summary, DispatchSummary { executed: 3, skipped: 0, failed: 1 });
    }
}
