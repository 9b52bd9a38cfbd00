//! Prompt Building
//!
//! Renders an [`Observation`] into the user message sent with each tick, and
//! holds the default system prompt that teaches the model the reply format.

use std::fmt::Write;

use crate::observation::Observation;

/// Maximum nearby objects mentioned in a prompt
pub const NEARBY_OBJECT_LIMIT: usize = 10;

/// Default system prompt: action vocabulary plus the mandated reply format
pub const SYSTEM_PROMPT: &str =
    r"You are an autonomous AI player in a survival and construction game.
Your goal is to survive and assist other players.
You can observe the game through a screenshot and a structured game state.

Available Actions:
- MOVE(direction): direction can be FORWARD, BACKWARD, LEFT, RIGHT
- LOOK(yaw, pitch): yaw and pitch are degrees to rotate (e.g., yaw: 45, pitch: 10)
- SELECT_SLOT(index): index of the inventory slot to select
- INTERACT: interact with the object in front of you
- CONSTRUCT: specialized interaction for advancing construction states. Use this when facing a construction frame.
- JUMP: jump

Output Format:
Reasoning: <your reasoning for the actions>
Actions:
- NAME: <action_name>, <param1>: <value1>, ...

Example:
Reasoning: I need to move closer to the storage bin to see what's inside.
Actions:
- NAME: MOVE, direction: FORWARD
- NAME: LOOK, yaw: 10, pitch: 0
";

/// Render the game-state message for one observation.
///
/// Pure and deterministic: the same observation always yields the same text.
/// Nearby objects are re-sorted nearest first (ties keep their input order)
/// and capped at [`NEARBY_OBJECT_LIMIT`].
pub fn build_prompt(observation: &Observation) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = render(&mut out, observation);
    out
}

fn render(out: &mut String, obs: &Observation) -> std::fmt::Result {
    writeln!(out, "Current Game State:")?;
    writeln!(out, "- Position: {}", obs.position)?;
    writeln!(out, "- Facing: {}", obs.facing)?;
    writeln!(out, "- Health: {:.1}% (Normalized)", obs.health_percent())?;
    writeln!(out, "- Held Item: {}", obs.held_item.as_deref().unwrap_or("None"))?;

    writeln!(out, "\nInventory:")?;
    for slot in &obs.inventory {
        writeln!(out, "  - {}: {}", slot.key, slot.occupant_or_empty())?;
    }

    writeln!(out, "\nNearby Objects:")?;
    let mut nearby: Vec<_> = obs.nearby.iter().collect();
    nearby.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    for object in nearby.into_iter().take(NEARBY_OBJECT_LIMIT) {
        writeln!(
            out,
            "  - {} at {:.1}m (State: {})",
            object.name, object.distance, object.build_state
        )?;
    }

    Ok(())
}
