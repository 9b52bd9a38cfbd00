//! Response Parser
//!
//! Turns the backend's line-oriented reply into a [`Decision`]. The accepted
//! shape is:
//!
//! ```text
//! Reasoning: <text>
//! Actions:
//! - NAME: <action_name>, <param1>: <value1>, ...
//! ```
//!
//! Parsing never fails. Whatever cannot be understood is dropped, so the worst
//! case is an empty reasoning string and no actions. When a reply carries more
//! than one `Reasoning:` line, the last one wins.

use crate::decision::{Action, Decision};

const REASONING_HEADER: &str = "Reasoning:";
const ACTIONS_HEADER: &str = "Actions:";
const ACTION_LINE_PREFIX: &str = "- NAME:";

/// Stateless parser for backend replies
pub struct ResponseParser;

impl ResponseParser {
    /// Parse a raw reply into a decision
    pub fn parse(raw: &str) -> Decision {
        let mut decision = Decision::default();
        let mut in_actions = false;

        for line in raw.split(['\r', '\n']).filter(|l| !l.is_empty()) {
            let trimmed = line.trim();

            if let Some(rest) = strip_prefix_ignore_case(trimmed, REASONING_HEADER) {
                decision.reasoning = rest.trim().to_string();
                continue;
            }

            if strip_prefix_ignore_case(trimmed, ACTIONS_HEADER).is_some() {
                in_actions = true;
                continue;
            }

            if in_actions && strip_prefix_ignore_case(trimmed, ACTION_LINE_PREFIX).is_some() {
                if let Some(action) = Self::parse_action_line(trimmed) {
                    decision.actions.push(action);
                }
            }
        }

        decision
    }

    /// Parse one `- NAME: X, key: value, ...` line
    fn parse_action_line(line: &str) -> Option<Action> {
        let body = line.trim().trim_start_matches('-');
        let mut action = Action::default();

        for field in body.split(',') {
            let Some((key, value)) = field.split_once(':') else {
                tracing::debug!(field = field.trim(), "skipping action field without key/value");
                continue;
            };

            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() {
                tracing::debug!(field = field.trim(), "skipping action field with empty key");
                continue;
            }

            if key.eq_ignore_ascii_case("NAME") {
                action.name = value.to_string();
            } else {
                action.parameters.insert(key.to_lowercase(), value.to_string());
            }
        }

        if action.name.is_empty() {
            tracing::warn!(line, "action line has no name; dropping it");
            return None;
        }

        Some(action)
    }
}

/// `s` without `prefix`, compared ASCII case-insensitively
fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}
