//! Runtime tunables for turn execution.

use std::time::Duration;

/// Timeouts and routing defaults for the orchestrator.
///
/// All values are configurable; the defaults match the documented contract
/// (tool 15 s, agent 60 s, turn 120 s).
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Per-tool execution timeout.
    pub tool_timeout: Duration,
    /// Per-agent LLM call timeout.
    pub agent_timeout: Duration,
    /// Whole-turn timeout.
    pub turn_timeout: Duration,
    /// Agent used when scoring produces no winner or the analyzer fails.
    pub default_agent: String,
    /// How many trailing history messages an agent sees.
    pub history_window: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tool_timeout: Duration::from_secs(15),
            agent_timeout: Duration::from_secs(60),
            turn_timeout: Duration::from_secs(120),
            default_agent: "story_creator".to_string(),
            history_window: 20,
        }
    }
}
