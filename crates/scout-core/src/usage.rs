//! Process-wide tool-use and token accounting
//!
//! Fed by the sub-agent runner with nested tool counts and token usage.
//! Hosts create one ledger at startup and share it via `Arc`.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Token totals for one model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTotals {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cached_prompt_tokens: u64,
}

impl TokenTotals {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Point-in-time copy of the ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub tools: BTreeMap<String, u64>,
    pub tokens: BTreeMap<String, TokenTotals>,
}

#[derive(Default)]
pub struct UsageLedger {
    inner: Mutex<UsageSnapshot>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `count` invocations of `tool`
    pub fn add(&self, tool: &str, count: u64) {
        if tool.is_empty() || count == 0 {
            return;
        }
        *self.inner.lock().tools.entry(tool.to_string()).or_default() += count;
    }

    pub fn add_tokens(&self, model: &str, prompt: u64, completion: u64, cached_prompt: u64) {
        let mut inner = self.inner.lock();
        let totals = inner.tokens.entry(model.to_string()).or_default();
        totals.prompt_tokens += prompt;
        totals.completion_tokens += completion;
        totals.cached_prompt_tokens += cached_prompt;
    }

    pub fn tool_count(&self, tool: &str) -> u64 {
        self.inner.lock().tools.get(tool).copied().unwrap_or(0)
    }

    pub fn total_tool_calls(&self) -> u64 {
        self.inner.lock().tools.values().sum()
    }

    pub fn tokens_for(&self, model: &str) -> TokenTotals {
        self.inner
            .lock()
            .tokens
            .get(model)
            .copied()
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        self.inner.lock().clone()
    }

    pub fn reset(&self) {
        *self.inner.lock() = UsageSnapshot::default();
    }

    /// Human-readable multi-line summary
    pub fn summary(&self) -> String {
        let snapshot = self.snapshot();
        let mut lines = Vec::new();
        if snapshot.tools.is_empty() {
            lines.push("Tools: none".to_string());
        } else {
            lines.push("Tools:".to_string());
            for (name, count) in &snapshot.tools {
                lines.push(format!("- {}: {}", name, count));
            }
        }
        for (model, totals) in &snapshot.tokens {
            lines.push(format!(
                "Tokens ({}): prompt={} completion={} cached={}",
                model, totals.prompt_tokens, totals.completion_tokens, totals.cached_prompt_tokens
            ));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_accumulates() {
        let ledger = UsageLedger::new();
        ledger.add("brave_search", 2);
        ledger.add("brave_search", 1);
        ledger.add("exec", 1);
        ledger.add("", 5);
        assert_eq!(ledger.tool_count("brave_search"), 3);
        assert_eq!(ledger.total_tool_calls(), 4);
    }

    #[test]
    fn test_tokens_per_model() {
        let ledger = UsageLedger::new();
        ledger.add_tokens("gpt-4o", 100, 20, 10);
        ledger.add_tokens("gpt-4o", 50, 5, 0);
        let totals = ledger.tokens_for("gpt-4o");
        assert_eq!(totals.prompt_tokens, 150);
        assert_eq!(totals.completion_tokens, 25);
        assert_eq!(totals.cached_prompt_tokens, 10);
        assert_eq!(totals.total(), 175);
        assert_eq!(ledger.tokens_for("other"), TokenTotals::default());
    }

    #[test]
    fn test_summary_and_reset() {
        let ledger = UsageLedger::new();
        assert_eq!(ledger.summary(), "Tools: none");
        ledger.add("exec", 1);
        ledger.add_tokens("default", 1, 2, 0);
        assert_eq!(
            ledger.summary(),
            "Tools:\n- exec: 1\nTokens (default): prompt=1 completion=2 cached=0"
        );
        ledger.reset();
        assert_eq!(ledger.snapshot(), UsageSnapshot::default());
    }
}
