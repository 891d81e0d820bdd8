//! Literal substring translation over a content buffer.
//!
//! Every rule is applied in order to the running buffer: if its match text
//! occurs anywhere, all occurrences are replaced and the rule's tier counter
//! goes up by one. A rule that does not match is a no-op.

use crate::rules::{RuleSet, Tier};
use serde::Serialize;

/// Number of distinct rules that matched at least once, per tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TranslationStats {
    pub exact: usize,
    pub template: usize,
    pub variable: usize,
}

impl TranslationStats {
    fn record(&mut self, tier: Tier) {
        match tier {
            Tier::Exact => self.exact += 1,
            Tier::Template => self.template += 1,
            Tier::Variable => self.variable += 1,
        }
    }

    pub fn count(&self, tier: Tier) -> usize {
        match tier {
            Tier::Exact => self.exact,
            Tier::Template => self.template,
            Tier::Variable => self.variable,
        }
    }

    pub fn total(&self) -> usize {
        self.exact + self.template + self.variable
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Output of [`apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Translation carries the rewritten content"]
pub struct Translation {
    pub content: String,
    pub stats: TranslationStats,
}

/// Apply `rules` to `content`.
///
/// Deterministic: the same content and rule set always produce the same
/// bytes and counts.
pub fn apply(content: &str, rules: &RuleSet) -> Translation {
    let mut buffer = content.to_owned();
    let mut stats = TranslationStats::default();

    for rule in rules {
        if rule.from.is_empty() || !buffer.contains(rule.from.as_str()) {
            continue;
        }
        buffer = buffer.replace(rule.from.as_str(), &rule.to);
        stats.record(rule.tier);
    }

    tracing::debug!(
        rule_set = rules.name(),
        exact = stats.exact,
        template = stats.template,
        variable = stats.variable,
        "applied rule set"
    );

    Translation {
        content: buffer,
        stats,
    }
}
