//! Ordering hazards between rules of one [`RuleSet`].
//!
//! Rules run sequentially over a shared buffer, so two rules can interact:
//!
//! - **Feeds**: an earlier replacement contains a later match text. The
//!   later rule then rewrites text that was never in the source.
//! - **Reintroduces**: a replacement contains the match text of an earlier
//!   rule or of its own rule. A second run over already-translated content
//!   would match again, breaking idempotence.
//! - **Shadows**: earlier rules rewrite part of a later rule's match text,
//!   so the later rule can no longer match, and the combined effect differs
//!   from what the later rule asked for.
//!
//! Shadowing where the earlier rules produce exactly the later rule's
//! replacement is harmless and is not reported.

use crate::rules::schema::{Rule, RuleSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionKind {
    Feeds,
    Reintroduces,
    Shadows,
}

/// Interaction between the rule at `first` and the rule at `second`
/// (absolute indexes into the set).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub kind: CollisionKind,
    pub first: usize,
    pub second: usize,
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CollisionKind::Feeds => write!(
                f,
                "replacement of rule #{} contains the match text of later rule #{}",
                self.first, self.second
            ),
            CollisionKind::Reintroduces => write!(
                f,
                "replacement of rule #{} reintroduces the match text of rule #{}",
                self.first, self.second
            ),
            CollisionKind::Shadows => write!(
                f,
                "rule #{} rewrites part of the match text of later rule #{}",
                self.first, self.second
            ),
        }
    }
}

/// Find every hazardous interaction in `set`.
pub fn find_collisions(set: &RuleSet) -> Vec<Collision> {
    let rules = set.rules();
    let mut found = Vec::new();

    for (i, matched) in rules.iter().enumerate() {
        if matched.from.is_empty() {
            continue;
        }
        for (j, other) in rules.iter().enumerate() {
            if other.from.is_empty() || !other.to.contains(matched.from.as_str()) {
                continue;
            }
            // `other` produces text that `matched` matches
            let kind = if j < i {
                CollisionKind::Feeds
            } else {
                CollisionKind::Reintroduces
            };
            found.push(Collision {
                kind,
                first: j,
                second: i,
            });
        }
    }

    for (j, later) in rules.iter().enumerate() {
        found.extend(shadowing(&rules[..j], later, j));
    }

    found.sort_by_key(|c| (c.first, c.second));
    found
}

fn shadowing(before: &[Rule], later: &Rule, later_index: usize) -> Vec<Collision> {
    let mut buffer = later.from.clone();
    let mut touched = Vec::new();
    for (i, rule) in before.iter().enumerate() {
        if !rule.from.is_empty() && buffer.contains(rule.from.as_str()) {
            buffer = buffer.replace(rule.from.as_str(), &rule.to);
            touched.push(i);
        }
    }

    if touched.is_empty() || buffer == later.to {
        return Vec::new();
    }

    touched
        .into_iter()
        .map(|i| Collision {
            kind: CollisionKind::Shadows,
            first: i,
            second: later_index,
        })
        .collect()
}
