use crate::target::FileType;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

/// Reporting tier of a rule. Matching mechanics are identical across tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Short quoted labels
    Exact,
    /// Full sentences and descriptions
    Template,
    /// Strings carrying live `${...}` interpolation
    Variable,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Exact, Tier::Template, Tier::Variable];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Exact => "exact",
            Tier::Template => "template",
            Tier::Variable => "variable",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A literal find/replace pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub from: String,
    pub to: String,
    pub tier: Tier,
}

impl Rule {
    pub fn new(from: impl Into<String>, to: impl Into<String>, tier: Tier) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            tier,
        }
    }

    pub fn exact(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(from, to, Tier::Exact)
    }

    pub fn template(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(from, to, Tier::Template)
    }

    pub fn variable(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(from, to, Tier::Variable)
    }
}

/// Ordered, immutable catalog of rules.
///
/// Rules run in sequence order; each later rule scans the buffer produced by
/// the earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    name: String,
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            name: name.into(),
            rules,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn count_in(&self, tier: Tier) -> usize {
        self.rules.iter().filter(|r| r.tier == tier).count()
    }

    /// Check the structural invariants: non-empty match text, no identity
    /// rules, no duplicate match text.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        for (index, rule) in self.rules.iter().enumerate() {
            let at = RuleRef {
                tier: rule.tier,
                index,
            };
            if rule.from.is_empty() {
                issues.push(ValidationIssue::EmptyMatch { at });
                continue;
            }
            if rule.from == rule.to {
                issues.push(ValidationIssue::Identity { at });
            }
            if !seen.insert(rule.from.as_str()) {
                issues.push(ValidationIssue::Duplicate {
                    at,
                    from: rule.from.clone(),
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

/// On-disk rule file.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct RuleFile {
    #[serde(default)]
    pub meta: RuleMeta,
    #[serde(default)]
    pub exact: Vec<RuleEntry>,
    #[serde(default)]
    pub template: Vec<RuleEntry>,
    #[serde(default)]
    pub variable: Vec<RuleEntry>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RuleMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_type: Option<FileType>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RuleEntry {
    pub from: String,
    pub to: String,
    /// Permit an empty replacement (deletes the match)
    #[serde(default)]
    pub allow_empty: bool,
}

impl RuleFile {
    fn tiers(&self) -> [(Tier, &[RuleEntry]); 3] {
        [
            (Tier::Exact, self.exact.as_slice()),
            (Tier::Template, self.template.as_slice()),
            (Tier::Variable, self.variable.as_slice()),
        ]
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.exact.is_empty() && self.template.is_empty() && self.variable.is_empty() {
            issues.push(ValidationIssue::EmptyRuleFile);
        }

        for (tier, entries) in self.tiers() {
            for (index, entry) in entries.iter().enumerate() {
                if entry.to.is_empty() && !entry.allow_empty {
                    issues.push(ValidationIssue::EmptyReplacement {
                        at: RuleRef { tier, index },
                    });
                }
            }
        }

        // Sequence-level checks report absolute indexes; remap them to the
        // per-tier position the author sees in the file.
        if let Err(err) = self.to_rule_set().validate() {
            issues.extend(err.issues.into_iter().map(|issue| self.localize(issue)));
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Flatten into a [`RuleSet`] ordered exact → template → variable.
    pub fn to_rule_set(&self) -> RuleSet {
        let rules = self
            .tiers()
            .into_iter()
            .flat_map(|(tier, entries)| {
                entries
                    .iter()
                    .map(move |e| Rule::new(e.from.clone(), e.to.clone(), tier))
            })
            .collect();
        RuleSet::new(self.meta.name.clone(), rules)
    }

    fn localize(&self, issue: ValidationIssue) -> ValidationIssue {
        let offset = |tier: Tier| match tier {
            Tier::Exact => 0,
            Tier::Template => self.exact.len(),
            Tier::Variable => self.exact.len() + self.template.len(),
        };
        let fix = |at: RuleRef| RuleRef {
            tier: at.tier,
            index: at.index - offset(at.tier),
        };
        match issue {
            ValidationIssue::EmptyMatch { at } => ValidationIssue::EmptyMatch { at: fix(at) },
            ValidationIssue::Identity { at } => ValidationIssue::Identity { at: fix(at) },
            ValidationIssue::Duplicate { at, from } => {
                ValidationIssue::Duplicate { at: fix(at), from }
            }
            other => other,
        }
    }
}

/// Position of a rule within its tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleRef {
    pub tier: Tier,
    pub index: usize,
}

impl fmt::Display for RuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.tier, self.index)
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyRuleFile,
    EmptyMatch { at: RuleRef },
    EmptyReplacement { at: RuleRef },
    Identity { at: RuleRef },
    Duplicate { at: RuleRef, from: String },
    MissingFileType,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRuleFile => write!(f, "rule file contains no rules"),
            ValidationIssue::EmptyMatch { at } => write!(f, "rule {at} has an empty 'from'"),
            ValidationIssue::EmptyReplacement { at } => write!(
                f,
                "rule {at} has an empty 'to' (set allow_empty = true if intended)"
            ),
            ValidationIssue::Identity { at } => {
                write!(f, "rule {at} replaces text with itself")
            }
            ValidationIssue::Duplicate { at, from } => {
                write!(f, "rule {at} repeats an earlier 'from': {from:?}")
            }
            ValidationIssue::MissingFileType => write!(
                f,
                "rule file declares no meta.file_type and its name is not a known file type"
            ),
        }
    }
}
