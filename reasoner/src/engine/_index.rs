use std::collections::HashMap;
use std::sync::Arc;

use warrant_api::pattern::Pattern;
use warrant_api::rule::{Program, Rule};

/// The loaded programs, with their rules indexed by body pattern.
///
/// An index is never modified once built:
/// reloading programs builds a new index and swaps it in.
#[derive(Debug, Default)]
pub(crate) struct RuleIndex {
    programs: Vec<Program>,
    /// every distinct body pattern, with the rules containing it, in order of first appearance
    patterns: Vec<(Pattern, Vec<Arc<Rule>>)>,
}

impl RuleIndex {
    pub fn new(programs: Vec<Program>) -> Self {
        let mut patterns: Vec<(Pattern, Vec<Arc<Rule>>)> = Vec::new();
        let mut positions = HashMap::new();
        for rule in programs.iter().flat_map(Program::rules) {
            for pattern in rule.body() {
                let i = *positions.entry(pattern.clone()).or_insert_with(|| {
                    patterns.push((pattern.clone(), Vec::new()));
                    patterns.len() - 1
                });
                patterns[i].1.push(rule.clone());
            }
        }
        RuleIndex { programs, patterns }
    }

    /// Whether no rule is loaded.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    pub fn patterns(&self) -> &[(Pattern, Vec<Arc<Rule>>)] {
        &self.patterns
    }

    /// Every rule of every program.
    pub fn rules(&self) -> impl Iterator<Item = &Arc<Rule>> + '_ {
        self.programs.iter().flat_map(Program::rules)
    }
}
