//! Join reorder exploration.
//!
//! Applies every enabled rule at every join of a plan and collects the
//! resulting alternatives. Deciding which alternative is cheapest is left to
//! the caller.

use std::sync::Arc;

use tracing::{debug, debug_span, warn};

use super::error::{ReorderError, ReorderResult};
use super::rules::{JoinCommute, JoinExchange, JoinLeftAssociate, JoinRightAssociate, ReorderRule};
use crate::config::ReorderConfig;
use crate::planner::Plan;

/// Enumerates single-step join reorder alternatives for a plan.
pub struct JoinReorderer {
    rules: Vec<Box<dyn ReorderRule>>,
    config: ReorderConfig,
}

impl Default for JoinReorderer {
    fn default() -> Self {
        Self::new(ReorderConfig::default())
    }
}

impl JoinReorderer {
    /// Create a reorderer with the rules `config` enables.
    pub fn new(config: ReorderConfig) -> Self {
        let mut rules: Vec<Box<dyn ReorderRule>> = Vec::new();
        if config.enable_commute {
            rules.push(Box::new(JoinCommute));
        }
        if config.enable_left_associate {
            rules.push(Box::new(JoinLeftAssociate));
        }
        if config.enable_right_associate {
            rules.push(Box::new(JoinRightAssociate));
        }
        if config.enable_exchange {
            rules.push(Box::new(JoinExchange));
        }
        Self { rules, config }
    }

    /// Add a custom rule.
    pub fn add_rule(&mut self, rule: Box<dyn ReorderRule>) {
        self.rules.push(rule);
    }

    pub fn config(&self) -> &ReorderConfig {
        &self.config
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Every plan reachable from `plan` by one rule application at one of its
    /// nodes, up to `max_alternatives`.
    pub fn explore(&self, plan: &Arc<Plan>) -> ReorderResult<Vec<Arc<Plan>>> {
        let span = debug_span!("explore", rules = self.rules.len());
        let _enter = span.enter();

        let alternatives = self.explore_node(plan, self.config.max_alternatives)?;
        debug!(count = alternatives.len(), "exploration finished");
        Ok(alternatives)
    }

    fn explore_node(&self, plan: &Arc<Plan>, budget: usize) -> ReorderResult<Vec<Arc<Plan>>> {
        let mut out = self.apply_rules(plan, budget)?;

        match plan.as_ref() {
            Plan::Leaf { .. } => {}
            Plan::Project { input, projects } => {
                let remaining = budget.saturating_sub(out.len());
                for alt in self.explore_node(input, remaining)? {
                    out.push(Plan::project(projects.clone(), alt));
                }
            }
            Plan::Join {
                left,
                right,
                join_type,
                hash_conjuncts,
                other_conjuncts,
            } => {
                let remaining = budget.saturating_sub(out.len());
                for alt in self.explore_node(left, remaining)? {
                    out.push(Plan::join(
                        *join_type,
                        alt,
                        right.clone(),
                        hash_conjuncts.clone(),
                        other_conjuncts.clone(),
                    ));
                }
                let remaining = budget.saturating_sub(out.len());
                for alt in self.explore_node(right, remaining)? {
                    out.push(Plan::join(
                        *join_type,
                        left.clone(),
                        alt,
                        hash_conjuncts.clone(),
                        other_conjuncts.clone(),
                    ));
                }
            }
        }

        out.truncate(budget);
        Ok(out)
    }

    fn apply_rules(&self, plan: &Arc<Plan>, budget: usize) -> ReorderResult<Vec<Arc<Plan>>> {
        let mut out = Vec::new();
        if !plan.is_join() {
            return Ok(out);
        }

        for rule in &self.rules {
            if out.len() >= budget {
                break;
            }
            match rule.apply(plan, &self.config) {
                Ok(Some(alt)) => {
                    if self.config.validate_rewrites {
                        alt.validate().map_err(|source| ReorderError::InvalidRewrite {
                            rule: rule.name(),
                            source,
                        })?;
                    }
                    debug!(rule = rule.name(), "rule produced an alternative");
                    out.push(alt);
                }
                Ok(None) => {}
                Err(err @ ReorderError::MisplacedConjunct { .. }) => {
                    warn!(rule = rule.name(), error = %err, "rule rejected plan");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(out)
    }
}
