//! Join reorder rules.
//!
//! Each rule matches one join-tree shape and builds the rotated replacement.
//! Rules never decide whether the rewrite is worth it; they only guarantee the
//! replacement produces the same columns, in the same order, with every
//! conjunct evaluated exactly once at a join that can see all of its inputs.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use super::error::{ReorderError, ReorderResult};
use super::utils::{
    add_slots_used_by_on, is_all_slot_project, join_child_condition_slots, project_or_self,
    project_or_self_in_order, split_conjuncts, split_project,
};
use crate::config::ReorderConfig;
use crate::expr::{ExprId, Expression, NamedExpression};
use crate::planner::{JoinType, Plan};

/// Join reorder rule trait.
pub trait ReorderRule: Send + Sync {
    /// Name of the rule.
    fn name(&self) -> &'static str;

    /// Rewrite `plan` if its root matches this rule's shape.
    ///
    /// `Ok(None)` means the rule does not apply.
    fn apply(&self, plan: &Arc<Plan>, config: &ReorderConfig) -> ReorderResult<Option<Arc<Plan>>>;
}

/// A bottom join as seen from its parent: optionally under a slot-only
/// projection.
struct BottomJoin<'a> {
    projects: Option<&'a [NamedExpression]>,
    join: &'a Plan,
    left: &'a Arc<Plan>,
    right: &'a Arc<Plan>,
    hash_conjuncts: &'a [Expression],
    other_conjuncts: &'a [Expression],
}

impl<'a> BottomJoin<'a> {
    /// Match an inner-like join, possibly under a slot-only projection.
    fn matching(child: &'a Plan) -> Option<Self> {
        let (projects, join) = match child {
            Plan::Project { input, projects } if input.is_join() && is_all_slot_project(child) => {
                (Some(projects.as_slice()), input.as_ref())
            }
            Plan::Join { .. } => (None, child),
            _ => return None,
        };
        match join {
            Plan::Join {
                left,
                right,
                join_type,
                hash_conjuncts,
                other_conjuncts,
            } if join_type.is_inner_like() => Some(Self {
                projects,
                join,
                left,
                right,
                hash_conjuncts,
                other_conjuncts,
            }),
            _ => None,
        }
    }

    /// Rebuild both children, pruned to what the projection kept plus the
    /// columns this join's conjuncts need once they move up.
    fn pruned_children(&self) -> (Arc<Plan>, Arc<Plan>) {
        match self.projects {
            None => (self.left.clone(), self.right.clone()),
            Some(projects) => {
                let (left_projects, right_projects) = split_project(projects, &self.left.output_expr_ids());
                let left_projects =
                    add_slots_used_by_on(&join_child_condition_slots(self.join, true), &left_projects);
                let right_projects =
                    add_slots_used_by_on(&join_child_condition_slots(self.join, false), &right_projects);
                (
                    project_or_self(left_projects, self.left.clone()),
                    project_or_self(right_projects, self.right.clone()),
                )
            }
        }
    }
}

/// Top join fields, for inner-like joins only.
struct TopJoin<'a> {
    left: &'a Arc<Plan>,
    right: &'a Arc<Plan>,
    hash_conjuncts: &'a [Expression],
    other_conjuncts: &'a [Expression],
}

impl<'a> TopJoin<'a> {
    fn matching(plan: &'a Plan) -> Option<Self> {
        match plan {
            Plan::Join {
                left,
                right,
                join_type,
                hash_conjuncts,
                other_conjuncts,
            } if join_type.is_inner_like() => Some(Self {
                left,
                right,
                hash_conjuncts,
                other_conjuncts,
            }),
            _ => None,
        }
    }

    fn conjuncts(&self) -> impl Iterator<Item = &'a Expression> {
        let (hash, other) = (self.hash_conjuncts, self.other_conjuncts);
        hash.iter().chain(other.iter())
    }
}

fn inner_join(
    left: Arc<Plan>,
    right: Arc<Plan>,
    hash_conjuncts: Vec<Expression>,
    other_conjuncts: Vec<Expression>,
) -> Arc<Plan> {
    let join_type = if hash_conjuncts.is_empty() && other_conjuncts.is_empty() {
        JoinType::Cross
    } else {
        JoinType::Inner
    };
    Plan::join(join_type, left, right, hash_conjuncts, other_conjuncts)
}

/// Restore the original column order on top of a rewritten subtree.
fn with_original_output(original: &Plan, rewritten: Arc<Plan>) -> Arc<Plan> {
    let projects = original.output().into_iter().map(NamedExpression::Slot).collect();
    project_or_self_in_order(projects, rewritten)
}

/// Reject top conjuncts that only read columns of one child subtree.
fn check_placement<'a>(
    rule: &'static str,
    conjuncts: impl Iterator<Item = &'a Expression>,
    below: &[HashSet<ExprId>],
) -> ReorderResult<()> {
    for conjunct in conjuncts {
        let used = conjunct.input_slot_expr_ids();
        if !used.is_empty() && below.iter().any(|ids| used.is_subset(ids)) {
            return Err(ReorderError::MisplacedConjunct {
                rule,
                conjunct: conjunct.to_string(),
            });
        }
    }
    Ok(())
}

/// Commutativity: `A ⋈ B → B ⋈ A`.
///
/// Outer joins swap their kind so the preserved side stays the same relation.
pub struct JoinCommute;

impl ReorderRule for JoinCommute {
    fn name(&self) -> &'static str {
        "JoinCommute"
    }

    fn apply(&self, plan: &Arc<Plan>, _config: &ReorderConfig) -> ReorderResult<Option<Arc<Plan>>> {
        match plan.as_ref() {
            Plan::Join {
                left,
                right,
                join_type,
                hash_conjuncts,
                other_conjuncts,
            } => {
                let swapped = Plan::join(
                    join_type.swap(),
                    right.clone(),
                    left.clone(),
                    hash_conjuncts.clone(),
                    other_conjuncts.clone(),
                );
                Ok(Some(with_original_output(plan, swapped)))
            }
            _ => Ok(None),
        }
    }
}

/// Left association: `A ⋈ (B ⋈ C) → (A ⋈ B) ⋈ C`.
///
/// C changes the join it hangs off, so every top conjunct that reads C moves
/// to the new top join together with the old `B ⋈ C` conjuncts.
pub struct JoinLeftAssociate;

impl ReorderRule for JoinLeftAssociate {
    fn name(&self) -> &'static str {
        "JoinLeftAssociate"
    }

    fn apply(&self, plan: &Arc<Plan>, config: &ReorderConfig) -> ReorderResult<Option<Arc<Plan>>> {
        let Some(top) = TopJoin::matching(plan) else {
            return Ok(None);
        };
        let Some(bottom) = BottomJoin::matching(top.right) else {
            return Ok(None);
        };
        check_placement(self.name(), top.conjuncts(), &[top.right.output_expr_ids()])?;

        let c_ids = bottom.right.output_expr_ids();
        let hash = split_conjuncts(top.hash_conjuncts, bottom.hash_conjuncts, &c_ids);
        let other = split_conjuncts(top.other_conjuncts, bottom.other_conjuncts, &c_ids);
        if hash.new_bottom.is_empty() && other.new_bottom.is_empty() && !config.allow_cross_products {
            debug!(rule = self.name(), "skipped: new bottom join would be a cross product");
            return Ok(None);
        }

        let (b, c) = bottom.pruned_children();
        let new_bottom = inner_join(top.left.clone(), b, hash.new_bottom, other.new_bottom);
        let new_top = inner_join(new_bottom, c, hash.new_top, other.new_top);
        Ok(Some(with_original_output(plan, new_top)))
    }
}

/// Right association: `(A ⋈ B) ⋈ C → A ⋈ (B ⋈ C)`.
///
/// A changes the join it hangs off, so every top conjunct that reads A moves
/// to the new top join together with the old `A ⋈ B` conjuncts.
pub struct JoinRightAssociate;

impl ReorderRule for JoinRightAssociate {
    fn name(&self) -> &'static str {
        "JoinRightAssociate"
    }

    fn apply(&self, plan: &Arc<Plan>, config: &ReorderConfig) -> ReorderResult<Option<Arc<Plan>>> {
        let Some(top) = TopJoin::matching(plan) else {
            return Ok(None);
        };
        let Some(bottom) = BottomJoin::matching(top.left) else {
            return Ok(None);
        };
        check_placement(self.name(), top.conjuncts(), &[top.left.output_expr_ids()])?;

        let a_ids = bottom.left.output_expr_ids();
        let hash = split_conjuncts(top.hash_conjuncts, bottom.hash_conjuncts, &a_ids);
        let other = split_conjuncts(top.other_conjuncts, bottom.other_conjuncts, &a_ids);
        if hash.new_bottom.is_empty() && other.new_bottom.is_empty() && !config.allow_cross_products {
            debug!(rule = self.name(), "skipped: new bottom join would be a cross product");
            return Ok(None);
        }

        let (a, b) = bottom.pruned_children();
        let new_bottom = inner_join(b, top.right.clone(), hash.new_bottom, other.new_bottom);
        let new_top = inner_join(a, new_bottom, hash.new_top, other.new_top);
        Ok(Some(with_original_output(plan, new_top)))
    }
}

/// Exchange: `(A ⋈ B) ⋈ (C ⋈ D) → (A ⋈ C) ⋈ (B ⋈ D)`.
pub struct JoinExchange;

/// Conjunct lists for the three joins an exchange produces.
struct ExchangeSplit {
    left: Vec<Expression>,
    right: Vec<Expression>,
    top: Vec<Expression>,
}

impl JoinExchange {
    /// Top conjuncts reading only A ∪ C go left, only B ∪ D go right, the rest
    /// and both old bottom lists go to the new top.
    fn split(
        top: &[Expression],
        left_bottom: &[Expression],
        right_bottom: &[Expression],
        ac_ids: &HashSet<ExprId>,
        bd_ids: &HashSet<ExprId>,
    ) -> ExchangeSplit {
        let touches_bd = split_conjuncts(top, &[], bd_ids);
        let crossing = split_conjuncts(&touches_bd.new_top, &[], ac_ids);
        let mut new_top = crossing.new_top;
        new_top.extend(left_bottom.iter().cloned());
        new_top.extend(right_bottom.iter().cloned());
        ExchangeSplit {
            left: touches_bd.new_bottom,
            right: crossing.new_bottom,
            top: new_top,
        }
    }
}

impl ReorderRule for JoinExchange {
    fn name(&self) -> &'static str {
        "JoinExchange"
    }

    fn apply(&self, plan: &Arc<Plan>, config: &ReorderConfig) -> ReorderResult<Option<Arc<Plan>>> {
        let Some(top) = TopJoin::matching(plan) else {
            return Ok(None);
        };
        let (Some(ab), Some(cd)) = (BottomJoin::matching(top.left), BottomJoin::matching(top.right)) else {
            return Ok(None);
        };
        check_placement(
            self.name(),
            top.conjuncts(),
            &[top.left.output_expr_ids(), top.right.output_expr_ids()],
        )?;

        let mut ac_ids = ab.left.output_expr_ids();
        ac_ids.extend(cd.left.output_expr_ids());
        let mut bd_ids = ab.right.output_expr_ids();
        bd_ids.extend(cd.right.output_expr_ids());

        let hash = Self::split(top.hash_conjuncts, ab.hash_conjuncts, cd.hash_conjuncts, &ac_ids, &bd_ids);
        let other = Self::split(top.other_conjuncts, ab.other_conjuncts, cd.other_conjuncts, &ac_ids, &bd_ids);
        let left_is_cross = hash.left.is_empty() && other.left.is_empty();
        let right_is_cross = hash.right.is_empty() && other.right.is_empty();
        if (left_is_cross || right_is_cross) && !config.allow_cross_products {
            debug!(rule = self.name(), "skipped: a new bottom join would be a cross product");
            return Ok(None);
        }

        let (a, b) = ab.pruned_children();
        let (c, d) = cd.pruned_children();
        let new_left = inner_join(a, c, hash.left, other.left);
        let new_right = inner_join(b, d, hash.right, other.right);
        let new_top = inner_join(new_left, new_right, hash.top, other.top);
        Ok(Some(with_original_output(plan, new_top)))
    }
}
