//! Logical query plan representation.
//!
//! Only the node kinds join reordering needs are modelled: opaque sources,
//! projections and binary joins. Every column is addressed by its
//! [`ExprId`], and a node's output is always derived from its children.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::error::{PlanError, PlanResult};
use crate::expr::{ExprId, Expression, NamedExpression, Slot};

/// Join types supported by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    Cross,
    LeftOuter,
    RightOuter,
    FullOuter,
}

impl JoinType {
    /// The join type to use after swapping the two inputs.
    pub fn swap(&self) -> JoinType {
        match self {
            JoinType::LeftOuter => JoinType::RightOuter,
            JoinType::RightOuter => JoinType::LeftOuter,
            other => *other,
        }
    }

    /// Inner and cross joins may be freely reassociated.
    pub fn is_inner_like(&self) -> bool {
        matches!(self, JoinType::Inner | JoinType::Cross)
    }

    fn nulls_left(&self) -> bool {
        matches!(self, JoinType::RightOuter | JoinType::FullOuter)
    }

    fn nulls_right(&self) -> bool {
        matches!(self, JoinType::LeftOuter | JoinType::FullOuter)
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER"),
            JoinType::Cross => write!(f, "CROSS"),
            JoinType::LeftOuter => write!(f, "LEFT OUTER"),
            JoinType::RightOuter => write!(f, "RIGHT OUTER"),
            JoinType::FullOuter => write!(f, "FULL OUTER"),
        }
    }
}

/// Logical query plan node.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// Opaque source such as a table scan. Its output is its schema.
    Leaf { name: String, output: Vec<Slot> },

    /// Ordered projection over the input.
    Project {
        input: Arc<Plan>,
        projects: Vec<NamedExpression>,
    },

    /// Join two inputs.
    Join {
        left: Arc<Plan>,
        right: Arc<Plan>,
        join_type: JoinType,
        /// Equality conjuncts usable as hash keys.
        hash_conjuncts: Vec<Expression>,
        /// Remaining conjuncts evaluated on matched pairs.
        other_conjuncts: Vec<Expression>,
    },
}

impl Plan {
    pub fn leaf(name: impl Into<String>, output: Vec<Slot>) -> Arc<Plan> {
        Arc::new(Plan::Leaf {
            name: name.into(),
            output,
        })
    }

    pub fn project(projects: Vec<NamedExpression>, input: Arc<Plan>) -> Arc<Plan> {
        Arc::new(Plan::Project { input, projects })
    }

    pub fn join(
        join_type: JoinType,
        left: Arc<Plan>,
        right: Arc<Plan>,
        hash_conjuncts: Vec<Expression>,
        other_conjuncts: Vec<Expression>,
    ) -> Arc<Plan> {
        Arc::new(Plan::Join {
            left,
            right,
            join_type,
            hash_conjuncts,
            other_conjuncts,
        })
    }

    /// Inner join whose conjuncts are sorted into hash and other conjuncts.
    /// A hash conjunct is `slot = slot` with one slot from each input. With no
    /// conjuncts at all this is a cross join.
    pub fn inner_join(left: Arc<Plan>, right: Arc<Plan>, conjuncts: Vec<Expression>) -> Arc<Plan> {
        let join_type = if conjuncts.is_empty() {
            JoinType::Cross
        } else {
            JoinType::Inner
        };
        let left_ids = left.output_expr_ids();
        let right_ids = right.output_expr_ids();
        let (hash, other): (Vec<_>, Vec<_>) = conjuncts
            .into_iter()
            .partition(|conjunct| is_hash_key(conjunct, &left_ids, &right_ids));
        Plan::join(join_type, left, right, hash, other)
    }

    /// Output columns in order.
    pub fn output(&self) -> Vec<Slot> {
        match self {
            Plan::Leaf { output, .. } => output.clone(),
            Plan::Project { projects, .. } => projects.iter().map(NamedExpression::to_slot).collect(),
            Plan::Join {
                left,
                right,
                join_type,
                ..
            } => {
                let mut cols: Vec<Slot> = left
                    .output()
                    .into_iter()
                    .map(|s| if join_type.nulls_left() { s.with_nullable(true) } else { s })
                    .collect();
                cols.extend(
                    right
                        .output()
                        .into_iter()
                        .map(|s| if join_type.nulls_right() { s.with_nullable(true) } else { s }),
                );
                cols
            }
        }
    }

    pub fn output_set(&self) -> HashSet<Slot> {
        self.output().into_iter().collect()
    }

    pub fn output_expr_ids(&self) -> HashSet<ExprId> {
        self.output().into_iter().map(|s| s.expr_id).collect()
    }

    pub fn children(&self) -> Vec<&Arc<Plan>> {
        match self {
            Plan::Leaf { .. } => Vec::new(),
            Plan::Project { input, .. } => vec![input],
            Plan::Join { left, right, .. } => vec![left, right],
        }
    }

    pub fn is_join(&self) -> bool {
        matches!(self, Plan::Join { .. })
    }

    /// Hash conjuncts followed by other conjuncts. Empty for non-joins.
    pub fn conjuncts(&self) -> Vec<&Expression> {
        match self {
            Plan::Join {
                hash_conjuncts,
                other_conjuncts,
                ..
            } => hash_conjuncts.iter().chain(other_conjuncts.iter()).collect(),
            _ => Vec::new(),
        }
    }

    /// Distinct slots referenced by a join's conjuncts, in first-occurrence
    /// order. Empty for non-joins.
    pub fn condition_slots(&self) -> Vec<Slot> {
        let mut seen = HashSet::new();
        self.conjuncts()
            .into_iter()
            .flat_map(Expression::input_slots)
            .filter(|slot| seen.insert(slot.expr_id))
            .collect()
    }

    /// Names of the leaves under this plan.
    pub fn referenced_leaves(&self) -> HashSet<String> {
        let mut leaves = HashSet::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves(&self, leaves: &mut HashSet<String>) {
        match self {
            Plan::Leaf { name, .. } => {
                leaves.insert(name.clone());
            }
            _ => {
                for child in self.children() {
                    child.collect_leaves(leaves);
                }
            }
        }
    }

    /// Check id uniqueness and schema containment over the whole tree.
    pub fn validate(&self) -> PlanResult<()> {
        let mut defined = HashSet::new();
        self.validate_into(&mut defined)
    }

    fn validate_into(&self, defined: &mut HashSet<ExprId>) -> PlanResult<()> {
        match self {
            Plan::Leaf { output, .. } => {
                for slot in output {
                    if !defined.insert(slot.expr_id) {
                        return Err(PlanError::DuplicateExprId(slot.expr_id));
                    }
                }
            }
            Plan::Project { input, projects } => {
                input.validate_into(defined)?;
                let available = input.output_expr_ids();
                for named in projects {
                    for slot in named.input_slots() {
                        if !available.contains(&slot.expr_id) {
                            return Err(PlanError::UnresolvedSlot {
                                node: "Project",
                                slot: slot.to_string(),
                            });
                        }
                    }
                    if let NamedExpression::Alias { expr_id, .. } = named {
                        if !defined.insert(*expr_id) {
                            return Err(PlanError::DuplicateExprId(*expr_id));
                        }
                    }
                }
            }
            Plan::Join { left, right, .. } => {
                left.validate_into(defined)?;
                right.validate_into(defined)?;
                let mut available = left.output_expr_ids();
                available.extend(right.output_expr_ids());
                for slot in self.condition_slots() {
                    if !available.contains(&slot.expr_id) {
                        return Err(PlanError::UnresolvedSlot {
                            node: "Join",
                            slot: slot.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn is_hash_key(conjunct: &Expression, left_ids: &HashSet<ExprId>, right_ids: &HashSet<ExprId>) -> bool {
    if !conjunct.is_equi_condition() {
        return false;
    }
    match conjunct {
        Expression::Binary { left, right, .. } => match (left.as_ref(), right.as_ref()) {
            (Expression::Slot(l), Expression::Slot(r)) => {
                (left_ids.contains(&l.expr_id) && right_ids.contains(&r.expr_id))
                    || (right_ids.contains(&l.expr_id) && left_ids.contains(&r.expr_id))
            }
            _ => false,
        },
        _ => false,
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.format_indent(f, 0)
    }
}

impl Plan {
    fn format_indent(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let pad = "  ".repeat(indent);
        match self {
            Plan::Leaf { name, output } => {
                let cols: Vec<String> = output.iter().map(|s| s.to_string()).collect();
                writeln!(f, "{}Leaf: {} [{}]", pad, name, cols.join(", "))
            }
            Plan::Project { input, projects } => {
                let cols: Vec<String> = projects.iter().map(|p| p.to_string()).collect();
                writeln!(f, "{}Project: [{}]", pad, cols.join(", "))?;
                input.format_indent(f, indent + 1)
            }
            Plan::Join {
                left,
                right,
                join_type,
                hash_conjuncts,
                other_conjuncts,
            } => {
                write!(f, "{}Join: {}", pad, join_type)?;
                if !hash_conjuncts.is_empty() {
                    let conds: Vec<String> = hash_conjuncts.iter().map(|c| c.to_string()).collect();
                    write!(f, " hash=[{}]", conds.join(", "))?;
                }
                if !other_conjuncts.is_empty() {
                    let conds: Vec<String> = other_conjuncts.iter().map(|c| c.to_string()).collect();
                    write!(f, " other=[{}]", conds.join(", "))?;
                }
                writeln!(f)?;
                left.format_indent(f, indent + 1)?;
                right.format_indent(f, indent + 1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{BinaryOperator, ExprIdAllocator, Literal};

    fn scan(alloc: &ExprIdAllocator, name: &str, cols: &[&str]) -> Arc<Plan> {
        let output = cols.iter().map(|c| Slot::qualified(alloc.next(), name, *c)).collect();
        Plan::leaf(name, output)
    }

    #[test]
    fn test_join_type_display() {
        assert_eq!(JoinType::Inner.to_string(), "INNER");
        assert_eq!(JoinType::LeftOuter.to_string(), "LEFT OUTER");
        assert_eq!(JoinType::RightOuter.to_string(), "RIGHT OUTER");
    }

    #[test]
    fn test_join_type_swap() {
        assert_eq!(JoinType::LeftOuter.swap(), JoinType::RightOuter);
        assert_eq!(JoinType::RightOuter.swap(), JoinType::LeftOuter);
        assert_eq!(JoinType::Inner.swap(), JoinType::Inner);
        assert_eq!(JoinType::FullOuter.swap(), JoinType::FullOuter);
    }

    #[test]
    fn test_join_output_is_concatenation() {
        let alloc = ExprIdAllocator::new();
        let a = scan(&alloc, "a", &["x", "y"]);
        let b = scan(&alloc, "b", &["z"]);
        let join = Plan::inner_join(a.clone(), b.clone(), Vec::new());

        let mut expected = a.output();
        expected.extend(b.output());
        assert_eq!(join.output(), expected);
        assert!(matches!(*join, Plan::Join { join_type: JoinType::Cross, .. }));
    }

    #[test]
    fn test_outer_join_marks_nullable_side() {
        let alloc = ExprIdAllocator::new();
        let a = Plan::leaf("a", vec![Slot::new(alloc.next(), "x").with_nullable(false)]);
        let b = Plan::leaf("b", vec![Slot::new(alloc.next(), "y").with_nullable(false)]);
        let join = Plan::join(JoinType::LeftOuter, a, b, Vec::new(), Vec::new());
        let out = join.output();
        assert!(!out[0].nullable);
        assert!(out[1].nullable);
    }

    #[test]
    fn test_inner_join_sorts_conjuncts() {
        let alloc = ExprIdAllocator::new();
        let a = scan(&alloc, "a", &["x"]);
        let b = scan(&alloc, "b", &["y"]);
        let ax = Expression::slot(&a.output()[0]);
        let by = Expression::slot(&b.output()[0]);
        let eq = Expression::equals(ax.clone(), by.clone());
        let lt = Expression::binary(BinaryOperator::Lt, ax, by);
        let join = Plan::inner_join(a, b, vec![lt.clone(), eq.clone()]);

        match join.as_ref() {
            Plan::Join {
                hash_conjuncts,
                other_conjuncts,
                join_type,
                ..
            } => {
                assert_eq!(*join_type, JoinType::Inner);
                assert_eq!(hash_conjuncts, &vec![eq]);
                assert_eq!(other_conjuncts, &vec![lt]);
            }
            other => panic!("expected join, got {:?}", other),
        }
    }

    #[test]
    fn test_inner_join_same_side_equality_is_not_a_hash_key() {
        let alloc = ExprIdAllocator::new();
        let a = scan(&alloc, "a", &["x", "y"]);
        let b = scan(&alloc, "b", &["z"]);
        let same_side = Expression::equals(Expression::slot(&a.output()[0]), Expression::slot(&a.output()[1]));
        let reversed = Expression::equals(Expression::slot(&b.output()[0]), Expression::slot(&a.output()[0]));
        let join = Plan::inner_join(a, b, vec![same_side.clone(), reversed.clone()]);

        match join.as_ref() {
            Plan::Join {
                hash_conjuncts,
                other_conjuncts,
                ..
            } => {
                assert_eq!(hash_conjuncts, &vec![reversed]);
                assert_eq!(other_conjuncts, &vec![same_side]);
            }
            other => panic!("expected join, got {:?}", other),
        }
    }

    #[test]
    fn test_children() {
        let alloc = ExprIdAllocator::new();
        let a = scan(&alloc, "a", &["x"]);
        let b = scan(&alloc, "b", &["y"]);
        let join = Plan::inner_join(a.clone(), b.clone(), Vec::new());
        let children = join.children();
        assert_eq!(children.len(), 2);
        assert!(Arc::ptr_eq(children[0], &a));
        assert!(Arc::ptr_eq(children[1], &b));
        assert!(a.children().is_empty());
    }

    #[test]
    fn test_condition_slots_distinct() {
        let alloc = ExprIdAllocator::new();
        let a = scan(&alloc, "a", &["x"]);
        let b = scan(&alloc, "b", &["y"]);
        let ax = Expression::slot(&a.output()[0]);
        let by = Expression::slot(&b.output()[0]);
        let join = Plan::inner_join(
            a.clone(),
            b.clone(),
            vec![
                Expression::equals(ax.clone(), by.clone()),
                Expression::binary(BinaryOperator::Lt, ax, by),
            ],
        );
        assert_eq!(join.condition_slots(), vec![a.output()[0].clone(), b.output()[0].clone()]);
        assert!(a.condition_slots().is_empty());
    }

    #[test]
    fn test_referenced_leaves() {
        let alloc = ExprIdAllocator::new();
        let join = Plan::inner_join(scan(&alloc, "users", &["id"]), scan(&alloc, "orders", &["uid"]), Vec::new());
        let leaves = join.referenced_leaves();
        assert!(leaves.contains("users"));
        assert!(leaves.contains("orders"));
        assert_eq!(leaves.len(), 2);
    }

    #[test]
    fn test_validate_accepts_well_formed_plan() {
        let alloc = ExprIdAllocator::new();
        let a = scan(&alloc, "a", &["x"]);
        let b = scan(&alloc, "b", &["y"]);
        let cond = Expression::equals(Expression::slot(&a.output()[0]), Expression::slot(&b.output()[0]));
        let join = Plan::inner_join(a.clone(), b, vec![cond]);
        let plus_one = NamedExpression::alias(
            &alloc,
            "x1",
            Expression::binary(
                BinaryOperator::Plus,
                Expression::slot(&a.output()[0]),
                Expression::Literal(Literal::Integer(1)),
            ),
        );
        let project = Plan::project(vec![plus_one], join);
        assert!(project.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let alloc = ExprIdAllocator::new();
        let a = scan(&alloc, "a", &["x"]);
        // Same leaf on both sides shares ids.
        let join = Plan::inner_join(a.clone(), a, Vec::new());
        assert!(matches!(join.validate(), Err(PlanError::DuplicateExprId(_))));
    }

    #[test]
    fn test_validate_rejects_unresolved_slot() {
        let alloc = ExprIdAllocator::new();
        let a = scan(&alloc, "a", &["x"]);
        let b = scan(&alloc, "b", &["y"]);
        let stray = Slot::new(alloc.next(), "stray");
        let project = Plan::project(vec![stray.clone().into()], a.clone());
        assert!(matches!(
            project.validate(),
            Err(PlanError::UnresolvedSlot { node: "Project", .. })
        ));

        let join = Plan::inner_join(a, b, vec![Expression::IsNull {
            expr: Box::new(Expression::slot(&stray)),
            negated: false,
        }]);
        assert!(matches!(join.validate(), Err(PlanError::UnresolvedSlot { node: "Join", .. })));
    }

    #[test]
    fn test_display() {
        let alloc = ExprIdAllocator::new();
        let a = scan(&alloc, "a", &["x"]);
        let b = scan(&alloc, "b", &["y"]);
        let cond = Expression::equals(Expression::slot(&a.output()[0]), Expression::slot(&b.output()[0]));
        let join = Plan::inner_join(a, b, vec![cond]);
        let text = join.to_string();
        assert!(text.starts_with("Join: INNER hash=[(a.x#0 = b.y#1)]"));
        assert!(text.contains("  Leaf: a [a.x#0]"));
    }
}
