//! Building blocks shared by the join reorder rules.
//!
//! Everything here is a pure function over immutable plans. Preconditions are
//! the caller's job: a rule only calls [`split_project`] after checking
//! [`is_all_slot_project`].

use std::collections::HashSet;
use std::sync::Arc;

use crate::expr::{ExprId, Expression, NamedExpression, Slot};
use crate::planner::Plan;

/// Conjuncts redistributed across a join rotation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConjunctSplit {
    /// Top conjuncts touching the moving relation, then every bottom conjunct.
    pub new_top: Vec<Expression>,
    /// Top conjuncts that do not touch the moving relation.
    pub new_bottom: Vec<Expression>,
}

/// True if `project` is a projection made only of bare slots.
///
/// Rules call this on a Project sitting directly above a Join. Any other node
/// yields false.
pub fn is_all_slot_project(project: &Plan) -> bool {
    match project {
        Plan::Project { projects, .. } => projects.iter().all(NamedExpression::is_slot),
        _ => false,
    }
}

/// Partition slot projections into those whose id is in `split_child_expr_ids`
/// and the rest, keeping relative order in both.
pub fn split_project(
    projects: &[NamedExpression],
    split_child_expr_ids: &HashSet<ExprId>,
) -> (Vec<NamedExpression>, Vec<NamedExpression>) {
    debug_assert!(
        projects.iter().all(NamedExpression::is_slot),
        "split_project requires a slot-only projection"
    );
    projects
        .iter()
        .cloned()
        .partition(|named| split_child_expr_ids.contains(&named.expr_id()))
}

/// Wrap `plan` in a projection unless `projects` is empty or names exactly the
/// columns `plan` already outputs, in any order.
pub fn project_or_self(projects: Vec<NamedExpression>, plan: Arc<Plan>) -> Arc<Plan> {
    if projects.is_empty() || is_output_set(&projects, &plan) {
        return plan;
    }
    Plan::project(projects, plan)
}

/// Like [`project_or_self`], but a different column order also forces a
/// projection.
pub fn project_or_self_in_order(projects: Vec<NamedExpression>, plan: Arc<Plan>) -> Arc<Plan> {
    if projects.is_empty() || is_output_sequence(&projects, &plan) {
        return plan;
    }
    Plan::project(projects, plan)
}

/// Always project `plan` down to the columns in `required_expr_ids`, keeping
/// the child's column order.
pub fn new_project(required_expr_ids: &HashSet<ExprId>, plan: Arc<Plan>) -> Arc<Plan> {
    let projects = plan
        .output()
        .into_iter()
        .filter(|slot| required_expr_ids.contains(&slot.expr_id))
        .map(NamedExpression::Slot)
        .collect();
    Plan::project(projects, plan)
}

/// Append the condition slots missing from `projects`.
///
/// An empty projection means "the child's full output" and is returned as is.
pub fn add_slots_used_by_on(used_slots: &[Slot], projects: &[NamedExpression]) -> Vec<NamedExpression> {
    if projects.is_empty() {
        return Vec::new();
    }
    let mut present: HashSet<ExprId> = projects.iter().map(NamedExpression::expr_id).collect();
    let mut result = projects.to_vec();
    for slot in used_slots {
        if present.insert(slot.expr_id) {
            result.push(NamedExpression::Slot(slot.clone()));
        }
    }
    result
}

/// The join's condition slots produced by its left (`left == true`) or right
/// child. Empty for non-joins.
pub fn join_child_condition_slots(join: &Plan, left: bool) -> Vec<Slot> {
    let child = match join {
        Plan::Join {
            left: l, right: r, ..
        } => {
            if left {
                l
            } else {
                r
            }
        }
        _ => return Vec::new(),
    };
    let child_ids = child.output_expr_ids();
    join.condition_slots()
        .into_iter()
        .filter(|slot| child_ids.contains(&slot.expr_id))
        .collect()
}

/// Redistribute conjuncts when a relation changes which join it hangs off.
///
/// Top conjuncts referencing `moving_expr_ids` cannot be evaluated below
/// anymore and go to the new top join together with all of the old bottom
/// join's conjuncts. The remaining top conjuncts go to the new bottom join.
pub fn split_conjuncts(
    top_conjuncts: &[Expression],
    bottom_conjuncts: &[Expression],
    moving_expr_ids: &HashSet<ExprId>,
) -> ConjunctSplit {
    let (mut new_top, new_bottom): (Vec<_>, Vec<_>) = top_conjuncts
        .iter()
        .cloned()
        .partition(|conjunct| references_any(conjunct, moving_expr_ids));
    new_top.extend(bottom_conjuncts.iter().cloned());
    ConjunctSplit { new_top, new_bottom }
}

fn references_any(expr: &Expression, ids: &HashSet<ExprId>) -> bool {
    expr.input_slots().iter().any(|slot| ids.contains(&slot.expr_id))
}

fn is_output_set(projects: &[NamedExpression], plan: &Plan) -> bool {
    let output = plan.output_set();
    let mut seen = HashSet::with_capacity(projects.len());
    projects.len() == output.len()
        && projects.iter().all(|p| match p.as_slot() {
            Some(slot) => output.contains(slot) && seen.insert(slot.expr_id),
            None => false,
        })
}

fn is_output_sequence(projects: &[NamedExpression], plan: &Plan) -> bool {
    let output = plan.output();
    projects.len() == output.len()
        && projects
            .iter()
            .zip(output.iter())
            .all(|(p, slot)| p.is_slot() && p.expr_id() == slot.expr_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{BinaryOperator, ExprIdAllocator, Literal};

    fn scan(alloc: &ExprIdAllocator, name: &str, cols: &[&str]) -> Arc<Plan> {
        let output = cols.iter().map(|c| Slot::qualified(alloc.next(), name, *c)).collect();
        Plan::leaf(name, output)
    }

    fn named(slots: &[Slot]) -> Vec<NamedExpression> {
        slots.iter().cloned().map(NamedExpression::Slot).collect()
    }

    fn ids(plan: &Plan) -> HashSet<ExprId> {
        plan.output_expr_ids()
    }

    fn col(plan: &Plan, i: usize) -> Expression {
        Expression::slot(&plan.output()[i])
    }

    #[test]
    fn test_is_all_slot_project() {
        let alloc = ExprIdAllocator::new();
        let a = scan(&alloc, "a", &["x"]);
        let b = scan(&alloc, "b", &["y"]);
        let join = Plan::inner_join(a.clone(), b, Vec::new());

        let slots_only = Plan::project(named(&a.output()), join.clone());
        assert!(is_all_slot_project(&slots_only));

        let computed = NamedExpression::alias(&alloc, "x2", Expression::binary(
            BinaryOperator::Multiply,
            col(&a, 0),
            Expression::Literal(Literal::Integer(2)),
        ));
        let with_alias = Plan::project(vec![a.output()[0].clone().into(), computed], join.clone());
        assert!(!is_all_slot_project(&with_alias));

        assert!(!is_all_slot_project(&join));
    }

    #[test]
    fn test_split_project_preserves_order() {
        let alloc = ExprIdAllocator::new();
        let a = scan(&alloc, "a", &["a1", "a2"]);
        let b = scan(&alloc, "b", &["b1", "b2"]);
        let (a_out, b_out) = (a.output(), b.output());
        let projects = named(&[b_out[1].clone(), a_out[0].clone(), b_out[0].clone(), a_out[1].clone()]);

        let (in_a, not_a) = split_project(&projects, &ids(&a));
        assert_eq!(in_a, named(&[a_out[0].clone(), a_out[1].clone()]));
        assert_eq!(not_a, named(&[b_out[1].clone(), b_out[0].clone()]));
    }

    #[test]
    fn test_split_project_empty() {
        let (yes, no) = split_project(&[], &HashSet::new());
        assert!(yes.is_empty());
        assert!(no.is_empty());
    }

    #[test]
    fn test_project_or_self_empty_returns_plan() {
        let alloc = ExprIdAllocator::new();
        let a = scan(&alloc, "a", &["x", "y"]);
        let result = project_or_self(Vec::new(), a.clone());
        assert!(Arc::ptr_eq(&result, &a));
    }

    #[test]
    fn test_project_or_self_permutation_returns_plan() {
        let alloc = ExprIdAllocator::new();
        let a = scan(&alloc, "a", &["x", "y"]);
        let out = a.output();
        let result = project_or_self(named(&[out[1].clone(), out[0].clone()]), a.clone());
        assert!(Arc::ptr_eq(&result, &a));
    }

    #[test]
    fn test_project_or_self_subset_wraps() {
        let alloc = ExprIdAllocator::new();
        let a = scan(&alloc, "a", &["x", "y"]);
        let out = a.output();
        let result = project_or_self(named(&out[..1]), a.clone());
        match result.as_ref() {
            Plan::Project { input, projects } => {
                assert!(Arc::ptr_eq(input, &a));
                assert_eq!(projects, &named(&out[..1]));
            }
            other => panic!("expected project, got {:?}", other),
        }
    }

    #[test]
    fn test_project_or_self_duplicates_wrap() {
        let alloc = ExprIdAllocator::new();
        let a = scan(&alloc, "a", &["x", "y"]);
        let out = a.output();
        let result = project_or_self(named(&[out[0].clone(), out[0].clone()]), a.clone());
        assert!(!Arc::ptr_eq(&result, &a));
    }

    #[test]
    fn test_project_or_self_in_order() {
        let alloc = ExprIdAllocator::new();
        let a = scan(&alloc, "a", &["x", "y"]);
        let out = a.output();

        let same = project_or_self_in_order(named(&out), a.clone());
        assert!(Arc::ptr_eq(&same, &a));

        let empty = project_or_self_in_order(Vec::new(), a.clone());
        assert!(Arc::ptr_eq(&empty, &a));

        let reordered = project_or_self_in_order(named(&[out[1].clone(), out[0].clone()]), a.clone());
        assert!(!Arc::ptr_eq(&reordered, &a));
        assert_eq!(reordered.output(), vec![out[1].clone(), out[0].clone()]);
    }

    #[test]
    fn test_new_project_always_wraps() {
        let alloc = ExprIdAllocator::new();
        let a = scan(&alloc, "a", &["x", "y", "z"]);
        let out = a.output();

        let full = new_project(&ids(&a), a.clone());
        assert!(matches!(full.as_ref(), Plan::Project { .. }));
        assert_eq!(full.output(), out);

        let required: HashSet<ExprId> = [out[2].expr_id, out[0].expr_id].into_iter().collect();
        let pruned = new_project(&required, a.clone());
        assert_eq!(pruned.output(), vec![out[0].clone(), out[2].clone()]);
    }

    #[test]
    fn test_add_slots_used_by_on() {
        let alloc = ExprIdAllocator::new();
        let a = scan(&alloc, "a", &["x", "y", "z"]);
        let out = a.output();
        let projects = named(&out[..1]);
        let used = vec![out[2].clone(), out[0].clone(), out[1].clone()];

        let result = add_slots_used_by_on(&used, &projects);
        assert_eq!(result, named(&[out[0].clone(), out[2].clone(), out[1].clone()]));

        let again = add_slots_used_by_on(&used, &result);
        assert_eq!(again, result);
    }

    #[test]
    fn test_add_slots_used_by_on_empty_is_full_schema() {
        let alloc = ExprIdAllocator::new();
        let a = scan(&alloc, "a", &["x"]);
        assert!(add_slots_used_by_on(&a.output(), &[]).is_empty());
    }

    #[test]
    fn test_join_child_condition_slots_partition() {
        let alloc = ExprIdAllocator::new();
        let a = scan(&alloc, "a", &["x", "y"]);
        let b = scan(&alloc, "b", &["u", "v"]);
        let conds = vec![
            Expression::equals(col(&a, 0), col(&b, 1)),
            Expression::binary(BinaryOperator::Lt, col(&a, 1), col(&b, 1)),
        ];
        let join = Plan::inner_join(a.clone(), b.clone(), conds);

        let left = join_child_condition_slots(&join, true);
        let right = join_child_condition_slots(&join, false);
        assert_eq!(left, vec![a.output()[0].clone(), a.output()[1].clone()]);
        assert_eq!(right, vec![b.output()[1].clone()]);

        let all: HashSet<Slot> = join.condition_slots().into_iter().collect();
        let union: HashSet<Slot> = left.iter().chain(right.iter()).cloned().collect();
        assert_eq!(all, union);
        assert_eq!(left.len() + right.len(), all.len());
    }

    #[test]
    fn test_join_child_condition_slots_non_join() {
        let alloc = ExprIdAllocator::new();
        let a = scan(&alloc, "a", &["x"]);
        assert!(join_child_condition_slots(&a, true).is_empty());
    }

    #[test]
    fn test_split_conjuncts_example() {
        let alloc = ExprIdAllocator::new();
        let a = scan(&alloc, "a", &["k"]);
        let b = scan(&alloc, "b", &["k"]);
        let c = scan(&alloc, "c", &["k"]);

        let p1 = Expression::equals(col(&a, 0), col(&c, 0));
        let p2 = Expression::equals(col(&b, 0), col(&c, 0));
        let p3 = Expression::binary(BinaryOperator::Lt, col(&b, 0), col(&c, 0));

        let split = split_conjuncts(&[p1.clone(), p2.clone()], &[p3.clone()], &ids(&b));
        assert_eq!(split.new_bottom, vec![p1]);
        assert_eq!(split.new_top, vec![p2, p3]);
    }

    #[test]
    fn test_split_conjuncts_three_relation_conjunct_moves_up() {
        let alloc = ExprIdAllocator::new();
        let a = scan(&alloc, "a", &["k"]);
        let b = scan(&alloc, "b", &["k"]);
        let c = scan(&alloc, "c", &["k"]);
        let abc = Expression::equals(
            Expression::binary(BinaryOperator::Plus, col(&a, 0), col(&b, 0)),
            col(&c, 0),
        );
        let split = split_conjuncts(&[abc.clone()], &[], &ids(&b));
        assert_eq!(split.new_top, vec![abc]);
        assert!(split.new_bottom.is_empty());
    }
}
