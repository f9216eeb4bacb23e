//! Reference evaluator for logical plans.
//!
//! A deliberately naive in-memory interpreter (nested-loop joins, row-at-a-time
//! projection). It exists so that a rewrite can be checked by running the
//! original and rewritten plans over the same data and comparing results.

use std::collections::HashMap;

use super::error::{PlanError, PlanResult};
use super::logical::{JoinType, Plan};
use crate::expr::{Expression, Literal, NamedExpression, Row, Slot};

/// Rows for each leaf, in the leaf's output column order.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    relations: HashMap<String, Vec<Vec<Literal>>>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the rows of a leaf.
    pub fn with_relation(mut self, name: impl Into<String>, rows: Vec<Vec<Literal>>) -> Self {
        self.relations.insert(name.into(), rows);
        self
    }

    /// Execute `plan` and return its rows as values in output column order.
    pub fn execute(&self, plan: &Plan) -> PlanResult<Vec<Vec<Literal>>> {
        let output = plan.output();
        let rows = self.execute_rows(plan)?;
        Ok(rows
            .into_iter()
            .map(|row| {
                output
                    .iter()
                    .map(|slot| row.get(&slot.expr_id).cloned().unwrap_or(Literal::Null))
                    .collect()
            })
            .collect())
    }

    /// Execute `plan` and return rows keyed by expression id.
    pub fn execute_rows(&self, plan: &Plan) -> PlanResult<Vec<Row>> {
        match plan {
            Plan::Leaf { name, output } => {
                let rows = self
                    .relations
                    .get(name)
                    .ok_or_else(|| PlanError::UnknownRelation(name.clone()))?;
                rows.iter()
                    .map(|values| {
                        if values.len() != output.len() {
                            return Err(PlanError::ArityMismatch {
                                relation: name.clone(),
                                expected: output.len(),
                                actual: values.len(),
                            });
                        }
                        Ok(output
                            .iter()
                            .map(|slot| slot.expr_id)
                            .zip(values.iter().cloned())
                            .collect())
                    })
                    .collect()
            }
            Plan::Project { input, projects } => {
                let rows = self.execute_rows(input)?;
                rows.iter()
                    .map(|row| -> PlanResult<Row> {
                        let mut out = Row::with_capacity(projects.len());
                        for named in projects {
                            let value = match named {
                                NamedExpression::Slot(slot) => Expression::Slot(slot.clone()).evaluate(row)?,
                                NamedExpression::Alias { child, .. } => child.evaluate(row)?,
                            };
                            out.insert(named.expr_id(), value);
                        }
                        Ok(out)
                    })
                    .collect()
            }
            Plan::Join {
                left,
                right,
                join_type,
                ..
            } => {
                let left_rows = self.execute_rows(left)?;
                let right_rows = self.execute_rows(right)?;
                let conjuncts = plan.conjuncts();
                join_rows(
                    *join_type,
                    &left_rows,
                    &right_rows,
                    &left.output(),
                    &right.output(),
                    &conjuncts,
                )
            }
        }
    }
}

fn join_rows(
    join_type: JoinType,
    left_rows: &[Row],
    right_rows: &[Row],
    left_output: &[Slot],
    right_output: &[Slot],
    conjuncts: &[&Expression],
) -> PlanResult<Vec<Row>> {
    let mut out = Vec::new();
    let mut right_matched = vec![false; right_rows.len()];

    for l in left_rows {
        let mut matched = false;
        for (i, r) in right_rows.iter().enumerate() {
            let mut row = l.clone();
            row.extend(r.iter().map(|(k, v)| (*k, v.clone())));
            if satisfies_all(conjuncts, &row)? {
                matched = true;
                right_matched[i] = true;
                out.push(row);
            }
        }
        if !matched && matches!(join_type, JoinType::LeftOuter | JoinType::FullOuter) {
            out.push(pad_nulls(l, right_output));
        }
    }

    if matches!(join_type, JoinType::RightOuter | JoinType::FullOuter) {
        for (r, matched) in right_rows.iter().zip(right_matched) {
            if !matched {
                out.push(pad_nulls(r, left_output));
            }
        }
    }
    Ok(out)
}

fn satisfies_all(conjuncts: &[&Expression], row: &Row) -> PlanResult<bool> {
    for conjunct in conjuncts {
        if !conjunct.is_satisfied(row)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn pad_nulls(row: &Row, missing: &[Slot]) -> Row {
    let mut padded = row.clone();
    padded.extend(missing.iter().map(|slot| (slot.expr_id, Literal::Null)));
    padded
}
