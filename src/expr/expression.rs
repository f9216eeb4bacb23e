//! Scalar expressions over slots.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{ExprError, ExprResult};
use super::id::ExprId;
use super::slot::Slot;

/// Column values keyed by the id of the slot that produced them.
pub type Row = HashMap<ExprId, Literal>;

/// Literal value.
///
/// Serialized untagged so that histogram bounds read as plain JSON scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Literal {
    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    /// Compare two non-null values of compatible types.
    fn compare(&self, other: &Literal) -> ExprResult<Ordering> {
        let ord = match (self, other) {
            (Literal::Integer(a), Literal::Integer(b)) => a.cmp(b),
            (Literal::Integer(a), Literal::Float(b)) => (*a as f64).total_cmp(b),
            (Literal::Float(a), Literal::Integer(b)) => a.total_cmp(&(*b as f64)),
            (Literal::Float(a), Literal::Float(b)) => a.total_cmp(b),
            (Literal::String(a), Literal::String(b)) => a.cmp(b),
            (Literal::Boolean(a), Literal::Boolean(b)) => a.cmp(b),
            (a, b) => {
                return Err(ExprError::TypeMismatch(format!("cannot compare {} with {}", a, b)));
            }
        };
        Ok(ord)
    }

    fn as_bool(&self) -> ExprResult<Option<bool>> {
        match self {
            Literal::Null => Ok(None),
            Literal::Boolean(b) => Ok(Some(*b)),
            other => Err(ExprError::TypeMismatch(format!("expected boolean, got {}", other))),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "NULL"),
            Literal::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Float(x) => write!(f, "{}", x),
            Literal::String(s) => write!(f, "'{}'", s),
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    // Logical
    And,
    Or,
    // Arithmetic
    Plus,
    Minus,
    Multiply,
    Divide,
}

impl BinaryOperator {
    /// Check if this is a comparison operator.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq
                | BinaryOperator::NotEq
                | BinaryOperator::Lt
                | BinaryOperator::LtEq
                | BinaryOperator::Gt
                | BinaryOperator::GtEq
        )
    }

    /// Check if this is a logical operator.
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }

    fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
        }
    }
}

/// Scalar expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Column reference.
    Slot(Slot),
    /// Literal value.
    Literal(Literal),
    /// Binary operation (e.g., a = b, a AND b).
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// Logical negation.
    Not(Box<Expression>),
    /// IS NULL / IS NOT NULL.
    IsNull {
        expr: Box<Expression>,
        negated: bool,
    },
}

impl Expression {
    pub fn slot(slot: &Slot) -> Self {
        Expression::Slot(slot.clone())
    }

    pub fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `left = right`.
    pub fn equals(left: Expression, right: Expression) -> Self {
        Self::binary(BinaryOperator::Eq, left, right)
    }

    /// `left AND right`.
    pub fn and(left: Expression, right: Expression) -> Self {
        Self::binary(BinaryOperator::And, left, right)
    }

    /// Fold conjuncts back into one predicate. `None` for an empty list.
    pub fn conjunction(conjuncts: impl IntoIterator<Item = Expression>) -> Option<Expression> {
        conjuncts.into_iter().reduce(Expression::and)
    }

    /// Flatten top-level ANDs into a conjunct list.
    pub fn split_conjunction(&self) -> Vec<Expression> {
        let mut out = Vec::new();
        self.collect_conjuncts(&mut out);
        out
    }

    fn collect_conjuncts(&self, out: &mut Vec<Expression>) {
        match self {
            Expression::Binary {
                op: BinaryOperator::And,
                left,
                right,
            } => {
                left.collect_conjuncts(out);
                right.collect_conjuncts(out);
            }
            other => out.push(other.clone()),
        }
    }

    /// True for `slot = slot` conjuncts, the shape usable as a hash join key.
    pub fn is_equi_condition(&self) -> bool {
        matches!(
            self,
            Expression::Binary { op: BinaryOperator::Eq, left, right }
                if matches!(**left, Expression::Slot(_)) && matches!(**right, Expression::Slot(_))
        )
    }

    /// Distinct slots referenced by this expression, in first-occurrence order.
    pub fn input_slots(&self) -> Vec<Slot> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.collect_slots(&mut seen, &mut out);
        out
    }

    fn collect_slots(&self, seen: &mut HashSet<ExprId>, out: &mut Vec<Slot>) {
        match self {
            Expression::Slot(slot) => {
                if seen.insert(slot.expr_id) {
                    out.push(slot.clone());
                }
            }
            Expression::Literal(_) => {}
            Expression::Binary { left, right, .. } => {
                left.collect_slots(seen, out);
                right.collect_slots(seen, out);
            }
            Expression::Not(expr) | Expression::IsNull { expr, .. } => expr.collect_slots(seen, out),
        }
    }

    pub fn input_slot_expr_ids(&self) -> HashSet<ExprId> {
        self.input_slots().into_iter().map(|s| s.expr_id).collect()
    }

    pub fn nullable(&self) -> bool {
        match self {
            Expression::Slot(slot) => slot.nullable,
            Expression::Literal(lit) => lit.is_null(),
            Expression::Binary { left, right, .. } => left.nullable() || right.nullable(),
            Expression::Not(expr) => expr.nullable(),
            Expression::IsNull { .. } => false,
        }
    }

    /// Evaluate against a row using SQL three-valued logic.
    pub fn evaluate(&self, row: &Row) -> ExprResult<Literal> {
        match self {
            Expression::Slot(slot) => row
                .get(&slot.expr_id)
                .cloned()
                .ok_or(ExprError::UnboundSlot(slot.expr_id)),
            Expression::Literal(lit) => Ok(lit.clone()),
            Expression::Not(expr) => Ok(match expr.evaluate(row)?.as_bool()? {
                Some(b) => Literal::Boolean(!b),
                None => Literal::Null,
            }),
            Expression::IsNull { expr, negated } => {
                let is_null = expr.evaluate(row)?.is_null();
                Ok(Literal::Boolean(is_null != *negated))
            }
            Expression::Binary { op, left, right } => {
                let l = left.evaluate(row)?;
                let r = right.evaluate(row)?;
                match op {
                    BinaryOperator::And => eval_and(&l, &r),
                    BinaryOperator::Or => eval_or(&l, &r),
                    op if op.is_comparison() => eval_comparison(*op, &l, &r),
                    op => eval_arithmetic(*op, &l, &r),
                }
            }
        }
    }

    /// Evaluate as a filter: only TRUE passes, NULL and FALSE reject.
    pub fn is_satisfied(&self, row: &Row) -> ExprResult<bool> {
        Ok(self.evaluate(row)?.as_bool()?.unwrap_or(false))
    }
}

fn eval_and(l: &Literal, r: &Literal) -> ExprResult<Literal> {
    Ok(match (l.as_bool()?, r.as_bool()?) {
        (Some(false), _) | (_, Some(false)) => Literal::Boolean(false),
        (Some(true), Some(true)) => Literal::Boolean(true),
        _ => Literal::Null,
    })
}

fn eval_or(l: &Literal, r: &Literal) -> ExprResult<Literal> {
    Ok(match (l.as_bool()?, r.as_bool()?) {
        (Some(true), _) | (_, Some(true)) => Literal::Boolean(true),
        (Some(false), Some(false)) => Literal::Boolean(false),
        _ => Literal::Null,
    })
}

fn eval_comparison(op: BinaryOperator, l: &Literal, r: &Literal) -> ExprResult<Literal> {
    if l.is_null() || r.is_null() {
        return Ok(Literal::Null);
    }
    let ord = l.compare(r)?;
    let result = match op {
        BinaryOperator::Eq => ord == Ordering::Equal,
        BinaryOperator::NotEq => ord != Ordering::Equal,
        BinaryOperator::Lt => ord == Ordering::Less,
        BinaryOperator::LtEq => ord != Ordering::Greater,
        BinaryOperator::Gt => ord == Ordering::Greater,
        BinaryOperator::GtEq => ord != Ordering::Less,
        _ => unreachable!("not a comparison operator: {:?}", op),
    };
    Ok(Literal::Boolean(result))
}

fn eval_arithmetic(op: BinaryOperator, l: &Literal, r: &Literal) -> ExprResult<Literal> {
    if l.is_null() || r.is_null() {
        return Ok(Literal::Null);
    }
    match (l, r) {
        (Literal::Integer(a), Literal::Integer(b)) => {
            let v = match op {
                BinaryOperator::Plus => a.wrapping_add(*b),
                BinaryOperator::Minus => a.wrapping_sub(*b),
                BinaryOperator::Multiply => a.wrapping_mul(*b),
                BinaryOperator::Divide => {
                    if *b == 0 {
                        return Err(ExprError::DivisionByZero);
                    }
                    a.wrapping_div(*b)
                }
                _ => unreachable!("not an arithmetic operator: {:?}", op),
            };
            Ok(Literal::Integer(v))
        }
        (Literal::Integer(_) | Literal::Float(_), Literal::Integer(_) | Literal::Float(_)) => {
            let a = to_f64(l);
            let b = to_f64(r);
            let v = match op {
                BinaryOperator::Plus => a + b,
                BinaryOperator::Minus => a - b,
                BinaryOperator::Multiply => a * b,
                BinaryOperator::Divide => {
                    if b == 0.0 {
                        return Err(ExprError::DivisionByZero);
                    }
                    a / b
                }
                _ => unreachable!("not an arithmetic operator: {:?}", op),
            };
            Ok(Literal::Float(v))
        }
        (a, b) => Err(ExprError::TypeMismatch(format!(
            "cannot apply {} to {} and {}",
            op.symbol(),
            a,
            b
        ))),
    }
}

fn to_f64(lit: &Literal) -> f64 {
    match lit {
        Literal::Integer(n) => *n as f64,
        Literal::Float(x) => *x,
        _ => f64::NAN,
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Slot(slot) => write!(f, "{}", slot),
            Expression::Literal(lit) => write!(f, "{}", lit),
            Expression::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expression::Not(expr) => write!(f, "NOT {}", expr),
            Expression::IsNull { expr, negated } => {
                if *negated {
                    write!(f, "{} IS NOT NULL", expr)
                } else {
                    write!(f, "{} IS NULL", expr)
                }
            }
        }
    }
}
