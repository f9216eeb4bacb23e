//! Slots and named expressions.

use std::fmt;
use std::hash::{Hash, Hasher};

use super::expression::Expression;
use super::id::{ExprId, ExprIdAllocator};

/// A reference to a column by its [`ExprId`].
///
/// Equality and hashing look only at the id: two slots naming the same column
/// are the same slot even if one of them has been made nullable by an outer
/// join above its producer.
#[derive(Debug, Clone)]
pub struct Slot {
    pub expr_id: ExprId,
    pub name: String,
    /// Producing relation, if known (table name or alias).
    pub qualifier: Option<String>,
    pub nullable: bool,
}

impl Slot {
    pub fn new(expr_id: ExprId, name: impl Into<String>) -> Self {
        Self {
            expr_id,
            name: name.into(),
            qualifier: None,
            nullable: true,
        }
    }

    pub fn qualified(expr_id: ExprId, qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            expr_id,
            name: name.into(),
            qualifier: Some(qualifier.into()),
            nullable: true,
        }
    }

    /// Copy of this slot with a different nullability flag.
    pub fn with_nullable(&self, nullable: bool) -> Self {
        Self {
            nullable,
            ..self.clone()
        }
    }
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.expr_id == other.expr_id
    }
}

impl Eq for Slot {}

impl Hash for Slot {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.expr_id.hash(state);
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref q) = self.qualifier {
            write!(f, "{}.{}{}", q, self.name, self.expr_id)
        } else {
            write!(f, "{}{}", self.name, self.expr_id)
        }
    }
}

/// One entry of a projection list.
#[derive(Debug, Clone, PartialEq)]
pub enum NamedExpression {
    /// Pass a child column through unchanged.
    Slot(Slot),
    /// A computed value with its own freshly minted id.
    Alias {
        expr_id: ExprId,
        name: String,
        child: Expression,
    },
}

impl NamedExpression {
    /// Name a computed expression, minting its output id from `allocator`.
    pub fn alias(allocator: &ExprIdAllocator, name: impl Into<String>, child: Expression) -> Self {
        NamedExpression::Alias {
            expr_id: allocator.next(),
            name: name.into(),
            child,
        }
    }

    pub fn expr_id(&self) -> ExprId {
        match self {
            NamedExpression::Slot(slot) => slot.expr_id,
            NamedExpression::Alias { expr_id, .. } => *expr_id,
        }
    }

    pub fn is_slot(&self) -> bool {
        matches!(self, NamedExpression::Slot(_))
    }

    pub fn as_slot(&self) -> Option<&Slot> {
        match self {
            NamedExpression::Slot(slot) => Some(slot),
            NamedExpression::Alias { .. } => None,
        }
    }

    /// The column this entry exposes to the parent.
    pub fn to_slot(&self) -> Slot {
        match self {
            NamedExpression::Slot(slot) => slot.clone(),
            NamedExpression::Alias {
                expr_id,
                name,
                child,
            } => Slot {
                expr_id: *expr_id,
                name: name.clone(),
                qualifier: None,
                nullable: child.nullable(),
            },
        }
    }

    /// Slots this entry reads from the child.
    pub fn input_slots(&self) -> Vec<Slot> {
        match self {
            NamedExpression::Slot(slot) => vec![slot.clone()],
            NamedExpression::Alias { child, .. } => child.input_slots(),
        }
    }
}

impl From<Slot> for NamedExpression {
    fn from(slot: Slot) -> Self {
        NamedExpression::Slot(slot)
    }
}

impl fmt::Display for NamedExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamedExpression::Slot(slot) => write!(f, "{}", slot),
            NamedExpression::Alias {
                expr_id,
                name,
                child,
            } => write!(f, "{} AS {}{}", child, name, expr_id),
        }
    }
}
