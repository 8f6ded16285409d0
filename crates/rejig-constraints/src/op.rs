//! The constraint operator.
//!
//! A closed enumeration: the encoding leaves room for strict-subtype and
//! equals relations, but only subtype-of exists today and only
//! [`ConstraintOp::subtype`] is meant to be called by collectors. Relation
//! kind checks always go through the enum, never through string comparison;
//! the canonical token only exists for display and for parsing recorded
//! constraint dumps.

use std::fmt;

/// Relation between the left and right variables of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintOp {
    /// Left must be a subtype of (or equal to) right.
    Subtype,
}

impl ConstraintOp {
    /// The subtype-of operator. The only exposed factory; repeated calls
    /// yield the same operator value.
    pub fn subtype() -> Self {
        ConstraintOp::Subtype
    }

    /// Parse a canonical operator token.
    ///
    /// An unrecognized token is a programming error in the caller, surfaced
    /// loudly; correct collector code can never hit it.
    pub fn from_token(token: &str) -> Result<Self, InvalidOperatorError> {
        match token {
            "<=" => Ok(ConstraintOp::Subtype),
            _ => Err(InvalidOperatorError {
                token: token.to_string(),
            }),
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            ConstraintOp::Subtype => "<=",
        }
    }

    pub fn is_subtype_operator(self) -> bool {
        matches!(self, ConstraintOp::Subtype)
    }
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Attempt to construct an operator from an unrecognized token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized constraint operator token `{token}`")]
pub struct InvalidOperatorError {
    pub token: String,
}
