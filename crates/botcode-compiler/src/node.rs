//! Node-access interface
//!
//! The code generator never looks at a concrete editor tree. It walks any
//! type implementing [`Node`], reached through a [`NodeTree`]. The Blockly
//! JSON workspace in [`crate::workspace`] is the implementation shipped with
//! the crate; tests and embedders can supply their own.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Value stored in a named block field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl FieldValue {
    /// Field value as text, the way the editor reports it.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Text(s) => Cow::Borrowed(s),
            FieldValue::Number(n) => Cow::Owned(n.to_string()),
            FieldValue::Bool(b) => Cow::Borrowed(if *b { "TRUE" } else { "FALSE" }),
        }
    }

    /// Numeric reading of the field. Text is trimmed and parsed; empty or
    /// malformed text yields `None`.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Integer reading of the field (ids and dropdown values), truncating
    /// any fractional part.
    pub fn to_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|n| n.is_finite()).map(|n| n.trunc() as i64))
            }
            other => other.to_number().filter(|n| n.is_finite()).map(|n| n.trunc() as i64),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// Shape of a `controls_if` block: how many `else if` arms it has and
/// whether it ends in `else`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mutation {
    pub else_if_count: usize,
    pub has_else: bool,
}

/// A typed block in the visual program.
pub trait Node {
    /// Block type tag, e.g. `robot_move`.
    fn kind(&self) -> &str;

    /// Value of a named field, if set.
    fn field(&self, name: &str) -> Option<&FieldValue>;

    /// Block plugged into a named input slot.
    fn input(&self, name: &str) -> Option<&Self>;

    /// Following block in the same statement chain.
    fn next(&self) -> Option<&Self>;

    /// Conditional shape; blocks without one report a bare `if`.
    fn mutation(&self) -> Mutation {
        Mutation::default()
    }

    /// Field read as text
    fn field_text(&self, name: &str) -> Option<Cow<'_, str>> {
        self.field(name).map(FieldValue::as_text)
    }
}

/// A collection of top-level blocks.
pub trait NodeTree {
    type Node: Node;

    /// Top-level blocks of the given type, in workspace order.
    fn roots_of_kind(&self, kind: &str) -> Vec<&Self::Node>;
}
