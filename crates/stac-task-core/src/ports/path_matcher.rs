//! PathMatcher port - item に対する構造的なパス述語
//!
//! Used to reassign output collections: each rule of
//! `upload_options.collections` is an expression evaluated against an item.
//! Expressions are compiled once and then evaluated against every item.

use serde_json::{Map, Value};

use crate::domain::errors::StacTaskError;

/// A compiled expression.
pub trait ItemPredicate: Send + Sync {
    fn matches(&self, item: &Map<String, Value>) -> bool;
}

pub trait PathMatcher: Send + Sync {
    /// A malformed expression is a [`StacTaskError::Configuration`].
    fn compile(&self, expression: &str) -> Result<Box<dyn ItemPredicate>, StacTaskError>;

    /// Does `item` satisfy `expression`?
    fn matches(&self, item: &Map<String, Value>, expression: &str) -> Result<bool, StacTaskError> {
        Ok(self.compile(expression)?.matches(item))
    }
}
