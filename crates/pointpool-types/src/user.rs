use crate::amount::Amount;
use serde::{Deserialize, Serialize};

/// A campaign participant, keyed by their on-chain address. Created lazily
/// on the first observed swap; the points balance is mutated only through
/// the balance service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub points: Amount,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            points: Amount::ZERO,
        }
    }
}
