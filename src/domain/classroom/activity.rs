//! Activity (atividade) entity.

use serde::{Deserialize, Serialize};

use super::numbering::Numbered;
use crate::domain::foundation::{ActivityId, ClassId, Timestamp};

/// An activity attached to exactly one class.
///
/// `sequence_number` follows the same fetch-time ordinal rule as
/// [`ClassEntity`](super::ClassEntity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntity {
    pub id: ActivityId,
    pub description: String,
    pub sequence_number: u32,
    pub class_id: ClassId,
    pub created_at: Timestamp,
}

impl ActivityEntity {
    /// Builds an entity from a fetched row. The ordinal is assigned later.
    pub fn from_row(
        id: ActivityId,
        description: impl Into<String>,
        class_id: ClassId,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            description: description.into(),
            sequence_number: 0,
            class_id,
            created_at,
        }
    }

    pub fn belongs_to(&self, class_id: ClassId) -> bool {
        self.class_id == class_id
    }
}

impl Numbered for ActivityEntity {
    fn assign_sequence_number(&mut self, number: u32) {
        self.sequence_number = number;
    }
}
