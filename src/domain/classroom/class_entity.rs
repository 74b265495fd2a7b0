//! Class (turma) entity.

use serde::{Deserialize, Serialize};

use super::numbering::Numbered;
use crate::domain::foundation::{ClassId, Timestamp, UserId};

/// A class owned by one teacher.
///
/// `sequence_number` is the 1-based position of the class in the list it
/// was fetched with. It is not persisted and changes whenever rows before it
/// are added or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntity {
    pub id: ClassId,
    pub name: String,
    pub sequence_number: u32,
    pub owner_id: UserId,
    pub created_at: Timestamp,
}

impl ClassEntity {
    /// Builds an entity from a fetched row. The ordinal is assigned later.
    pub fn from_row(
        id: ClassId,
        name: impl Into<String>,
        owner_id: UserId,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            sequence_number: 0,
            owner_id,
            created_at,
        }
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.owner_id == user_id
    }
}

impl Numbered for ClassEntity {
    fn assign_sequence_number(&mut self, number: u32) {
        self.sequence_number = number;
    }
}
