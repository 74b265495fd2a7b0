//! ActivityService - activity rows of one class.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::tables::{ACTIVITIES, ACTIVITY_CLASS, ACTIVITY_DESCRIPTION, ACTIVITY_ID};
use super::{created_at_or_now, decode_row};
use crate::domain::classroom::{number_sequentially, ActivityEntity};
use crate::domain::foundation::{ActivityId, ClassId, DomainError, Timestamp};
use crate::domain::session::required_text;
use crate::ports::{Filter, SelectQuery, TableStore};

#[derive(Debug, Deserialize)]
struct ActivityRow {
    id_atividade: i64,
    descricao: String,
    id_turma: i64,
    #[serde(default)]
    created_at: Option<Timestamp>,
}

impl From<ActivityRow> for ActivityEntity {
    fn from(row: ActivityRow) -> Self {
        ActivityEntity::from_row(
            ActivityId::new(row.id_atividade),
            row.descricao,
            ClassId::new(row.id_turma),
            created_at_or_now(row.created_at),
        )
    }
}

/// Activity queries and mutations.
#[derive(Clone)]
pub struct ActivityService {
    tables: Arc<dyn TableStore>,
}

impl ActivityService {
    pub fn new(tables: Arc<dyn TableStore>) -> Self {
        Self { tables }
    }

    /// All activities of `class_id`, in creation order, numbered from 1.
    pub async fn list_by_class(
        &self,
        class_id: ClassId,
    ) -> Result<Vec<ActivityEntity>, DomainError> {
        let query = SelectQuery::from(ACTIVITIES)
            .eq(ACTIVITY_CLASS, class_id.value())
            .order_ascending(ACTIVITY_ID);

        let activities = self
            .tables
            .select(&query)
            .await?
            .into_iter()
            .map(|row| decode_row::<ActivityRow>(ACTIVITIES, row).map(ActivityEntity::from))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(number_sequentially(activities))
    }

    pub async fn create(
        &self,
        class_id: ClassId,
        description: &str,
    ) -> Result<ActivityEntity, DomainError> {
        let description = required_text("description", description)?;

        let mut row = Map::new();
        row.insert(ACTIVITY_DESCRIPTION.to_string(), Value::from(description));
        row.insert(ACTIVITY_CLASS.to_string(), Value::from(class_id.value()));

        let stored = self.tables.insert(ACTIVITIES, row).await?;
        decode_row::<ActivityRow>(ACTIVITIES, stored).map(ActivityEntity::from)
    }

    /// True if at least one activity references `class_id`.
    pub async fn has_activities(&self, class_id: ClassId) -> Result<bool, DomainError> {
        let query = SelectQuery::from(ACTIVITIES)
            .columns(&[ACTIVITY_ID])
            .eq(ACTIVITY_CLASS, class_id.value())
            .limit(1);

        Ok(!self.tables.select(&query).await?.is_empty())
    }

    pub async fn update(&self, id: ActivityId, description: &str) -> Result<(), DomainError> {
        let description = required_text("description", description)?;

        let mut patch = Map::new();
        patch.insert(ACTIVITY_DESCRIPTION.to_string(), Value::from(description));

        self.tables
            .update(ACTIVITIES, &Filter::eq(ACTIVITY_ID, id.value()), patch)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: ActivityId) -> Result<(), DomainError> {
        self.tables
            .delete(ACTIVITIES, &Filter::eq(ACTIVITY_ID, id.value()))
            .await?;
        Ok(())
    }
}
