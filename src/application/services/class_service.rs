//! ClassService - class rows of the current teacher.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::tables::{CLASSES, CLASS_ID, CLASS_NAME, CLASS_OWNER};
use super::{created_at_or_now, decode_row};
use crate::domain::classroom::{number_sequentially, ClassEntity};
use crate::domain::foundation::{ClassId, DomainError, Timestamp, UserId};
use crate::domain::session::required_text;
use crate::ports::{Filter, SelectQuery, TableStore};

#[derive(Debug, Deserialize)]
struct ClassRow {
    id_turma: i64,
    nome: String,
    id_professor: String,
    #[serde(default)]
    created_at: Option<Timestamp>,
}

impl ClassRow {
    fn into_entity(self) -> Result<ClassEntity, DomainError> {
        Ok(ClassEntity::from_row(
            ClassId::new(self.id_turma),
            self.nome,
            UserId::new(self.id_professor)?,
            created_at_or_now(self.created_at),
        ))
    }
}

/// Class queries and mutations.
#[derive(Clone)]
pub struct ClassService {
    tables: Arc<dyn TableStore>,
}

impl ClassService {
    pub fn new(tables: Arc<dyn TableStore>) -> Self {
        Self { tables }
    }

    /// All classes owned by `owner`, in creation order, numbered from 1.
    pub async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<ClassEntity>, DomainError> {
        let query = SelectQuery::from(CLASSES)
            .eq(CLASS_OWNER, owner.as_str())
            .order_ascending(CLASS_ID);

        let classes = self
            .tables
            .select(&query)
            .await?
            .into_iter()
            .map(|row| decode_row::<ClassRow>(CLASSES, row)?.into_entity())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(number_sequentially(classes))
    }

    /// Inserts a class owned by `owner`.
    ///
    /// The returned entity carries no ordinal; reload the list for that.
    pub async fn create(&self, name: &str, owner: &UserId) -> Result<ClassEntity, DomainError> {
        let name = required_text("name", name)?;

        let mut row = Map::new();
        row.insert(CLASS_NAME.to_string(), Value::from(name));
        row.insert(CLASS_OWNER.to_string(), Value::from(owner.as_str()));

        let stored = self.tables.insert(CLASSES, row).await?;
        decode_row::<ClassRow>(CLASSES, stored)?.into_entity()
    }

    pub async fn delete(&self, id: ClassId) -> Result<(), DomainError> {
        self.tables
            .delete(CLASSES, &Filter::eq(CLASS_ID, id.value()))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryTableStore;
    use crate::domain::foundation::ErrorCode;
    use crate::ports::RemoteError;
    use serde_json::json;

    fn store() -> Arc<InMemoryTableStore> {
        Arc::new(InMemoryTableStore::new().with_identity(CLASSES, CLASS_ID))
    }

    fn owner(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn list_returns_only_owned_classes_numbered_in_creation_order() {
        let store = store();
        let service = ClassService::new(store.clone());

        service.create("Math101", &owner("t-1")).await.unwrap();
        service.create("Other", &owner("t-2")).await.unwrap();
        service.create("Physics", &owner("t-1")).await.unwrap();

        let classes = service.list_by_owner(&owner("t-1")).await.unwrap();

        let names: Vec<_> = classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Math101", "Physics"]);
        assert_eq!(classes[0].sequence_number, 1);
        assert_eq!(classes[1].sequence_number, 2);
        assert!(classes.iter().all(|c| c.is_owned_by(&owner("t-1"))));
    }

    #[tokio::test]
    async fn create_trims_name_and_rejects_blank() {
        let store = store();
        let service = ClassService::new(store.clone());

        let created = service.create("  History ", &owner("t-1")).await.unwrap();
        assert_eq!(created.name, "History");

        let err = service.create("   ", &owner("t-1")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(store.mutation_count(), 1);
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let store = store();
        let service = ClassService::new(store.clone());
        let created = service.create("Math101", &owner("t-1")).await.unwrap();

        service.delete(created.id).await.unwrap();

        assert!(service.list_by_owner(&owner("t-1")).await.unwrap().is_empty());
        assert!(store.rows(CLASSES).is_empty());
    }

    #[tokio::test]
    async fn created_at_falls_back_when_missing() {
        let store = store();
        store
            .insert(
                CLASSES,
                json!({"nome": "Art", "id_professor": "t-1", "created_at": null})
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await
            .unwrap();
        let service = ClassService::new(store);

        let classes = service.list_by_owner(&owner("t-1")).await.unwrap();
        assert_eq!(classes.len(), 1);
    }

    #[tokio::test]
    async fn malformed_row_is_reported() {
        let store = store();
        store
            .insert(
                CLASSES,
                json!({"nome": 5, "id_professor": "t-1"}).as_object().cloned().unwrap(),
            )
            .await
            .unwrap();
        let service = ClassService::new(store);

        let err = service.list_by_owner(&owner("t-1")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedRow);
    }

    #[tokio::test]
    async fn remote_failure_maps_to_domain_error() {
        let store = Arc::new(
            InMemoryTableStore::new().with_error(RemoteError::unavailable("offline")),
        );
        let service = ClassService::new(store);

        let err = service.list_by_owner(&owner("t-1")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RemoteUnavailable);
    }
}
