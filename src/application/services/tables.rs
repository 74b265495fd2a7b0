//! Remote table and column names.
//!
//! The schema is owned by the hosted backend; these names are its contract.

pub const PROFESSORS: &str = "professores";
pub const PROFESSOR_ID: &str = "id";
pub const PROFESSOR_NAME: &str = "nome";

pub const CLASSES: &str = "turmas";
pub const CLASS_ID: &str = "id_turma";
pub const CLASS_NAME: &str = "nome";
pub const CLASS_OWNER: &str = "id_professor";

pub const ACTIVITIES: &str = "atividades";
pub const ACTIVITY_ID: &str = "id_atividade";
pub const ACTIVITY_DESCRIPTION: &str = "descricao";
pub const ACTIVITY_CLASS: &str = "id_turma";

/// Identity columns per table, for stores that emulate the backend.
pub const IDENTITY_COLUMNS: [(&str, &str); 2] = [(CLASSES, CLASS_ID), (ACTIVITIES, ACTIVITY_ID)];
