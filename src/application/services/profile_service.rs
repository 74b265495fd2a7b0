//! ProfileService - auth account plus teacher profile row.
//!
//! A session is only complete once the profile row in `professores` has been
//! resolved: the display name lives there, the email comes from the auth
//! account.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::decode_row;
use super::tables::{PROFESSORS, PROFESSOR_ID, PROFESSOR_NAME};
use crate::domain::foundation::{
    AuthError, AuthenticatedUser, DomainError, UserId, ValidationError,
};
use crate::domain::session::{LoginForm, RegistrationForm, Session};
use crate::ports::{AuthBackend, SelectQuery, TableStore, DISPLAY_NAME_METADATA_KEY};

/// Failure of an account operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccountError {
    #[error("Invalid form: {0}")]
    Validation(#[from] ValidationError),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Profile request failed: {0}")]
    Profile(#[from] DomainError),

    #[error("No profile for user {0}")]
    ProfileMissing(UserId),
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    nome: String,
}

/// Sign-in, sign-up and profile resolution.
#[derive(Clone)]
pub struct ProfileService {
    auth: Arc<dyn AuthBackend>,
    tables: Arc<dyn TableStore>,
}

impl ProfileService {
    pub fn new(auth: Arc<dyn AuthBackend>, tables: Arc<dyn TableStore>) -> Self {
        Self { auth, tables }
    }

    pub fn auth(&self) -> &Arc<dyn AuthBackend> {
        &self.auth
    }

    pub async fn login(&self, form: &LoginForm) -> Result<Session, AccountError> {
        form.validate()?;
        let user = self
            .auth
            .sign_in_with_password(form.email.trim(), &form.password)
            .await?;
        self.session_for(&user).await
    }

    /// Creates the auth account, then the profile row.
    pub async fn register(&self, form: &RegistrationForm) -> Result<Session, AccountError> {
        form.validate()?;
        let name = form.name.trim();
        let email = form.email.trim();

        let mut metadata = Map::new();
        metadata.insert(DISPLAY_NAME_METADATA_KEY.to_string(), Value::from(name));
        let user = self.auth.sign_up(email, &form.password, metadata).await?;

        let mut profile = Map::new();
        profile.insert(PROFESSOR_ID.to_string(), Value::from(user.id.as_str()));
        profile.insert(PROFESSOR_NAME.to_string(), Value::from(name));
        self.tables
            .insert(PROFESSORS, profile)
            .await
            .map_err(DomainError::from)?;

        Ok(Session::new(user.id, name, user.email))
    }

    pub async fn logout(&self) -> Result<(), AccountError> {
        self.auth.sign_out().await?;
        Ok(())
    }

    /// Session of a still-valid backend session, if any.
    pub async fn current_session(&self) -> Result<Option<Session>, AccountError> {
        match self.auth.current_session().await? {
            Some(user) => self.session_for(&user).await.map(Some),
            None => Ok(None),
        }
    }

    /// Resolves the profile row of an authenticated user.
    pub async fn session_for(&self, user: &AuthenticatedUser) -> Result<Session, AccountError> {
        let query = SelectQuery::from(PROFESSORS)
            .columns(&[PROFESSOR_NAME])
            .eq(PROFESSOR_ID, user.id.as_str())
            .limit(1);

        let row = self
            .tables
            .select(&query)
            .await
            .map_err(DomainError::from)?
            .into_iter()
            .next()
            .ok_or_else(|| AccountError::ProfileMissing(user.id.clone()))?;

        let profile: ProfileRow = decode_row(PROFESSORS, row)?;
        Ok(Session::new(user.id.clone(), profile.nome, user.email.clone()))
    }
}
