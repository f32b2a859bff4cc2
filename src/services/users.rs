use crate::{
    auth::AuthService,
    config::AppConfig,
    entities::{user, User, UserModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// User service: registration and credential checks.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    auth_service: Arc<AuthService>,
    config: Arc<AppConfig>,
}

impl UserService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        auth_service: Arc<AuthService>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            auth_service,
            config,
        }
    }

    /// Registers a new user. The email must be unique; a duplicate is
    /// rejected with `Conflict` both by a pre-check and by the database
    /// constraint backstop (the pre-check alone would race).
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<UserModel, ServiceError> {
        let existing = User::find()
            .filter(user::Column::Email.eq(input.email.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Email {} is already registered",
                input.email
            )));
        }

        let password_hash = self
            .auth_service
            .hash_password(&input.password)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        let user_id = Uuid::new_v4();
        let user = user::ActiveModel {
            id: Set(user_id),
            name: Set(input.name),
            email: Set(input.email.clone()),
            phone: Set(self.normalize_phone(&input.phone)),
            password_hash: Set(password_hash),
            gender: Set(input.gender),
            age: Set(input.age),
            profession: Set(input.profession),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };

        let user = match user.insert(&*self.db).await {
            Ok(user) => user,
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(ServiceError::Conflict(format!(
                    "Email {} is already registered",
                    input.email
                )));
            }
            Err(err) => return Err(err.into()),
        };

        self.event_sender
            .send_or_log(Event::UserRegistered(user_id))
            .await;

        info!("Registered user: {}", user_id);
        Ok(user)
    }

    /// Checks credentials and returns the user. Unknown email and wrong
    /// password produce the same error so accounts cannot be enumerated.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserModel, ServiceError> {
        let user = User::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Invalid credentials".to_string()))?;

        let valid = self
            .auth_service
            .verify_password(password, &user.password_hash)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        if !valid {
            return Err(ServiceError::Unauthorized("Invalid credentials".to_string()));
        }

        Ok(user)
    }

    /// Retrieves a user by id.
    pub async fn get_user(&self, user_id: Uuid) -> Result<UserModel, ServiceError> {
        User::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }

    /// Stores phone numbers with the configured dialing prefix. Numbers
    /// that already carry it are left alone.
    fn normalize_phone(&self, phone: &str) -> String {
        let prefix = &self.config.phone_prefix;
        let trimmed = phone.trim();
        if trimmed.starts_with(prefix.as_str()) {
            trimmed.to_string()
        } else {
            format!("{}{}", prefix, trimmed)
        }
    }
}

/// Input for registering a user
#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub gender: String,
    pub age: i32,
    pub profession: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthConfig;
    use std::time::Duration;

    fn service() -> UserService {
        let config = Arc::new(AppConfig::new(
            "sqlite::memory:".to_string(),
            "a_test_secret_that_is_at_least_32_chars!".to_string(),
            3600,
            "127.0.0.1".to_string(),
            8080,
            "test".to_string(),
        ));
        let auth = Arc::new(AuthService::new(AuthConfig::new(
            config.jwt_secret.clone(),
            Duration::from_secs(3600),
        )));
        let (tx, _rx) = tokio::sync::mpsc::channel(1);
        UserService::new(
            Arc::new(DatabaseConnection::default()),
            Arc::new(crate::events::EventSender::new(tx)),
            auth,
            config,
        )
    }

    #[test]
    fn phone_prefix_is_applied() {
        let svc = service();
        assert_eq!(svc.normalize_phone("5551234567"), "+91-5551234567");
        assert_eq!(svc.normalize_phone("  5551234567 "), "+91-5551234567");
    }

    #[test]
    fn phone_prefix_is_not_doubled() {
        let svc = service();
        assert_eq!(svc.normalize_phone("+91-5551234567"), "+91-5551234567");
    }
}
