use crate::{
    entities::{contact, ContactModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Contact form service. Submissions are stored as-is; repeated messages
/// from the same address are allowed.
#[derive(Clone)]
pub struct ContactService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ContactService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Stores a contact message.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn submit(&self, input: ContactInput) -> Result<ContactModel, ServiceError> {
        let contact_id = Uuid::new_v4();
        let message = contact::ActiveModel {
            id: Set(contact_id),
            name: Set(input.name),
            email: Set(input.email),
            message: Set(input.message),
            created_at: Set(Utc::now()),
        };

        let message = message.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ContactReceived(contact_id))
            .await;

        info!("Received contact message: {}", contact_id);
        Ok(message)
    }
}

/// Contact form input
#[derive(Debug, Deserialize)]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    pub message: String,
}
