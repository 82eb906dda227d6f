//! Contact and feedback submissions.
//!
//! The marketing site posts one JSON shape with a `type` discriminator.
//! [`SubmissionRequest::validate`] turns it into a typed [`Submission`] or a
//! Spanish validation message; a [`FeedbackStore`] persists the result.
//!
//! ERROR HANDLING
//! ==============
//! Validation failures are user-facing text. Storage failures are logged with
//! their cause and surface to the visitor only as a generic 500.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

pub const CONTACT_REQUIRED_MESSAGE: &str = "Nombre, email y mensaje son obligatorios";
pub const RATING_REQUIRED_MESSAGE: &str = "La calificación es obligatoria";
pub const RATING_RANGE_MESSAGE: &str = "La calificación debe estar entre 1 y 5";
pub const UNKNOWN_TYPE_MESSAGE: &str = "Tipo de envío no válido";
pub const INTERNAL_ERROR_MESSAGE: &str = "Error interno del servidor";

const CONTACT_SUCCESS_MESSAGE: &str = "Mensaje enviado correctamente";
const FEEDBACK_SUCCESS_MESSAGE: &str = "¡Gracias por tu opinión!";

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

// =============================================================================
// REQUEST SHAPE
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub contact_data: Option<ContactData>,
    pub feedback_data: Option<FeedbackData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactData {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
    pub company: Option<String>,
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackData {
    /// Kept loose: browsers send numbers or numeric strings.
    pub rating: Option<serde_json::Value>,
    pub comment: Option<String>,
    pub category: Option<String>,
    pub email: Option<String>,
}

// =============================================================================
// VALIDATED SHAPE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
    pub company: Option<String>,
    pub subject: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackEntry {
    pub rating: u8,
    pub comment: Option<String>,
    pub category: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Contact(ContactMessage),
    Feedback(FeedbackEntry),
}

impl Submission {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Contact(_) => "contact",
            Self::Feedback(_) => "feedback",
        }
    }

    #[must_use]
    pub fn success_message(&self) -> &'static str {
        match self {
            Self::Contact(_) => CONTACT_SUCCESS_MESSAGE,
            Self::Feedback(_) => FEEDBACK_SUCCESS_MESSAGE,
        }
    }
}

fn required(field: Option<&str>) -> Option<String> {
    field
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn optional(field: Option<String>) -> Option<String> {
    required(field.as_deref())
}

/// `Ok(None)` for an absent or zero rating, `Err` for anything else outside
/// the accepted range.
fn parse_rating(raw: Option<&serde_json::Value>) -> Result<Option<u8>, &'static str> {
    let number = match raw {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    let Some(number) = number else {
        return Err(RATING_RANGE_MESSAGE);
    };
    if number.abs() < f64::EPSILON {
        return Ok(None);
    }
    if number.fract().abs() > 0.0 || number < f64::from(MIN_RATING) || number > f64::from(MAX_RATING) {
        return Err(RATING_RANGE_MESSAGE);
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(Some(number as u8))
}

impl SubmissionRequest {
    /// Check required fields for the declared type.
    ///
    /// # Errors
    ///
    /// Returns the message to show the visitor.
    pub fn validate(self) -> Result<Submission, &'static str> {
        match self.kind.as_str() {
            "contact" => {
                let data = self.contact_data.unwrap_or_default();
                let (Some(name), Some(email), Some(message)) = (
                    required(data.name.as_deref()),
                    required(data.email.as_deref()),
                    required(data.message.as_deref()),
                ) else {
                    return Err(CONTACT_REQUIRED_MESSAGE);
                };
                Ok(Submission::Contact(ContactMessage {
                    name,
                    email,
                    message,
                    company: optional(data.company),
                    subject: optional(data.subject),
                }))
            }
            "feedback" => {
                let data = self.feedback_data.unwrap_or_default();
                let rating = parse_rating(data.rating.as_ref())?.ok_or(RATING_REQUIRED_MESSAGE)?;
                Ok(Submission::Feedback(FeedbackEntry {
                    rating,
                    comment: optional(data.comment),
                    category: optional(data.category),
                    email: optional(data.email),
                }))
            }
            _ => Err(UNKNOWN_TYPE_MESSAGE),
        }
    }
}

// =============================================================================
// STORAGE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Persist one validated submission. Returns the stored row id.
    async fn save(&self, visitor_id: &str, submission: &Submission) -> Result<Uuid, FeedbackError>;
}

pub struct PgFeedbackStore {
    pool: PgPool,
}

impl PgFeedbackStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedbackStore for PgFeedbackStore {
    async fn save(&self, visitor_id: &str, submission: &Submission) -> Result<Uuid, FeedbackError> {
        let id = Uuid::new_v4();
        match submission {
            Submission::Contact(c) => {
                sqlx::query(
                    "INSERT INTO contact_messages (id, visitor_id, name, email, message, company, subject) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7)",
                )
                .bind(id)
                .bind(visitor_id)
                .bind(&c.name)
                .bind(&c.email)
                .bind(&c.message)
                .bind(&c.company)
                .bind(&c.subject)
                .execute(&self.pool)
                .await?;
            }
            Submission::Feedback(f) => {
                sqlx::query(
                    "INSERT INTO feedback_entries (id, visitor_id, rating, comment, category, email) \
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(id)
                .bind(visitor_id)
                .bind(i16::from(f.rating))
                .bind(&f.comment)
                .bind(&f.category)
                .bind(&f.email)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(id)
    }
}

/// Used when no database is configured. Submissions are only logged.
#[derive(Default)]
pub struct LogOnlyFeedbackStore;

#[async_trait]
impl FeedbackStore for LogOnlyFeedbackStore {
    async fn save(&self, visitor_id: &str, submission: &Submission) -> Result<Uuid, FeedbackError> {
        let id = Uuid::new_v4();
        match submission {
            Submission::Contact(c) => {
                info!(%id, visitor = %visitor_id, email = %c.email, subject = ?c.subject, "contact message received (not persisted)");
            }
            Submission::Feedback(f) => {
                info!(%id, visitor = %visitor_id, rating = f.rating, category = ?f.category, "feedback received (not persisted)");
            }
        }
        Ok(id)
    }
}

#[cfg(test)]
#[path = "feedback_test.rs"]
mod tests;
