//! Service contracts for the engine's external collaborators.
//!
//! The core owns no UI and no storage: translation lookup, profile and
//! goal persistence, transcript storage and the weekly-reminder store
//! all live behind these traits. Port failures surface as chat
//! messages, never as corrupted in-memory state.

use crate::{ConversationMessage, KbjuGoals, ProfileSnapshot, ProfileUpdate};
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

/// A generic error type for all port operations.
///
/// Abstracts away the specific errors of external services (database,
/// network, platform bridge).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Translation-string lookup. The core passes only keys; rendering a
/// key into a localized string is entirely the caller's concern.
pub trait Translator: Send + Sync {
    /// Translate a key with `{name}` placeholders substituted
    fn translate_with(&self, key: &str, params: &[(&str, String)]) -> String;

    /// Translate a key with no parameters
    fn translate(&self, key: &str) -> String {
        self.translate_with(key, &[])
    }
}

/// A translator that echoes keys back, substituting parameters.
///
/// Useful in tests and as a fallback when no dictionary is wired up.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyTranslator;

impl Translator for KeyTranslator {
    fn translate_with(&self, key: &str, params: &[(&str, String)]) -> String {
        let mut out = key.to_string();
        for (name, value) in params {
            out = out.replace(&format!("{{{}}}", name), value);
        }
        out
    }
}

/// External profile persistence
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Snapshot of the stored profile, or None for a fresh user
    async fn fetch_profile(&self) -> PortResult<Option<ProfileSnapshot>>;

    /// Apply a partial update; `false` means the backend rejected it
    async fn update_profile(&self, update: ProfileUpdate) -> PortResult<bool>;

    /// Record a weight-history entry
    async fn add_weight(&self, weight_kg: f64, date: Option<NaiveDate>) -> PortResult<bool>;
}

/// External KBJU goal persistence
#[async_trait]
pub trait GoalsStore: Send + Sync {
    async fn update_goals(&self, goals: KbjuGoals) -> PortResult<bool>;
}

/// External chat transcript persistence
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create_conversation(&self, kind: &str) -> PortResult<Uuid>;

    async fn load_conversation(&self, id: Uuid) -> PortResult<Vec<ConversationMessage>>;

    async fn save_messages(
        &self,
        id: Uuid,
        messages: Vec<ConversationMessage>,
        title: &str,
    ) -> PortResult<()>;

    async fn delete_conversation(&self, id: Uuid) -> PortResult<()>;
}

/// Weekly dry-plan reminder store
#[async_trait]
pub trait ReminderSchedule: Send + Sync {
    /// Whether the weekly auto-update should fire now
    async fn is_reminder_due(&self) -> PortResult<bool>;

    /// Current dry-program week number (1-based)
    async fn week_number(&self) -> PortResult<u32>;

    /// Called after a dry plan is (re)generated
    async fn mark_updated(&self) -> PortResult<()>;

    /// Called when the dry program starts
    async fn activate(&self) -> PortResult<()>;
}
