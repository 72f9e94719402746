#![forbid(unsafe_code)]

//! Core domain model and business logic for the dry-plan nutrition
//! assistant.
//!
//! This crate provides:
//! - Domain types (profiles, meals, plans, targets, messages)
//! - Energy and BMI calculators
//! - The progressive "dry" restriction schedule
//! - The meal catalog and weekly plan generator
//! - Dietary-exclusion correction
//! - Content moderation and the topic Q&A matcher
//! - The conversation state machine and the async chat session

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod energy;
pub mod restriction;
pub mod plan;
pub mod correction;
pub mod moderation;
pub mod topics;
pub mod ports;
pub mod conversation;
pub mod session;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog, MealCatalog};
pub use config::{Config, DryConfig, PlanConfig, SessionConfig};
pub use energy::{bmi, bmi_category, bmr, goal_kcal, maintenance_kcal, normal_weight_range};
pub use plan::generate_week;
pub use ports::{
    ConversationStore, GoalsStore, KeyTranslator, PortError, PortResult, ProfileStore,
    ReminderSchedule, Translator,
};
pub use conversation::{Conversation, Effect, ReplyDelay, Step, StepOutcome, Turn};
pub use session::ChatSession;
