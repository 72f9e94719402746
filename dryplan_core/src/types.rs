//! Core domain types for the dry-plan nutrition engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Profile data collected by the conversation (draft and snapshot)
//! - Meal templates, scaled meals and day plans
//! - Energy/macro targets
//! - Conversation messages and analysis report sections

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Profile Types
// ============================================================================

/// Biological sex used by the Mifflin-St Jeor formula
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn is_female(self) -> bool {
        self == Gender::Female
    }
}

/// Physical activity level with its fixed TDEE coefficient
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Low,
    Light,
    Moderate,
    High,
    VeryHigh,
    Extreme,
}

impl ActivityLevel {
    pub const ALL: [ActivityLevel; 7] = [
        ActivityLevel::Sedentary,
        ActivityLevel::Low,
        ActivityLevel::Light,
        ActivityLevel::Moderate,
        ActivityLevel::High,
        ActivityLevel::VeryHigh,
        ActivityLevel::Extreme,
    ];

    /// TDEE multiplier for this activity level
    pub fn coefficient(self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Low => 1.375,
            ActivityLevel::Light => 1.46,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::High => 1.64,
            ActivityLevel::VeryHigh => 1.72,
            ActivityLevel::Extreme => 1.9,
        }
    }

    /// Translation key for the level's display name
    pub fn name_key(self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "activity.sedentary",
            ActivityLevel::Low => "activity.low",
            ActivityLevel::Light => "activity.light",
            ActivityLevel::Moderate => "activity.moderate",
            ActivityLevel::High => "activity.high",
            ActivityLevel::VeryHigh => "activity.very_high",
            ActivityLevel::Extreme => "activity.extreme",
        }
    }
}

/// Nutrition goal selected by the user
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    /// Weight loss
    Loss,
    /// Muscle gain
    Gain,
    /// Progressive cutting ("dry") program with weekly tightening
    Dry,
}

/// Profile data collected incrementally by the conversation.
///
/// Created empty at conversation start, populated either from an
/// external profile snapshot or one field at a time, and discarded once
/// the plan and analysis are generated.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileDraft {
    pub gender: Option<Gender>,
    pub age: Option<u32>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub activity: Option<ActivityLevel>,
    pub goal: Option<Goal>,
    pub target_weight_kg: Option<f64>,
}

impl ProfileDraft {
    /// True when every field required for plan generation is present
    /// (target weight stays optional).
    pub fn is_complete(&self) -> bool {
        self.gender.is_some()
            && self.age.is_some()
            && self.height_cm.is_some()
            && self.weight_kg.is_some()
            && self.activity.is_some()
            && self.goal.is_some()
    }

    /// Wholesale reset back to an empty draft
    pub fn reset(&mut self) {
        *self = ProfileDraft::default();
    }
}

/// Read-only snapshot of the externally stored profile
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub gender: Option<Gender>,
    pub birthdate: Option<NaiveDate>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub target_weight_kg: Option<f64>,
}

impl ProfileSnapshot {
    /// Whether the snapshot carries enough data to pre-fill the draft
    pub fn is_fillable(&self) -> bool {
        self.gender.is_some()
            && self.birthdate.is_some()
            && self.height_cm.is_some()
            && self.weight_kg.is_some()
    }

    /// Age in whole years as of today
    pub fn age_years(&self) -> Option<u32> {
        let birth = self.birthdate?;
        let today = Utc::now().date_naive();
        let mut age = today.year() - birth.year();
        if (today.month(), today.day()) < (birth.month(), birth.day()) {
            age -= 1;
        }
        u32::try_from(age).ok()
    }
}

/// Partial profile update sent to the external profile store
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileUpdate {
    pub gender: Option<Gender>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub target_weight_kg: Option<f64>,
}

// ============================================================================
// Energy and Macro Types
// ============================================================================

/// Daily calorie target before and after the calorie floor
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnergyTarget {
    /// Goal-adjusted kcal before flooring
    pub raw_kcal: i32,
    /// Final kcal, never below the configured floor
    pub kcal: i32,
}

impl EnergyTarget {
    /// Whether the calorie floor kicked in (drives a risk warning)
    pub fn was_floored(self) -> bool {
        self.kcal > self.raw_kcal
    }
}

/// Macro distribution as fractions of the calorie budget
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MacroRatios {
    pub protein: f64,
    pub fat: f64,
    pub carb: f64,
}

/// Daily macro targets in grams
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MacroTargets {
    pub protein_g: i32,
    pub fat_g: i32,
    pub carb_g: i32,
}

/// Calories/protein/fats/carbs goal bundle applied to the tracker
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct KbjuGoals {
    pub calories: i32,
    pub protein: i32,
    pub fats: i32,
    pub carbs: i32,
}

/// BMI classification bands
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
    SevereThinness,
    ModerateThinness,
    MildThinness,
    Normal,
    Overweight,
    ObeseClass1,
    ObeseClass2,
    ObeseClass3,
}

impl BmiCategory {
    pub fn name_key(self) -> &'static str {
        match self {
            BmiCategory::SevereThinness => "bmi.severe_thinness",
            BmiCategory::ModerateThinness => "bmi.moderate_thinness",
            BmiCategory::MildThinness => "bmi.mild_thinness",
            BmiCategory::Normal => "bmi.normal",
            BmiCategory::Overweight => "bmi.overweight",
            BmiCategory::ObeseClass1 => "bmi.obese_1",
            BmiCategory::ObeseClass2 => "bmi.obese_2",
            BmiCategory::ObeseClass3 => "bmi.obese_3",
        }
    }
}

// ============================================================================
// Meal Types
// ============================================================================

/// One of the four daily meal occasions
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealSlot {
    pub const ALL: [MealSlot; 4] = [
        MealSlot::Breakfast,
        MealSlot::Lunch,
        MealSlot::Dinner,
        MealSlot::Snack,
    ];

    pub fn name_key(self) -> &'static str {
        match self {
            MealSlot::Breakfast => "slot.breakfast",
            MealSlot::Lunch => "slot.lunch",
            MealSlot::Dinner => "slot.dinner",
            MealSlot::Snack => "slot.snack",
        }
    }
}

/// Immutable baseline meal at 100% budget, grouped by goal and slot
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MealTemplate {
    pub name_key: String,
    pub protein_g: i32,
    pub fat_g: i32,
    pub carb_g: i32,
    pub kcal: i32,
}

impl MealTemplate {
    pub fn new(name_key: &str, protein_g: i32, fat_g: i32, carb_g: i32, kcal: i32) -> Self {
        Self {
            name_key: name_key.to_string(),
            protein_g,
            fat_g,
            carb_g,
            kcal,
        }
    }
}

/// A meal scaled to a slot's calorie budget.
///
/// `kcal` is always recomputed from the rounded macros (`p*4 + f*9 + c*4`)
/// so displayed totals match displayed macros.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScaledMeal {
    pub slot: MealSlot,
    pub name_key: String,
    pub protein_g: i32,
    pub fat_g: i32,
    pub carb_g: i32,
    pub kcal: i32,
}

/// Sum of the four scaled meals of a day
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayTotals {
    pub kcal: i32,
    pub protein_g: i32,
    pub fat_g: i32,
    pub carb_g: i32,
}

/// One day of the weekly plan
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DayPlan {
    pub day_key: String,
    pub meals: Vec<ScaledMeal>,
    pub totals: DayTotals,
}

impl DayPlan {
    /// Recompute totals from the current meals
    pub fn recompute_totals(&mut self) {
        let mut totals = DayTotals::default();
        for meal in &self.meals {
            totals.kcal += meal.kcal;
            totals.protein_g += meal.protein_g;
            totals.fat_g += meal.fat_g;
            totals.carb_g += meal.carb_g;
        }
        self.totals = totals;
    }
}

/// Excludable food group detected from free text
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionCategory {
    Fish,
    Meat,
    Dairy,
    Eggs,
}

impl ExclusionCategory {
    pub const ALL: [ExclusionCategory; 4] = [
        ExclusionCategory::Fish,
        ExclusionCategory::Meat,
        ExclusionCategory::Dairy,
        ExclusionCategory::Eggs,
    ];
}

// ============================================================================
// Report and Message Types
// ============================================================================

/// Read-only report entry (status, calories, risks, recommendations)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnalysisSection {
    pub icon: String,
    pub title: String,
    pub lines: Vec<String>,
}

/// A selectable quick-reply option attached to a message
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MessageOption {
    pub value: String,
    pub label: String,
}

/// One entry of the append-only conversation transcript
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ConversationMessage {
    pub is_user: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<MessageOption>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Vec<AnalysisSection>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meal_plan: Option<Vec<DayPlan>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apply_kbju: Option<KbjuGoals>,
    #[serde(default)]
    pub applied: bool,
}

impl ConversationMessage {
    /// Plain assistant text message
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            is_user: false,
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Plain user text message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            is_user: true,
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Assistant message with quick-reply options
    pub fn bot_with_options(text: impl Into<String>, options: Vec<MessageOption>) -> Self {
        Self {
            is_user: false,
            text: Some(text.into()),
            options: Some(options),
            ..Self::default()
        }
    }
}
