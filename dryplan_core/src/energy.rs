//! Energy and body calculations.
//!
//! Pure functions implementing the Mifflin-St Jeor BMR formula,
//! maintenance (TDEE) and goal calorie targets with the calorie floor,
//! BMI classification, and macro-target derivation. Input-range
//! validation is the caller's job (the conversation guards do it).

use crate::{
    restriction, BmiCategory, Config, EnergyTarget, Gender, Goal, MacroRatios, MacroTargets,
};

/// Lower bound multiplier of the per-height normal weight range.
///
/// Slightly below the WHO 18.5 BMI threshold on purpose: the original
/// heuristic allows target weights a little under "normal".
const NORMAL_WEIGHT_LOW_BMI: f64 = 17.59;

/// Upper bound of the per-height normal weight range
const NORMAL_WEIGHT_HIGH_BMI: f64 = 24.9;

/// Basal metabolic rate (kcal/day), Mifflin-St Jeor
pub fn bmr(weight_kg: f64, height_cm: f64, age_years: u32, gender: Gender) -> f64 {
    let sex_term = if gender.is_female() { -161.0 } else { 5.0 };
    10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age_years) + sex_term
}

/// Maintenance calories: BMR scaled by the activity coefficient
pub fn maintenance_kcal(bmr: f64, activity_coefficient: f64) -> i32 {
    (bmr * activity_coefficient).round() as i32
}

/// Goal-adjusted daily calorie target.
///
/// Returns both the raw value and the floored one; callers inspect
/// [`EnergyTarget::was_floored`] to drive the risk warning.
pub fn goal_kcal(maintenance: i32, goal: Goal, week: u32, config: &Config) -> EnergyTarget {
    let coefficient = match goal {
        Goal::Loss => config.plan.loss_coefficient,
        Goal::Gain => config.plan.gain_coefficient,
        Goal::Dry => restriction::dry_coefficient(week, &config.dry),
    };

    let raw_kcal = (f64::from(maintenance) * coefficient).round() as i32;
    let kcal = raw_kcal.max(config.plan.calorie_floor);

    tracing::debug!(maintenance, ?goal, week, raw_kcal, kcal, "computed calorie target");
    EnergyTarget { raw_kcal, kcal }
}

/// Body mass index
pub fn bmi(weight_kg: f64, height_cm: f64) -> f64 {
    let height_m = height_cm / 100.0;
    weight_kg / (height_m * height_m)
}

/// Classify a BMI value into one of the 8 bands
pub fn bmi_category(bmi: f64) -> BmiCategory {
    if bmi < 16.0 {
        BmiCategory::SevereThinness
    } else if bmi < 17.0 {
        BmiCategory::ModerateThinness
    } else if bmi < 18.5 {
        BmiCategory::MildThinness
    } else if bmi < 25.0 {
        BmiCategory::Normal
    } else if bmi < 30.0 {
        BmiCategory::Overweight
    } else if bmi < 35.0 {
        BmiCategory::ObeseClass1
    } else if bmi < 40.0 {
        BmiCategory::ObeseClass2
    } else {
        BmiCategory::ObeseClass3
    }
}

/// Acceptable target-weight range (kg) for the given height
pub fn normal_weight_range(height_cm: f64) -> (f64, f64) {
    let height_m = height_cm / 100.0;
    let sq = height_m * height_m;
    (NORMAL_WEIGHT_LOW_BMI * sq, NORMAL_WEIGHT_HIGH_BMI * sq)
}

/// Macro split for the goal and (dry-only) week number
pub fn macro_ratios(goal: Goal, week: u32, config: &Config) -> MacroRatios {
    match goal {
        Goal::Gain => MacroRatios {
            protein: 0.30,
            fat: 0.25,
            carb: 0.45,
        },
        Goal::Dry if week > 1 => restriction::dry_macro_ratios(week, &config.dry),
        _ => MacroRatios {
            protein: 0.40,
            fat: 0.30,
            carb: 0.30,
        },
    }
}

/// Gram targets for a calorie budget and macro split.
///
/// Each gram value is the rounded kcal share over 4 kcal/g (protein,
/// carbs) or 9 kcal/g (fat).
pub fn macro_targets(kcal: i32, ratios: MacroRatios) -> MacroTargets {
    let kcal = f64::from(kcal);
    MacroTargets {
        protein_g: (kcal * ratios.protein / 4.0).round() as i32,
        fat_g: (kcal * ratios.fat / 9.0).round() as i32,
        carb_g: (kcal * ratios.carb / 4.0).round() as i32,
    }
}
