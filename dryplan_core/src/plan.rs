//! Weekly meal plan generation.
//!
//! The day's calorie budget is split across the four slots
//! (breakfast/lunch/dinner take their configured shares, the snack
//! absorbs the remainder so the slots always sum exactly to the goal),
//! and each slot is filled round-robin from its pool so the same
//! inputs always produce the same week.

use crate::{
    restriction, Config, DayPlan, DayTotals, Goal, MealCatalog, MealSlot, MealTemplate,
    PlanConfig, ScaledMeal,
};

/// Translation keys for the seven weekdays, Monday first
pub const WEEKDAY_KEYS: [&str; 7] = [
    "weekday.monday",
    "weekday.tuesday",
    "weekday.wednesday",
    "weekday.thursday",
    "weekday.friday",
    "weekday.saturday",
    "weekday.sunday",
];

/// Per-slot calorie budgets for one day
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotBudgets {
    pub breakfast: i32,
    pub lunch: i32,
    pub dinner: i32,
    pub snack: i32,
}

impl SlotBudgets {
    pub fn for_slot(self, slot: MealSlot) -> i32 {
        match slot {
            MealSlot::Breakfast => self.breakfast,
            MealSlot::Lunch => self.lunch,
            MealSlot::Dinner => self.dinner,
            MealSlot::Snack => self.snack,
        }
    }
}

/// Split a daily calorie budget across the four slots.
///
/// The snack takes the remainder rather than a fixed share, absorbing
/// all rounding drift so the four budgets sum exactly to `goal_kcal`.
pub fn slot_budgets(goal_kcal: i32, config: &PlanConfig) -> SlotBudgets {
    let kcal = f64::from(goal_kcal);
    let breakfast = (kcal * config.breakfast_share).round() as i32;
    let lunch = (kcal * config.lunch_share).round() as i32;
    let dinner = (kcal * config.dinner_share).round() as i32;
    let snack = goal_kcal - breakfast - lunch - dinner;

    SlotBudgets {
        breakfast,
        lunch,
        dinner,
        snack,
    }
}

/// Scale a baseline template to a slot's calorie budget.
///
/// Macros are scaled and rounded first; the meal's kcal is then
/// recomputed from the rounded macros (p*4 + f*9 + c*4) so displayed
/// totals always match displayed macros. A template with no calories
/// contributes a zero meal rather than a division by zero.
pub fn scale_meal_to_slot(template: &MealTemplate, slot: MealSlot, target_kcal: i32) -> ScaledMeal {
    if template.kcal <= 0 {
        return ScaledMeal {
            slot,
            name_key: template.name_key.clone(),
            protein_g: 0,
            fat_g: 0,
            carb_g: 0,
            kcal: 0,
        };
    }

    let factor = f64::from(target_kcal) / f64::from(template.kcal);
    let protein_g = (f64::from(template.protein_g) * factor).round() as i32;
    let fat_g = (f64::from(template.fat_g) * factor).round() as i32;
    let carb_g = (f64::from(template.carb_g) * factor).round() as i32;

    ScaledMeal {
        slot,
        name_key: template.name_key.clone(),
        protein_g,
        fat_g,
        carb_g,
        kcal: protein_g * 4 + fat_g * 9 + carb_g * 4,
    }
}

/// Generate the 7-day plan for a goal, week number and calorie budget.
///
/// Selection is `pool[day % pool.len()]` per slot - deterministic, not
/// random, so a regeneration from the same inputs reproduces the week.
/// The dry goal filters each pool through the week's high-carb bans
/// first.
pub fn generate_week(
    goal: Goal,
    week: u32,
    goal_kcal: i32,
    catalog: &MealCatalog,
    config: &Config,
) -> Vec<DayPlan> {
    let budgets = slot_budgets(goal_kcal, &config.plan);
    tracing::debug!(?goal, week, goal_kcal, ?budgets, "generating weekly plan");

    let mut week_plan = Vec::with_capacity(WEEKDAY_KEYS.len());

    for (day_index, day_key) in WEEKDAY_KEYS.iter().enumerate() {
        let mut day = DayPlan {
            day_key: (*day_key).to_string(),
            meals: Vec::with_capacity(MealSlot::ALL.len()),
            totals: DayTotals::default(),
        };

        for slot in MealSlot::ALL {
            let pool = catalog.pool(goal, slot);
            let selected: Vec<&MealTemplate> = if goal == Goal::Dry {
                restriction::filter_pool(pool, week, &config.dry)
            } else {
                pool.iter().collect()
            };

            if selected.is_empty() {
                tracing::warn!(?goal, ?slot, "empty meal pool, skipping slot");
                continue;
            }

            let template = selected[day_index % selected.len()];
            day.meals
                .push(scale_meal_to_slot(template, slot, budgets.for_slot(slot)));
        }

        day.recompute_totals();
        week_plan.push(day);
    }

    week_plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::build_default_catalog;

    #[test]
    fn test_slot_budgets_sum_exactly() {
        let config = PlanConfig::default();
        for goal_kcal in [1200, 1643, 1692, 1979, 2370, 1999, 2001] {
            let b = slot_budgets(goal_kcal, &config);
            assert_eq!(
                b.breakfast + b.lunch + b.dinner + b.snack,
                goal_kcal,
                "slots must sum exactly for {}",
                goal_kcal
            );
        }
    }

    #[test]
    fn test_slot_budget_shares() {
        let b = slot_budgets(2000, &PlanConfig::default());
        assert_eq!(b.breakfast, 500);
        assert_eq!(b.lunch, 700);
        assert_eq!(b.dinner, 600);
        assert_eq!(b.snack, 200);
    }

    #[test]
    fn test_scale_identity_factor() {
        let template = MealTemplate::new("meal.loss.breakfast.oatmeal_berries", 12, 8, 45, 300);
        let scaled = scale_meal_to_slot(&template, MealSlot::Breakfast, 300);

        // Macros unchanged at factor 1
        assert_eq!(scaled.protein_g, 12);
        assert_eq!(scaled.fat_g, 8);
        assert_eq!(scaled.carb_g, 45);
        // kcal recomputed from macros, which here equals the template
        assert_eq!(scaled.kcal, 12 * 4 + 8 * 9 + 45 * 4);
    }

    #[test]
    fn test_scale_recomputes_kcal_from_rounded_macros() {
        let template = MealTemplate::new("meal.loss.lunch.chicken_buckwheat", 35, 10, 40, 390);
        let scaled = scale_meal_to_slot(&template, MealSlot::Lunch, 575);

        assert_eq!(
            scaled.kcal,
            scaled.protein_g * 4 + scaled.fat_g * 9 + scaled.carb_g * 4
        );
        // Close to the target, within macro-rounding drift
        assert!((scaled.kcal - 575).abs() <= 15);
    }

    #[test]
    fn test_scale_zero_template_yields_zero_meal() {
        let template = MealTemplate::new("meal.broken", 10, 10, 10, 0);
        let scaled = scale_meal_to_slot(&template, MealSlot::Snack, 200);
        assert_eq!(scaled.kcal, 0);
        assert_eq!(scaled.protein_g, 0);
        assert_eq!(scaled.fat_g, 0);
        assert_eq!(scaled.carb_g, 0);
    }

    #[test]
    fn test_week_has_seven_days_of_four_meals() {
        let catalog = build_default_catalog();
        let config = Config::default();
        let week = generate_week(Goal::Loss, 1, 1650, &catalog, &config);

        assert_eq!(week.len(), 7);
        for day in &week {
            assert_eq!(day.meals.len(), 4);
        }
        assert_eq!(week[0].day_key, "weekday.monday");
        assert_eq!(week[6].day_key, "weekday.sunday");
    }

    #[test]
    fn test_day_totals_are_exact_sums() {
        let catalog = build_default_catalog();
        let config = Config::default();
        let week = generate_week(Goal::Dry, 3, 1500, &catalog, &config);

        for day in &week {
            let kcal: i32 = day.meals.iter().map(|m| m.kcal).sum();
            assert_eq!(day.totals.kcal, kcal, "{}", day.day_key);
            let protein: i32 = day.meals.iter().map(|m| m.protein_g).sum();
            assert_eq!(day.totals.protein_g, protein);
        }
    }

    #[test]
    fn test_generation_is_reproducible() {
        let catalog = build_default_catalog();
        let config = Config::default();
        let first = generate_week(Goal::Dry, 2, 1600, &catalog, &config);
        let second = generate_week(Goal::Dry, 2, 1600, &catalog, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn test_round_robin_cycles_the_pool() {
        let catalog = build_default_catalog();
        let config = Config::default();
        let week = generate_week(Goal::Loss, 1, 1650, &catalog, &config);

        // Loss breakfast pool has 4 entries, so day 5 repeats day 1
        assert_eq!(week[0].meals[0].name_key, week[4].meals[0].name_key);
        assert_ne!(week[0].meals[0].name_key, week[1].meals[0].name_key);
    }

    #[test]
    fn test_dry_late_week_drops_high_carb_meals() {
        let catalog = build_default_catalog();
        let config = Config::default();
        let week = generate_week(Goal::Dry, 4, 1400, &catalog, &config);

        for day in &week {
            for meal in &day.meals {
                assert!(
                    !crate::restriction::HIGH_CARB_BAN_ORDER.contains(&meal.name_key.as_str()),
                    "banned meal {} appeared in week 4",
                    meal.name_key
                );
            }
        }
    }
}
