//! Progressive restriction schedule for the dry (cutting) goal.
//!
//! Week by week the calorie multiplier shrinks, protein displaces fat
//! in the macro split, and high-carb meals are banned from the pools.
//! All three move together on the same week number.

use crate::{DryConfig, MacroRatios, MealTemplate};

/// Fixed ordered elimination list for high-carb meal keys.
///
/// Keys are banned from the dry pools front-to-back, `bans_per_week`
/// per week beyond week 1.
pub const HIGH_CARB_BAN_ORDER: [&str; 12] = [
    "meal.dry.lunch.rice_veal",
    "meal.dry.dinner.pasta_turkey",
    "meal.dry.breakfast.banana_oatmeal",
    "meal.dry.snack.dried_fruit_mix",
    "meal.dry.lunch.potato_chicken",
    "meal.dry.breakfast.granola_yogurt",
    "meal.dry.snack.rice_cakes_honey",
    "meal.dry.dinner.buckwheat_liver",
    "meal.dry.breakfast.toast_avocado_egg",
    "meal.dry.snack.banana_cottage",
    "meal.dry.lunch.bulgur_beef",
    "meal.dry.dinner.couscous_cod",
];

/// Calorie multiplier for the given dry week (1-based)
///
/// Shrinks linearly from the base, floored at -25% of maintenance.
pub fn dry_coefficient(week: u32, config: &DryConfig) -> f64 {
    let week = week.max(1);
    let coeff = config.base_coefficient - config.weekly_step * f64::from(week - 1);
    coeff.max(config.coefficient_floor)
}

/// Macro split for the given dry week (1-based).
///
/// Protein rises to its cap, fat falls to its floor, carbs absorb the
/// remainder with their own floor. The three ratios are derived
/// together; clamping any one of them independently would break the
/// split.
pub fn dry_macro_ratios(week: u32, config: &DryConfig) -> MacroRatios {
    let week = week.max(1);
    let shift = f64::from(week - 1);

    let protein = (config.protein_base + config.protein_step * shift).min(config.protein_cap);
    let fat = (config.fat_base - config.fat_step * shift).max(config.fat_floor);
    let carb = (1.0 - protein - fat).max(config.carb_floor);

    MacroRatios { protein, fat, carb }
}

/// Set of high-carb meal keys banned for the given week
pub fn banned_keys(week: u32, config: &DryConfig) -> &'static [&'static str] {
    let week = week.max(1) as usize;
    let banned = ((week - 1) * config.bans_per_week).min(HIGH_CARB_BAN_ORDER.len());
    &HIGH_CARB_BAN_ORDER[..banned]
}

/// Filter a meal pool against the week's banned keys.
///
/// If filtering would leave fewer than `min_pool_survivors` meals, the
/// pool falls back to its first survivors-many unfiltered entries.
pub fn filter_pool<'a>(
    pool: &'a [MealTemplate],
    week: u32,
    config: &DryConfig,
) -> Vec<&'a MealTemplate> {
    let banned = banned_keys(week, config);

    let filtered: Vec<&MealTemplate> = pool
        .iter()
        .filter(|m| !banned.contains(&m.name_key.as_str()))
        .collect();

    if filtered.len() >= config.min_pool_survivors {
        filtered
    } else {
        tracing::debug!(
            week,
            survivors = filtered.len(),
            "pool filtered below the survivor floor, falling back to unfiltered head"
        );
        pool.iter().take(config.min_pool_survivors).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> DryConfig {
        DryConfig::default()
    }

    #[test]
    fn test_dry_coefficient_schedule() {
        let config = cfg();
        assert!((dry_coefficient(1, &config) - 0.8462).abs() < 1e-9);
        assert!((dry_coefficient(5, &config) - 0.7862).abs() < 1e-9);
        // Floor holds far into the program
        assert!((dry_coefficient(20, &config) - 0.75).abs() < 1e-9);
        assert!((dry_coefficient(100, &config) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_dry_coefficient_week_zero_treated_as_one() {
        let config = cfg();
        assert_eq!(dry_coefficient(0, &config), dry_coefficient(1, &config));
    }

    #[test]
    fn test_dry_macro_ratios_week_one() {
        let r = dry_macro_ratios(1, &cfg());
        assert!((r.protein - 0.40).abs() < 1e-9);
        assert!((r.fat - 0.30).abs() < 1e-9);
        assert!((r.carb - 0.30).abs() < 1e-9);
    }

    #[test]
    fn test_dry_macro_ratios_week_five() {
        let r = dry_macro_ratios(5, &cfg());
        assert!((r.protein - 0.50).abs() < 1e-9, "protein capped at 0.50");
        assert!((r.fat - 0.24).abs() < 1e-9);
        assert!((r.carb - 0.26).abs() < 1e-9);
    }

    #[test]
    fn test_dry_macro_ratios_sum_near_one_until_carb_floor() {
        let config = cfg();
        for week in 1..=12 {
            let r = dry_macro_ratios(week, &config);
            let sum = r.protein + r.fat + r.carb;
            assert!(
                (sum - 1.0).abs() < 1e-9 || r.carb == config.carb_floor,
                "week {}: sum {} carb {}",
                week,
                sum,
                r.carb
            );
            assert!(r.carb >= config.carb_floor - 1e-9);
        }
    }

    #[test]
    fn test_banned_keys_grow_four_per_week() {
        let config = cfg();
        assert!(banned_keys(1, &config).is_empty());
        assert_eq!(banned_keys(2, &config).len(), 4);
        assert_eq!(banned_keys(3, &config).len(), 8);
        // Capped at the list length
        assert_eq!(banned_keys(10, &config).len(), HIGH_CARB_BAN_ORDER.len());
    }

    #[test]
    fn test_filter_pool_removes_banned_meals() {
        let config = cfg();
        let pool = vec![
            MealTemplate::new("meal.dry.lunch.rice_veal", 30, 8, 60, 432),
            MealTemplate::new("meal.dry.lunch.chicken_salad", 35, 12, 10, 288),
            MealTemplate::new("meal.dry.lunch.potato_chicken", 32, 9, 50, 409),
            MealTemplate::new("meal.dry.lunch.cod_vegetables", 34, 7, 12, 247),
        ];

        // Week 1: nothing banned
        assert_eq!(filter_pool(&pool, 1, &config).len(), 4);

        // Week 2 bans the first four keys of the order; of this pool
        // that is only rice_veal (potato_chicken is 5th, banned later)
        let filtered = filter_pool(&pool, 2, &config);
        let keys: Vec<&str> = filtered.iter().map(|m| m.name_key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "meal.dry.lunch.chicken_salad",
                "meal.dry.lunch.potato_chicken",
                "meal.dry.lunch.cod_vegetables",
            ]
        );

        // Week 3 extends the bans to the first eight keys, reaching
        // potato_chicken
        let filtered = filter_pool(&pool, 3, &config);
        let keys: Vec<&str> = filtered.iter().map(|m| m.name_key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["meal.dry.lunch.chicken_salad", "meal.dry.lunch.cod_vegetables"]
        );
    }

    #[test]
    fn test_filter_pool_falls_back_to_unfiltered_head() {
        let config = cfg();
        let pool = vec![
            MealTemplate::new("meal.dry.lunch.rice_veal", 30, 8, 60, 432),
            MealTemplate::new("meal.dry.lunch.potato_chicken", 32, 9, 50, 409),
        ];

        // Week 2 would empty the pool entirely; the first 2 unfiltered
        // entries survive instead.
        let filtered = filter_pool(&pool, 2, &config);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].name_key, "meal.dry.lunch.rice_veal");
    }
}
