//! Default catalog of meal templates.
//!
//! Three goal-keyed pools (loss/gain/dry) by four slots, each with at
//! least four baseline templates, plus the fixed substitute used when a
//! dietary exclusion knocks a meal out of a plan. Substitute templates
//! are plant-based so a substitution never reintroduces another
//! excludable category.

use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<MealCatalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static MealCatalog {
    &DEFAULT_CATALOG
}

/// The complete catalog of meal pools and exclusion substitutes
#[derive(Clone, Debug)]
pub struct MealCatalog {
    pools: HashMap<(Goal, MealSlot), Vec<MealTemplate>>,
    substitutes: HashMap<(ExclusionCategory, MealSlot), MealTemplate>,
}

impl MealCatalog {
    /// Baseline pool for a goal and slot; empty slice if missing
    pub fn pool(&self, goal: Goal, slot: MealSlot) -> &[MealTemplate] {
        self.pools
            .get(&(goal, slot))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Fixed substitute template for an excluded category in a slot
    pub fn substitute(&self, category: ExclusionCategory, slot: MealSlot) -> Option<&MealTemplate> {
        self.substitutes.get(&(category, slot))
    }

    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for goal in [Goal::Loss, Goal::Gain, Goal::Dry] {
            for slot in MealSlot::ALL {
                let pool = self.pool(goal, slot);
                if pool.len() < 4 {
                    errors.push(format!(
                        "Pool {:?}/{:?} has {} templates, need at least 4",
                        goal,
                        slot,
                        pool.len()
                    ));
                }
                for meal in pool {
                    if meal.name_key.is_empty() {
                        errors.push(format!("Pool {:?}/{:?} has a template with an empty key", goal, slot));
                    }
                    if meal.kcal <= 0 {
                        errors.push(format!(
                            "Template '{}' has non-positive kcal {}",
                            meal.name_key, meal.kcal
                        ));
                    }
                    if meal.protein_g < 0 || meal.fat_g < 0 || meal.carb_g < 0 {
                        errors.push(format!("Template '{}' has a negative macro", meal.name_key));
                    }
                }
            }
        }

        for category in ExclusionCategory::ALL {
            for slot in MealSlot::ALL {
                match self.substitute(category, slot) {
                    None => errors.push(format!(
                        "Missing substitute for {:?} in {:?}",
                        category, slot
                    )),
                    Some(meal) if meal.kcal <= 0 => errors.push(format!(
                        "Substitute '{}' has non-positive kcal",
                        meal.name_key
                    )),
                    Some(_) => {}
                }
            }
        }

        errors
    }

    /// `validate` as a hard failure for startup paths
    pub fn ensure_valid(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::CatalogValidation(errors.join("; ")))
        }
    }
}

fn meal(name_key: &str, protein_g: i32, fat_g: i32, carb_g: i32, kcal: i32) -> MealTemplate {
    MealTemplate::new(name_key, protein_g, fat_g, carb_g, kcal)
}

/// Builds the default catalog with the built-in meal pools
pub fn build_default_catalog() -> MealCatalog {
    let mut pools: HashMap<(Goal, MealSlot), Vec<MealTemplate>> = HashMap::new();
    let mut substitutes: HashMap<(ExclusionCategory, MealSlot), MealTemplate> = HashMap::new();

    // ========================================================================
    // Loss pools
    // ========================================================================

    pools.insert(
        (Goal::Loss, MealSlot::Breakfast),
        vec![
            meal("meal.loss.breakfast.oatmeal_berries", 12, 8, 45, 300),
            meal("meal.loss.breakfast.omelet_vegetables", 20, 15, 6, 239),
            meal("meal.loss.breakfast.cottage_cheese_pear", 22, 5, 20, 213),
            meal("meal.loss.breakfast.buckwheat_milk", 14, 7, 40, 279),
        ],
    );
    pools.insert(
        (Goal::Loss, MealSlot::Lunch),
        vec![
            meal("meal.loss.lunch.chicken_buckwheat", 35, 10, 40, 390),
            meal("meal.loss.lunch.cod_rice_vegetables", 32, 6, 45, 362),
            meal("meal.loss.lunch.turkey_lentil_soup", 30, 8, 35, 332),
            meal("meal.loss.lunch.beef_vegetable_stew", 33, 12, 25, 340),
        ],
    );
    pools.insert(
        (Goal::Loss, MealSlot::Dinner),
        vec![
            meal("meal.loss.dinner.baked_fish_salad", 30, 9, 12, 249),
            meal("meal.loss.dinner.chicken_grilled_vegetables", 32, 8, 10, 240),
            meal("meal.loss.dinner.cottage_casserole", 28, 7, 18, 247),
            meal("meal.loss.dinner.turkey_cutlets_cabbage", 29, 10, 12, 254),
        ],
    );
    pools.insert(
        (Goal::Loss, MealSlot::Snack),
        vec![
            meal("meal.loss.snack.apple_yogurt", 8, 3, 22, 147),
            meal("meal.loss.snack.kefir_bran", 9, 4, 15, 132),
            meal("meal.loss.snack.carrot_hummus", 5, 6, 18, 146),
            meal("meal.loss.snack.berries_nuts", 5, 9, 12, 149),
        ],
    );

    // ========================================================================
    // Gain pools
    // ========================================================================

    pools.insert(
        (Goal::Gain, MealSlot::Breakfast),
        vec![
            meal("meal.gain.breakfast.oatmeal_banana_peanut", 22, 18, 70, 530),
            meal("meal.gain.breakfast.omelet_cheese_toast", 30, 22, 40, 478),
            meal("meal.gain.breakfast.rice_porridge_raisins", 18, 12, 75, 480),
            meal("meal.gain.breakfast.cottage_pancakes_honey", 28, 14, 55, 458),
        ],
    );
    pools.insert(
        (Goal::Gain, MealSlot::Lunch),
        vec![
            meal("meal.gain.lunch.beef_rice", 45, 18, 80, 662),
            meal("meal.gain.lunch.chicken_pasta", 48, 15, 75, 627),
            meal("meal.gain.lunch.salmon_potato", 42, 20, 65, 608),
            meal("meal.gain.lunch.pork_buckwheat", 44, 22, 60, 614),
        ],
    );
    pools.insert(
        (Goal::Gain, MealSlot::Dinner),
        vec![
            meal("meal.gain.dinner.chicken_rice_vegetables", 40, 14, 55, 506),
            meal("meal.gain.dinner.beef_potato_salad", 38, 16, 50, 496),
            meal("meal.gain.dinner.fish_pasta_cream", 36, 18, 48, 498),
            meal("meal.gain.dinner.turkey_bulgur", 39, 12, 52, 472),
        ],
    );
    pools.insert(
        (Goal::Gain, MealSlot::Snack),
        vec![
            meal("meal.gain.snack.banana_peanut_shake", 20, 12, 45, 368),
            meal("meal.gain.snack.cottage_nuts_honey", 22, 14, 30, 334),
            meal("meal.gain.snack.sandwich_chicken", 18, 10, 35, 302),
            meal("meal.gain.snack.yogurt_granola", 15, 8, 40, 292),
        ],
    );

    // ========================================================================
    // Dry pools
    //
    // Five entries each: the high-carb ones sit on the weekly
    // elimination list, the lean ones survive the full schedule.
    // ========================================================================

    pools.insert(
        (Goal::Dry, MealSlot::Breakfast),
        vec![
            meal("meal.dry.breakfast.egg_white_omelet", 28, 6, 8, 198),
            meal("meal.dry.breakfast.cottage_cheese_cucumber", 26, 4, 10, 180),
            meal("meal.dry.breakfast.banana_oatmeal", 16, 7, 55, 347),
            meal("meal.dry.breakfast.granola_yogurt", 15, 9, 48, 333),
            meal("meal.dry.breakfast.toast_avocado_egg", 18, 14, 35, 338),
        ],
    );
    pools.insert(
        (Goal::Dry, MealSlot::Lunch),
        vec![
            meal("meal.dry.lunch.chicken_salad", 38, 10, 12, 290),
            meal("meal.dry.lunch.cod_vegetables", 36, 6, 14, 254),
            meal("meal.dry.lunch.rice_veal", 34, 9, 55, 437),
            meal("meal.dry.lunch.potato_chicken", 35, 8, 50, 412),
            meal("meal.dry.lunch.bulgur_beef", 36, 11, 45, 423),
        ],
    );
    pools.insert(
        (Goal::Dry, MealSlot::Dinner),
        vec![
            meal("meal.dry.dinner.grilled_fish_greens", 34, 8, 6, 232),
            meal("meal.dry.dinner.turkey_steamed_broccoli", 36, 7, 8, 239),
            meal("meal.dry.dinner.pasta_turkey", 32, 9, 50, 409),
            meal("meal.dry.dinner.buckwheat_liver", 30, 8, 42, 360),
            meal("meal.dry.dinner.couscous_cod", 31, 6, 44, 354),
        ],
    );
    pools.insert(
        (Goal::Dry, MealSlot::Snack),
        vec![
            meal("meal.dry.snack.protein_shake_water", 24, 2, 5, 134),
            meal("meal.dry.snack.egg_white_cucumber", 12, 1, 4, 73),
            meal("meal.dry.snack.dried_fruit_mix", 4, 3, 40, 203),
            meal("meal.dry.snack.rice_cakes_honey", 3, 2, 35, 170),
            meal("meal.dry.snack.banana_cottage", 14, 4, 28, 204),
        ],
    );

    // ========================================================================
    // Exclusion substitutes (one per category and slot)
    // ========================================================================

    substitutes.insert(
        (ExclusionCategory::Fish, MealSlot::Breakfast),
        meal("meal.sub.tofu_scramble", 20, 12, 10, 228),
    );
    substitutes.insert(
        (ExclusionCategory::Fish, MealSlot::Lunch),
        meal("meal.sub.chickpea_stew", 22, 10, 45, 358),
    );
    substitutes.insert(
        (ExclusionCategory::Fish, MealSlot::Dinner),
        meal("meal.sub.tofu_vegetables", 24, 12, 15, 264),
    );
    substitutes.insert(
        (ExclusionCategory::Fish, MealSlot::Snack),
        meal("meal.sub.nut_mix", 10, 18, 12, 250),
    );

    substitutes.insert(
        (ExclusionCategory::Meat, MealSlot::Breakfast),
        meal("meal.sub.peanut_oatmeal", 18, 14, 42, 366),
    );
    substitutes.insert(
        (ExclusionCategory::Meat, MealSlot::Lunch),
        meal("meal.sub.lentil_curry", 24, 9, 48, 369),
    );
    substitutes.insert(
        (ExclusionCategory::Meat, MealSlot::Dinner),
        meal("meal.sub.bean_stew", 22, 8, 40, 320),
    );
    substitutes.insert(
        (ExclusionCategory::Meat, MealSlot::Snack),
        meal("meal.sub.hummus_vegetables", 9, 10, 25, 226),
    );

    substitutes.insert(
        (ExclusionCategory::Dairy, MealSlot::Breakfast),
        meal("meal.sub.oatmeal_water_berries", 12, 6, 48, 294),
    );
    substitutes.insert(
        (ExclusionCategory::Dairy, MealSlot::Lunch),
        meal("meal.sub.quinoa_vegetables", 16, 8, 50, 336),
    );
    substitutes.insert(
        (ExclusionCategory::Dairy, MealSlot::Dinner),
        meal("meal.sub.buckwheat_mushrooms", 14, 7, 45, 299),
    );
    substitutes.insert(
        (ExclusionCategory::Dairy, MealSlot::Snack),
        meal("meal.sub.apple_nuts", 6, 12, 20, 212),
    );

    substitutes.insert(
        (ExclusionCategory::Eggs, MealSlot::Breakfast),
        meal("meal.sub.chia_porridge", 14, 10, 40, 306),
    );
    substitutes.insert(
        (ExclusionCategory::Eggs, MealSlot::Lunch),
        meal("meal.sub.tofu_rice", 22, 10, 48, 370),
    );
    substitutes.insert(
        (ExclusionCategory::Eggs, MealSlot::Dinner),
        meal("meal.sub.lentil_cutlets", 20, 8, 30, 272),
    );
    substitutes.insert(
        (ExclusionCategory::Eggs, MealSlot::Snack),
        meal("meal.sub.seed_bar", 8, 14, 22, 246),
    );

    MealCatalog { pools, substitutes }
}
