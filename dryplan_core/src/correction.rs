//! Dietary exclusion correction.
//!
//! Free text like "я не їм рибу" is scanned against per-category
//! keyword sets (Ukrainian stems plus English words). Matched
//! categories then knock meals out of an existing plan: any meal whose
//! translated display name carries a category keyword is replaced by
//! that category's fixed substitute for the same slot, rescaled to the
//! replaced meal's calories so the day total survives the swap.

use crate::{DayPlan, ExclusionCategory, MealCatalog, Translator};
use std::collections::BTreeSet;

/// Ukrainian stems + English keywords per excludable category.
///
/// Stems rather than full words so case endings match (риба/рибу/риби).
const FISH_KEYWORDS: &[&str] = &[
    "риб", "лосос", "тунец", "тунц", "скумбр", "оселедец", "минта", "тріск", "морепродукт",
    "fish", "salmon", "tuna", "cod", "mackerel", "herring", "seafood",
];

const MEAT_KEYWORDS: &[&str] = &[
    "м'яс", "мяс", "курк", "курят", "куряч", "яловичин", "свинин", "індич", "індик", "телятин",
    "печінк", "шинк", "meat", "chicken", "beef", "pork", "turkey", "veal", "liver", "ham",
];

const DAIRY_KEYWORDS: &[&str] = &[
    "молок", "молочн", "сир", "творог", "творож", "йогурт", "кефір", "сметан", "вершк", "лактоз",
    "dairy", "milk", "cheese", "yogurt", "yoghurt", "kefir", "cottage", "cream", "lactose",
];

const EGG_KEYWORDS: &[&str] = &[
    "яйц", "яєц", "яєчн", "омлет", "egg", "omelet", "omelette",
];

/// Phrases that signal the user wants the plan changed, even when no
/// food category was recognized.
const CORRECTION_INTENT_KEYWORDS: &[&str] = &[
    "не їм", "не вживаю", "не люблю", "алергі", "приберіть", "прибери", "заміни", "виключ",
    "don't eat", "dont eat", "do not eat", "allerg", "remove", "replace", "exclude", "without",
];

fn keywords_for(category: ExclusionCategory) -> &'static [&'static str] {
    match category {
        ExclusionCategory::Fish => FISH_KEYWORDS,
        ExclusionCategory::Meat => MEAT_KEYWORDS,
        ExclusionCategory::Dairy => DAIRY_KEYWORDS,
        ExclusionCategory::Eggs => EGG_KEYWORDS,
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// Category stems match at word starts only. A bare substring test
/// would find "риб" inside "прибери" and turn every removal request
/// into a fish exclusion.
fn word_starts_with_any(text: &str, keywords: &[&str]) -> bool {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '’'))
        .filter(|w| !w.is_empty())
        .any(|word| keywords.iter().any(|k| word.starts_with(k)))
}

/// Detect excluded food categories in free text.
///
/// Each category is tested independently, so several simultaneous
/// exclusions come back together; the set is order-independent.
pub fn detect_exclusions(text: &str) -> BTreeSet<ExclusionCategory> {
    let lower = text.to_lowercase();
    ExclusionCategory::ALL
        .into_iter()
        .filter(|c| word_starts_with_any(&lower, keywords_for(*c)))
        .collect()
}

/// Whether the text reads as a plan-correction request at all.
///
/// Used to distinguish "remove X" with an unrecognized X (answer with a
/// clarification prompt) from ordinary chat (fall through to the topic
/// matcher).
pub fn has_correction_intent(text: &str) -> bool {
    contains_any(&text.to_lowercase(), CORRECTION_INTENT_KEYWORDS)
}

/// Whether a meal's translated display name hits an excluded category
fn meal_matches(display_name: &str, exclusions: &BTreeSet<ExclusionCategory>) -> Option<ExclusionCategory> {
    let lower = display_name.to_lowercase();
    exclusions
        .iter()
        .copied()
        .find(|c| word_starts_with_any(&lower, keywords_for(*c)))
}

/// Replace every excluded meal in the plan with its category
/// substitute, rescaled to the replaced meal's calories.
///
/// Day totals are recomputed after substitution. Returns the number of
/// meals replaced.
pub fn apply_corrections(
    plan: &mut [DayPlan],
    exclusions: &BTreeSet<ExclusionCategory>,
    catalog: &MealCatalog,
    translator: &dyn Translator,
) -> usize {
    if exclusions.is_empty() {
        return 0;
    }

    let mut replaced = 0;

    for day in plan.iter_mut() {
        let mut changed = false;

        for meal in day.meals.iter_mut() {
            let display = translator.translate(&meal.name_key);
            let Some(category) = meal_matches(&display, exclusions) else {
                continue;
            };
            let Some(substitute) = catalog.substitute(category, meal.slot) else {
                tracing::warn!(?category, slot = ?meal.slot, "no substitute template, leaving meal");
                continue;
            };

            // Rescale to the slot's existing budget, not the
            // substitute's native calories.
            *meal = crate::plan::scale_meal_to_slot(substitute, meal.slot, meal.kcal);
            replaced += 1;
            changed = true;
        }

        if changed {
            day.recompute_totals();
        }
    }

    tracing::info!(?exclusions, replaced, "applied dietary corrections");
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::build_default_catalog;
    use crate::ports::KeyTranslator;
    use crate::{plan, Config, Goal};

    #[test]
    fn test_detect_single_exclusion_ukrainian() {
        let detected = detect_exclusions("я не їм рибу");
        assert_eq!(detected.len(), 1);
        assert!(detected.contains(&ExclusionCategory::Fish));
    }

    #[test]
    fn test_detect_multiple_exclusions() {
        let detected = detect_exclusions("не вживаю м'ясо і яйця, алергія");
        assert!(detected.contains(&ExclusionCategory::Meat));
        assert!(detected.contains(&ExclusionCategory::Eggs));
        assert_eq!(detected.len(), 2);
    }

    #[test]
    fn test_detect_english_keywords() {
        let detected = detect_exclusions("please remove milk and cheese");
        assert_eq!(detected.len(), 1);
        assert!(detected.contains(&ExclusionCategory::Dairy));
    }

    #[test]
    fn test_no_exclusion_in_ordinary_text() {
        assert!(detect_exclusions("скільки води пити на день?").is_empty());
        assert!(detect_exclusions("pineapple is great").is_empty());
    }

    #[test]
    fn test_correction_intent_without_category() {
        let text = "приберіть це зі списку";
        assert!(has_correction_intent(text));
        assert!(detect_exclusions(text).is_empty());
    }

    #[test]
    fn test_removal_verbs_are_not_fish() {
        // "прибери"/"приберіть" contain the stem "риб" mid-word and
        // must not read as a fish exclusion.
        for text in ["прибери оце зелене", "приберіть це зі списку", "Приберіть щось"] {
            assert!(
                detect_exclusions(text).is_empty(),
                "false exclusion in {:?}",
                text
            );
        }
        // The stem still matches at word starts, case endings included
        assert!(detect_exclusions("риби не хочу").contains(&ExclusionCategory::Fish));
    }

    #[test]
    fn test_apply_corrections_removes_fish_and_keeps_totals() {
        let catalog = build_default_catalog();
        let config = Config::default();
        let translator = KeyTranslator;

        let mut plan = plan::generate_week(Goal::Loss, 1, 1650, &catalog, &config);
        let before: Vec<i32> = plan.iter().map(|d| d.totals.kcal).collect();

        let exclusions = detect_exclusions("я не їм рибу");
        let replaced = apply_corrections(&mut plan, &exclusions, &catalog, &translator);
        assert!(replaced > 0, "the loss pools contain fish meals");

        for day in &plan {
            for meal in &day.meals {
                let name = translator.translate(&meal.name_key).to_lowercase();
                assert!(
                    !word_starts_with_any(&name, FISH_KEYWORDS),
                    "fish meal survived: {}",
                    meal.name_key
                );
            }
        }

        // Substitutes were rescaled to the replaced meals' calories, so
        // day totals move only by macro-rounding drift.
        for (day, old_kcal) in plan.iter().zip(before) {
            assert!(
                (day.totals.kcal - old_kcal).abs() <= 20,
                "{}: {} vs {}",
                day.day_key,
                day.totals.kcal,
                old_kcal
            );
        }
    }

    #[test]
    fn test_apply_corrections_is_idempotent() {
        let catalog = build_default_catalog();
        let config = Config::default();
        let translator = KeyTranslator;

        let mut plan = plan::generate_week(Goal::Dry, 1, 1500, &catalog, &config);
        let exclusions = detect_exclusions("без м'яса");
        apply_corrections(&mut plan, &exclusions, &catalog, &translator);

        let again = apply_corrections(&mut plan, &exclusions, &catalog, &translator);
        assert_eq!(again, 0, "substitutes must not match their own category");
    }

    #[test]
    fn test_substitutes_are_free_of_all_categories() {
        let catalog = build_default_catalog();
        for category in ExclusionCategory::ALL {
            for slot in crate::MealSlot::ALL {
                let substitute = catalog.substitute(category, slot).unwrap();
                for other in ExclusionCategory::ALL {
                    assert!(
                        !word_starts_with_any(&substitute.name_key, keywords_for(other)),
                        "substitute {} matches {:?}",
                        substitute.name_key,
                        other
                    );
                }
            }
        }
    }

    #[test]
    fn test_empty_exclusions_no_op() {
        let catalog = build_default_catalog();
        let config = Config::default();
        let mut plan = plan::generate_week(Goal::Loss, 1, 1650, &catalog, &config);
        let copy = plan.clone();

        let replaced = apply_corrections(&mut plan, &BTreeSet::new(), &catalog, &KeyTranslator);
        assert_eq!(replaced, 0);
        assert_eq!(plan, copy);
    }
}
