//! Keyword lookup for nutrition Q&A after the plan is generated.
//!
//! Not NLP: an ordered list of keyword sets mapped to canned answer
//! keys, lowercase substring test, first match wins. One distinguished
//! key routes plan-correction requests to the correction engine.

/// Answer key that routes to the dietary-exclusion correction flow
pub const CORRECTION_ANSWER_KEY: &str = "__CORRECTION__";

/// Answer key used when nothing matched: a gentle on-topic hint
pub const FALLBACK_ANSWER_KEY: &str = "chat.answer.on_topic_hint";

/// A keyword-to-answer rule
pub struct TopicRule {
    pub keywords: &'static [&'static str],
    pub answer_key: &'static str,
}

/// Ordered rule list; earlier rules win
pub const TOPIC_RULES: &[TopicRule] = &[
    TopicRule {
        keywords: &[
            "не їм", "не вживаю", "не люблю", "алергі", "прибери", "заміни", "виключ",
            "don't eat", "dont eat", "do not eat", "allerg", "remove", "replace", "exclude",
        ],
        answer_key: CORRECTION_ANSWER_KEY,
    },
    TopicRule {
        keywords: &["вода", "води", "пити", "water", "hydrat"],
        answer_key: "chat.answer.water",
    },
    TopicRule {
        keywords: &["білок", "білка", "протеїн", "protein"],
        answer_key: "chat.answer.protein",
    },
    TopicRule {
        keywords: &["цукор", "цукру", "солодк", "sugar", "sweets"],
        answer_key: "chat.answer.sugar",
    },
    TopicRule {
        keywords: &["плато", "вага стоїть", "вага не", "plateau", "stall"],
        answer_key: "chat.answer.plateau",
    },
    TopicRule {
        keywords: &["трену", "спортзал", "кардіо", "workout", "training", "gym", "cardio", "exercise"],
        answer_key: "chat.answer.training",
    },
    TopicRule {
        keywords: &["сон", "спати", "висипа", "sleep"],
        answer_key: "chat.answer.sleep",
    },
    TopicRule {
        keywords: &["чітміл", "читміл", "cheat meal", "cheat day"],
        answer_key: "chat.answer.cheat_meal",
    },
    TopicRule {
        keywords: &["вітамін", "добавк", "креатин", "vitamin", "supplement", "creatine", "omega"],
        answer_key: "chat.answer.supplements",
    },
];

/// First matching answer key for the text, if any
pub fn match_topic(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    TOPIC_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| lower.contains(k)))
        .map(|rule| rule.answer_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_wins() {
        // "заміни" (correction) appears before any topic keyword
        assert_eq!(
            match_topic("заміни мені воду на чай"),
            Some(CORRECTION_ANSWER_KEY)
        );
    }

    #[test]
    fn test_topic_lookup() {
        assert_eq!(match_topic("Скільки води пити на день?"), Some("chat.answer.water"));
        assert_eq!(match_topic("how much protein do I need"), Some("chat.answer.protein"));
        assert_eq!(match_topic("вага стоїть другий тиждень"), Some("chat.answer.plateau"));
        assert_eq!(match_topic("чи можна чітміл раз на тиждень"), Some("chat.answer.cheat_meal"));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(match_topic("WATER please"), Some("chat.answer.water"));
    }

    #[test]
    fn test_no_match_returns_none() {
        assert_eq!(match_topic("розкажи анекдот"), None);
        assert_eq!(match_topic("what's the weather like"), None);
    }
}
