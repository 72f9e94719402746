//! Content moderation for user-authored text.
//!
//! Every free-text input passes through here before it reaches the
//! conversation state machine. Normalization defeats the common
//! evasion tricks (zero-width characters, single-character separators,
//! spaced-out letters, homoglyphs and leetspeak); the banned-term list
//! is compiled into an Aho-Corasick automaton once at startup and the
//! normalized variants run through it in a single pass each.

use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use regex::Regex;

/// Banned terms: Ukrainian stems and English words across the blocked
/// topic groups, plus a few literal bypass spellings. All lowercase.
const BANNED_TERMS: &[&str] = &[
    // drugs
    "наркотик", "наркота", "героїн", "кокаїн", "амфетамін", "метамфетамін", "марихуана",
    "канабіс", "мефедрон", "drugs", "heroin", "cocaine", "amphetamine", "methamphetamine",
    "marijuana", "cannabis", "mephedrone",
    // alcohol
    "алкоголь", "горілка", "самогон", "vodka", "alcohol", "whiskey",
    // sexual content
    "порно", "еротик", "porn", "erotic", "onlyfans", "xxx",
    // self-harm
    "суїцид", "самогубство", "самопошкодження", "suicide", "self-harm", "selfharm",
    // eating disorders
    "анорекс", "булім", "anorexia", "bulimia",
    // weapons and violence
    "збро", "пістолет", "вибухівк", "weapon", "explosive", "firearm",
    // hate speech
    "нацист", "nazi",
    // financial crime
    "відмивання грошей", "шахрайств", "money laundering", "fraud",
    // smuggling
    "контрабанд", "smuggling",
    // known bypass spellings
    "п0рно", "p0rn", "hero1n", "c0caine", "нарк0тик",
];

/// Automaton over the banned-term list, built once
static BANNED_MATCHER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::new(BANNED_TERMS).expect("banned-term list compiles into an automaton")
});

/// Letter, separators, letter - the `п*о*р*н*о` obfuscation pattern
static SEPARATOR_OBFUSCATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([\p{L}\p{N}])[.\-_*•~]+([\p{L}\p{N}])").expect("separator pattern compiles")
});

/// Invisible characters stripped before any matching
const ZERO_WIDTH: [char; 7] = [
    '\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}', '\u{00AD}', '\u{2060}', '\u{180E}',
];

/// Homoglyph and leetspeak folding toward Latin letters
fn fold_char(c: char) -> char {
    match c {
        // Cyrillic look-alikes
        'а' => 'a',
        'е' => 'e',
        'о' => 'o',
        'р' => 'p',
        'с' => 'c',
        'х' => 'x',
        'у' => 'y',
        'і' => 'i',
        'ї' => 'i',
        'к' => 'k',
        'м' => 'm',
        'т' => 't',
        'н' => 'n',
        'в' => 'b',
        // leetspeak digits
        '0' => 'o',
        '1' => 'i',
        '3' => 'e',
        '4' => 'a',
        '5' => 's',
        '7' => 't',
        // symbol substitutions
        '@' => 'a',
        '$' => 's',
        '!' => 'i',
        '|' => 'l',
        '+' => 't',
        other => other,
    }
}

/// Rejoin runs of three or more spaced single letters ("п о р н о").
///
/// Two-token runs are left alone: they are ordinary speech.
fn collapse_spaced_letters(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut run: Vec<&str> = Vec::new();

    let flush = |run: &mut Vec<&str>, out: &mut Vec<String>| {
        if run.len() >= 3 {
            out.push(run.concat());
        } else {
            out.extend(run.iter().map(|s| s.to_string()));
        }
        run.clear();
    };

    for token in text.split_whitespace() {
        if token.chars().count() == 1 && token.chars().all(char::is_alphanumeric) {
            run.push(token);
        } else {
            flush(&mut run, &mut out);
            out.push(token.to_string());
        }
    }
    flush(&mut run, &mut out);

    out.join(" ")
}

/// Normalize user text for matching: lowercase, strip invisible
/// characters, collapse separator obfuscation and spaced-out letters.
pub fn normalize_text(text: &str) -> String {
    let mut cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !ZERO_WIDTH.contains(c))
        .collect();

    // Collapsing is repeated to a fixpoint: one pass over
    // "п.о.р.н.о" only rejoins alternating pairs.
    for _ in 0..16 {
        let next = SEPARATOR_OBFUSCATION.replace_all(&cleaned, "$1$2");
        if next == cleaned {
            break;
        }
        cleaned = next.into_owned();
    }

    collapse_spaced_letters(&cleaned)
}

/// Build the homoglyph-folded twin of an already-normalized string
pub fn homoglyph_fold(normalized: &str) -> String {
    normalized.chars().map(fold_char).collect()
}

/// Whether the text contains banned content under any variant.
///
/// Four variants are checked: the cleaned string and its
/// homoglyph-folded twin, each with and without whitespace. Any single
/// hit blocks the input.
pub fn contains_banned_content(text: &str) -> bool {
    let cleaned = normalize_text(text);
    let folded = homoglyph_fold(&cleaned);

    let no_space = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();

    let variants = [
        cleaned.clone(),
        no_space(&cleaned),
        folded.clone(),
        no_space(&folded),
    ];

    let hit = variants.iter().any(|v| BANNED_MATCHER.is_match(v));
    if hit {
        tracing::warn!("moderation: banned content detected");
    }
    hit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases_and_strips_zero_width() {
        assert_eq!(normalize_text("ПрИвІт"), "привіт");
        assert_eq!(normalize_text("при\u{200B}віт"), "привіт");
        assert_eq!(normalize_text("so\u{00AD}up"), "soup");
    }

    #[test]
    fn test_normalize_collapses_separators_to_fixpoint() {
        assert_eq!(normalize_text("п.о.р.н.о"), "порно");
        assert_eq!(normalize_text("п*о*р*н*о"), "порно");
        assert_eq!(normalize_text("h-e-l-l-o"), "hello");
    }

    #[test]
    fn test_normalize_collapses_spaced_letters() {
        assert_eq!(normalize_text("п о р н о"), "порно");
        // Two spaced letters stay apart
        assert_eq!(normalize_text("я є"), "я є");
        assert_eq!(normalize_text("скажи п о р н о зараз"), "скажи порно зараз");
    }

    #[test]
    fn test_homoglyph_fold() {
        assert_eq!(homoglyph_fold("p0rn"), "porn");
        assert_eq!(homoglyph_fold("c0ca!ne"), "cocaine");
        assert_eq!(homoglyph_fold("сосаіне"), "cocaine");
    }

    #[test]
    fn test_banned_variants_blocked() {
        assert!(contains_banned_content("п.о.р.н.о"));
        assert!(contains_banned_content("p0rn"));
        assert!(contains_banned_content("п о р н о"));
        assert!(contains_banned_content("де купити наркотики"));
        assert!(contains_banned_content("ВИБУХІВКА"));
    }

    #[test]
    fn test_clean_text_passes() {
        assert!(!contains_banned_content("pineapple"));
        assert!(!contains_banned_content("скільки білка мені потрібно?"));
        assert!(!contains_banned_content("я не їм рибу"));
        assert!(!contains_banned_content("what about my meal plan for monday"));
    }

    #[test]
    fn test_whitespace_stripped_variant_catches_split_terms() {
        assert!(contains_banned_content("нарко тики"));
    }
}
