//! Text normalization used for filter matching.
//!
//! Display always uses the text as extracted from the page; these helpers only
//! produce matching keys.

use regex::Regex;
use std::sync::OnceLock;

/// Lower-cases `s` and drops every character outside `[0-9a-z]`.
///
/// `normalize("RX 6600  Ti") == "rx6600ti"`
pub fn normalize(s: &str) -> String {
    s.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Alpha,
    Digit,
    Other,
}

fn classify(c: char) -> CharClass {
    if c.is_ascii_lowercase() {
        CharClass::Alpha
    } else if c.is_ascii_digit() {
        CharClass::Digit
    } else {
        CharClass::Other
    }
}

/// Splits `s` into lower-cased tokens: maximal runs of ASCII letters or of ASCII digits.
///
/// `tokenize("RTX4060 Ti") == ["rtx", "4060", "ti"]`
pub fn tokenize(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut current_class = CharClass::Other;

    for c in s.chars().flat_map(char::to_lowercase) {
        let class = classify(c);
        if class != current_class && !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        if class != CharClass::Other {
            current.push(c);
        }
        current_class = class;
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Brand filter: normalized substring match. An empty brand matches anything.
pub fn contains_brand(name: &str, brand: &str) -> bool {
    normalize(name).contains(&normalize(brand))
}

/// Model filter with whole-word semantics.
///
/// The normalized model must equal a run of one or more consecutive tokens of
/// `name` (see [`tokenize`]), so `"60"` matches `"rtx 60 edition"` but not
/// `"rtx4060"`, while `"rx 6600"` still matches `"RX6600 XT"`.
pub fn contains_model(name: &str, model: &str) -> bool {
    let needle = normalize(model);
    if needle.is_empty() {
        return true;
    }

    let tokens = tokenize(name);
    for start in 0..tokens.len() {
        let mut joined = String::with_capacity(needle.len());
        for token in &tokens[start..] {
            joined.push_str(token);
            if joined.len() >= needle.len() {
                break;
            }
        }
        if joined == needle {
            return true;
        }
    }
    false
}

fn slug_suffix_regex() -> &'static Regex {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    SUFFIX.get_or_init(|| Regex::new(r"-p-\d+\.html$").expect("slug suffix pattern is valid"))
}

/// Display name carried by a product link's last path segment.
///
/// `".../msi-rtx-4060-ventus-p-1234.html"` becomes `"msi rtx 4060 ventus"`.
/// `None` when the link has no usable segment.
pub fn name_from_slug(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    let slug = path.trim_end_matches('/').rsplit('/').next()?;
    let slug = slug_suffix_regex().replace(slug, "");
    let decoded = urlencoding::decode(&slug)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| slug.to_string());
    let name = decoded.replace('-', " ").trim().to_string();
    (!name.is_empty()).then_some(name)
}
