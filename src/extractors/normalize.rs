// src/extractors/normalize.rs
use once_cell::sync::Lazy;
use regex::Regex;

// ASCII hyphen plus the Unicode dash family, and any whitespace, collapsed as one run.
static HYPHEN_WS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\s\-\u{00AD}\u{2010}\u{2011}\u{2012}\u{2013}\u{2014}\u{2015}\u{2212}]+")
        .expect("Failed to compile HYPHEN_WS_RE")
});

/// Canonical matching form of a label: lowercase, hyphen/whitespace runs
/// folded to one space, trimmed. Idempotent.
pub fn normalize_label(text: &str) -> String {
    let lower = text.to_lowercase();
    HYPHEN_WS_RE.replace_all(&lower, " ").trim().to_string()
}

/// Same folding without lowercasing; keeps narrative text readable for
/// case-insensitive matching while preserving the literal hit.
pub fn collapse_hyphens(text: &str) -> String {
    HYPHEN_WS_RE.replace_all(text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hyphen_variants_collapse_identically() {
        let expected = "broker dealer operator";
        for raw in [
            "Broker-Dealer Operator",
            "Broker\u{2010}Dealer Operator",
            "Broker\u{2011}Dealer   Operator",
            "Broker \u{2013} Dealer\tOperator",
            "BROKER\u{2014}DEALER\nOPERATOR",
            "  broker - dealer operator  ",
        ] {
            assert_eq!(normalize_label(raw), expected, "input {:?}", raw);
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in [
            "",
            "   ",
            "a. Can any Subscriber opt-out?",
            "Item 14(a) \u{00A0} -- counter\u{2011}party",
            "already normalized",
            "Ünïcode — Dash",
        ] {
            let once = normalize_label(raw);
            assert_eq!(normalize_label(&once), once, "input {:?}", raw);
        }
    }

    #[test]
    fn test_collapse_keeps_case() {
        assert_eq!(collapse_hyphens("Mid-Point  Peg"), "Mid Point Peg");
    }
}
