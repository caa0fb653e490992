//! Decklist line parsing.
//!
//! A line is split into whitespace separated tokens and matched against
//!
//! ```text
//! line := [quantity] name [set_group [collector] [foil]]
//! ```
//!
//! Only the last parenthesized group, followed by nothing but an optional
//! collector number and foil marker, counts as the set code. Parentheses
//! earlier in the line are part of the card name and are kept as written.

use crate::domain::model::CardEntry;

/// Everything recognized on a single decklist line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub quantity: Option<u32>,
    pub name: String,
    pub set_code: Option<String>,
    pub collector_number: Option<String>,
    pub foil: bool,
    /// False when the line had no usable card name and was passed through.
    pub recognized: bool,
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    text: &'a str,
    start: usize,
    end: usize,
}

fn tokenize(line: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start = None;

    for (i, c) in line.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                tokens.push(Token {
                    text: &line[s..i],
                    start: s,
                    end: i,
                });
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push(Token {
            text: &line[s..],
            start: s,
            end: line.len(),
        });
    }
    tokens
}

/// `4`, `12`, `2x`. More than three digits is read as part of the name.
fn quantity_of(token: &str) -> Option<u32> {
    let digits = token
        .strip_suffix('x')
        .or_else(|| token.strip_suffix('X'))
        .unwrap_or(token);
    if (1..=3).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}

/// `(OTC)`, `(PLST)`, `(P30A)`.
fn set_code_of(token: &str) -> Option<&str> {
    let inner = token.strip_prefix('(')?.strip_suffix(')')?;
    if !inner.is_empty() && inner.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Some(inner)
    } else {
        None
    }
}

/// `252`, `12a`, `1494★`, `MH1-123`.
fn is_collector_number(token: &str) -> bool {
    if token.contains(['(', ')']) {
        return false;
    }
    let starts_with_digit = token.bytes().next().is_some_and(|b| b.is_ascii_digit());
    starts_with_digit
        || (token.bytes().any(|b| b.is_ascii_digit())
            && token.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-'))
}

fn is_foil_marker(token: &str) -> bool {
    matches!(token, "*F*" | "*E*")
}

pub fn parse_line(line: &str) -> ParsedLine {
    let line = line.trim();
    let tokens = tokenize(line);

    let mut first = 0;
    let quantity = if tokens.len() > 1 {
        quantity_of(tokens[0].text)
    } else {
        None
    };
    if quantity.is_some() {
        first = 1;
    }

    // Suffix, matched right to left. Nothing is stripped unless a set group is found.
    let mut end = tokens.len();
    let mut set_code = None;
    let mut collector_number = None;
    let mut foil = false;
    {
        let mut cursor = end;
        let mut foil_seen = false;
        let mut collector_seen = None;

        if cursor > first && is_foil_marker(tokens[cursor - 1].text) {
            foil_seen = true;
            cursor -= 1;
        }
        if cursor > first && is_collector_number(tokens[cursor - 1].text) {
            collector_seen = Some(tokens[cursor - 1].text.to_string());
            cursor -= 1;
        }
        if cursor > first {
            if let Some(code) = set_code_of(tokens[cursor - 1].text) {
                set_code = Some(code.to_string());
                collector_number = collector_seen;
                foil = foil_seen;
                end = cursor - 1;
            }
        }
    }

    let name = if first < end {
        line[tokens[first].start..tokens[end - 1].end].trim()
    } else {
        ""
    };

    if !name.chars().any(char::is_alphabetic) {
        return ParsedLine {
            quantity: None,
            name: line.to_string(),
            set_code: None,
            collector_number: None,
            foil: false,
            recognized: false,
        };
    }

    ParsedLine {
        quantity,
        name: name.to_string(),
        set_code,
        collector_number,
        foil,
        recognized: true,
    }
}

/// Turns raw decklist lines into card entries, in input order.
///
/// Blank lines are dropped. Lines without a recognizable card name are kept
/// verbatim and reported with a warning. Repeated cards stay separate entries.
pub fn normalize<S: AsRef<str>>(raw_lines: &[S]) -> Vec<CardEntry> {
    raw_lines
        .iter()
        .map(|l| l.as_ref().trim())
        .filter(|l| !l.is_empty())
        .enumerate()
        .map(|(index, line)| {
            let parsed = parse_line(line);
            if !parsed.recognized {
                tracing::warn!(
                    "⚠️ Line {} has no recognizable card name, keeping it as-is: '{}'",
                    index + 1,
                    line
                );
            }
            CardEntry::new(parsed.name, index)
        })
        .collect()
}

/// File content written back over the input: one name per line.
pub fn render_normalized(cards: &[CardEntry]) -> String {
    let mut out = String::new();
    for card in cards {
        out.push_str(&card.name);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(lines: &[&str]) -> Vec<String> {
        normalize(lines).into_iter().map(|c| c.name).collect()
    }

    #[test]
    fn test_moxfield_line() {
        let parsed = parse_line("1 Arcane Signet (OTC) 252");
        assert_eq!(parsed.quantity, Some(1));
        assert_eq!(parsed.name, "Arcane Signet");
        assert_eq!(parsed.set_code.as_deref(), Some("OTC"));
        assert_eq!(parsed.collector_number.as_deref(), Some("252"));
        assert!(parsed.recognized);
    }

    #[test]
    fn test_punctuation_is_preserved() {
        assert_eq!(
            names(&[
                "1 Kros, Defense Contractor (MOM) 123",
                "1 Urza's Saga (MH2) 259",
                "3 Kastral, the Windcrested (BLB) 25",
            ]),
            vec![
                "Kros, Defense Contractor",
                "Urza's Saga",
                "Kastral, the Windcrested"
            ]
        );
    }

    #[test]
    fn test_only_trailing_group_is_stripped() {
        let parsed = parse_line("1 Erase (Not the Urza's Legacy One) (UNH) 42");
        assert_eq!(parsed.name, "Erase (Not the Urza's Legacy One)");
        assert_eq!(parsed.set_code.as_deref(), Some("UNH"));

        // Not a set code: the group is not at the end of the line.
        let parsed = parse_line("1 Sol Ring (C21) extra");
        assert_eq!(parsed.name, "Sol Ring (C21) extra");
        assert_eq!(parsed.set_code, None);
    }

    #[test]
    fn test_set_code_without_collector_number() {
        assert_eq!(names(&["2 Sol Ring (C21)"]), vec!["Sol Ring"]);
    }

    #[test]
    fn test_collector_number_needs_set_code() {
        // A trailing number alone belongs to the name.
        assert_eq!(names(&["1 Borrowing 100,000 Arrows"]), vec!["Borrowing 100,000 Arrows"]);
        assert_eq!(names(&["Channel 1"]), vec!["Channel 1"]);
    }

    #[test]
    fn test_foil_marker_and_letter_collector_numbers() {
        let parsed = parse_line("1 Sol Ring (PLST) C21-263 *F*");
        assert_eq!(parsed.name, "Sol Ring");
        assert_eq!(parsed.collector_number.as_deref(), Some("C21-263"));
        assert!(parsed.foil);

        assert_eq!(names(&["1x Command Tower (CMM) 350a"]), vec!["Command Tower"]);
    }

    #[test]
    fn test_promo_collector_numbers() {
        let parsed = parse_line("1 Sol Ring (SLD) 1494★");
        assert_eq!(parsed.name, "Sol Ring");
        assert_eq!(parsed.set_code.as_deref(), Some("SLD"));
        assert_eq!(parsed.collector_number.as_deref(), Some("1494★"));

        assert_eq!(
            names(&[
                "1 Sol Ring (SLD) 1494★",
                "1 Lightning Bolt (PLST) 2XM-129†",
                "1 Swords to Plowshares (PEMN) 9s *F*",
                "1 Arcane Signet (P30A) 12p",
            ]),
            vec!["Sol Ring", "Lightning Bolt", "Swords to Plowshares", "Arcane Signet"]
        );
    }

    #[test]
    fn test_plain_names_and_blank_lines() {
        let cards = normalize(&["  Sol Ring  ", "", "   ", "Command Tower"]);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0], CardEntry::new("Sol Ring", 0));
        assert_eq!(cards[1], CardEntry::new("Command Tower", 1));
    }

    #[test]
    fn test_long_leading_number_is_part_of_name() {
        assert_eq!(names(&["1996 World Champion"]), vec!["1996 World Champion"]);
    }

    #[test]
    fn test_duplicates_are_kept() {
        assert_eq!(
            names(&["1 Island (DMU) 262", "1 Island (DMU) 263"]),
            vec!["Island", "Island"]
        );
    }

    #[test]
    fn test_unrecognized_line_is_passed_through() {
        let parsed = parse_line("(MOM) 12");
        assert!(!parsed.recognized);
        assert_eq!(parsed.name, "(MOM) 12");

        assert_eq!(names(&["4", "1 Sol Ring"]), vec!["4", "Sol Ring"]);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = [
            "1 Arcane Signet (OTC) 252",
            "2 Sol Ring",
            "1 Kros, Defense Contractor (MOM) 123",
            "1 Erase (Not the Urza's Legacy One) (UNH) 42",
        ];
        let once = names(&raw);
        let twice: Vec<String> = normalize(&once).into_iter().map(|c| c.name).collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_render_normalized() {
        let cards = normalize(&["1 Arcane Signet (OTC) 252", "2 Sol Ring"]);
        assert_eq!(render_normalized(&cards), "Arcane Signet\nSol Ring\n");
    }
}
