//! Per-attribute constraints carried by a word pattern.
//!
//! Each property lowers to an automaton fragment matching one attribute
//! value (`to_base_pattern`). Sibling properties on the same attribute are
//! combined through lookaheads, so only one of them consumes input.

use std::borrow::Cow;

use super::encoder::{ATTRIBUTE_WILDCARD, NON_SEPARATOR, SEPARATOR_CHARS, SEPARATOR_CLASS};
use crate::diagnostic::{DiagnosticKind, Diagnostics, Location};
use crate::token::Attribute;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordProperty {
    /// Exact attribute value, e.g. `walk`.
    Literal(String),
    /// Regular expression over the value, e.g. `walk(s|ing|ed)?`.
    Regex(RegexProperty),
    /// `*` stands for any run of characters, e.g. `walk*`.
    Starred(String),
    /// Same value as `attribute` on the word with id `word_id`.
    Backref { word_id: String, attribute: Attribute },
}

/// What a property lowers to before it is placed in the automaton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BasePattern<'a> {
    /// A self-contained fragment.
    Expr(String),
    /// Must be resolved against the slot of another word's attribute.
    Reference { word_id: &'a str, attribute: Attribute },
}

impl WordProperty {
    pub fn literal(value: impl Into<String>) -> Self {
        WordProperty::Literal(value.into())
    }

    pub fn starred(value: impl Into<String>) -> Self {
        WordProperty::Starred(value.into())
    }

    pub fn backref(word_id: impl Into<String>, attribute: Attribute) -> Self {
        WordProperty::Backref {
            word_id: word_id.into(),
            attribute,
        }
    }

    /// Build a regex property. Problems are reported to `diagnostics`; the
    /// property is built anyway.
    pub fn regex(
        value: &str,
        flags: &str,
        location: Option<Location>,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        WordProperty::Regex(RegexProperty::new(value, flags, location, diagnostics))
    }

    /// The user-facing value, as written in the pattern.
    pub fn value(&self) -> Cow<'_, str> {
        match self {
            WordProperty::Literal(v) | WordProperty::Starred(v) => Cow::Borrowed(v),
            WordProperty::Regex(r) => Cow::Borrowed(&r.value),
            WordProperty::Backref { word_id, attribute } => {
                Cow::Owned(format!("back:{word_id}.{attribute}"))
            }
        }
    }

    pub fn to_base_pattern(&self) -> BasePattern<'_> {
        match self {
            WordProperty::Literal(v) => BasePattern::Expr(fancy_regex::escape(v).into_owned()),
            WordProperty::Starred(v) => BasePattern::Expr(
                fancy_regex::escape(v).replace("\\*", ATTRIBUTE_WILDCARD),
            ),
            WordProperty::Regex(r) => BasePattern::Expr(r.to_base_pattern()),
            WordProperty::Backref { word_id, attribute } => BasePattern::Reference {
                word_id,
                attribute: *attribute,
            },
        }
    }

    /// `None` for back-references, which need slot resolution first.
    pub fn to_positive_lookahead(&self) -> Option<String> {
        match self.to_base_pattern() {
            BasePattern::Expr(e) => Some(positive_lookahead(&e)),
            BasePattern::Reference { .. } => None,
        }
    }

    pub fn to_negative_lookahead(&self) -> Option<String> {
        match self.to_base_pattern() {
            BasePattern::Expr(e) => Some(negative_lookahead(&e)),
            BasePattern::Reference { .. } => None,
        }
    }
}

/// Require `expr` to match the whole attribute value at this point.
pub fn positive_lookahead(expr: &str) -> String {
    format!("(?={expr}{SEPARATOR_CLASS})")
}

/// Forbid `expr` from matching the whole attribute value at this point.
pub fn negative_lookahead(expr: &str) -> String {
    format!("(?!{expr}{SEPARATOR_CLASS})")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexProperty {
    value: String,
    case_insensitive: bool,
    /// `value` rewritten so it cannot run across separators.
    confined: String,
}

impl RegexProperty {
    pub fn new(
        value: &str,
        flags: &str,
        location: Option<Location>,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        for bad in bad_elements(value) {
            // `^` and `$` are implicit; `(?` openers break the word layout.
            diagnostics.warn(
                DiagnosticKind::BadRegex,
                location,
                format!("Bad regex element `{bad}` in `{value}`"),
            );
        }

        let mut case_insensitive = false;
        for flag in flags.chars() {
            if flag == 'i' {
                case_insensitive = true;
            } else {
                diagnostics.warn(
                    DiagnosticKind::BadRegexFlag,
                    location,
                    format!("Bad regex flag `{flag}`"),
                );
            }
        }

        let confined = confine(value);
        if let Err(e) = fancy_regex::Regex::new(&confined) {
            diagnostics.warn(
                DiagnosticKind::BadRegex,
                location,
                format!("Regex `{value}` does not compile: {e}"),
            );
        }

        Self {
            value: value.to_string(),
            case_insensitive,
            confined,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    fn to_base_pattern(&self) -> String {
        if self.case_insensitive {
            format!("(?i:{})", self.confined)
        } else {
            format!("(?:{})", self.confined)
        }
    }
}

/// Elements of a user regex that clash with the surrounding automaton.
/// Inside a bracket class these characters are literals.
fn bad_elements(value: &str) -> Vec<String> {
    let mut bad = Vec::new();
    let mut chars = value.chars().peekable();
    let mut in_class = false;
    let mut class_start = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    if next.is_alphanumeric() && !"sdwSDW".contains(next) {
                        bad.push(format!("\\{next}"));
                    }
                }
                class_start = false;
            }
            '[' if !in_class => {
                in_class = true;
                class_start = true;
                if chars.peek() == Some(&'^') {
                    chars.next();
                }
            }
            ']' if in_class && !class_start => in_class = false,
            _ if in_class => class_start = false,
            '^' => bad.push("^".to_string()),
            '$' => bad.push("$".to_string()),
            '(' if chars.peek() == Some(&'?') => bad.push("(?".to_string()),
            _ => {}
        }
    }
    bad
}

/// Rewrite `value` so that nothing in it can match a separator: `.` and
/// negated classes/escapes are narrowed to non-separator characters. A
/// positive class holding `\W`, `\D` or `\S` is guarded by a lookahead.
fn confine(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 16);
    let mut chars = value.chars().peekable();
    // Some(negated) while inside a bracket class.
    let mut class: Option<bool> = None;
    let mut class_start = false;
    // Where the open class begins in `out`, and whether it holds an escape
    // that can match a separator.
    let mut class_pos = 0;
    let mut class_wide = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let Some(next) = chars.next() else {
                    out.push('\\');
                    break;
                };
                match (class, next) {
                    (None, 'W' | 'D' | 'S') => {
                        out.push_str("[^\\");
                        out.push(next.to_ascii_lowercase());
                        out.push_str(SEPARATOR_CHARS);
                        out.push(']');
                    }
                    (Some(negated), _) => {
                        class_wide |= !negated && matches!(next, 'W' | 'D' | 'S');
                        out.push('\\');
                        out.push(next);
                    }
                    _ => {
                        out.push('\\');
                        out.push(next);
                    }
                }
                class_start = false;
            }
            '[' if class.is_none() => {
                class_pos = out.len();
                class_wide = false;
                out.push('[');
                let negated = chars.peek() == Some(&'^');
                if negated {
                    chars.next();
                    out.push('^');
                }
                class = Some(negated);
                class_start = true;
            }
            ']' if class.is_some() && !class_start => {
                if class == Some(true) {
                    out.push_str(SEPARATOR_CHARS);
                }
                out.push(']');
                if class_wide {
                    out.insert_str(class_pos, &format!("(?:(?!{SEPARATOR_CLASS})"));
                    out.push(')');
                }
                class = None;
            }
            '.' if class.is_none() => out.push_str(NON_SEPARATOR),
            _ => {
                out.push(c);
                class_start = false;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regex(value: &str, flags: &str) -> (WordProperty, Diagnostics) {
        let mut diags = Diagnostics::new();
        let prop = WordProperty::regex(value, flags, None, &mut diags);
        (prop, diags)
    }

    fn base(prop: &WordProperty) -> String {
        match prop.to_base_pattern() {
            BasePattern::Expr(e) => e,
            BasePattern::Reference { .. } => panic!("expected an expression"),
        }
    }

    fn whole(expr: &str) -> fancy_regex::Regex {
        fancy_regex::Regex::new(&format!("^{expr}$")).unwrap()
    }

    #[test]
    fn literal_is_escaped() {
        let prop = WordProperty::literal("a.b(c)");
        let re = whole(&base(&prop));
        assert!(re.is_match("a.b(c)").unwrap());
        assert!(!re.is_match("axb(c)").unwrap());
    }

    #[test]
    fn starred_expands_within_attribute() {
        let prop = WordProperty::starred("walk*");
        let re = whole(&base(&prop));
        assert!(re.is_match("walk").unwrap());
        assert!(re.is_match("walking").unwrap());
        assert!(!re.is_match("walk\u{1D}x").unwrap());
        assert!(!re.is_match("awalk").unwrap());
    }

    #[test]
    fn regex_dot_does_not_cross_separators() {
        let (prop, diags) = regex("wa.k", "");
        assert!(diags.is_empty());
        let re = whole(&base(&prop));
        assert!(re.is_match("walk").unwrap());
        assert!(!re.is_match("wa\u{1C}k").unwrap());
    }

    #[test]
    fn regex_escaped_dot_stays_literal() {
        let (prop, _) = regex(r"e\.g", "");
        let re = whole(&base(&prop));
        assert!(re.is_match("e.g").unwrap());
        assert!(!re.is_match("exg").unwrap());
    }

    #[test]
    fn regex_negated_class_excludes_separators() {
        let (prop, _) = regex("[^x]+", "");
        let re = whole(&base(&prop));
        assert!(re.is_match("abc").unwrap());
        assert!(!re.is_match("a\u{1D}c").unwrap());
        assert!(!re.is_match("axc").unwrap());
    }

    #[test]
    fn regex_negated_escape_excludes_separators() {
        let (prop, _) = regex(r"\W", "");
        let re = whole(&base(&prop));
        assert!(re.is_match("-").unwrap());
        assert!(!re.is_match("a").unwrap());
        assert!(!re.is_match("\u{1C}").unwrap());
    }

    #[test]
    fn regex_alternation_stays_local() {
        let (prop, _) = regex("walk|run", "");
        let re = whole(&format!("x{}y", base(&prop)));
        assert!(re.is_match("xruny").unwrap());
        assert!(!re.is_match("run").unwrap());
    }

    #[test]
    fn regex_case_insensitive_flag() {
        let (prop, diags) = regex("kick", "i");
        assert!(diags.is_empty());
        let re = whole(&base(&prop));
        assert!(re.is_match("KiCk").unwrap());
    }

    #[test]
    fn bad_flag_warns_and_is_dropped() {
        let (prop, diags) = regex("kick", "ix");
        assert_eq!(diags.count_of(DiagnosticKind::BadRegexFlag), 1);
        let WordProperty::Regex(r) = prop else {
            panic!("expected regex property");
        };
        assert!(r.is_case_insensitive());
    }

    #[test]
    fn bad_elements_warn_but_build() {
        let (_, diags) = regex("^walk$", "");
        assert_eq!(diags.count_of(DiagnosticKind::BadRegex), 2);
        let (_, diags) = regex("(?=a)b", "");
        assert_eq!(diags.count_of(DiagnosticKind::BadRegex), 1);
        let (_, diags) = regex(r"\bword", "");
        assert_eq!(diags.count_of(DiagnosticKind::BadRegex), 1);
    }

    #[test]
    fn class_caret_and_supported_escapes_do_not_warn() {
        let (_, diags) = regex(r"[^aeiou]\d\s\w\.", "");
        assert!(diags.is_empty(), "{:?}", diags.as_slice());
    }

    #[test]
    fn caret_inside_class_is_literal() {
        let (prop, diags) = regex("[a^]+", "");
        assert!(diags.is_empty(), "{:?}", diags.as_slice());
        let re = whole(&base(&prop));
        assert!(re.is_match("a^a").unwrap());
        let (_, diags) = regex("[$(?]x^", "");
        assert_eq!(diags.count_of(DiagnosticKind::BadRegex), 1);
    }

    #[test]
    fn regex_wide_escape_in_class_excludes_separators() {
        let (prop, diags) = regex(r"[\W\d]+", "");
        assert!(diags.is_empty());
        let re = whole(&base(&prop));
        assert!(re.is_match("-7!").unwrap());
        assert!(!re.is_match("a").unwrap());
        assert!(!re.is_match("-\u{1C}-").unwrap());
        assert!(!re.is_match("\u{1D}").unwrap());
    }

    #[test]
    fn uncompilable_regex_warns() {
        let (_, diags) = regex("wal(k", "");
        assert_eq!(diags.count_of(DiagnosticKind::BadRegex), 1);
    }

    #[test]
    fn lookaheads_are_anchored_to_the_value_end() {
        let prop = WordProperty::literal("la");
        let pos = prop.to_positive_lookahead().unwrap();
        let neg = prop.to_negative_lookahead().unwrap();
        let re_pos = fancy_regex::Regex::new(&format!("^{pos}{ATTRIBUTE_WILDCARD}\u{1D}")).unwrap();
        let re_neg = fancy_regex::Regex::new(&format!("^{neg}{ATTRIBUTE_WILDCARD}\u{1D}")).unwrap();
        assert!(re_pos.is_match("la\u{1D}").unwrap());
        assert!(!re_pos.is_match("lave\u{1D}").unwrap());
        assert!(re_neg.is_match("lave\u{1D}").unwrap());
        assert!(!re_neg.is_match("la\u{1D}").unwrap());
    }

    #[test]
    fn backref_needs_resolution() {
        let prop = WordProperty::backref("n1", Attribute::Lemma);
        assert_eq!(
            prop.to_base_pattern(),
            BasePattern::Reference {
                word_id: "n1",
                attribute: Attribute::Lemma
            }
        );
        assert!(prop.to_positive_lookahead().is_none());
        assert_eq!(prop.value(), "back:n1.lemma");
    }
}
