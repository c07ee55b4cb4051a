use crate::pattern::ast::WordPatternBuilder;
use crate::token::Token;

/// Build a token with all four attributes set.
pub fn tok(surface: &str, lemma: &str, pos: &str, syn: &str) -> Token {
    Token::new(surface).with_lemma(lemma).with_pos(pos).with_syn(syn)
}

/// A sentence whose surfaces equal their lemmas.
pub fn lemmas(words: &[&str]) -> Vec<Token> {
    words.iter().map(|w| tok(w, w, "X", "")).collect()
}

/// A sentence from `(surface, lemma)` pairs.
pub fn sentence(words: &[(&str, &str)]) -> Vec<Token> {
    words.iter().map(|(s, l)| tok(s, l, "X", "")).collect()
}

/// A word constrained on its lemma only.
pub fn lemma(value: &str) -> WordPatternBuilder {
    WordPatternBuilder::new().lemma(value)
}
