//! Linear encoding of a sentence, shared by the compiler and the matcher.
//!
//! A sentence becomes one string: every token is rendered as
//! `wordnum ATTR surface ATTR lemma ATTR pos ATTR ;syn;` and tokens are
//! joined (and surrounded) by `WORD`. The compiled automaton is written
//! against exactly this layout.

use std::ops::Range;

use super::error::PatternError;
use crate::token::{Attribute, Token};

/// Delimits tokens.
pub const WORD_SEPARATOR: char = '\u{1C}';
/// Delimits attributes inside a token.
pub const ATTRIBUTE_SEPARATOR: char = '\u{1D}';

/// Any run of characters that stays inside one attribute value.
pub(crate) const ATTRIBUTE_WILDCARD: &str = "[^\u{1D}\u{1C}]*";
/// One character that stays inside one attribute value.
pub(crate) const NON_SEPARATOR: &str = "[^\u{1D}\u{1C}]";
/// Either separator; ends an attribute value.
pub(crate) const SEPARATOR_CLASS: &str = "[\u{1D}\u{1C}]";
/// Both separators, for splicing into a negated character class.
pub(crate) const SEPARATOR_CHARS: &str = "\u{1D}\u{1C}";

#[derive(Debug, Clone)]
pub struct EncodedSentence {
    text: String,
    /// Byte offset of the first character of each token.
    offsets: Vec<usize>,
}

impl EncodedSentence {
    pub fn encode(tokens: &[Token]) -> Result<Self, PatternError> {
        let mut text = String::from(WORD_SEPARATOR);
        let mut offsets = Vec::with_capacity(tokens.len());

        for (index, token) in tokens.iter().enumerate() {
            for attribute in Attribute::ALL {
                if token.get(attribute).contains([WORD_SEPARATOR, ATTRIBUTE_SEPARATOR]) {
                    return Err(PatternError::Unencodable {
                        token: index,
                        attribute,
                    });
                }
            }

            offsets.push(text.len());
            text.push_str(&(index + 1).to_string());
            for attribute in [Attribute::Surface, Attribute::Lemma, Attribute::Pos] {
                text.push(ATTRIBUTE_SEPARATOR);
                text.push_str(token.get(attribute));
            }
            // `;` on both sides lets a dependency fragment match one
            // `rel:head` pair anywhere in the field.
            text.push(ATTRIBUTE_SEPARATOR);
            text.push(';');
            text.push_str(&token.syn);
            text.push(';');
            text.push(WORD_SEPARATOR);
        }

        Ok(Self { text, offsets })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Indices of the tokens whose region starts inside `span`.
    pub fn tokens_in(&self, span: Range<usize>) -> Range<usize> {
        let first = self.offsets.partition_point(|&o| o < span.start);
        let last = self.offsets.partition_point(|&o| o < span.end);
        first..last.max(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::tok;

    fn printable(s: &str) -> String {
        s.replace(WORD_SEPARATOR, "@").replace(ATTRIBUTE_SEPARATOR, ",")
    }

    #[test]
    fn encodes_layout_and_offsets() {
        let tokens = vec![
            tok("The", "the", "DT", "det:2"),
            tok("cat", "cat", "NN", ""),
        ];
        let enc = EncodedSentence::encode(&tokens).unwrap();
        assert_eq!(printable(enc.as_str()), "@1,The,the,DT,;det:2;@2,cat,cat,NN,;;@");
        assert_eq!(enc.offsets(), &[1, 22]);
        assert_eq!(&enc.as_str()[enc.offsets()[1]..enc.offsets()[1] + 1], "2");
    }

    #[test]
    fn empty_sentence_is_one_separator() {
        let enc = EncodedSentence::encode(&[]).unwrap();
        assert_eq!(enc.as_str(), "\u{1C}");
        assert!(enc.is_empty());
    }

    #[test]
    fn rejects_separator_in_token_text() {
        let tokens = vec![tok("a", "a", "X", ""), tok("b\u{1C}", "b", "X", "")];
        let err = EncodedSentence::encode(&tokens).unwrap_err();
        assert_eq!(
            err,
            PatternError::Unencodable {
                token: 1,
                attribute: Attribute::Surface
            }
        );
    }

    #[test]
    fn tokens_in_span() {
        let tokens: Vec<_> = ["a", "b", "c"].iter().map(|s| tok(s, s, "X", "")).collect();
        let enc = EncodedSentence::encode(&tokens).unwrap();
        let o = enc.offsets().to_vec();
        assert_eq!(enc.tokens_in(o[0] - 1..o[2]), 0..2);
        assert_eq!(enc.tokens_in(o[1]..o[1] + 1), 1..2);
        assert_eq!(enc.tokens_in(o[1] + 1..o[2] - 1), 2..2);
        assert_eq!(enc.tokens_in(0..enc.as_str().len()), 0..3);
    }

    #[test]
    fn multibyte_text_keeps_offsets_on_char_boundaries() {
        let tokens = vec![tok("été", "être", "V", ""), tok("là", "là", "ADV", "")];
        let enc = EncodedSentence::encode(&tokens).unwrap();
        for &o in enc.offsets() {
            assert!(enc.as_str().is_char_boundary(o));
            assert!(enc.as_str().is_char_boundary(o - 1));
        }
    }
}
