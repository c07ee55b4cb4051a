//! Multi-word expression patterns: building, compiling and matching.
//!
//! A pattern is assembled with the builders in [`ast`], frozen, and wrapped
//! in a [`Pattern`], which compiles it once into a [`CompiledMatcher`] on
//! first use. Matching a sentence yields [`MatchResult`]s lazily.

pub mod ast;
pub mod compiler;
pub mod encoder;
pub mod error;
pub mod matcher;
pub mod property;

pub use ast::{
    EitherBuilder, EitherPattern, Pattern, PatternNode, SequenceBuilder, SequencePattern,
    WordPattern, WordPatternBuilder, generic_pattern,
};
pub use compiler::{CompiledMatcher, SlotId, SlotKind, WHOLE_MATCH_ID};
pub use encoder::{ATTRIBUTE_SEPARATOR, EncodedSentence, WORD_SEPARATOR};
pub use error::PatternError;
pub use matcher::{MatchOptions, MatchResult, Matches, SelectionPolicy};
pub use property::{RegexProperty, WordProperty};
