//! Pattern AST.
//!
//! Patterns are assembled with the `*Builder` types and frozen into
//! immutable nodes. Frozen nodes have no mutation methods; the only way to
//! change a pattern is to build a new one.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::compiler::CompiledMatcher;
use super::error::PatternError;
use super::matcher::{MatchOptions, Matches};
use super::property::WordProperty;
use crate::diagnostic::Location;
use crate::token::{Attribute, Token};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternNode {
    Word(WordPattern),
    Sequence(SequencePattern),
    Either(EitherPattern),
}

impl PatternNode {
    pub fn location(&self) -> Option<Location> {
        match self {
            PatternNode::Word(w) => w.location,
            PatternNode::Sequence(s) => s.location,
            PatternNode::Either(e) => e.location,
        }
    }
}

/// Constraints on a single token.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WordPattern {
    id: Option<String>,
    positive: BTreeMap<Attribute, Vec<WordProperty>>,
    negative: BTreeMap<Attribute, Vec<WordProperty>>,
    /// Raw `rel:wordid` dependency values, in declaration order.
    dependencies: Vec<String>,
    location: Option<Location>,
}

impl WordPattern {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn positive(&self, attribute: Attribute) -> &[WordProperty] {
        self.positive
            .get(&attribute)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn negative(&self, attribute: Attribute) -> &[WordProperty] {
        self.negative
            .get(&attribute)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn location(&self) -> Option<Location> {
        self.location
    }
}

/// An ordered run of sub-patterns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SequencePattern {
    children: Vec<PatternNode>,
    id: Option<String>,
    /// `*`, `+`, `?` or `{m,n}`; anything else is passed through verbatim.
    repeat: Option<String>,
    /// Matched tokens are consumed but left out of extracted indices.
    ignore: bool,
    location: Option<Location>,
}

impl SequencePattern {
    pub fn children(&self) -> &[PatternNode] {
        &self.children
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn repeat(&self) -> Option<&str> {
        self.repeat.as_deref()
    }

    pub fn ignore(&self) -> bool {
        self.ignore
    }

    pub fn location(&self) -> Option<Location> {
        self.location
    }
}

/// Alternation; earlier branches win when several match the same span.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EitherPattern {
    branches: Vec<SequencePattern>,
    location: Option<Location>,
}

impl EitherPattern {
    pub fn branches(&self) -> &[SequencePattern] {
        &self.branches
    }

    pub fn location(&self) -> Option<Location> {
        self.location
    }
}

#[derive(Debug, Clone, Default)]
pub struct WordPatternBuilder {
    word: WordPattern,
}

impl WordPatternBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.word.id = Some(id.into());
        self
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.word.location = Some(Location { line, column });
        self
    }

    /// Add `attribute = value` (or `attribute != value` when `negated`).
    pub fn prop(mut self, attribute: Attribute, value: WordProperty, negated: bool) -> Self {
        let props = if negated {
            &mut self.word.negative
        } else {
            &mut self.word.positive
        };
        props.entry(attribute).or_default().push(value);
        self
    }

    pub fn literal(self, attribute: Attribute, value: impl Into<String>) -> Self {
        self.prop(attribute, WordProperty::literal(value), false)
    }

    pub fn not_literal(self, attribute: Attribute, value: impl Into<String>) -> Self {
        self.prop(attribute, WordProperty::literal(value), true)
    }

    pub fn lemma(self, value: impl Into<String>) -> Self {
        self.literal(Attribute::Lemma, value)
    }

    pub fn pos(self, value: impl Into<String>) -> Self {
        self.literal(Attribute::Pos, value)
    }

    pub fn surface(self, value: impl Into<String>) -> Self {
        self.literal(Attribute::Surface, value)
    }

    /// Require a `rel:wordid` dependency on the word identified by `wordid`.
    pub fn dependency(mut self, value: impl Into<String>) -> Self {
        self.word.dependencies.push(value.into());
        self
    }

    pub fn freeze(self) -> WordPattern {
        self.word
    }
}

#[derive(Debug, Clone, Default)]
pub struct SequenceBuilder {
    seq: SequencePattern,
}

impl SequenceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// An ignored run of at most `max` unconstrained words.
    pub fn gap(max: usize) -> Self {
        Self::new()
            .ignore(true)
            .repeat(format!("{{0,{max}}}"))
            .push(WordPatternBuilder::new())
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.seq.id = Some(id.into());
        self
    }

    /// An empty string clears the repeat.
    pub fn repeat(mut self, repeat: impl Into<String>) -> Self {
        let repeat = repeat.into();
        self.seq.repeat = (!repeat.is_empty()).then_some(repeat);
        self
    }

    pub fn ignore(mut self, ignore: bool) -> Self {
        self.seq.ignore = ignore;
        self
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.seq.location = Some(Location { line, column });
        self
    }

    pub fn push(mut self, child: impl Into<PatternNode>) -> Self {
        self.seq.children.push(child.into());
        self
    }

    pub fn insert(mut self, index: usize, child: impl Into<PatternNode>) -> Self {
        self.seq.children.insert(index, child.into());
        self
    }

    pub fn freeze(self) -> SequencePattern {
        self.seq
    }
}

#[derive(Debug, Clone, Default)]
pub struct EitherBuilder {
    either: EitherPattern,
}

impl EitherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.either.location = Some(Location { line, column });
        self
    }

    pub fn branch(mut self, branch: impl Into<SequencePattern>) -> Self {
        self.either.branches.push(branch.into());
        self
    }

    pub fn freeze(self) -> EitherPattern {
        self.either
    }
}

impl From<WordPattern> for PatternNode {
    fn from(w: WordPattern) -> Self {
        PatternNode::Word(w)
    }
}

impl From<SequencePattern> for PatternNode {
    fn from(s: SequencePattern) -> Self {
        PatternNode::Sequence(s)
    }
}

impl From<EitherPattern> for PatternNode {
    fn from(e: EitherPattern) -> Self {
        PatternNode::Either(e)
    }
}

impl From<WordPatternBuilder> for PatternNode {
    fn from(b: WordPatternBuilder) -> Self {
        PatternNode::Word(b.freeze())
    }
}

impl From<SequenceBuilder> for PatternNode {
    fn from(b: SequenceBuilder) -> Self {
        PatternNode::Sequence(b.freeze())
    }
}

impl From<EitherBuilder> for PatternNode {
    fn from(b: EitherBuilder) -> Self {
        PatternNode::Either(b.freeze())
    }
}

impl From<SequenceBuilder> for SequencePattern {
    fn from(b: SequenceBuilder) -> Self {
        b.freeze()
    }
}

/// A frozen pattern together with its lazily compiled matcher.
///
/// The matcher is built on first use and shared by every later call,
/// including calls from other threads.
#[derive(Debug)]
pub struct Pattern {
    root: PatternNode,
    matcher: OnceLock<Result<CompiledMatcher, PatternError>>,
}

impl Pattern {
    pub fn new(root: impl Into<PatternNode>) -> Self {
        Self {
            root: root.into(),
            matcher: OnceLock::new(),
        }
    }

    pub fn root(&self) -> &PatternNode {
        &self.root
    }

    pub fn matcher(&self) -> Result<&CompiledMatcher, PatternError> {
        self.matcher
            .get_or_init(|| CompiledMatcher::compile(&self.root))
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn matches<'p, 't>(
        &'p self,
        tokens: &'t [Token],
        options: &MatchOptions,
    ) -> Result<Matches<'p, 't>, PatternError> {
        self.matcher()?.matches(tokens, options)
    }
}

impl Clone for Pattern {
    fn clone(&self) -> Self {
        Self::new(self.root.clone())
    }
}

/// A pattern matching any n-gram of `min` to `max` words.
pub fn generic_pattern(min: usize, max: usize) -> Pattern {
    Pattern::new(
        SequenceBuilder::new()
            .repeat(format!("{{{min},{max}}}"))
            .push(WordPatternBuilder::new()),
    )
}
