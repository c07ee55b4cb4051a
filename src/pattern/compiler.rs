//! Pattern compiler.
//!
//! A frozen pattern is walked once, pre-order and left to right, and
//! lowered into a single automaton over the sentence encoding from
//! `encoder`. Ids, ignore scopes, the attribute captures of id-carrying
//! words and reference placeholders all become numbered slots; each slot
//! is emitted as the named group `s<N>`.
//!
//! References to words that have not been compiled yet (fore-references)
//! capture into a placeholder slot and are queued. The queue entry is
//! resolved when the referenced field is compiled, by requiring that field
//! to equal the placeholder. Entries still queued at the end constrain
//! nothing and are reported.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;

use super::ast::{EitherPattern, PatternNode, SequencePattern, WordPattern};
use super::encoder::{ATTRIBUTE_SEPARATOR, ATTRIBUTE_WILDCARD, WORD_SEPARATOR};
use super::error::PatternError;
use super::property::{BasePattern, negative_lookahead, positive_lookahead};
use crate::diagnostic::{Diagnostic, DiagnosticKind, Diagnostics, Location};
use crate::token::Attribute;

/// Id under which the whole match is always available.
pub const WHOLE_MATCH_ID: &str = "*";

static VALID_REPEAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\*|\+|\?|\{[0-9]*,[0-9]*\}|\{[0-9]+\})$").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(usize);

impl SlotId {
    pub const WHOLE: SlotId = SlotId(0);

    pub fn index(self) -> usize {
        self.0
    }

    pub(crate) fn from_index(index: usize) -> Self {
        SlotId(index)
    }

    fn group_name(self) -> String {
        format!("s{}", self.0)
    }
}

/// The parts of an encoded word a slot can capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// The 1-based token position.
    Position,
    Attr(Attribute),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotKind {
    Whole,
    Id(String),
    Ignore,
    Field { word_id: String, field: Field },
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct Slot {
    pub kind: SlotKind,
    pub parent: Option<SlotId>,
}

#[derive(Debug)]
struct PendingRef {
    placeholder: SlotId,
    target: String,
    field: Field,
    negated: bool,
    location: Option<Location>,
}

/// Automaton source plus slot bookkeeping, before the engine compiles it.
#[derive(Debug)]
pub(crate) struct Lowered {
    pub source: String,
    pub slots: Vec<Slot>,
    pub ids: BTreeMap<String, SlotId>,
    pub diagnostics: Diagnostics,
}

pub(crate) fn lower(root: &PatternNode) -> Result<Lowered, PatternError> {
    let mut compiler = Compiler::new();
    compiler.out.push(WORD_SEPARATOR);
    compiler.node(root, SlotId::WHOLE, None)?;
    Ok(compiler.finish())
}

struct Compiler {
    out: String,
    slots: Vec<Slot>,
    ids: BTreeMap<String, SlotId>,
    /// Fields of id-carrying words compiled so far.
    fields: HashMap<(String, Field), SlotId>,
    pending: Vec<PendingRef>,
    diagnostics: Diagnostics,
}

impl Compiler {
    fn new() -> Self {
        let mut ids = BTreeMap::new();
        ids.insert(WHOLE_MATCH_ID.to_string(), SlotId::WHOLE);
        Self {
            out: String::new(),
            slots: vec![Slot {
                kind: SlotKind::Whole,
                parent: None,
            }],
            ids,
            fields: HashMap::new(),
            pending: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    fn finish(mut self) -> Lowered {
        for p in std::mem::take(&mut self.pending) {
            self.diagnostics.warn(
                DiagnosticKind::UnresolvedReference,
                p.location,
                format!("Reference to undefined id `{}`", p.target),
            );
        }
        Lowered {
            source: self.out,
            slots: self.slots,
            ids: self.ids,
            diagnostics: self.diagnostics,
        }
    }

    fn alloc(&mut self, kind: SlotKind, parent: SlotId) -> SlotId {
        let slot = SlotId(self.slots.len());
        self.slots.push(Slot {
            kind,
            parent: Some(parent),
        });
        slot
    }

    fn open(&mut self, slot: SlotId) {
        let _ = write!(self.out, "(?P<{}>", slot.group_name());
    }

    /// Word ids and sequence ids share one namespace.
    fn declare_id(
        &mut self,
        id: &str,
        parent: SlotId,
        location: Option<Location>,
    ) -> Result<SlotId, PatternError> {
        if self.ids.contains_key(id) {
            return Err(PatternError::DuplicateId {
                id: id.to_string(),
                location,
            });
        }
        let slot = self.alloc(SlotKind::Id(id.to_string()), parent);
        self.ids.insert(id.to_string(), slot);
        Ok(slot)
    }

    fn check_repeat_scope(&mut self, scope: Option<&SequencePattern>, location: Option<Location>) {
        if let Some(repeat) = scope {
            let at = repeat
                .location()
                .map(|l| format!(" (`repeat` at {l})"))
                .unwrap_or_default();
            self.diagnostics.warn(
                DiagnosticKind::ScopedUnderRepeat,
                location,
                format!("Elem cannot have `id` or `ignore` under a `repeat` scope{at}"),
            );
        }
    }

    fn node<'p>(
        &mut self,
        node: &'p PatternNode,
        parent: SlotId,
        repeat_scope: Option<&'p SequencePattern>,
    ) -> Result<(), PatternError> {
        match node {
            PatternNode::Word(w) => self.word(w, parent, repeat_scope),
            PatternNode::Sequence(s) => self.sequence(s, parent, repeat_scope),
            PatternNode::Either(e) => self.either(e, parent, repeat_scope),
        }
    }

    fn sequence<'p>(
        &mut self,
        seq: &'p SequencePattern,
        mut parent: SlotId,
        repeat_scope: Option<&'p SequencePattern>,
    ) -> Result<(), PatternError> {
        let mut closers = 0;

        if seq.ignore() {
            self.check_repeat_scope(repeat_scope, seq.location());
            let slot = self.alloc(SlotKind::Ignore, parent);
            self.open(slot);
            closers += 1;
            parent = slot;
        }

        if let Some(id) = seq.id() {
            self.check_repeat_scope(repeat_scope, seq.location());
            let slot = self.declare_id(id, parent, seq.location())?;
            self.open(slot);
            closers += 1;
            parent = slot;
        }

        let inner_scope = match seq.repeat() {
            Some(_) => {
                self.out.push_str("(?:");
                Some(seq)
            }
            None => repeat_scope,
        };

        for child in seq.children() {
            self.node(child, parent, inner_scope)?;
        }

        if let Some(repeat) = seq.repeat() {
            let quantifier = self.quantifier(repeat, seq.location());
            self.out.push(')');
            self.out.push_str(&quantifier);
        }

        for _ in 0..closers {
            self.out.push(')');
        }
        Ok(())
    }

    fn quantifier(&mut self, repeat: &str, location: Option<Location>) -> String {
        if !VALID_REPEAT.is_match(repeat) {
            self.diagnostics.warn(
                DiagnosticKind::InvalidRepeat,
                location,
                format!("Invalid repeat pattern: {repeat}"),
            );
            return repeat.to_string();
        }
        match repeat.strip_prefix("{,") {
            Some(rest) => format!("{{0,{rest}"),
            None => repeat.to_string(),
        }
    }

    fn either<'p>(
        &mut self,
        either: &'p EitherPattern,
        parent: SlotId,
        repeat_scope: Option<&'p SequencePattern>,
    ) -> Result<(), PatternError> {
        self.out.push_str("(?:");
        for (i, branch) in either.branches().iter().enumerate() {
            if i > 0 {
                self.out.push('|');
            }
            self.sequence(branch, parent, repeat_scope)?;
        }
        self.out.push(')');
        Ok(())
    }

    fn word(
        &mut self,
        word: &WordPattern,
        parent: SlotId,
        repeat_scope: Option<&SequencePattern>,
    ) -> Result<(), PatternError> {
        let word_slot = match word.id() {
            Some(id) => {
                self.check_repeat_scope(repeat_scope, word.location());
                let slot = self.declare_id(id, parent, word.location())?;
                self.open(slot);
                Some(slot)
            }
            None => None,
        };
        let scope = word_slot.unwrap_or(parent);

        self.field(word, Field::Position, scope, |_| "[0-9]+".to_string());
        for attribute in Attribute::ALL {
            self.out.push(ATTRIBUTE_SEPARATOR);
            self.field(word, Field::Attr(attribute), scope, |c| {
                c.attribute_fragment(word, attribute, scope)
            });
        }
        self.out.push(WORD_SEPARATOR);

        if word_slot.is_some() {
            self.out.push(')');
        }
        Ok(())
    }

    /// Emit one field of `word`. For id-carrying words the field gets its
    /// own slot, and queued fore-references to it are unified first.
    fn field(
        &mut self,
        word: &WordPattern,
        field: Field,
        scope: SlotId,
        fragment: impl FnOnce(&mut Self) -> String,
    ) {
        let Some(id) = word.id() else {
            let fragment = fragment(self);
            self.out.push_str(&fragment);
            return;
        };

        let slot = self.alloc(
            SlotKind::Field {
                word_id: id.to_string(),
                field,
            },
            scope,
        );
        let mut unify = String::new();
        self.pending.retain(|p| {
            if p.target != id || p.field != field {
                return true;
            }
            let backref = backref(p.placeholder);
            unify.push_str(&if p.negated {
                negative_lookahead(&backref)
            } else {
                positive_lookahead(&backref)
            });
            false
        });
        let fragment = fragment(self);

        self.open(slot);
        self.out.push_str(&unify);
        self.out.push_str(&fragment);
        self.out.push(')');
        self.fields.insert((id.to_string(), field), slot);
    }

    /// Conjunction of every property on `attribute`: one consuming base,
    /// everything else as lookaheads in front of it.
    fn attribute_fragment(&mut self, word: &WordPattern, attribute: Attribute, scope: SlotId) -> String {
        let confine = |expr: String| {
            // Relation fields are encoded as `;value;`.
            if attribute == Attribute::Syn {
                format!(";{expr};")
            } else {
                expr
            }
        };

        let mut base = None;
        let mut lookaheads = String::new();
        let mut placeholder = None;

        if attribute == Attribute::Syn {
            base = self.dependency_fragment(word, scope);
        }

        for (props, negated) in [
            (word.positive(attribute), false),
            (word.negative(attribute), true),
        ] {
            for prop in props {
                let expr = match prop.to_base_pattern() {
                    BasePattern::Expr(e) => confine(e),
                    BasePattern::Reference {
                        word_id,
                        attribute: target,
                    } => match self.fields.get(&(word_id.to_string(), Field::Attr(target))) {
                        Some(&slot) => backref(slot),
                        None => {
                            let slot = *placeholder
                                .get_or_insert_with(|| self.alloc(SlotKind::Placeholder, scope));
                            self.pending.push(PendingRef {
                                placeholder: slot,
                                target: word_id.to_string(),
                                field: Field::Attr(target),
                                negated,
                                location: word.location(),
                            });
                            continue;
                        }
                    },
                };
                if negated {
                    lookaheads.push_str(&negative_lookahead(&expr));
                } else if base.is_none() {
                    base = Some(expr);
                } else {
                    lookaheads.push_str(&positive_lookahead(&expr));
                }
            }
        }

        if let Some(slot) = placeholder {
            let capture = format!("(?P<{}>{ATTRIBUTE_WILDCARD})", slot.group_name());
            match base {
                None => base = Some(capture),
                Some(_) => lookaheads.push_str(&positive_lookahead(&capture)),
            }
        }

        lookaheads.push_str(base.as_deref().unwrap_or(ATTRIBUTE_WILDCARD));
        lookaheads
    }

    /// Fragment for the first `rel:wordid` dependency of `word`, matching
    /// one `;rel:head;` pair whose head is the position of `wordid`.
    fn dependency_fragment(&mut self, word: &WordPattern, scope: SlotId) -> Option<String> {
        let (first, extra) = word.dependencies().split_first()?;
        for dep in extra {
            self.diagnostics.warn(
                DiagnosticKind::ExtraDependency,
                word.location(),
                format!("Only the first syntactic dependency is used; `{dep}` dropped"),
            );
        }

        let Some((relation, target)) = first.rsplit_once(':') else {
            self.diagnostics.warn(
                DiagnosticKind::MalformedDependency,
                word.location(),
                format!("Dependency `{first}` is not of the form `rel:wordid`"),
            );
            return None;
        };
        let relation = fancy_regex::escape(relation);

        let head = match self.fields.get(&(target.to_string(), Field::Position)) {
            Some(&slot) => backref(slot),
            None => {
                let slot = self.alloc(SlotKind::Placeholder, scope);
                self.pending.push(PendingRef {
                    placeholder: slot,
                    target: target.to_string(),
                    field: Field::Position,
                    negated: false,
                    location: word.location(),
                });
                format!("(?P<{}>[0-9]+)", slot.group_name())
            }
        };
        Some(format!(
            "{ATTRIBUTE_WILDCARD};{relation}:{head};{ATTRIBUTE_WILDCARD}"
        ))
    }
}

fn backref(slot: SlotId) -> String {
    format!("\\k<{}>", slot.group_name())
}

/// A compiled pattern. Immutable; one instance can serve any number of
/// sentences, from any number of threads.
#[derive(Debug)]
pub struct CompiledMatcher {
    pub(super) regex: fancy_regex::Regex,
    source: String,
    slots: Vec<Slot>,
    ids: BTreeMap<String, SlotId>,
    /// Capture group of each slot.
    groups: Vec<Option<usize>>,
    /// For each slot, the ignore slots nested in it (itself included).
    ignored_descendants: Vec<Vec<SlotId>>,
    diagnostics: Vec<Diagnostic>,
}

impl CompiledMatcher {
    pub fn compile(root: &PatternNode) -> Result<Self, PatternError> {
        let lowered = lower(root)?;
        let regex = fancy_regex::Regex::new(&format!("^(?:{})", lowered.source))
            .map_err(|e| PatternError::Automaton(e.to_string()))?;

        let mut diagnostics = lowered.diagnostics;
        if regex
            .is_match(&WORD_SEPARATOR.to_string())
            .unwrap_or(false)
        {
            diagnostics.warn(
                DiagnosticKind::EmptyMatch,
                root.location(),
                "Pattern matches empty string",
            );
        }

        let by_name: HashMap<&str, usize> = regex
            .capture_names()
            .enumerate()
            .filter_map(|(group, name)| name.map(|n| (n, group)))
            .collect();
        let groups = (0..lowered.slots.len())
            .map(|i| match i {
                0 => Some(0),
                _ => by_name.get(SlotId(i).group_name().as_str()).copied(),
            })
            .collect();

        let mut ignored_descendants = vec![Vec::new(); lowered.slots.len()];
        for (i, slot) in lowered.slots.iter().enumerate() {
            if slot.kind != SlotKind::Ignore {
                continue;
            }
            let mut ancestor = Some(SlotId(i));
            while let Some(a) = ancestor {
                ignored_descendants[a.0].push(SlotId(i));
                ancestor = lowered.slots[a.0].parent;
            }
        }

        tracing::debug!(
            slots = lowered.slots.len(),
            ids = lowered.ids.len(),
            warnings = diagnostics.len(),
            "compiled pattern"
        );

        Ok(Self {
            regex,
            source: lowered.source,
            slots: lowered.slots,
            ids: lowered.ids,
            groups,
            ignored_descendants,
            diagnostics: diagnostics.into_vec(),
        })
    }

    /// The automaton source, without the start anchor.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The automaton with `@` for word separators, `,` for attribute
    /// separators and `_` for unconstrained attributes.
    pub fn printable_pattern(&self) -> String {
        self.source
            .replace(WORD_SEPARATOR, "@")
            .replace(ATTRIBUTE_SEPARATOR, ",")
            .replace("[^,@]*", "_")
    }

    /// Requestable ids and their slots, `*` included.
    pub fn ids(&self) -> impl Iterator<Item = (&str, SlotId)> {
        self.ids.iter().map(|(id, &slot)| (id.as_str(), slot))
    }

    pub fn slot_of(&self, id: &str) -> Option<SlotId> {
        self.ids.get(id).copied()
    }

    pub fn slot(&self, slot: SlotId) -> &Slot {
        &self.slots[slot.0]
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn parent_of(&self, slot: SlotId) -> Option<SlotId> {
        self.slots[slot.0].parent
    }

    pub fn ignored_slots(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.kind == SlotKind::Ignore)
            .map(|(i, _)| SlotId(i))
    }

    pub fn ignored_descendants(&self, slot: SlotId) -> &[SlotId] {
        &self.ignored_descendants[slot.0]
    }

    pub(super) fn group_of(&self, slot: SlotId) -> Option<usize> {
        self.groups[slot.0]
    }

    /// Warnings raised while compiling.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}
