//! Runtime side of a compiled pattern: scanning one encoded sentence and
//! turning automaton spans back into token indices.

use std::collections::VecDeque;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use fancy_regex::Captures;
use serde::{Deserialize, Serialize};

use super::compiler::{CompiledMatcher, SlotId, WHOLE_MATCH_ID};
use super::encoder::EncodedSentence;
use super::error::PatternError;
use crate::diagnostic::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::token::Token;

/// Which of the matches starting at one position are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionPolicy {
    #[default]
    All,
    Longest,
    Shortest,
}

impl SelectionPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            SelectionPolicy::All => "All",
            SelectionPolicy::Longest => "Longest",
            SelectionPolicy::Shortest => "Shortest",
        }
    }
}

impl FromStr for SelectionPolicy {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "All" => Ok(SelectionPolicy::All),
            "Longest" => Ok(SelectionPolicy::Longest),
            "Shortest" => Ok(SelectionPolicy::Shortest),
            other => Err(PatternError::BadPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOptions {
    pub policy: SelectionPolicy,
    /// When false, scanning resumes after the reported match.
    pub overlapping: bool,
    /// Ids whose tokens make up each result, in order.
    pub ids: Vec<String>,
    /// Only try the first token position.
    pub anchor_begin: bool,
    /// Report at most one match per token position.
    pub anchor_end: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            policy: SelectionPolicy::All,
            overlapping: true,
            ids: vec![WHOLE_MATCH_ID.to_string()],
            anchor_begin: false,
            anchor_end: false,
        }
    }
}

impl MatchOptions {
    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn non_overlapping(mut self) -> Self {
        self.overlapping = false;
        self
    }

    pub fn validate(&self) -> Result<(), PatternError> {
        if self.policy == SelectionPolicy::All && !self.overlapping {
            return Err(PatternError::AllRequiresOverlapping);
        }
        Ok(())
    }
}

/// Tokens extracted for one match, with their positions in the sentence.
///
/// `indices` are grouped by requested id; within one id they are in
/// sentence order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub ngram: Vec<Token>,
    pub indices: Vec<usize>,
}

impl MatchResult {
    /// True when the sorted indices skip over at least one token.
    pub fn has_gap(&self) -> bool {
        let mut sorted = self.indices.clone();
        sorted.sort_unstable();
        sorted.windows(2).any(|w| w[1] - w[0] > 1)
    }

    pub fn surface(&self) -> String {
        self.ngram
            .iter()
            .map(|t| t.surface.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl CompiledMatcher {
    /// Scan `tokens` lazily. Fails up front on an invalid option set or a
    /// sentence that cannot be encoded.
    pub fn matches<'p, 't>(
        &'p self,
        tokens: &'t [Token],
        options: &MatchOptions,
    ) -> Result<Matches<'p, 't>, PatternError> {
        options.validate()?;
        let sentence = EncodedSentence::encode(tokens)?;

        let mut diagnostics = Diagnostics::new();
        let mut requested = Vec::with_capacity(options.ids.len());
        for id in &options.ids {
            match self.slot_of(id) {
                Some(slot) => requested.push(slot),
                None => diagnostics.warn_once(
                    id,
                    DiagnosticKind::UnknownId,
                    format!("Unknown id `{id}` requested"),
                ),
            }
        }

        Ok(Matches {
            matcher: self,
            tokens,
            sentence,
            options: options.clone(),
            requested,
            cursor: 0,
            queue: VecDeque::new(),
            diagnostics,
            done: false,
        })
    }
}

/// Lazy sequence of matches over one sentence.
pub struct Matches<'p, 't> {
    matcher: &'p CompiledMatcher,
    tokens: &'t [Token],
    sentence: EncodedSentence,
    options: MatchOptions,
    requested: Vec<SlotId>,
    cursor: usize,
    queue: VecDeque<MatchResult>,
    diagnostics: Diagnostics,
    done: bool,
}

impl Matches<'_, '_> {
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    /// Drain the remaining matches, returning them with the diagnostics
    /// raised along the way, stamped with `sentence`.
    pub fn collect_for_sentence(mut self, sentence: usize) -> (Vec<MatchResult>, Vec<Diagnostic>) {
        let results: Vec<_> = self.by_ref().collect();
        let diagnostics = self
            .diagnostics
            .into_vec()
            .into_iter()
            .map(|d| d.in_sentence(sentence))
            .collect();
        (results, diagnostics)
    }

    /// Every match anchored at the current cursor, longest first. Each
    /// retry hides the end of the previous match from the automaton.
    fn matches_here(&mut self) -> Vec<(Range<usize>, Vec<Option<Range<usize>>>)> {
        let text = self.sentence.as_str();
        let start = self.sentence.offsets()[self.cursor] - 1;
        let mut end = text.len();
        let mut found = Vec::new();

        loop {
            let caps = match self.matcher.regex.captures(&text[start..end]) {
                Ok(Some(caps)) => caps,
                Ok(None) => break,
                Err(e) => {
                    let message = format!("Matching aborted: {e}");
                    self.diagnostics.push(
                        Diagnostic::warning(DiagnosticKind::MatchAborted, message)
                            .at_token(self.cursor),
                    );
                    break;
                }
            };
            let Some(whole) = caps.get(0) else { break };
            let match_end = start + whole.end();
            found.push((start..match_end, self.spans(&caps, start)));

            if self.options.anchor_end {
                break;
            }
            end = match_end - 1;
            if end <= start {
                break;
            }
        }
        found
    }

    /// Byte span of every slot in `caps`, shifted back to sentence offsets.
    fn spans(&self, caps: &Captures<'_>, start: usize) -> Vec<Option<Range<usize>>> {
        (0..self.matcher.slot_count())
            .map(|i| {
                let group = self.matcher.group_of(SlotId::from_index(i))?;
                let m = caps.get(group)?;
                Some(start + m.start()..start + m.end())
            })
            .collect()
    }

    fn extract(&self, spans: &[Option<Range<usize>>]) -> MatchResult {
        let mut result = MatchResult {
            ngram: Vec::new(),
            indices: Vec::new(),
        };
        for &slot in &self.requested {
            let Some(span) = spans[slot.index()].clone() else {
                continue;
            };
            let ignored: Vec<Range<usize>> = self
                .matcher
                .ignored_descendants(slot)
                .iter()
                .filter_map(|ig| spans[ig.index()].clone())
                .map(|span| self.sentence.tokens_in(span))
                .collect();
            for index in self.sentence.tokens_in(span) {
                if ignored.iter().any(|r| r.contains(&index)) {
                    continue;
                }
                result.indices.push(index);
                result.ngram.push(self.tokens[index].clone());
            }
        }
        result
    }

    fn scan_next_position(&mut self) {
        if self.cursor >= self.sentence.len() {
            self.done = true;
            return;
        }

        let mut here = self.matches_here();
        let selected = match self.options.policy {
            SelectionPolicy::All => here,
            SelectionPolicy::Longest => {
                here.truncate(1);
                here
            }
            SelectionPolicy::Shortest => here.pop().into_iter().collect(),
        };

        let mut advance = 1;
        if !self.options.overlapping {
            if let Some((whole, _)) = selected.first() {
                advance = self.sentence.tokens_in(whole.clone()).len().max(1);
            }
        }

        for (_, spans) in &selected {
            let result = self.extract(spans);
            self.queue.push_back(result);
        }

        self.cursor += advance;
        if self.options.anchor_begin {
            self.done = true;
        }
    }
}

impl Iterator for Matches<'_, '_> {
    type Item = MatchResult;

    fn next(&mut self) -> Option<MatchResult> {
        loop {
            if let Some(result) = self.queue.pop_front() {
                return Some(result);
            }
            if self.done {
                return None;
            }
            self.scan_next_position();
        }
    }
}
