use rayon::prelude::*;
use serde::Serialize;

use crate::diagnostic::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::pattern::{CompiledMatcher, MatchOptions, MatchResult, PatternError};
use crate::token::Token;

/// Matches found in one sentence of a corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentenceMatches {
    /// 0-based index of the sentence in the corpus.
    pub sentence: usize,
    pub matches: Vec<MatchResult>,
}

#[derive(Debug, Default)]
pub struct Extraction {
    /// Sentences with at least one match, in corpus order.
    pub sentences: Vec<SentenceMatches>,
    pub diagnostics: Vec<Diagnostic>,
    pub sentence_count: usize,
}

impl Extraction {
    pub fn match_count(&self) -> usize {
        self.sentences.iter().map(|s| s.matches.len()).sum()
    }

    /// Add diagnostics raised before extraction (pattern building and
    /// compilation) and order the whole list by `Diagnostic::sort_key`.
    pub fn merge_diagnostics(&mut self, earlier: impl IntoIterator<Item = Diagnostic>) {
        let mut diagnostics: Vec<Diagnostic> = earlier.into_iter().collect();
        diagnostics.append(&mut self.diagnostics);
        diagnostics.sort_by_key(Diagnostic::sort_key);
        self.diagnostics = diagnostics;
    }
}

/// Run `matcher` over every sentence in parallel.
///
/// Invalid options abort the whole run. A sentence that cannot be encoded
/// is reported as a fatal diagnostic for that sentence only.
pub fn extract_corpus(
    matcher: &CompiledMatcher,
    sentences: &[Vec<Token>],
    options: &MatchOptions,
) -> Result<Extraction, PatternError> {
    options.validate()?;

    // Unknown ids are reported once for the run, not once per sentence.
    let mut diagnostics = Diagnostics::new();
    let ids = options
        .ids
        .iter()
        .filter(|id| {
            let known = matcher.slot_of(id).is_some();
            if !known {
                diagnostics.warn_once(
                    id,
                    DiagnosticKind::UnknownId,
                    format!("Unknown id `{id}` requested"),
                );
            }
            known
        })
        .cloned()
        .collect();
    let options = MatchOptions {
        ids,
        ..options.clone()
    };

    let per_sentence: Vec<(SentenceMatches, Vec<Diagnostic>)> = sentences
        .par_iter()
        .enumerate()
        .map(|(index, tokens)| match matcher.matches(tokens, &options) {
            Ok(matches) => {
                let (matches, diagnostics) = matches.collect_for_sentence(index);
                (
                    SentenceMatches {
                        sentence: index,
                        matches,
                    },
                    diagnostics,
                )
            }
            Err(e) => {
                let mut diagnostic =
                    Diagnostic::fatal(DiagnosticKind::Unencodable, e.to_string()).in_sentence(index);
                if let PatternError::Unencodable { token, .. } = e {
                    diagnostic = diagnostic.at_token(token);
                }
                (
                    SentenceMatches {
                        sentence: index,
                        matches: Vec::new(),
                    },
                    vec![diagnostic],
                )
            }
        })
        .collect();

    let mut extraction = Extraction {
        diagnostics: diagnostics.into_vec(),
        sentence_count: sentences.len(),
        ..Extraction::default()
    };
    for (found, diagnostics) in per_sentence {
        extraction.diagnostics.extend(diagnostics);
        if !found.matches.is_empty() {
            extraction.sentences.push(found);
        }
    }

    tracing::debug!(
        sentences = extraction.sentence_count,
        matched = extraction.sentences.len(),
        matches = extraction.match_count(),
        "extracted corpus"
    );
    Ok(extraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Severity;
    use crate::pattern::{Pattern, SelectionPolicy, SequenceBuilder};
    use crate::testutil::{lemma, lemmas, tok};

    fn kick_bucket() -> Pattern {
        Pattern::new(
            SequenceBuilder::new()
                .push(lemma("kick").id("v"))
                .push(SequenceBuilder::gap(2))
                .push(lemma("bucket")),
        )
    }

    #[test]
    fn extracts_in_corpus_order() {
        let pattern = kick_bucket();
        let corpus: Vec<_> = (0..50)
            .map(|i| {
                if i % 7 == 0 {
                    lemmas(&["they", "kick", "the", "bucket"])
                } else {
                    lemmas(&["nothing", "here"])
                }
            })
            .collect();
        let options = MatchOptions::default().with_policy(SelectionPolicy::Longest);
        let extraction = extract_corpus(pattern.matcher().unwrap(), &corpus, &options).unwrap();
        let matched: Vec<_> = extraction.sentences.iter().map(|s| s.sentence).collect();
        assert_eq!(matched, vec![0, 7, 14, 21, 28, 35, 42, 49]);
        assert_eq!(extraction.match_count(), 8);
        assert_eq!(extraction.sentences[0].matches[0].indices, vec![1, 3]);
        assert_eq!(extraction.sentence_count, 50);
    }

    #[test]
    fn unencodable_sentence_does_not_stop_the_run() {
        let pattern = kick_bucket();
        let corpus = vec![
            vec![tok("kick", "kick", "V", ""), tok("bad\u{1C}", "bad", "X", "")],
            lemmas(&["kick", "bucket"]),
        ];
        let extraction =
            extract_corpus(pattern.matcher().unwrap(), &corpus, &MatchOptions::default()).unwrap();
        assert_eq!(extraction.sentences.len(), 1);
        assert_eq!(extraction.sentences[0].sentence, 1);
        let fatal = &extraction.diagnostics[0];
        assert_eq!(fatal.severity, Severity::Fatal);
        assert_eq!(fatal.sentence, Some(0));
        assert_eq!(fatal.token, Some(1));
    }

    #[test]
    fn unknown_id_is_reported_once_per_run() {
        let pattern = kick_bucket();
        let corpus = vec![lemmas(&["kick", "bucket"]); 5];
        let options = MatchOptions::default().with_ids(["*", "nope"]);
        let extraction = extract_corpus(pattern.matcher().unwrap(), &corpus, &options).unwrap();
        assert_eq!(extraction.sentences.len(), 5);
        let unknown = extraction
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::UnknownId)
            .count();
        assert_eq!(unknown, 1);
    }

    #[test]
    fn invalid_options_abort() {
        let pattern = kick_bucket();
        let options = MatchOptions::default().non_overlapping();
        assert_eq!(
            extract_corpus(pattern.matcher().unwrap(), &[], &options).unwrap_err(),
            PatternError::AllRequiresOverlapping
        );
    }

    #[test]
    fn merged_diagnostics_are_sorted() {
        let pattern = kick_bucket();
        let corpus = vec![
            lemmas(&["kick", "bucket"]),
            vec![tok("bad\u{1D}", "bad", "X", "")],
            vec![tok("kick", "kick", "V", ""), tok("bad\u{1C}", "bad", "X", "")],
        ];
        let options = MatchOptions::default().with_ids(["*", "nope"]);
        let mut extraction =
            extract_corpus(pattern.matcher().unwrap(), &corpus, &options).unwrap();
        extraction.merge_diagnostics(vec![Diagnostic::warning(
            DiagnosticKind::BadRegex,
            "from the pattern",
        )]);
        let order: Vec<_> = extraction
            .diagnostics
            .iter()
            .map(|d| (d.kind, d.sentence, d.token))
            .collect();
        assert_eq!(
            order,
            vec![
                (DiagnosticKind::BadRegex, None, None),
                (DiagnosticKind::UnknownId, None, None),
                (DiagnosticKind::Unencodable, Some(1), Some(0)),
                (DiagnosticKind::Unencodable, Some(2), Some(1)),
            ]
        );
        let keys: Vec<_> = extraction.diagnostics.iter().map(Diagnostic::sort_key).collect();
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));
    }
}
