use std::io::Write;

use crate::extractor::Extraction;
use crate::formatter::Formatter;

/// One line per match: `sentence: n-gram [indices]`, then a summary.
pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_to(&self, extraction: &Extraction, out: &mut dyn Write) {
        for found in &extraction.sentences {
            for m in &found.matches {
                let _ = writeln!(out, "{}: {} {:?}", found.sentence, m.surface(), m.indices);
            }
        }

        let count = extraction.match_count();
        let match_word = if count == 1 { "match" } else { "matches" };
        let sentence_word = if extraction.sentence_count == 1 {
            "sentence"
        } else {
            "sentences"
        };
        let _ = writeln!(
            out,
            "\n{} {sentence_word} scanned, {count} {match_word} found",
            extraction.sentence_count,
        );
    }
}
