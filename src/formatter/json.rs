use std::io::Write;

use serde::Serialize;

use crate::extractor::{Extraction, SentenceMatches};
use crate::formatter::Formatter;
use crate::pattern::MatchOptions;

pub struct JsonFormatter {
    options: Option<MatchOptions>,
}

impl JsonFormatter {
    // Default impl not useful; formatter is always explicitly constructed.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self { options: None }
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    metadata: Metadata<'a>,
    sentences: &'a [SentenceMatches],
    warnings: Vec<Warning>,
}

#[derive(Serialize)]
struct Metadata<'a> {
    sentences_scanned: usize,
    match_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    match_distance: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    overlapping: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id_order: Option<&'a [String]>,
}

#[derive(Serialize)]
struct Warning {
    severity: String,
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sentence: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    column: Option<usize>,
}

impl Formatter for JsonFormatter {
    fn set_options(&mut self, options: &MatchOptions) {
        self.options = Some(options.clone());
    }

    fn format_to(&self, extraction: &Extraction, out: &mut dyn Write) {
        let options = self.options.as_ref();
        let output = JsonOutput {
            metadata: Metadata {
                sentences_scanned: extraction.sentence_count,
                match_count: extraction.match_count(),
                match_distance: options.map(|o| o.policy.name()),
                overlapping: options.map(|o| o.overlapping),
                id_order: options.map(|o| o.ids.as_slice()),
            },
            sentences: &extraction.sentences,
            warnings: extraction
                .diagnostics
                .iter()
                .map(|d| Warning {
                    severity: d.severity.letter().to_string(),
                    kind: d.kind.name(),
                    message: d.message.clone(),
                    sentence: d.sentence,
                    token: d.token,
                    line: d.location.map(|l| l.line),
                    column: d.location.map(|l| l.column),
                })
                .collect(),
        };
        match serde_json::to_string_pretty(&output) {
            Ok(json) => {
                let _ = writeln!(out, "{json}");
            }
            Err(e) => tracing::error!("failed to serialize output: {e}"),
        }
    }
}
