use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Fatal,
}

impl Severity {
    pub fn letter(&self) -> char {
        match self {
            Severity::Warning => 'W',
            Severity::Fatal => 'F',
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A position in the pattern source, as reported by whatever built the AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    /// 1-indexed line number
    pub line: usize,
    /// 0-indexed column
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// What a diagnostic is about. The name is stable and shows up in output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    BadRegex,
    BadRegexFlag,
    InvalidRepeat,
    ScopedUnderRepeat,
    ExtraDependency,
    MalformedDependency,
    UnresolvedReference,
    UnknownAttribute,
    UnknownId,
    EmptyMatch,
    MatchAborted,
    Unencodable,
}

impl DiagnosticKind {
    pub fn name(&self) -> &'static str {
        match self {
            DiagnosticKind::BadRegex => "bad-regex",
            DiagnosticKind::BadRegexFlag => "bad-regex-flag",
            DiagnosticKind::InvalidRepeat => "invalid-repeat",
            DiagnosticKind::ScopedUnderRepeat => "scoped-under-repeat",
            DiagnosticKind::ExtraDependency => "extra-dependency",
            DiagnosticKind::MalformedDependency => "malformed-dependency",
            DiagnosticKind::UnresolvedReference => "unresolved-reference",
            DiagnosticKind::UnknownAttribute => "unknown-attribute",
            DiagnosticKind::UnknownId => "unknown-id",
            DiagnosticKind::EmptyMatch => "empty-match",
            DiagnosticKind::MatchAborted => "match-aborted",
            DiagnosticKind::Unencodable => "unencodable",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    /// Pattern source location, when the diagnostic comes from a pattern node.
    pub location: Option<Location>,
    /// Index of the sentence being matched, when known.
    pub sentence: Option<usize>,
    /// Index of the offending token inside `sentence`.
    pub token: Option<usize>,
}

impl Diagnostic {
    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            message: message.into(),
            location: None,
            sentence: None,
            token: None,
        }
    }

    pub fn fatal(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Fatal,
            ..Self::warning(kind, message)
        }
    }

    pub fn at(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }

    pub fn in_sentence(mut self, sentence: usize) -> Self {
        self.sentence = Some(sentence);
        self
    }

    pub fn at_token(mut self, token: usize) -> Self {
        self.token = Some(token);
        self
    }

    /// Pattern diagnostics first, then by sentence, token and location.
    pub fn sort_key(&self) -> (Option<usize>, Option<usize>, usize, usize) {
        let (line, column) = self
            .location
            .map(|l| (l.line, l.column))
            .unwrap_or_default();
        (self.sentence, self.token, line, column)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(loc) = self.location {
            write!(f, "{loc}: ")?;
        }
        match (self.sentence, self.token) {
            (Some(s), Some(t)) => write!(f, "sentence {s}, token {t}: ")?,
            (Some(s), None) => write!(f, "sentence {s}: ")?,
            _ => {}
        }
        write!(f, "{}: {}: {}", self.severity, self.kind, self.message)
    }
}

/// Collects warnings raised while building, compiling or running a pattern.
///
/// Every pushed diagnostic is also emitted as a `tracing` event so a
/// subscriber sees it without the caller having to drain the sink.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    once: HashSet<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => tracing::warn!(kind = diagnostic.kind.name(), "{diagnostic}"),
            Severity::Fatal => tracing::error!(kind = diagnostic.kind.name(), "{diagnostic}"),
        }
        self.entries.push(diagnostic);
    }

    pub fn warn(
        &mut self,
        kind: DiagnosticKind,
        location: Option<Location>,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic::warning(kind, message).at(location));
    }

    /// Like `warn`, but only the first call with a given `key` is recorded.
    pub fn warn_once(&mut self, key: &str, kind: DiagnosticKind, message: impl Into<String>) {
        if self.once.insert(key.to_string()) {
            self.warn(kind, None, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    /// Append `other` with `context` prepended to each message. The entries
    /// were traced when first pushed and are not traced again.
    pub fn extend_with_context(&mut self, other: Diagnostics, context: &str) {
        self.entries.extend(other.entries.into_iter().map(|d| Diagnostic {
            message: format!("{context}: {}", d.message),
            ..d
        }));
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_letters() {
        assert_eq!(Severity::Warning.letter(), 'W');
        assert_eq!(Severity::Fatal.letter(), 'F');
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Warning < Severity::Fatal);
    }

    #[test]
    fn diagnostic_display_with_location() {
        let d = Diagnostic::warning(DiagnosticKind::InvalidRepeat, "Invalid repeat pattern: x")
            .at(Some(Location { line: 3, column: 5 }));
        assert_eq!(
            format!("{d}"),
            "3:5: W: invalid-repeat: Invalid repeat pattern: x"
        );
    }

    #[test]
    fn diagnostic_display_with_sentence() {
        let d = Diagnostic::fatal(DiagnosticKind::Unencodable, "bad token")
            .in_sentence(7)
            .at_token(2);
        assert_eq!(format!("{d}"), "sentence 7, token 2: F: unencodable: bad token");
    }

    #[test]
    fn diagnostic_sort_key() {
        let d1 = Diagnostic::warning(DiagnosticKind::UnknownId, "m").in_sentence(1);
        let d2 = Diagnostic::warning(DiagnosticKind::UnknownId, "m").in_sentence(2);
        let d0 = Diagnostic::warning(DiagnosticKind::BadRegex, "m")
            .at(Some(Location { line: 9, column: 0 }));
        assert!(d0.sort_key() < d1.sort_key());
        assert!(d1.sort_key() < d2.sort_key());
    }

    #[test]
    fn warn_once_deduplicates_by_key() {
        let mut diags = Diagnostics::new();
        diags.warn_once("x", DiagnosticKind::UnknownId, "no id x");
        diags.warn_once("x", DiagnosticKind::UnknownId, "no id x");
        diags.warn_once("y", DiagnosticKind::UnknownId, "no id y");
        assert_eq!(diags.len(), 2);
        assert_eq!(diags.count_of(DiagnosticKind::UnknownId), 2);
    }

    #[test]
    fn extend_with_context_prefixes_messages() {
        let mut inner = Diagnostics::new();
        inner.warn(DiagnosticKind::BadRegex, None, "bad");
        let mut outer = Diagnostics::new();
        outer.extend_with_context(inner, "w.props[0]");
        assert_eq!(outer.as_slice()[0].message, "w.props[0]: bad");
    }
}
