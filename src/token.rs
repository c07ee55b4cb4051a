//! Corpus tokens and the word attributes patterns can constrain.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the four per-word attributes known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    Surface,
    Lemma,
    Pos,
    Syn,
}

impl Attribute {
    /// Encoding order of the attributes inside a word.
    pub const ALL: [Attribute; 4] = [
        Attribute::Surface,
        Attribute::Lemma,
        Attribute::Pos,
        Attribute::Syn,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Attribute::Surface => "surface",
            Attribute::Lemma => "lemma",
            Attribute::Pos => "pos",
            Attribute::Syn => "syn",
        }
    }

    pub fn from_name(name: &str) -> Option<Attribute> {
        match name {
            "surface" => Some(Attribute::Surface),
            "lemma" => Some(Attribute::Lemma),
            "pos" => Some(Attribute::Pos),
            "syn" => Some(Attribute::Syn),
            _ => None,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A corpus token. Missing attributes are empty strings.
///
/// `syn` holds the dependency information as `rel:head` pairs joined by
/// `;`, where `head` is the 1-based position of the governing token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    #[serde(default)]
    pub surface: String,
    #[serde(default)]
    pub lemma: String,
    #[serde(default)]
    pub pos: String,
    #[serde(default)]
    pub syn: String,
}

impl Token {
    pub fn new(surface: impl Into<String>) -> Self {
        Self {
            surface: surface.into(),
            ..Self::default()
        }
    }

    pub fn with_lemma(mut self, lemma: impl Into<String>) -> Self {
        self.lemma = lemma.into();
        self
    }

    pub fn with_pos(mut self, pos: impl Into<String>) -> Self {
        self.pos = pos.into();
        self
    }

    pub fn with_syn(mut self, syn: impl Into<String>) -> Self {
        self.syn = syn.into();
        self
    }

    pub fn get(&self, attribute: Attribute) -> &str {
        match attribute {
            Attribute::Surface => &self.surface,
            Attribute::Lemma => &self.lemma,
            Attribute::Pos => &self.pos,
            Attribute::Syn => &self.syn,
        }
    }
}
