//! JSON pattern files and JSON-lines corpora.
//!
//! A pattern file holds one node. Nodes are externally tagged:
//!
//! ```json
//! {"seq": {"id": "mwe", "children": [
//!     {"w": {"id": "v", "props": [{"attr": "lemma", "literal": "kick"}]}},
//!     {"gap": 1},
//!     {"w": {"props": [{"attr": "lemma", "regex": "buckets?", "flags": "i"}]}}
//! ]}}
//! ```
//!
//! Dependency constraints use the `syndep` attribute with a `rel:wordid`
//! literal.

use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::diagnostic::{DiagnosticKind, Diagnostics};
use crate::pattern::{
    EitherBuilder, Pattern, PatternNode, SequenceBuilder, WordPatternBuilder, WordProperty,
};
use crate::token::{Attribute, Token};

const DEPENDENCY_ATTRIBUTE: &str = "syndep";

#[derive(Debug, Deserialize)]
enum NodeDef {
    #[serde(rename = "w")]
    Word(WordDef),
    #[serde(rename = "seq")]
    Sequence(SequenceDef),
    #[serde(rename = "either")]
    Either(Vec<SequenceDef>),
    #[serde(rename = "gap")]
    Gap(usize),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct WordDef {
    id: Option<String>,
    #[serde(default)]
    props: Vec<PropDef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SequenceDef {
    id: Option<String>,
    repeat: Option<String>,
    #[serde(default)]
    ignore: bool,
    #[serde(default)]
    children: Vec<NodeDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PropDef {
    attr: String,
    #[serde(default)]
    negated: bool,
    literal: Option<String>,
    regex: Option<String>,
    #[serde(default)]
    flags: String,
    starred: Option<String>,
    /// `wordid.attribute`
    backref: Option<String>,
}

/// Read a pattern file. Warnings raised while building it are returned
/// alongside; compile warnings come later, from the matcher.
pub fn load_pattern(path: &Path) -> Result<(Pattern, Diagnostics)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read pattern {}", path.display()))?;
    parse_pattern(&text).with_context(|| format!("invalid pattern {}", path.display()))
}

pub fn parse_pattern(text: &str) -> Result<(Pattern, Diagnostics)> {
    let def: NodeDef = serde_json::from_str(text)?;
    let mut diagnostics = Diagnostics::new();
    let root = build_node(def, "", &mut diagnostics)?;
    Ok((Pattern::new(root), diagnostics))
}

/// Nodes are built with their JSON path (`seq.children[1].w.props[0]`) so
/// warnings can point back into the file.
fn build_node(def: NodeDef, path: &str, diagnostics: &mut Diagnostics) -> Result<PatternNode> {
    Ok(match def {
        NodeDef::Word(w) => build_word(w, &format!("{path}w"), diagnostics)?.into(),
        NodeDef::Sequence(s) => build_sequence(s, &format!("{path}seq"), diagnostics)?.into(),
        NodeDef::Either(branches) => {
            let mut either = EitherBuilder::new();
            for (i, branch) in branches.into_iter().enumerate() {
                let branch_path = format!("{path}either[{i}]");
                either = either.branch(build_sequence(branch, &branch_path, diagnostics)?);
            }
            either.into()
        }
        NodeDef::Gap(max) => SequenceBuilder::gap(max).into(),
    })
}

fn build_sequence(
    def: SequenceDef,
    path: &str,
    diagnostics: &mut Diagnostics,
) -> Result<SequenceBuilder> {
    let mut seq = SequenceBuilder::new().ignore(def.ignore);
    if let Some(id) = def.id {
        seq = seq.id(id);
    }
    if let Some(repeat) = def.repeat {
        seq = seq.repeat(repeat);
    }
    for (i, child) in def.children.into_iter().enumerate() {
        seq = seq.push(build_node(child, &format!("{path}.children[{i}]."), diagnostics)?);
    }
    Ok(seq)
}

fn build_word(
    def: WordDef,
    path: &str,
    diagnostics: &mut Diagnostics,
) -> Result<WordPatternBuilder> {
    let mut word = WordPatternBuilder::new();
    if let Some(id) = def.id {
        word = word.id(id);
    }

    for (i, prop) in def.props.into_iter().enumerate() {
        let path = format!("{path}.props[{i}]");
        if prop.attr == DEPENDENCY_ATTRIBUTE {
            let Some(value) = prop.literal else {
                bail!(
                    "{path}: `{DEPENDENCY_ATTRIBUTE}` takes a `literal` value of the form \
                     `rel:wordid`"
                );
            };
            word = word.dependency(value);
            continue;
        }

        let Some(attribute) = Attribute::from_name(&prop.attr) else {
            diagnostics.warn(
                DiagnosticKind::UnknownAttribute,
                None,
                format!("{path}: Unknown attribute `{}` ignored", prop.attr),
            );
            continue;
        };
        let negated = prop.negated;
        let value = build_property(prop, &path, diagnostics)?;
        word = word.prop(attribute, value, negated);
    }
    Ok(word)
}

fn build_property(
    prop: PropDef,
    path: &str,
    diagnostics: &mut Diagnostics,
) -> Result<WordProperty> {
    let given = [
        prop.literal.is_some(),
        prop.regex.is_some(),
        prop.starred.is_some(),
        prop.backref.is_some(),
    ]
    .iter()
    .filter(|&&b| b)
    .count();
    if given != 1 {
        bail!("{path}: property needs exactly one of `literal`, `regex`, `starred`, `backref`");
    }

    if let Some(v) = prop.literal {
        return Ok(WordProperty::literal(v));
    }
    if let Some(v) = prop.regex {
        let mut regex_diagnostics = Diagnostics::new();
        let property = WordProperty::regex(&v, &prop.flags, None, &mut regex_diagnostics);
        diagnostics.extend_with_context(regex_diagnostics, path);
        return Ok(property);
    }
    if let Some(v) = prop.starred {
        return Ok(WordProperty::starred(v));
    }

    let target = prop.backref.unwrap_or_default();
    let Some((word_id, attr)) = target.rsplit_once('.') else {
        bail!("{path}: backref `{target}` is not of the form `wordid.attribute`");
    };
    let Some(attribute) = Attribute::from_name(attr) else {
        bail!("{path}: backref `{target}` names unknown attribute `{attr}`");
    };
    Ok(WordProperty::backref(word_id, attribute))
}

/// Read a JSON-lines corpus: one sentence, as an array of tokens, per line.
/// Blank lines are skipped.
pub fn read_corpus(reader: impl BufRead, name: &str) -> Result<Vec<Vec<Token>>> {
    let mut sentences = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {name}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let sentence: Vec<Token> = serde_json::from_str(&line)
            .with_context(|| format!("{name}:{}: invalid sentence", n + 1))?;
        sentences.push(sentence);
    }
    Ok(sentences)
}

pub fn load_corpus(path: &Path) -> Result<Vec<Vec<Token>>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open corpus {}", path.display()))?;
    read_corpus(std::io::BufReader::new(file), &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{MatchOptions, SelectionPolicy};
    use crate::testutil::lemmas;

    #[test]
    fn parses_nested_pattern() {
        let (pattern, diagnostics) = parse_pattern(
            r#"{"seq": {"id": "mwe", "children": [
                {"w": {"id": "v", "props": [{"attr": "lemma", "literal": "kick"}]}},
                {"gap": 1},
                {"w": {"props": [{"attr": "lemma", "regex": "buckets?", "flags": "i"}]}}
            ]}}"#,
        )
        .unwrap();
        assert!(diagnostics.is_empty());
        let PatternNode::Sequence(seq) = pattern.root() else {
            panic!("expected sequence");
        };
        assert_eq!(seq.id(), Some("mwe"));
        assert_eq!(seq.children().len(), 3);

        let options = MatchOptions::default().with_policy(SelectionPolicy::Longest);
        let found: Vec<_> = pattern
            .matches(&lemmas(&["kick", "the", "Bucket"]), &options)
            .unwrap()
            .map(|m| m.indices)
            .collect();
        assert_eq!(found, vec![vec![0, 2]]);
    }

    #[test]
    fn either_and_syndep() {
        let (pattern, _) = parse_pattern(
            r#"{"either": [
                {"children": [{"w": {"id": "h", "props": [{"attr": "pos", "literal": "V"}]}},
                              {"w": {"props": [{"attr": "syndep", "literal": "obj:h"}]}}]},
                {"children": [{"w": {"props": [{"attr": "lemma", "starred": "un*"}]}}]}
            ]}"#,
        )
        .unwrap();
        let PatternNode::Either(e) = pattern.root() else {
            panic!("expected either");
        };
        assert_eq!(e.branches().len(), 2);
        let PatternNode::Word(w) = &e.branches()[0].children()[1] else {
            panic!("expected word");
        };
        assert_eq!(w.dependencies(), &["obj:h".to_string()]);
    }

    #[test]
    fn unknown_attribute_warns() {
        let (_, diagnostics) = parse_pattern(
            r#"{"w": {"props": [{"attr": "colour", "literal": "red"}]}}"#,
        )
        .unwrap();
        assert_eq!(diagnostics.count_of(DiagnosticKind::UnknownAttribute), 1);
    }

    #[test]
    fn warnings_name_the_json_path() {
        let (_, diagnostics) = parse_pattern(
            r#"{"seq": {"children": [
                {"w": {"props": [{"attr": "lemma", "literal": "a"}]}},
                {"either": [{"children": [{"w": {"props": [
                    {"attr": "lemma", "literal": "b"},
                    {"attr": "lemma", "regex": "^b", "flags": "z"}
                ]}}]}]}
            ]}}"#,
        )
        .unwrap();
        let messages: Vec<_> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages.len(), 2);
        let path = "seq.children[1].either[0].children[0].w.props[1]: ";
        assert!(messages.iter().all(|m| m.starts_with(path)), "{messages:?}");
        assert_eq!(diagnostics.count_of(DiagnosticKind::BadRegex), 1);
        assert_eq!(diagnostics.count_of(DiagnosticKind::BadRegexFlag), 1);
    }

    #[test]
    fn negated_backref_is_parsed() {
        let (pattern, _) = parse_pattern(
            r#"{"w": {"props": [{"attr": "lemma", "negated": true, "backref": "x.surface"}]}}"#,
        )
        .unwrap();
        let PatternNode::Word(w) = pattern.root() else {
            panic!("expected word");
        };
        assert_eq!(
            w.negative(Attribute::Lemma),
            &[WordProperty::backref("x", Attribute::Surface)]
        );
    }

    #[test]
    fn property_needs_exactly_one_value() {
        assert!(parse_pattern(r#"{"w": {"props": [{"attr": "lemma"}]}}"#).is_err());
        assert!(
            parse_pattern(r#"{"w": {"props": [{"attr": "lemma", "literal": "a", "starred": "b"}]}}"#)
                .is_err()
        );
        assert!(parse_pattern(r#"{"w": {"props": [{"attr": "lemma", "backref": "x"}]}}"#).is_err());
    }

    #[test]
    fn unknown_node_kind_is_rejected() {
        assert!(parse_pattern(r#"{"word": {}}"#).is_err());
    }

    #[test]
    fn corpus_lines_skip_blanks() {
        let text = "[{\"surface\": \"a\"}, {\"surface\": \"b\", \"lemma\": \"b\"}]\n\n[]\n";
        let corpus = read_corpus(text.as_bytes(), "mem").unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus[0][1].lemma, "b");
        assert!(corpus[1].is_empty());
    }

    #[test]
    fn corpus_error_names_the_line() {
        let err = read_corpus("[]\nnot json\n".as_bytes(), "mem").unwrap_err();
        assert!(format!("{err:#}").contains("mem:2"));
    }
}
