use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_yml::Value;

use crate::cli::Args;
use crate::pattern::{MatchOptions, SelectionPolicy};

const DEFAULT_CONFIG: &str = ".mwematch.yml";

/// Matching settings from `.mwematch.yml`. Unset keys fall back to the
/// `MatchOptions` defaults.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MatchConfig {
    /// Kept as written; parsed when options are resolved.
    pub match_distance: Option<String>,
    pub overlapping: Option<bool>,
    pub id_order: Option<Vec<String>>,
    pub anchor_begin: Option<bool>,
    pub anchor_end: Option<bool>,
}

/// Load config from the given path, or look for `.mwematch.yml` in the
/// current directory. Returns an empty config if the file doesn't exist.
pub fn load_config(path: Option<&Path>) -> Result<MatchConfig> {
    let config_path = path.unwrap_or(Path::new(DEFAULT_CONFIG));

    if !config_path.exists() {
        return Ok(MatchConfig::default());
    }

    let contents = std::fs::read_to_string(config_path)
        .with_context(|| format!("failed to read config {}", config_path.display()))?;
    let raw: Value = serde_yml::from_str(&contents)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;

    parse_config(&raw).with_context(|| format!("invalid config {}", config_path.display()))
}

fn parse_config(raw: &Value) -> Result<MatchConfig> {
    let mut config = MatchConfig::default();

    let map = match raw {
        Value::Mapping(map) => map,
        Value::Null => return Ok(config),
        _ => bail!("expected a mapping at the top level"),
    };

    for (key, value) in map {
        let Some(key) = key.as_str() else {
            continue;
        };
        match key {
            "match_distance" => config.match_distance = Some(expect_str(key, value)?),
            "overlapping" => config.overlapping = Some(expect_bool(key, value)?),
            "anchor_begin" => config.anchor_begin = Some(expect_bool(key, value)?),
            "anchor_end" => config.anchor_end = Some(expect_bool(key, value)?),
            "id_order" => {
                let Some(list) = value_to_string_list(value) else {
                    bail!("`id_order` must be a list of ids");
                };
                config.id_order = Some(list);
            }
            other => tracing::warn!("unknown config key `{other}` ignored"),
        }
    }

    Ok(config)
}

fn expect_str(key: &str, value: &Value) -> Result<String> {
    match value.as_str() {
        Some(s) => Ok(s.to_string()),
        None => bail!("`{key}` must be a string"),
    }
}

fn expect_bool(key: &str, value: &Value) -> Result<bool> {
    match value.as_bool() {
        Some(b) => Ok(b),
        None => bail!("`{key}` must be true or false"),
    }
}

fn value_to_string_list(value: &Value) -> Option<Vec<String>> {
    value.as_sequence().map(|seq| {
        seq.iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect()
    })
}

impl MatchConfig {
    /// Resolve the options for a run. Command-line flags win over the file.
    pub fn to_options(&self, args: &Args) -> Result<MatchOptions> {
        let defaults = MatchOptions::default();

        let policy = match args
            .match_distance
            .as_deref()
            .or(self.match_distance.as_deref())
        {
            Some(name) => name.parse::<SelectionPolicy>()?,
            None => defaults.policy,
        };
        let ids = if !args.id_order.is_empty() {
            args.id_order.clone()
        } else {
            self.id_order.clone().unwrap_or(defaults.ids)
        };

        let options = MatchOptions {
            policy,
            overlapping: !args.non_overlapping && self.overlapping.unwrap_or(defaults.overlapping),
            ids,
            anchor_begin: args.anchor_begin || self.anchor_begin.unwrap_or(defaults.anchor_begin),
            anchor_end: args.anchor_end || self.anchor_end.unwrap_or(defaults.anchor_end),
        };
        options.validate()?;
        Ok(options)
    }
}
