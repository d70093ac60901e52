// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config error diagnostics.
//!
//! Figment extraction errors become miette reports that point at the
//! offending key in the TOML file, list what its section accepts, and
//! suggest either the closest key or the section a misplaced key belongs to.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

use crate::model::Section;

/// Minimum Jaro-Winkler similarity for a "did you mean" suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error rendered through miette.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key that its section does not accept.
    #[error("unknown key `{key}` in [{section}]")]
    #[diagnostic(code(antispam::config::unknown_key), help("{help}"))]
    UnknownKey {
        section: String,
        key: String,
        /// Closest accepted key in the same section.
        suggestion: Option<String>,
        help: String,
        #[label("not accepted here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A top-level table or key that is not a config section.
    #[error("unknown section `{name}`")]
    #[diagnostic(code(antispam::config::unknown_section), help("{help}"))]
    UnknownSection {
        name: String,
        suggestion: Option<String>,
        help: String,
        #[label("not a config section")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value of the wrong type, e.g. a string for `telegram.workers`.
    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(antispam::config::invalid_type), help("`{key}` expects {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
        #[label("wrong type")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value that parsed but breaks a semantic rule.
    #[error("validation error: {message}")]
    #[diagnostic(code(antispam::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(antispam::config::other))]
    Other(String),
}

/// Converts a figment error, which may hold several, into diagnostics.
///
/// `toml_sources` are `(path, content)` pairs used to attach source spans.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| convert(&error, toml_sources))
        .collect()
}

fn convert(error: &figment::Error, toml_sources: &[(String, String)]) -> ConfigError {
    let source = source_of(error, toml_sources);
    let from_env = error.metadata.as_ref().is_some_and(is_env);

    match &error.kind {
        Kind::UnknownField(field, _) => match error.path.first() {
            None => unknown_section(field, source),
            Some(name) => match Section::from_name(name) {
                Some(section) => unknown_key(section, field, from_env, source),
                None => ConfigError::Other(error.to_string()),
            },
        },
        Kind::InvalidType(actual, expected) => {
            let key = error.path.join(".");
            let span = source.and_then(|(path, content)| {
                let (section, field) = match error.path.as_slice() {
                    [section, field] => (Some(section.as_str()), field.as_str()),
                    [field] => (None, field.as_str()),
                    _ => return None,
                };
                let offset = find_key_offset(content, section, field)?;
                Some(attach(path, content, offset, field.len()))
            });
            let (span, src) = span.unzip();
            ConfigError::InvalidType {
                key,
                found: actual.to_string(),
                expected: expected.to_string(),
                span,
                src,
            }
        }
        _ => ConfigError::Other(error.to_string()),
    }
}

fn unknown_key(
    section: Section,
    key: &str,
    from_env: bool,
    source: Option<(&str, &str)>,
) -> ConfigError {
    let suggestion = closest_key(key, section.keys()).map(str::to_string);

    let mut help = Vec::new();
    match (Section::owning(key), &suggestion) {
        (Some(home), _) => help.push(format!("`{key}` belongs in [{}]", home.name())),
        (None, Some(s)) => help.push(format!("did you mean `{s}`?")),
        (None, None) => {}
    }
    help.push(format!("[{}] accepts: {}", section.name(), section.keys().join(", ")));
    if let Some(hint) = section_hint(section) {
        help.push(hint.to_string());
    }
    if from_env {
        help.push(format!(
            "set by the environment variable ANTISPAM_{}_{}",
            section.name().to_uppercase(),
            key.to_uppercase()
        ));
    }

    let (span, src) = source
        .and_then(|(path, content)| {
            let offset = find_key_offset(content, Some(section.name()), key)?;
            Some(attach(path, content, offset, key.len()))
        })
        .unzip();

    ConfigError::UnknownKey {
        section: section.name().to_string(),
        key: key.to_string(),
        suggestion,
        help: help.join("\n"),
        span,
        src,
    }
}

fn unknown_section(name: &str, source: Option<(&str, &str)>) -> ConfigError {
    let sections = Section::ALL.map(Section::name);
    let suggestion = closest_key(name, &sections).map(str::to_string);

    let mut help = Vec::new();
    if let Some(home) = Section::owning(name) {
        help.push(format!("`{name}` is a key, move it under [{}]", home.name()));
    } else if let Some(s) = &suggestion {
        help.push(format!("did you mean [{s}]?"));
    }
    help.push(format!("sections: {}", sections.join(", ")));

    let (span, src) = source
        .and_then(|(path, content)| {
            let offset =
                find_section_offset(content, name).or_else(|| find_key_offset(content, None, name))?;
            Some(attach(path, content, offset, name.len()))
        })
        .unzip();

    ConfigError::UnknownSection {
        name: name.to_string(),
        suggestion,
        help: help.join("\n"),
        span,
        src,
    }
}

/// Extra help for sections whose keys are easy to get wrong.
fn section_hint(section: Section) -> Option<&'static str> {
    match section {
        Section::Scoring => Some("scores must satisfy ban_score < default_score < trusted_score"),
        Section::Telegram => {
            Some("the bot token can also be set with ANTISPAM_TELEGRAM_BOT_TOKEN")
        }
        Section::OpenAi => Some("the API key can also be set with OPENAI_API_KEY"),
        Section::Bot | Section::Storage => None,
    }
}

/// The TOML source an error came from, if its content was collected.
///
/// Inline strings carry no path, so they match only when a single source
/// was collected.
fn source_of<'a>(
    error: &figment::Error,
    toml_sources: &'a [(String, String)],
) -> Option<(&'a str, &'a str)> {
    let metadata = error.metadata.as_ref()?;
    let found = match &metadata.source {
        Some(figment::Source::File(path)) => {
            let path = path.display().to_string();
            toml_sources.iter().find(|(p, _)| *p == path)
        }
        _ if is_env(metadata) => None,
        _ if toml_sources.len() == 1 => toml_sources.first(),
        _ => None,
    };
    found.map(|(p, content)| (p.as_str(), content.as_str()))
}

fn is_env(metadata: &figment::Metadata) -> bool {
    metadata.name.contains("environment")
}

fn attach(path: &str, content: &str, offset: usize, len: usize) -> (SourceSpan, NamedSource<String>) {
    (
        SourceSpan::new(offset.into(), len),
        NamedSource::new(path, content.to_string()),
    )
}

/// The bare table name of a `[header]` line, if `line` is one.
fn table_header(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('[')?;
    let end = rest.find(']')?;
    Some(rest[..end].trim())
}

/// Byte offset of `key` inside `[section]`, or before the first table when
/// `section` is `None`. The search stops at the next table header.
pub fn find_key_offset(content: &str, section: Option<&str>, key: &str) -> Option<usize> {
    let mut inside = section.is_none();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        if let Some(name) = table_header(line) {
            inside = section == Some(name);
        } else if inside {
            let trimmed = line.trim_start();
            if let Some(after) = trimmed.strip_prefix(key)
                && after.trim_start().starts_with('=')
            {
                return Some(offset + line.len() - trimmed.len());
            }
        }
        offset += line.len();
    }

    None
}

/// Byte offset of the name inside a `[name]` header.
pub fn find_section_offset(content: &str, name: &str) -> Option<usize> {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        if table_header(line) == Some(name) {
            return line.find(name).map(|i| offset + i);
        }
        offset += line.len();
    }
    None
}

/// The candidate most similar to `unknown`, if any is close enough.
pub fn closest_key<'a>(unknown: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&c| (c, strsim::jaro_winkler(unknown, c)))
        .filter(|(_, score)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(c, _)| c)
}

/// Prints every error to stderr as a miette report.
pub fn render_errors(errors: &[ConfigError]) {
    let plural = if errors.len() == 1 { "" } else { "s" };
    eprintln!("antispam: {} configuration error{plural}", errors.len());

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error) {
            Ok(()) => eprint!("{buf}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}
