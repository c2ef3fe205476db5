//! Content normalization for change detection
//!
//! Generated code embeds the generator and service versions in a handful of
//! comment and constant lines. Those lines change on every release of the
//! code-generation service even when nothing else does, so they are blanked
//! before two versions of a file are compared.

use regex::Regex;
use std::sync::OnceLock;

/// A single "ignorable line" rule, evaluated against the trimmed line
#[derive(Debug, Clone)]
pub struct LineMatcher {
    name: &'static str,
    pattern: Regex,
}

impl LineMatcher {
    pub fn new(name: &'static str, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_match(&self, trimmed_line: &str) -> bool {
        self.pattern.is_match(trimmed_line)
    }
}

// Comment leaders seen in generated output: #, //, /*, *, --
const COMMENT: &str = r"(?:#+|//+|/\*+|\*+|--)";
// Optional declaration keywords in front of a constant name
const DECL: &str = concat!(
    r"(?:(?:private|protected|public|pub|export|static|final|override|lazy)\s+)*",
    r"(?:(?:val|var|let|const|def)\s+)?",
);

const BUILTIN_PATTERNS: &[(&str, &str)] = &[
    ("service-version", r"(?i)^COMMENT\s*service version:"),
    ("apibuilder-comment", r"(?i)^COMMENT\s*apibuilder(?::|\s+\d)"),
    (
        "user-agent-constant",
        r"^DECL(?:USER_AGENT|UserAgent|userAgent)\b\s*(?::[^=]*)?:?=(?:[^=]|$)",
    ),
    (
        "version-constant",
        r"^DECL(?:VERSION|Version|API_VERSION|ApiVersion|apiVersion)\b\s*(?::[^=]*)?:?=(?:[^=]|$)",
    ),
];

/// Blanks version-stamp lines so that metadata churn is not seen as a change
#[derive(Debug, Clone)]
pub struct ContentNormalizer {
    matchers: Vec<LineMatcher>,
}

impl ContentNormalizer {
    /// Normalizer with no rules; `normalize` then only trims
    pub fn empty() -> Self {
        Self {
            matchers: Vec::new(),
        }
    }

    /// Append a rule. Rules are evaluated in insertion order.
    pub fn with_matcher(mut self, matcher: LineMatcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    pub fn matchers(&self) -> &[LineMatcher] {
        &self.matchers
    }

    /// Name of the first rule matching `line`, if any
    pub fn matching_rule(&self, line: &str) -> Option<&'static str> {
        let trimmed = line.trim();
        self.matchers
            .iter()
            .find(|m| m.is_match(trimmed))
            .map(LineMatcher::name)
    }

    /// Replace every ignorable line with an empty line, rejoin with `\n` and
    /// trim the result.
    pub fn normalize(&self, text: &str) -> String {
        text.lines()
            .map(|line| match self.matching_rule(line) {
                Some(_) => "",
                None => line,
            })
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

impl Default for ContentNormalizer {
    fn default() -> Self {
        let matchers = BUILTIN_PATTERNS
            .iter()
            .map(|(name, pattern)| {
                let pattern = pattern.replace("COMMENT", COMMENT).replace("DECL", DECL);
                LineMatcher::new(*name, &pattern).expect("built-in line pattern is valid")
            })
            .collect();

        Self { matchers }
    }
}

/// Shared normalizer with the built-in rules
pub fn default_normalizer() -> &'static ContentNormalizer {
    static NORMALIZER: OnceLock<ContentNormalizer> = OnceLock::new();
    NORMALIZER.get_or_init(ContentNormalizer::default)
}

/// Normalize `text` with the built-in rules
pub fn normalize(text: &str) -> String {
    default_normalizer().normalize(text)
}
