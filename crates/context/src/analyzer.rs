// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static signature extraction for source-like content.
//!
//! The analyzer runs a data-driven rule table over content line by line.
//! When several rules match the same line, the highest-scoring rule wins;
//! ties break by rule order. Content with no structural matches falls
//! back to a truncated preview.

use regex::Regex;
use vibe_core::FileSignature;

/// What a matched line contributes to the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
    Import,
    Export,
    Function,
    Class,
    Interface,
    TypeAlias,
}

/// One extraction rule. The first capture group is the extracted name.
#[derive(Debug, Clone)]
pub struct SignatureRule {
    pub pattern: Regex,
    pub kind: SignatureKind,
    pub score: u32,
}

/// Maximum names kept per signature section.
const MAX_NAMES_PER_SECTION: usize = 25;

/// Preview length for structureless content, in characters.
const PREVIEW_CHARS: usize = 400;

/// Regex-driven file analyzer.
pub struct FileAnalyzer {
    rules: Vec<SignatureRule>,
}

impl Default for FileAnalyzer {
    fn default() -> Self {
        Self::new(builtin_rules())
    }
}

impl FileAnalyzer {
    /// Build an analyzer from an explicit rule table.
    pub fn new(rules: Vec<SignatureRule>) -> Self {
        Self { rules }
    }

    /// Extract a static signature from content.
    pub fn analyze(&self, content: &str) -> FileSignature {
        let mut signature = FileSignature::default();

        for line in content.lines() {
            // Highest score wins; ties break by rule order
            let mut best: Option<(&SignatureRule, String)> = None;
            for rule in &self.rules {
                if let Some(m) = rule.pattern.captures(line).and_then(|c| c.get(1)) {
                    if best.as_ref().is_none_or(|(b, _)| rule.score > b.score) {
                        best = Some((rule, m.as_str().to_string()));
                    }
                }
            }

            if let Some((rule, name)) = best {
                push_name(section_mut(&mut signature, rule.kind), name);
            }
        }

        if signature.is_structureless() {
            signature.preview = truncate_chars(content, PREVIEW_CHARS);
        }

        signature
    }
}

fn section_mut(signature: &mut FileSignature, kind: SignatureKind) -> &mut Vec<String> {
    match kind {
        SignatureKind::Import => &mut signature.imports,
        SignatureKind::Export => &mut signature.exports,
        SignatureKind::Function => &mut signature.functions,
        SignatureKind::Class => &mut signature.classes,
        SignatureKind::Interface => &mut signature.interfaces,
        SignatureKind::TypeAlias => &mut signature.types,
    }
}

fn push_name(section: &mut Vec<String>, name: String) {
    if section.len() < MAX_NAMES_PER_SECTION && !section.contains(&name) {
        section.push(name);
    }
}

/// Truncate to at most `n` characters on a char boundary.
fn truncate_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

/// Built-in rule table covering the common source shapes.
// Allow expect here as the regexes are compile-time verified to be valid
#[allow(clippy::expect_used)]
fn builtin_rules() -> Vec<SignatureRule> {
    let rule = |pattern: &str, kind, score| SignatureRule {
        pattern: Regex::new(pattern).expect("constant regex pattern is valid"),
        kind,
        score,
    };

    vec![
        // Imports
        rule(
            r#"^\s*import\s+.*?\bfrom\s+['"]([^'"]+)['"]"#,
            SignatureKind::Import,
            30,
        ),
        rule(
            r#"^\s*(?:const|let|var)\s+\w+\s*=\s*require\(\s*['"]([^'"]+)['"]"#,
            SignatureKind::Import,
            30,
        ),
        rule(r"^\s*use\s+([A-Za-z0-9_]+)", SignatureKind::Import, 20),
        rule(
            r"^\s*import\s+([A-Za-z0-9_.]+)\s*$",
            SignatureKind::Import,
            20,
        ),
        // Exports (win over the plain declarations they wrap)
        rule(
            r"^\s*export\s+(?:default\s+)?(?:abstract\s+)?(?:const|let|var|function|class|interface|type|enum)\s+(\w+)",
            SignatureKind::Export,
            40,
        ),
        rule(r"^\s*module\.exports\s*=\s*(\w+)", SignatureKind::Export, 40),
        // Interfaces and traits
        rule(r"^\s*interface\s+(\w+)", SignatureKind::Interface, 25),
        rule(r"^\s*(?:pub\s+)?trait\s+(\w+)", SignatureKind::Interface, 25),
        // Classes and structs
        rule(
            r"^\s*(?:abstract\s+)?class\s+(\w+)",
            SignatureKind::Class,
            25,
        ),
        rule(r"^\s*(?:pub\s+)?struct\s+(\w+)", SignatureKind::Class, 25),
        // Type aliases and enums
        rule(r"^\s*type\s+(\w+)\s*=", SignatureKind::TypeAlias, 25),
        rule(r"^\s*(?:pub\s+)?enum\s+(\w+)", SignatureKind::TypeAlias, 25),
        // Functions
        rule(
            r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?fn\s+(\w+)",
            SignatureKind::Function,
            20,
        ),
        rule(
            r"^\s*(?:async\s+)?function\s+(\w+)",
            SignatureKind::Function,
            20,
        ),
        rule(r"^\s*(?:async\s+)?def\s+(\w+)", SignatureKind::Function, 20),
    ]
}

#[cfg(test)]
#[path = "analyzer_tests.rs"]
mod tests;
