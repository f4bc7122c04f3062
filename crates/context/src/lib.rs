// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Active window pipeline for the Vibe Flow context management core.
//!
//! Shapes an unbounded conversation into a bounded provider payload:
//! noise pruning ([`window`]), file-pointer substitution ([`injector`]),
//! old-log archival and escalation summarization ([`archival`],
//! [`escalation`]), plus the read-only tool surface over the archives
//! ([`tools`]).

pub mod analyzer;
pub mod archival;
pub mod categorize;
pub mod escalation;
pub mod injector;
pub mod tools;
pub mod window;

pub use analyzer::{FileAnalyzer, SignatureKind, SignatureRule};
pub use archival::{ArchivalConfig, ArchivalResult, LogArchiver};
pub use categorize::{CategoryRule, EntryClassifier};
pub use escalation::{
    escalated_summarize, EscalationOptions, EscalationOutcome, LlmCaller, LlmError,
};
pub use injector::{FilePointerInjector, Injected, InjectorConfig};
pub use tools::{ArchiveTools, DescribeResult, GrepMatch, GrepOptions, ToolsError};
pub use window::{ActiveWindow, CleaningMode, CleaningResult, Payload, WindowConfig};
