// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier newtypes and minting.
//!
//! Every entity in the core (transactions, pointers, files, entries,
//! tasks, context snapshots) is keyed by its own string newtype so ids
//! cannot be mixed up across components. Fresh ids come from an [`IdGen`]
//! passed in at construction; production uses 128-bit random ids, tests
//! use a counting minter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Declare a domain identifier backed by an owned string.
///
/// The raw value stays private; callers go through `new`, `as_str`, or
/// the string conversions. Ids compare against bare strings and work as
/// `&str`-keyed map lookups.
#[macro_export]
macro_rules! string_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        // Map lookups by bare &str
        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

/// Mints fresh identifier strings.
pub trait IdGen: Clone + Send + Sync {
    fn mint(&self) -> String;
}

/// 128-bit random identifiers (UUID v4); the production minter.
#[derive(Clone, Copy, Default)]
pub struct RandomIdGen;

impl IdGen for RandomIdGen {
    fn mint(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic `prefix-N` identifiers for tests.
///
/// Clones share the counter, so every handle in a test mints from the
/// same sequence.
#[derive(Clone)]
pub struct CountingIdGen {
    prefix: Arc<str>,
    next: Arc<AtomicU64>,
}

impl CountingIdGen {
    pub fn new(prefix: impl AsRef<str>) -> Self {
        Self {
            prefix: Arc::from(prefix.as_ref()),
            next: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl IdGen for CountingIdGen {
    fn mint(&self) -> String {
        format!("{}-{}", self.prefix, self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
