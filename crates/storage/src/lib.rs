// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for the Vibe Flow context management core

mod archive;
mod audit;
mod transactions;
mod wal;

pub use archive::{ArchiveError, ArchiveStore, ContextArchive};
pub use audit::{AuditError, AuditLog, AuditRecord};
pub use transactions::{
    Appended, SearchResults, StoreError, StoreStats, TransactionQuery, TransactionStore,
};
pub use wal::{FrameInfo, RecoveryOutcome, StateFrame, StateMap, StateWal, WalError};
