//! WhatDose Safety Engine
//!
//! Advisory safety checks over a user's supplement stack:
//! - Interaction warnings between supplements sharing interacting substances
//! - Dosage warnings for items above their recommended maximum
//! - Daily timeline projection of the stack into time-of-day slots
//! - App-lifetime notification and refill lists over an injected store
//!
//! Checks are fail-open. A lookup failure produces no warnings rather than an
//! error, so a flaky catalog never blocks the user from editing their stack.
//!
//! # Example
//!
//! ```ignore
//! use whatdose_safety::{DosageCheckItem, MemorySafetyStore, SafetyEngine, SupplementId};
//!
//! let store = MemorySafetyStore::new()
//!     .with_supplement(1, "Creatine")
//!     .with_supplement(2, "Caffeine")
//!     .with_contains(1, 10)
//!     .with_contains(2, 20)
//!     .with_interaction(10, 20, 3);
//!
//! let engine = SafetyEngine::new(store);
//! let report = engine.check_stack(&items).await;
//! for warning in report.warnings() {
//!     println!("{:?}", warning.level(&engine.policy().levels));
//! }
//! ```

pub mod dosage;
pub mod engine;
pub mod interactions;
pub mod kv;
pub mod memory;
pub mod policy;
pub mod report;
pub mod store;
pub mod timeline;
pub mod types;

pub use dosage::{check_dosages, DosageCheckItem};
pub use engine::SafetyEngine;
pub use interactions::{check_interactions, UNKNOWN_NAME};
pub use kv::{
    KeyValueStore, MemoryKeyValueStore, Notification, NotificationInbox, NotificationKind, RefillList,
    StorageError,
};
pub use memory::{FailingLookup, MemorySafetyStore};
pub use policy::{
    DosageBand, DosagePolicy, LevelBand, LevelPolicy, PolicyError, SafetyPolicy, SeverityLevel, MAX_SEVERITY,
    MIN_SEVERITY,
};
pub use report::{SafetyReport, SafetyWarning};
pub use store::{LookupError, SafetyStore};
pub use timeline::{build_timeline, DailyTimeline, TimelineEntry, TimelineSlot};
pub use types::*;
