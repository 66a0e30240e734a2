//! # TimberBooks Database Layer
//!
//! SQLite persistence for the pricing engine: markup rules, catalog items,
//! and the recalculation cascade that keeps stored MRP bands in sync with
//! their inputs.
//!
//! ## Architecture
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        timber-db                             │
//! │                                                              │
//! │  ┌───────────┐   ┌──────────────────────┐   ┌────────────┐  │
//! │  │  Database │──▶│   Repositories       │◀──│  Cascade   │  │
//! │  │  (pool)   │   │  markup_rule         │   │ (triggers  │  │
//! │  │           │   │  catalog_item        │   │  A and B)  │  │
//! │  └───────────┘   └──────────────────────┘   └────────────┘  │
//! │        │                                                     │
//! │        ▼                                                     │
//! │  ┌──────────────────────────────────────┐                   │
//! │  │  SQLite (WAL) + embedded migrations  │                   │
//! │  └──────────────────────────────────────┘                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! All price math lives in `timber-core`; this crate only stores inputs,
//! persists derived bands, and orchestrates when re-derivation happens.

pub mod cascade;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// Re-export main types at crate root
pub use cascade::{CascadeReport, ItemOutcome, OutcomeStatus, RecalculationCascade};
pub use error::{DbError, DbResult};
pub use migrations::{migration_status, run_migrations};
pub use pool::{Database, DbConfig};
pub use repository::catalog_item::{CatalogItemRepository, NewCatalogItem};
pub use repository::markup_rule::MarkupRuleRepository;
