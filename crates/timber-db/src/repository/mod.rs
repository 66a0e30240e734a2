//! # Repository Module
//!
//! Database repository implementations for TimberBooks.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  RecalculationCascade / external endpoints                      │
//! │       │                                                         │
//! │       │  db.catalog_items().find_by_scope(&scope)               │
//! │       ▼                                                         │
//! │  CatalogItemRepository / MarkupRuleRepository                   │
//! │       │                                                         │
//! │       │  SQL (scope-key equality only; listing UX is external)  │
//! │       ▼                                                         │
//! │  SQLite Database                                                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`markup_rule::MarkupRuleRepository`] - markup rule lifecycle, one active per scope
//! - [`catalog_item::CatalogItemRepository`] - catalog items and their derived price fields

pub mod catalog_item;
pub mod markup_rule;
