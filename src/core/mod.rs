//! Core catalog logic.
//!
//! This module contains:
//! - Validator: hierarchy integrity checks
//! - Engine: category and item workflows
//! - Queries: trees, rankings and statistics
//! - Uploads: file payload limits

pub mod categories;
pub mod engine;
pub mod items;
pub mod queries;
pub mod uploads;
pub mod validator;

// Re-export commonly used types
pub use engine::{BulkOutcome, CatalogEngine};
pub use queries::CategoryStatistics;
pub use uploads::{content_type_for, thumbnail_ref_for, UploadPolicy, UploadViolation};
pub use validator::{next_display_order, HierarchyValidator};
