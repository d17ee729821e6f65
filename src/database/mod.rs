/*!
 * Database module for persistent storage of sources, fragments and chunks.
 *
 * This module provides SQLite-based persistence for:
 * - Source metadata with per-stage body hashes for change detection
 * - Fragment texts deduplicated across sources, with their occurrences
 * - Display chunks per source
 */

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;

// Re-export main types
pub use connection::{DatabaseConnection, DatabaseStats};
pub use models::{ChunkRecord, FragmentRecord, FragmentWithRefs, HitRef, ProcessingStage, SourceRecord, StoreSummary};
pub use repository::Repository;
