/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for all database operations,
 * abstracting away the SQL details and providing type-safe access.
 */

use anyhow::Result;
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

use super::connection::{DatabaseConnection, DatabaseStats};
use super::models::{
    ChunkRecord, FragmentRecord, FragmentWithRefs, HitRef, ProcessingStage, SourceRecord, StoreSummary,
};
use crate::char_class::meaty_char_count;
use crate::document::{Chunk, DocumentKind, Fragment, Loc, SourceDocument};
use crate::errors::StorageError;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Open a repository at a path, or at the default location when `None`
    pub fn open(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Ok(Self::new(DatabaseConnection::new(path)?)),
            None => Self::new_default(),
        }
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    pub fn stats(&self) -> Result<DatabaseStats> {
        self.db.stats()
    }

    // =========================================================================
    // Source Operations
    // =========================================================================

    /// Insert or update a source row, returning its id
    fn upsert_source_sync(conn: &Connection, doc: &SourceDocument) -> Result<i64> {
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            r#"
            INSERT INTO sources (source_key, kind, title, url, published, tags, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            ON CONFLICT(source_key) DO UPDATE SET
                kind = excluded.kind,
                title = excluded.title,
                url = excluded.url,
                published = excluded.published,
                tags = excluded.tags,
                updated_at = excluded.updated_at
            "#,
            params![
                doc.key,
                doc.kind.mime_type(),
                doc.title,
                doc.url,
                doc.published,
                doc.kind.tags(),
                now,
            ],
        )?;

        let id = conn.query_row(
            "SELECT id FROM sources WHERE source_key = ?1",
            [&doc.key],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn set_stage_hash_sync(conn: &Connection, source_id: i64, stage: ProcessingStage, hash: &str) -> Result<()> {
        let sql = format!("UPDATE sources SET {} = ?1 WHERE id = ?2", stage.hash_column());
        conn.execute(&sql, params![hash, source_id])?;
        Ok(())
    }

    fn parse_source_row(row: &Row) -> rusqlite::Result<SourceRecord> {
        let kind: String = row.get(2)?;
        let kind = kind.parse::<DocumentKind>().map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                Type::Text,
                Box::new(StorageError::CorruptRecord(format!("source kind '{}'", kind))),
            )
        })?;

        Ok(SourceRecord {
            id: row.get(0)?,
            source_key: row.get(1)?,
            kind,
            title: row.get(3)?,
            url: row.get(4)?,
            published: row.get(5)?,
            tags: row.get(6)?,
            fragments_hash: row.get(7)?,
            chunks_hash: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    /// Get a source by its storage key
    pub async fn get_source_by_key(&self, key: &str) -> Result<Option<SourceRecord>> {
        let key = key.to_string();

        self.db
            .execute_async(move |conn| {
                let record = conn
                    .query_row(
                        r#"
                        SELECT id, source_key, kind, title, url, published, tags,
                               fragments_hash, chunks_hash, created_at, updated_at
                        FROM sources WHERE source_key = ?1
                        "#,
                        [&key],
                        Self::parse_source_row,
                    )
                    .optional()?;
                Ok(record)
            })
            .await
    }

    /// Body hash stored for a source when the given stage last ran
    pub async fn source_hash(&self, key: &str, stage: ProcessingStage) -> Result<Option<String>> {
        let key = key.to_string();

        self.db
            .execute_async(move |conn| {
                let sql = format!("SELECT {} FROM sources WHERE source_key = ?1", stage.hash_column());
                let hash: Option<Option<String>> = conn.query_row(&sql, [&key], |row| row.get(0)).optional()?;
                Ok(hash.flatten())
            })
            .await
    }

    // =========================================================================
    // Fragment Operations
    // =========================================================================

    /// Store the fragments of a source, replacing its previous occurrences.
    /// Fragment texts are shared across sources.
    pub async fn store_source_fragments(&self, doc: &SourceDocument, fragments: &[Fragment]) -> Result<StoreSummary> {
        let doc = doc.clone();
        let fragments = fragments.to_vec();
        let hash = doc.body_hash();

        self.db
            .transaction_async(move |tx| {
                let source_id = Self::upsert_source_sync(tx, &doc)?;
                tx.execute("DELETE FROM hits WHERE source_id = ?1", [source_id])?;

                let mut summary = StoreSummary {
                    source_id,
                    ..StoreSummary::default()
                };

                let mut insert_fragment = tx.prepare_cached(
                    "INSERT OR IGNORE INTO fragments (text, count_chars, count_meaty_chars) VALUES (?1, ?2, ?3)",
                )?;
                let mut select_fragment = tx.prepare_cached("SELECT id FROM fragments WHERE text = ?1")?;
                let mut insert_hit =
                    tx.prepare_cached("INSERT OR IGNORE INTO hits (fragment_id, source_id, loc) VALUES (?1, ?2, ?3)")?;

                for fragment in &fragments {
                    let count_chars = fragment.text.chars().count() as i64;
                    let count_meaty = meaty_char_count(&fragment.text) as i64;
                    summary.new_fragments += insert_fragment.execute(params![fragment.text, count_chars, count_meaty])?;

                    let fragment_id: i64 = select_fragment.query_row([&fragment.text], |row| row.get(0))?;
                    let loc = fragment.loc.as_ref().map(Loc::to_string).unwrap_or_default();
                    summary.hits += insert_hit.execute(params![fragment_id, source_id, loc])?;
                }

                // Texts only this source used before a body change
                summary.removed_fragments = tx.execute(
                    "DELETE FROM fragments WHERE NOT EXISTS (SELECT 1 FROM hits h WHERE h.fragment_id = fragments.id)",
                    [],
                )?;

                Self::set_stage_hash_sync(tx, source_id, ProcessingStage::Fragments, &hash)?;
                debug!(
                    "Stored {} hits ({} new fragments, {} removed) for {}",
                    summary.hits, summary.new_fragments, summary.removed_fragments, doc.key
                );
                Ok(summary)
            })
            .await
    }

    /// Get a fragment by its text
    pub async fn get_fragment(&self, text: &str) -> Result<Option<FragmentRecord>> {
        let text = text.to_string();

        self.db
            .execute_async(move |conn| {
                let record = conn
                    .query_row(
                        "SELECT id, text, count_chars, count_meaty_chars FROM fragments WHERE text = ?1",
                        [&text],
                        |row| {
                            Ok(FragmentRecord {
                                id: row.get(0)?,
                                text: row.get(1)?,
                                count_chars: row.get(2)?,
                                count_meaty_chars: row.get(3)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(record)
            })
            .await
    }

    /// All fragments that still occur in some source, in id order, each with at
    /// most `max_refs` occurrences.
    /// Occurrences are sampled with a shuffle seeded from `seed` and the fragment
    /// id, so repeated runs over the same data pick the same ones.
    pub async fn fragments_with_refs(&self, max_refs: usize, seed: u64) -> Result<Vec<FragmentWithRefs>> {
        self.db
            .execute_async(move |conn| {
                let mut refs_by_fragment: HashMap<i64, Vec<HitRef>> = HashMap::new();
                {
                    let mut stmt = conn.prepare(
                        r#"
                        SELECT h.fragment_id, s.source_key, s.title, s.url, s.tags, h.loc
                        FROM hits h JOIN sources s ON s.id = h.source_id
                        ORDER BY h.fragment_id, s.source_key, h.loc
                        "#,
                    )?;
                    let mut rows = stmt.query([])?;
                    while let Some(row) = rows.next()? {
                        let loc: String = row.get(5)?;
                        let loc = if loc.is_empty() {
                            None
                        } else {
                            Some(
                                loc.parse::<Loc>()
                                    .map_err(|_| StorageError::CorruptRecord(format!("hit loc '{}'", loc)))?,
                            )
                        };
                        refs_by_fragment.entry(row.get(0)?).or_default().push(HitRef {
                            source_key: row.get(1)?,
                            title: row.get(2)?,
                            url: row.get(3)?,
                            tags: row.get(4)?,
                            loc,
                        });
                    }
                }

                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, text, count_chars, count_meaty_chars FROM fragments
                    WHERE EXISTS (SELECT 1 FROM hits h WHERE h.fragment_id = fragments.id)
                    ORDER BY id
                    "#,
                )?;
                let fragments = stmt
                    .query_map([], |row| {
                        Ok(FragmentRecord {
                            id: row.get(0)?,
                            text: row.get(1)?,
                            count_chars: row.get(2)?,
                            count_meaty_chars: row.get(3)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                let result = fragments
                    .into_iter()
                    .map(|fragment| {
                        let mut refs = refs_by_fragment.remove(&fragment.id).unwrap_or_default();
                        let total_refs = refs.len();
                        if refs.len() > max_refs {
                            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(fragment.id as u64));
                            refs.shuffle(&mut rng);
                            refs.truncate(max_refs);
                        }
                        FragmentWithRefs {
                            fragment,
                            refs,
                            total_refs,
                        }
                    })
                    .collect();

                Ok(result)
            })
            .await
    }

    // =========================================================================
    // Chunk Operations
    // =========================================================================

    /// Replace the stored chunks of a source
    pub async fn replace_source_chunks(&self, doc: &SourceDocument, chunks: &[Chunk]) -> Result<usize> {
        let doc = doc.clone();
        let chunks = chunks.to_vec();
        let hash = doc.body_hash();

        self.db
            .transaction_async(move |tx| {
                let source_id = Self::upsert_source_sync(tx, &doc)?;
                tx.execute("DELETE FROM chunks WHERE source_id = ?1", [source_id])?;

                let mut insert = tx.prepare_cached(
                    "INSERT INTO chunks (source_id, seq, loc, text, html) VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for (seq, chunk) in chunks.iter().enumerate() {
                    let loc = chunk.loc.as_ref().map(Loc::to_string);
                    insert.execute(params![source_id, seq as i64, loc, chunk.text, chunk.html])?;
                }

                Self::set_stage_hash_sync(tx, source_id, ProcessingStage::Chunks, &hash)?;
                debug!("Stored {} chunks for {}", chunks.len(), doc.key);
                Ok(chunks.len())
            })
            .await
    }

    /// Chunks of a source in order
    pub async fn get_chunks(&self, key: &str) -> Result<Vec<ChunkRecord>> {
        let key = key.to_string();

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT c.id, c.source_id, c.seq, c.loc, c.text, c.html
                    FROM chunks c JOIN sources s ON s.id = c.source_id
                    WHERE s.source_key = ?1
                    ORDER BY c.seq
                    "#,
                )?;
                let rows = stmt
                    .query_map([&key], |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, Option<String>>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, String>(5)?,
                        ))
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                let mut chunks = Vec::with_capacity(rows.len());
                for (id, source_id, seq, loc, text, html) in rows {
                    let loc = match loc {
                        Some(loc) => Some(
                            loc.parse::<Loc>()
                                .map_err(|_| StorageError::CorruptRecord(format!("chunk loc '{}'", loc)))?,
                        ),
                        None => None,
                    };
                    chunks.push(ChunkRecord {
                        id,
                        source_id,
                        seq,
                        loc,
                        text,
                        html,
                    });
                }
                Ok(chunks)
            })
            .await
    }
}
