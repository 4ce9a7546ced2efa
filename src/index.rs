//! In-memory full-text index over documentation chunks.
//!
//! Each [`Chunk`] becomes one tantivy document keyed by its composite
//! `name#id`. Queries are matched against both the document path and the
//! chunk body, with exact terms scored by BM25 and typo-tolerant
//! (Levenshtein distance 1) matches contributing at a lower weight.

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, Query, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tracing::warn;

use crate::error::{DocsError, Result};
use crate::models::Chunk;

/// Result count used when the caller asks for a non-positive limit.
pub const DEFAULT_SEARCH_LIMIT: usize = 25;

/// Edit distance tolerated for fuzzy term matches.
pub const FUZZY_DISTANCE: u8 = 1;

const WRITER_HEAP_BYTES: usize = 50_000_000;
const FUZZY_WEIGHT: f32 = 0.5;

/// Read-only search index. Built once, then only queried.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    id: Field,
    name: Field,
    content: Field,
    len: usize,
}

impl SearchIndex {
    /// Indexes `chunks`.
    ///
    /// A chunk that cannot be added is logged and skipped; failing to create
    /// or commit the index aborts the build.
    pub fn build<'a>(chunks: impl IntoIterator<Item = &'a Chunk>) -> Result<Self> {
        let mut builder = Schema::builder();
        let id = builder.add_text_field("id", STRING | STORED);
        let name = builder.add_text_field("name", TEXT);
        let content = builder.add_text_field("content", TEXT);
        let index = Index::create_in_ram(builder.build());

        let mut writer: IndexWriter = index
            .writer_with_num_threads(1, WRITER_HEAP_BYTES)
            .map_err(DocsError::Index)?;

        let mut len = 0;
        for chunk in chunks {
            let key = chunk.key();
            let document = doc!(
                id => key.clone(),
                name => chunk.name.clone(),
                content => chunk.content.clone(),
            );
            match writer.add_document(document) {
                Ok(_) => len += 1,
                Err(err) => warn!(chunk = %key, error = %err, "failed to index docs chunk"),
            }
        }
        writer.commit().map_err(DocsError::Index)?;
        drop(writer);

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(DocsError::Index)?;

        Ok(Self {
            index,
            reader,
            id,
            name,
            content,
            len,
        })
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns up to `limit` chunk keys, best match first.
    ///
    /// A `limit` of zero falls back to [`DEFAULT_SEARCH_LIMIT`]. The collector
    /// preallocates `limit` slots, so it never asks for more than the index
    /// holds.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let limit = if limit == 0 { DEFAULT_SEARCH_LIMIT } else { limit };
        let limit = limit.min(self.len.max(1));
        let query = self.build_query(query);

        let searcher = self.reader.searcher();
        let hits = searcher
            .search(&*query, &TopDocs::with_limit(limit))
            .map_err(DocsError::Search)?;

        let mut keys = Vec::with_capacity(hits.len());
        for (_score, address) in hits {
            let stored: TantivyDocument = searcher.doc(address).map_err(DocsError::Search)?;
            if let Some(key) = stored.get_first(self.id).and_then(|v| v.as_str()) {
                keys.push(key.to_string());
            }
        }
        Ok(keys)
    }

    fn build_query(&self, text: &str) -> Box<dyn Query> {
        let fields = vec![self.name, self.content];

        let exact_parser = QueryParser::for_index(&self.index, fields.clone());
        let (exact, _) = exact_parser.parse_query_lenient(text);

        let mut fuzzy_parser = QueryParser::for_index(&self.index, fields);
        fuzzy_parser.set_field_fuzzy(self.name, false, FUZZY_DISTANCE, true);
        fuzzy_parser.set_field_fuzzy(self.content, false, FUZZY_DISTANCE, true);
        let (fuzzy, _) = fuzzy_parser.parse_query_lenient(text);

        Box::new(BooleanQuery::new(vec![
            (Occur::Should, exact),
            (
                Occur::Should,
                Box::new(BoostQuery::new(fuzzy, FUZZY_WEIGHT)) as Box<dyn Query>,
            ),
        ]))
    }
}
