pub mod core;
pub mod sets;
pub mod compression;
pub mod analysis;
pub mod scoring;
pub mod text;
pub mod index;
pub mod query;
pub mod catalog;
pub mod storage;

pub use crate::catalog::{Catalog, CatalogQuery, DocumentMap, QueryOptions, ResultSet};
pub use crate::core::config::Config;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::types::{DocId, Document, Value};
pub use crate::index::{
    CatalogIndex, Discriminator, FacetIndex, FieldIndex, IndexKind, KeywordIndex, SortType, TextIndex,
};
pub use crate::query::{parse_query, Query, Term};
pub use crate::sets::Results;
pub use crate::storage::{Store, Transaction};

/*
┌────────────────────────────────────────────────────────────────────────────────────────────┐
│                              CATALOGIX STRUCT ARCHITECTURE                                   │
└────────────────────────────────────────────────────────────────────────────────────────────┘

┌─────────────────────────────────────── CATALOG LAYER ───────────────────────────────────────┐
│                                                                                              │
│  ┌────────────────────────────────────────────────────────────────────────────────────┐    │
│  │                               struct Catalog                                        │    │
│  │  ┌──────────────────────────────────────────────────────────────────────────────┐ │    │
│  │  │ config: Config                               // Thresholds, scorer, storage  │ │    │
│  │  │ indexes: BTreeMap<String, Box<dyn CatalogIndex>> // Name -> index           │ │    │
│  │  └──────────────────────────────────────────────────────────────────────────────┘ │    │
│  └────────────────────────────────────────────────────────────────────────────────────┘    │
│                                                                                              │
│  ┌──────────────────────┐  ┌──────────────────────┐  ┌──────────────────────────────┐    │
│  │ struct CatalogQuery  │  │ struct ResultSet     │  │ struct DocumentMap           │    │
│  │ • query(text|tree)   │  │ • ids: Vec<DocId>    │  │ • docid <-> address          │    │
│  │ • search(pairs)      │  │ • numids             │  │ • docid -> Metadata          │    │
│  │ • sort(results)      │  │ • weights            │  │ • new_docid()                │    │
│  └──────────────────────┘  └──────────────────────┘  └──────────────────────────────┘    │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────────── QUERY LAYER ────────────────────────────────────────┐
│                                                                                              │
│  ┌──────────────────────────┐  ┌──────────────────────────┐  ┌──────────────────────────┐ │
│  │ enum Query               │  │ struct ExpressionParser  │  │ struct QueryOptimizer    │ │
│  │ • Comparator{index, cmp} │  │ • nom grammar -> Expr    │  │ • FlattenRule            │ │
│  │ • And / Or (flattened)   │  │ • Expr -> Query          │  │ • GroupAnyAllRule        │ │
│  │ • Not / Difference       │  │ • optimize: bool         │  │ • RangeMergeRule         │ │
│  └──────────────────────────┘  └──────────────────────────┘  │ • UnwrapSingleRule       │ │
│                                                               └──────────────────────────┘ │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌─────────────────────────────────────── INDEXING LAYER ──────────────────────────────────────┐
│                                                                                              │
│  trait CatalogIndex: index_doc, unindex_doc, apply_*, negate, sort, snapshot, restore       │
│                                                                                              │
│  ┌────────────────────┐ ┌────────────────────┐ ┌────────────────────┐ ┌──────────────────┐ │
│  │ FieldIndex         │ │ KeywordIndex       │ │ FacetIndex         │ │ TextIndex        │ │
│  │ • forward: Value   │ │ • forward: Value   │ │ • taxonomy         │ │ • engine:        │ │
│  │   -> DocSet        │ │   -> Bucket        │ │ • KeywordData      │ │   TextEngine     │ │
│  │ • reverse: DocId   │ │ • reverse: DocId   │ │ • counts()         │ │ • not_indexed    │ │
│  │   -> Value         │ │   -> {Value}       │ └────────────────────┘ └──────────────────┘ │
│  │ • nbest/timsort/   │ │ • Normalizer       │                                               │
│  │   fwscan sort      │ └────────────────────┘                                               │
│  └────────────────────┘                                                                      │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────────── TEXT LAYER ─────────────────────────────────────────┐
│                                                                                              │
│  TextEngine { lexicon: Lexicon, postings: PostingData, scorer: Box<dyn Scorer> }            │
│  Lexicon { wids <-> words, pipeline: splitter -> case -> stopwords [-> stemmer] }           │
│  PostingData { word_info: Wid -> Weighted, doc_words: WidCode bytes, total_doc_len }        │
│  QueryParser -> ParseTree (And / Or / Not / Atom / Phrase / Glob)                           │
│  Scorer: OkapiScorer (K1, B) | CosineScorer                                                  │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌─────────────────────────────────────── STORAGE LAYER ───────────────────────────────────────┐
│                                                                                              │
│  Store { layout: StorageLayout, sync_on_commit, write_lock }                                │
│     meta/catalog.bin = "CTLX" | version | crc32 | len | bincode(CatalogSnapshot)            │
│  Transaction { state: Active/Committed/Aborted, rollback: CatalogSnapshot }                 │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────── RELATIONSHIPS ────────────────────────────────────────────┐
│                                                                                              │
│  CatalogQuery ──parses──> ExpressionParser ──yields──> Query ──optimized by──> Optimizer    │
│       │                                                  │                                  │
│       │                                                  └──applies to──> CatalogIndex      │
│       └──sorts with──> CatalogIndex::sort ──returns──> ResultSet                            │
│                                                                                              │
│  Store ──begin──> Transaction ──mutates──> Catalog ──snapshot──> CatalogSnapshot            │
│                                                                                              │
│  Results (Set | Weighted) ──combined by──> weighted_union / weighted_intersection           │
│                                                                                              │
└──────────────────────────────────────────────────────────────────────────────────────────────┘
*/
