//! # Bucket Sync
//!
//! Incremental synchronization of a remote object store (bucket + prefix)
//! into a search index.
//!
//! Each feed runs a polling scan loop: list the bucket, index objects
//! modified since the last watermark, delete documents whose source object
//! is gone, and persist the new watermark. There is no change feed from the
//! store; change detection is a timestamp comparison and deletion detection
//! is a set difference against the ids already in the index. Writes are
//! batched and at-least-once; document ids are a pure function of the
//! object key, so retries overwrite instead of duplicating.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────────────────┐   ┌─────────────┐
//! │ ObjectStore │──▶│ Scanner (one per feed)        │──▶│ SearchIndex │
//! │  S3 / mock  │   │ list→filter→write→reconcile  │   │ bulk/status │
//! └─────────────┘   └──────────────────────────────┘   └─────────────┘
//! ```
//!
//! The engine is stateless: the watermark and the enable/disable flag live
//! in the index collaborator, behind the [`traits::SearchIndex`]
//! capability. The host process that owns the real index implements that
//! trait and drives [`scanner::Scanner::run`] with a cancellation token;
//! the `bsync` binary only provides operational commands (`check`, `ls`).
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML feed configuration |
//! | [`models`] | Core data types |
//! | [`errors`] | Error taxonomy |
//! | [`traits`] | Object store / search index / extractor capabilities |
//! | [`connector_s3`] | S3 implementation of the object store |
//! | [`filter`] | Include/exclude key filtering |
//! | [`changes`] | Change detection against the watermark |
//! | [`writer`] | Per-object document construction |
//! | [`reconcile`] | Deletion detection |
//! | [`batch`] | Threshold-flushed bulk write-back |
//! | [`extract`] | Built-in content extraction |
//! | [`scanner`] | The per-feed scan loop |

pub mod batch;
pub mod changes;
pub mod config;
pub mod connector_s3;
pub mod errors;
pub mod extract;
pub mod filter;
pub mod models;
pub mod reconcile;
pub mod scanner;
pub mod traits;
pub mod writer;
