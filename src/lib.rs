//! # StrataKV
//!
//! An embeddable, persistent key-value store built on a **write-optimized
//! layered sorted-array index** (a Bε-tree with ε ≈ ½, in the style of
//! cache-oblivious lookahead arrays). Designed for fast ingest of short
//! keys with arbitrary binary values.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                         Db                             │
//! │  ┌──────────────────────────┐   ┌───────────────────┐  │
//! │  │           Sst            │   │       Vlog        │  │
//! │  │  L0 append buffer        │   │  append-only,     │  │
//! │  │  L1..Lk sorted levels    │──►│  CRC-protected    │  │
//! │  │  bloom + block indexes   │   │  value records    │  │
//! │  └──────────────────────────┘   └───────────────────┘  │
//! │              │                                         │
//! │              ▼ synchronous merge cascade on L0 fill    │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`db`] | Top-level façade — open, put, get, exists, delete, scan, compact |
//! | [`sst`] | Layered sorted-array index with bloom filter and block indexes |
//! | [`vlog`] | Append-only, CRC-protected value log |
//! | [`encoding`] | Deterministic little-endian wire format for all on-disk state |
//! | [`stats`] | Shared atomic operation counters |
//!
//! ## Key Features
//!
//! - **Write-optimized ingest** — inserts append to an unsorted L0 buffer;
//!   sorting cost is amortized across level merges with geometric fan-out.
//! - **Tombstone deletes** — removals are records too, and the bytes they
//!   strand in the value log are tracked for reclamation by `compact`.
//! - **Bloom-filtered lookups** — a persisted, deterministically seeded
//!   filter short-circuits lookups for absent keys.
//! - **Commit-by-header** — every mutation becomes visible only when the
//!   fixed-offset header lands; a torn L0 append is invisible on reopen.
//! - **Block-indexed reads** — point lookups above L0 read exactly one
//!   block of a sorted level, found by binary search in memory.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stratakv::Db;
//!
//! let db = Db::open("/tmp/my_db").unwrap();
//!
//! // Write
//! db.put(b"hello", b"world").unwrap();
//!
//! // Read
//! assert_eq!(db.get(b"hello").unwrap(), Some(b"world".to_vec()));
//!
//! // Delete
//! db.delete(b"hello").unwrap();
//! assert_eq!(db.get(b"hello").unwrap(), None);
//!
//! // Scan
//! db.put(b"a", b"1").unwrap();
//! db.put(b"b", b"2").unwrap();
//! let pairs = db.scan(b"a", b"c", 0).unwrap();
//! assert_eq!(pairs.len(), 2);
//!
//! // Graceful shutdown
//! db.close().unwrap();
//! ```

pub mod db;
pub mod encoding;
pub mod sst;
pub mod stats;
pub mod vlog;

pub use db::{Db, DbError};
pub use sst::{Item, Sst, SstError};
pub use stats::{Stats, StatsSnapshot};
pub use vlog::{Vlog, VlogError};
