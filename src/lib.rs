#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # MegaCouch: an async CouchDB client
//!
//! This crate is a client-side data-access layer for CouchDB, a remote
//! multi-version document store reachable over HTTP. It exposes three
//! cooperating abstractions that respect the store's optimistic-concurrency
//! (MVCC) revision model:
//!
//! 1. **[`Server`]** — connection handle: credentialed base URL, HTTP verb
//!    methods, database lifecycle, UUID minting, connection checks
//! 2. **[`Db`]** — per-database facade: document CRUD, bulk operations,
//!    `_find` queries, views, replication jobs, `_security` management
//! 3. **[`Doc`]** — single-document handle: a [`DocData`] payload cell with
//!    `{pristine, changed, empty}` dirty tracking, plus fetch / create /
//!    save / delete under revision discipline
//!
//! Control flow is strictly layered: application → `Doc` (optional) → `Db`
//! → `Server` → HTTP. `Db` is the only component that knows REST path
//! shapes; `Doc` is the only component that knows local dirty state.
//!
//! ## Key Features
//!
//! - **Revision discipline**: every write carries the revision the caller
//!   last read; the store rejects stale writes with a conflict
//! - **Dirty tracking**: `save_if_changed` is a no-op unless the local
//!   payload actually changed; reserved (`_`-prefixed) keys are rejected
//!   from application payloads before any network call
//! - **Bulk operations** with per-item failure reporting, never
//!   all-or-nothing
//! - **Security set algebra**: `_security` grants merge as set union and
//!   revoke as set difference, idempotently
//! - **Two error styles, preserved on purpose**: soft accessors collapse
//!   every failure to `None`/`false`; throwing accessors propagate a typed
//!   [`CouchError`]
//!
//! ## Client Usage
//!
//! ```ignore
//! use megacouch::{Doc, Server, ServerConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> megacouch::Result<()> {
//!     let server = Server::new(&ServerConfig {
//!         scheme: "http".into(),
//!         user: "admin".into(),
//!         password: "secret".into(),
//!         host: "127.0.0.1".into(),
//!         port: 5984,
//!     })?;
//!     server.check_connection_or_throw().await?;
//!
//!     let db = server.use_db("orders");
//!     db.create_if_not_exists().await?;
//!
//!     let mut doc = Doc::with_id(db.clone(), "o1");
//!     doc.data.set(json!({"total": 10}))?;
//!     doc.create().await?;
//!
//!     doc.data.merge(json!({"total": 20}))?;
//!     doc.save_if_changed().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Concurrency Model
//!
//! All operations are single-shot async request/response calls; there is no
//! background scheduler. [`Server`] and [`Db`] are stateless per call and
//! cheap to clone, so many operations may be in flight concurrently against
//! one connection. A [`Doc`] handle is *not* meant to be shared across
//! concurrent mutation paths; serialize access or use one handle per
//! logical unit of work. No built-in timeout or retry exists: callers
//! needing deadlines wrap calls externally, and the only conflict-avoidance
//! mechanism is the store's own `_rev` check.
//!
//! ## Module Structure
//!
//! - **[`server`]** - Connection handle and HTTP verb plumbing
//! - **[`db`]** - Per-database operations facade
//! - **[`doc`]** - Single-document handle
//! - **[`doc_data`]** - Payload cell with dirty tracking
//! - **[`types`]** - Wire types, security set algebra, sort normalization
//! - **[`validate`]** - Pure validation helpers
//! - **[`error`]** - Error types and result handling

pub mod db;
pub mod doc;
pub mod doc_data;
pub mod error;
pub mod server;
pub mod types;
pub mod validate;

pub use db::{Db, DocumentInfo};
pub use doc::Doc;
pub use doc_data::{DocData, DocStatus};
pub use error::{CouchError, Result};
pub use server::Server;
pub use types::{
    DocGetParams, DocPutParams, DocumentCreated, FindRequest, FindResponse, ReplicationOptions,
    SecurityDocument, SecurityGroup, ServerConfig, SortSpec,
};
