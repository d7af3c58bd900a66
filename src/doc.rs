//! Single-document handle with local mutation tracking.
//!
//! [`Doc`] binds an optional document id to a [`Db`] and carries a
//! [`DocData`] payload cell whose status flags drive the fetch/save cycle:
//!
//! - **new/empty** — no local payload; [`fetch_if_exists`](Doc::fetch_if_exists)
//!   moves to *fetched* only when the remote document exists.
//! - **set/merged** — local payload present and `changed`; [`save`](Doc::save)
//!   writes it through using the tracked revision.
//! - **fetched** — payload and `_rev` both came from the store; the cell is
//!   `pristine` and [`save_if_changed`](Doc::save_if_changed) is a no-op.
//!
//! The handle is exclusively owned by its caller. Its status flags are
//! updated in place by each call, so concurrent `set`/`save` on one handle
//! must be serialized by the application; use one handle per logical unit
//! of work.
//!
//! # Revision discipline
//!
//! `_rev` is populated by a successful fetch, create or save and is handed
//! to the store on the next write. The store, not this layer, rejects
//! writes carrying a stale revision.
//!
//! # Examples
//!
//! ```ignore
//! use megacouch::{Doc, Server};
//! use serde_json::json;
//!
//! let db = server.use_db("orders");
//! let mut doc = Doc::with_id(db.clone(), "o1");
//! doc.data.set(json!({"total": 10}))?;
//! doc.create().await?;
//!
//! doc.data.merge(json!({"total": 20}))?;
//! doc.save_if_changed().await?;
//! ```

use crate::db::{Db, DocumentInfo};
use crate::doc_data::DocData;
use crate::error::{CouchError, Result};
use crate::types::{DocGetParams, DocPutParams, DocumentCreated, OpenRevs};
use serde_json::{json, Value};
use uuid::Uuid;

/// A handle to one document in a database.
#[derive(Debug, Clone)]
pub struct Doc {
    id: Option<String>,
    rev: Option<String>,
    /// The local payload with dirty tracking.
    pub data: DocData,
    get_params: DocGetParams,
    db: Db,
}

impl Doc {
    /// A handle with no id yet; the store assigns one on
    /// [`create`](Self::create), or mint one locally with
    /// [`generate_id`](Self::generate_id) / [`generate_uuid`](Self::generate_uuid).
    pub fn new(db: Db) -> Doc {
        Doc {
            id: None,
            rev: None,
            data: DocData::new(),
            get_params: DocGetParams::default(),
            db,
        }
    }

    /// A handle bound to a known document id.
    pub fn with_id(db: Db, id: impl Into<String>) -> Doc {
        Doc {
            id: Some(id.into()),
            ..Doc::new(db)
        }
    }

    /// The bound document id, if any.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Rebind the handle to another id.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// The revision tracked from the last successful fetch or write.
    pub fn rev(&self) -> Option<&str> {
        self.rev.as_deref()
    }

    /// The database this handle reads and writes through.
    pub fn db(&self) -> &Db {
        &self.db
    }

    fn id_or_throw(&self) -> Result<&str> {
        self.id.as_deref().ok_or(CouchError::MissingId)
    }

    // ----- read-parameter builders -----

    /// Include detailed revision info on the next read.
    pub fn with_revisions(&mut self) -> &mut Self {
        self.get_params.revs_info = Some(true);
        self
    }

    /// Include attachment bodies on the next read.
    pub fn with_attachments(&mut self) -> &mut Self {
        self.get_params.attachments = Some(true);
        self
    }

    /// Include attachment encoding info on the next read.
    pub fn with_attachments_info(&mut self) -> &mut Self {
        self.get_params.att_encoding_info = Some(true);
        self
    }

    /// Include attachments only since the given revisions on the next read.
    pub fn with_attachments_since(&mut self, revs: Vec<String>) -> &mut Self {
        self.get_params.atts_since = Some(revs);
        self
    }

    /// Include conflict info on the next read.
    pub fn with_conflicts(&mut self) -> &mut Self {
        self.get_params.conflicts = Some(true);
        self
    }

    /// Include deleted-conflict info on the next read.
    pub fn with_deleted_conflicts(&mut self) -> &mut Self {
        self.get_params.deleted_conflicts = Some(true);
        self
    }

    /// Force the latest leaf revision on the next read.
    pub fn with_latest(&mut self) -> &mut Self {
        self.get_params.latest = Some(true);
        self
    }

    /// Include the local update sequence on the next read.
    pub fn with_local_seq(&mut self) -> &mut Self {
        self.get_params.local_seq = Some(true);
        self
    }

    /// Read the given leaf revisions (or all of them) on the next read.
    pub fn with_open_revs(&mut self, revs: OpenRevs) -> &mut Self {
        self.get_params.open_revs = Some(revs);
        self
    }

    /// Read a specific revision on the next read.
    pub fn with_rev(&mut self, rev: impl Into<String>) -> &mut Self {
        self.get_params.rev = Some(rev.into());
        self
    }

    /// Shorthand for conflicts + deleted conflicts + revision info.
    pub fn with_meta(&mut self) -> &mut Self {
        self.get_params.meta = Some(true);
        self
    }

    /// Reset the accumulated read parameters.
    pub fn done(&mut self) {
        self.get_params = DocGetParams::default();
    }

    // ----- reads -----

    /// Whether the remote document exists (`false` on any failure or when
    /// the handle has no id).
    pub async fn exists(&self) -> bool {
        match &self.id {
            Some(id) => self.db.doc_exists(id).await,
            None => false,
        }
    }

    /// Current remote id/revision metadata, read without the body.
    pub async fn info(&self) -> Result<DocumentInfo> {
        self.db.doc_info(self.id_or_throw()?).await
    }

    /// Read the remote document, collapsing any failure to `None`. Does
    /// not touch the local payload.
    pub async fn get(&self) -> Option<Value> {
        let id = self.id.as_deref()?;
        self.db.doc_get(id, Some(&self.get_params)).await
    }

    /// Read the remote document, propagating any failure. Does not touch
    /// the local payload.
    pub async fn get_or_throw(&self) -> Result<Value> {
        self.db
            .doc_get_or_throw(self.id_or_throw()?, Some(&self.get_params))
            .await
    }

    /// Read the remote document with detailed revision info included.
    pub async fn get_with_revisions(&self) -> Result<Value> {
        let mut params = self.get_params.clone();
        params.revs_info = Some(true);
        self.db
            .doc_get_or_throw(self.id_or_throw()?, Some(&params))
            .await
    }

    /// Fetch the remote document into the local payload.
    ///
    /// On success the payload is pristine and the handle tracks the
    /// fetched `_rev`.
    pub async fn fetch(&mut self) -> Result<&mut Self> {
        let doc = self
            .db
            .doc_get_or_throw(self.id_or_throw()?, Some(&self.get_params))
            .await?;
        self.rev = doc.get("_rev").and_then(Value::as_str).map(String::from);
        self.data.replace(doc);
        Ok(self)
    }

    /// Fetch only when the remote document exists; otherwise the handle
    /// stays empty.
    pub async fn fetch_if_exists(&mut self) -> Result<&mut Self> {
        if self.exists().await {
            self.fetch().await
        } else {
            Ok(self)
        }
    }

    // ----- writes -----

    /// Create this document.
    ///
    /// Dispatches to the id-preserving create when the handle already has
    /// an id, otherwise lets the store assign one. On success the returned
    /// id and revision are reflected back onto the handle, so an immediate
    /// [`save`](Self::save) is not revision-stale.
    pub async fn create(&mut self) -> Result<DocumentCreated> {
        let data = self.data.value().unwrap_or_else(|| json!({}));
        let created = match &self.id {
            Some(id) => self.db.doc_create_with_id(id, data).await?,
            None => self.db.doc_create(data).await?,
        };
        if created.is_ok() {
            if self.id.is_none() {
                self.id = Some(created.id.clone());
            }
            self.rev = created.rev.clone();
            self.data.mark_saved();
        }
        Ok(created)
    }

    /// Save the local payload to the store using the tracked revision.
    ///
    /// When the handle is empty it fetches first (if the remote document
    /// exists) so the write carries a current revision. On success the
    /// handle tracks the new revision and the payload is pristine again.
    pub async fn save(&mut self) -> Result<DocumentCreated> {
        if self.data.status().empty {
            self.fetch_if_exists().await?;
        }
        let rev = self.rev.clone().ok_or(CouchError::MissingRev)?;
        self.save_with_rev(rev).await
    }

    /// Save the local payload against an explicit revision instead of the
    /// tracked one.
    pub async fn save_to_rev(&mut self, rev: impl Into<String>) -> Result<DocumentCreated> {
        if self.data.status().empty {
            self.fetch_if_exists().await?;
        }
        self.save_with_rev(rev.into()).await
    }

    /// Save only when the payload carries unsaved mutations; a pristine or
    /// empty handle is a no-op returning `None`.
    pub async fn save_if_changed(&mut self) -> Result<Option<DocumentCreated>> {
        if !self.data.status().changed {
            return Ok(None);
        }
        self.save().await.map(Some)
    }

    async fn save_with_rev(&mut self, rev: String) -> Result<DocumentCreated> {
        let id = self.id_or_throw()?.to_string();
        let data = self.data.value().unwrap_or_else(|| json!({}));
        let created = self
            .db
            .doc_update(data, &DocPutParams::new(id, rev))
            .await?;
        if created.is_ok() {
            self.rev = created.rev.clone();
            self.data.mark_saved();
        }
        Ok(created)
    }

    // ----- deletes -----

    /// Delete the document at the tracked revision. Requires both id and
    /// revision before any network call.
    pub async fn delete(&self) -> Result<DocumentCreated> {
        let id = self.id_or_throw()?;
        let rev = self.rev.as_deref().ok_or(CouchError::MissingRev)?;
        self.db.doc_delete(id, rev).await
    }

    /// Delete a specific revision of the document.
    pub async fn delete_rev(&self, rev: &str) -> Result<DocumentCreated> {
        if rev.is_empty() {
            return Err(CouchError::MissingRev);
        }
        self.db.doc_delete(self.id_or_throw()?, rev).await
    }

    /// Re-read the document's current revision and delete exactly that
    /// one.
    pub async fn delete_last_rev(&self) -> Result<DocumentCreated> {
        let info = self.info().await?;
        self.db.doc_delete(self.id_or_throw()?, &info.rev).await
    }

    // ----- identifier minting -----

    /// Bind a fresh store-minted identifier (one `_uuids` round-trip).
    ///
    /// Use this where global uniqueness across the whole cluster is
    /// required; it is not interchangeable with
    /// [`generate_id`](Self::generate_id).
    pub async fn generate_uuid(&mut self) -> Result<&mut Self> {
        self.id = Some(self.db.server().get_uuid().await?);
        Ok(self)
    }

    /// Bind a locally-random identifier salted with the given prefixes; no
    /// store round-trip.
    pub fn generate_id(&mut self, prefixes: &[&str]) -> &mut Self {
        let hash = Uuid::new_v4().simple().to_string();
        self.id = Some(if prefixes.is_empty() {
            hash
        } else {
            format!("{}-{}", prefixes.join("-"), hash)
        });
        self
    }

    /// Drop the local payload and tracked revision; the id stays bound.
    pub fn clear(&mut self) -> &mut Self {
        self.data.clear();
        self.rev = None;
        self.done();
        self
    }
}
