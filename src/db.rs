//! Per-database operations facade.
//!
//! [`Db`] names one collection on a [`Server`] and is the only component
//! that knows the store's REST path shapes. It covers:
//!
//! | Area | Operations |
//! |------|-----------|
//! | Lifecycle | `create_if_not_exists`, `create_or_throw`, `exists`, `info`, `destroy` |
//! | CRUD | `doc_get(_or_throw)`, `doc_create(_with_id)`, `doc_update`, `doc_delete` |
//! | Bulk | `bulk_get(_raw)`, `bulk_insert_raw`, `bulk_update_raw`, `all_docs`, `all_user_docs` |
//! | Query | `find_raw`, `explain`, `find_one(_or_throw)`, `find_first(_or_throw)` |
//! | Views | `view_create_with_id`, `view_update`, `call_view(_or_throw)` |
//! | Security | `security`, `add_users_authorization`, `update_users_authorization`, `delete_user_authorization` |
//! | Replication | `replicate_to`, `replicate_from` |
//! | Tuning | `set_revs_limit` |
//!
//! # Optimistic concurrency
//!
//! Writes carry the revision the caller last read ([`DocPutParams`]); the
//! store rejects the write with a conflict when that revision is stale.
//! This layer never retries or resolves conflicts, it only shapes the
//! requests that carry the discipline.
//!
//! # Bulk partial failure
//!
//! Bulk writes return one [`DocumentCreated`] per input document and never
//! raise for per-item failures; the `{error, reason}` fields on each entry
//! are the only failure signal.

use crate::error::{CouchError, Result};
use crate::server::Server;
use crate::types::{
    AllDocs, BulkGetRef, BulkGetResponse, DatabaseInfo, DocGetParams, DocPutParams,
    DocumentCreated, FindRequest, FindResponse, OkStatus, ReplicationOptions, ReplicationRequest,
    SecurityDocument, SortSpec, ViewResponse, ViewRow,
};
use crate::validate;
use serde_json::{json, Value};

/// Current metadata of one document, read via HEAD without the body.
#[derive(Debug, Clone)]
pub struct DocumentInfo {
    /// The document id.
    pub id: String,
    /// The current revision, taken from the `ETag` response header.
    pub rev: String,
}

/// A database facade scoped onto a [`Server`] connection.
///
/// Stateless per call and cheap to clone; safe to share across
/// concurrently executing operations.
#[derive(Debug, Clone)]
pub struct Db {
    name: String,
    server: Server,
}

impl Db {
    pub(crate) fn new(name: impl Into<String>, server: Server) -> Db {
        Db {
            name: name.into(),
            server,
        }
    }

    /// The database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The connection this facade operates through.
    pub fn server(&self) -> &Server {
        &self.server
    }

    fn path(&self, suffix: &str) -> String {
        if suffix.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.name, suffix)
        }
    }

    // ----- database lifecycle -----

    /// Create the database only when it does not already exist.
    ///
    /// Returns whether the database exists afterwards.
    pub async fn create_if_not_exists(&self) -> Result<bool> {
        if self.exists().await? {
            return Ok(true);
        }
        self.create_or_throw().await?;
        Ok(true)
    }

    /// Create the database, propagating any failure to the caller.
    pub async fn create_or_throw(&self) -> Result<()> {
        let name = validate::database_name(&self.name)?;
        self.server.put(name, None).await?;
        Ok(())
    }

    /// Whether this database exists (`false` on any failure).
    pub async fn exists(&self) -> Result<bool> {
        self.server.db_exists(&self.name).await
    }

    /// Metadata of this database, or `None` on any failure.
    pub async fn info(&self) -> Result<Option<DatabaseInfo>> {
        self.server.db_info(&self.name).await
    }

    /// Destroy this database (`false` on any failure).
    pub async fn destroy(&self) -> Result<bool> {
        self.server.db_destroy(&self.name).await
    }

    // ----- all_docs -----

    /// Fetch the `_all_docs` view, optionally constrained to the given keys.
    pub async fn all_docs(&self, keys: Option<&[String]>) -> Result<AllDocs> {
        let value = match keys {
            Some(keys) if !keys.is_empty() => {
                self.server
                    .post(&self.path("_all_docs"), &json!({ "keys": keys }))
                    .await?
            }
            _ => self.server.get(&self.path("_all_docs")).await?,
        };
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch `_all_docs` with the store-internal (`_`-prefixed) rows
    /// removed and `total_rows` recomputed accordingly.
    pub async fn all_user_docs(&self, keys: Option<&[String]>) -> Result<AllDocs> {
        let result = self.all_docs(keys).await?;
        Ok(filter_system_rows(result))
    }

    // ----- document CRUD -----

    /// Whether a document exists (`false` on any failure).
    pub async fn doc_exists(&self, id: &str) -> bool {
        match self.server.head(&self.path(id)).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(db = %self.name, id, error = %e, "doc_exists probe failed, reporting false");
                false
            }
        }
    }

    /// Current id/revision of a document, read via HEAD.
    pub async fn doc_info(&self, id: &str) -> Result<DocumentInfo> {
        let headers = self.server.head(&self.path(id)).await?;
        let rev = headers
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_matches('"').to_string())
            .ok_or(CouchError::MissingRev)?;
        Ok(DocumentInfo {
            id: id.to_string(),
            rev,
        })
    }

    /// Fetch a document by id, collapsing any failure to `None`.
    pub async fn doc_get(&self, id: &str, params: Option<&DocGetParams>) -> Option<Value> {
        match self.doc_get_or_throw(id, params).await {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!(db = %self.name, id, error = %e, "doc_get failed, reporting none");
                None
            }
        }
    }

    /// Fetch a document by id, propagating any failure.
    pub async fn doc_get_or_throw(&self, id: &str, params: Option<&DocGetParams>) -> Result<Value> {
        let query = params.map(DocGetParams::to_query).unwrap_or_default();
        self.server.get_with_query(&self.path(id), &query).await
    }

    /// Create a new document; the store assigns id and revision.
    pub async fn doc_create(&self, data: Value) -> Result<DocumentCreated> {
        let value = self.server.post(&self.path(""), &data).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Create a new document under a caller-chosen id.
    pub async fn doc_create_with_id(&self, id: &str, data: Value) -> Result<DocumentCreated> {
        let data = stamp(data, Some(id), None)?;
        self.doc_create(data).await
    }

    /// Update an existing document.
    ///
    /// The target `_id` and the revision being replaced both come from
    /// `params` and are stamped onto the payload; the store rejects the
    /// write with a conflict when the revision is stale.
    pub async fn doc_update(&self, data: Value, params: &DocPutParams) -> Result<DocumentCreated> {
        let data = stamp(data, Some(&params.id), Some(&params.rev))?;
        let value = self.server.post(&self.path(""), &data).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Delete exactly one revision of a document (a tombstone write).
    ///
    /// Requires both id and revision up front; deleting with a stale
    /// revision fails with the store's conflict, not an error from this
    /// layer.
    pub async fn doc_delete(&self, id: &str, rev: &str) -> Result<DocumentCreated> {
        if id.is_empty() {
            return Err(CouchError::MissingId);
        }
        if rev.is_empty() {
            return Err(CouchError::MissingRev);
        }
        let query = [("rev".to_string(), rev.to_string())];
        let value = self.server.delete_with_query(&self.path(id), &query).await?;
        Ok(serde_json::from_value(value)?)
    }

    // ----- bulk -----

    /// Fetch documents in bulk: one result group per input reference, each
    /// listing the document's known open revisions.
    pub async fn bulk_get_raw(
        &self,
        refs: &[BulkGetRef],
        list_all_revs: bool,
    ) -> Result<BulkGetResponse> {
        let query = [("revs".to_string(), list_all_revs.to_string())];
        let value = self
            .server
            .post_with_query(&self.path("_bulk_get"), &json!({ "docs": refs }), &query)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch documents in bulk, flattening each group to its first open
    /// revision body. With `remove_system_docs`, store-internal entries
    /// (id starting with `_`) are dropped first.
    pub async fn bulk_get(
        &self,
        refs: &[BulkGetRef],
        list_all_revs: bool,
        remove_system_docs: bool,
    ) -> Result<Vec<Value>> {
        let response = self.bulk_get_raw(refs, list_all_revs).await?;
        Ok(flatten_bulk_get(response, remove_system_docs))
    }

    /// Insert a batch of documents in one request.
    ///
    /// Returns one entry per input; a transport-level success does not
    /// imply every item succeeded, so walk the entries.
    pub async fn bulk_insert_raw(&self, docs: &[Value]) -> Result<Vec<DocumentCreated>> {
        let value = self
            .server
            .post(&self.path("_bulk_docs"), &json!({ "docs": docs }))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Update a batch of documents in one request; each payload must carry
    /// its own `_id` and `_rev`. Same per-item failure contract as
    /// [`bulk_insert_raw`](Self::bulk_insert_raw).
    pub async fn bulk_update_raw(&self, docs: &[Value]) -> Result<Vec<DocumentCreated>> {
        self.bulk_insert_raw(docs).await
    }

    // ----- find -----

    /// Run a `_find` selector query.
    pub async fn find_raw(&self, req: &FindRequest) -> Result<FindResponse> {
        let value = self
            .server
            .post(&self.path("_find"), &serde_json::to_value(req)?)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Explain how the store would execute a `_find` query.
    pub async fn explain(&self, req: &FindRequest) -> Result<Value> {
        self.server
            .post(&self.path("_explain"), &serde_json::to_value(req)?)
            .await
    }

    /// Run a query that must match exactly one document.
    ///
    /// Fetches up to two matches so that over-matching is detectable: zero
    /// matches raise [`CouchError::NoResults`], more than one raise
    /// [`CouchError::TooManyResults`].
    pub async fn find_one_or_throw(&self, req: FindRequest) -> Result<Value> {
        let req = req.limit(2);
        let mut response = self.find_raw(&req).await?;
        match response.docs.len() {
            0 => Err(CouchError::NoResults),
            1 => Ok(response.docs.remove(0)),
            n => Err(CouchError::TooManyResults(n)),
        }
    }

    /// Soft variant of [`find_one_or_throw`](Self::find_one_or_throw):
    /// collapses any failure, including cardinality errors, to `None`.
    pub async fn find_one(&self, req: FindRequest) -> Option<Value> {
        match self.find_one_or_throw(req).await {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!(db = %self.name, error = %e, "find_one failed, reporting none");
                None
            }
        }
    }

    /// First matching document under the given sort order.
    ///
    /// The sort may be a single clause or an ordered sequence; a single
    /// clause is normalized to a one-element sequence before the request
    /// is sent. Zero matches raise [`CouchError::NoResults`].
    pub async fn find_first_or_throw(
        &self,
        req: FindRequest,
        sort: impl Into<SortSpec>,
    ) -> Result<Value> {
        let req = req.sort(sort).limit(1);
        let mut response = self.find_raw(&req).await?;
        if response.docs.is_empty() {
            return Err(CouchError::NoResults);
        }
        Ok(response.docs.remove(0))
    }

    /// Soft variant of [`find_first_or_throw`](Self::find_first_or_throw).
    pub async fn find_first(&self, req: FindRequest, sort: impl Into<SortSpec>) -> Option<Value> {
        match self.find_first_or_throw(req, sort).await {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!(db = %self.name, error = %e, "find_first failed, reporting none");
                None
            }
        }
    }

    // ----- views -----

    /// Create a design document under a caller-chosen id.
    pub async fn view_create_with_id(&self, ddoc: &str, design: &Value) -> Result<DocumentCreated> {
        let value = self
            .server
            .put(&self.path(&format!("_design/{ddoc}")), Some(design))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Update a design document; the payload must carry the current `_rev`.
    pub async fn view_update(&self, ddoc: &str, design: &Value) -> Result<DocumentCreated> {
        self.view_create_with_id(ddoc, design).await
    }

    /// Invoke a named view under a named design document, returning its
    /// rows. A missing view propagates as the store's 404.
    pub async fn call_view_or_throw(&self, ddoc: &str, view: &str) -> Result<Vec<ViewRow>> {
        let value = self
            .server
            .get(&self.path(&format!("_design/{ddoc}/_view/{view}")))
            .await?;
        let response: ViewResponse = serde_json::from_value(value)?;
        Ok(response.rows)
    }

    /// Soft variant of [`call_view_or_throw`](Self::call_view_or_throw):
    /// any failure, including "view does not exist", collapses to `None`.
    pub async fn call_view(&self, ddoc: &str, view: &str) -> Option<Vec<ViewRow>> {
        match self.call_view_or_throw(ddoc, view).await {
            Ok(rows) => Some(rows),
            Err(e) => {
                tracing::warn!(db = %self.name, ddoc, view, error = %e, "call_view failed, reporting none");
                None
            }
        }
    }

    // ----- security -----

    /// Read the database's `_security` document. A fresh database answers
    /// `{}`, which deserializes to two empty groups.
    pub async fn security(&self) -> Result<SecurityDocument> {
        let value = self.server.get(&self.path("_security")).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Grant the incoming names and roles on top of the existing security
    /// document.
    ///
    /// When no security document exists yet the incoming one is written
    /// verbatim; otherwise the two are combined per group and per field as
    /// a set union preserving first-seen order. Returns the document as
    /// written.
    pub async fn add_users_authorization(
        &self,
        incoming: &SecurityDocument,
    ) -> Result<SecurityDocument> {
        let mut merged = self.security().await?;
        if merged.is_empty() {
            merged = incoming.clone();
        } else {
            merged.merge_from(incoming);
        }
        self.put_security(&merged).await?;
        Ok(merged)
    }

    /// Overwrite the security document unconditionally (last writer wins).
    pub async fn update_users_authorization(&self, incoming: &SecurityDocument) -> Result<bool> {
        self.put_security(incoming).await
    }

    /// Revoke the incoming names and roles: per-field set difference
    /// against the existing document. Groups absent from the input delete
    /// nothing. Returns the document as written.
    pub async fn delete_user_authorization(
        &self,
        incoming: &SecurityDocument,
    ) -> Result<SecurityDocument> {
        let mut remaining = self.security().await?;
        remaining.subtract(incoming);
        self.put_security(&remaining).await?;
        Ok(remaining)
    }

    async fn put_security(&self, doc: &SecurityDocument) -> Result<bool> {
        let value = self
            .server
            .put(&self.path("_security"), Some(&serde_json::to_value(doc)?))
            .await?;
        let status: OkStatus = serde_json::from_value(value)?;
        Ok(status.ok)
    }

    // ----- replication -----

    /// Register a replication job pushing this database into `target`.
    ///
    /// The job document is registered on this (source) side's server; with
    /// no job id supplied one is minted from `_uuids` first.
    pub async fn replicate_to(&self, target: &Db, opts: ReplicationOptions) -> Result<DocumentCreated> {
        let request = self.replication_request(self, target, opts).await?;
        self.register_replication(request).await
    }

    /// Register a replication job pulling `source` into this database.
    ///
    /// Replication jobs always live on the destination side, so this one
    /// is registered on this (target) side's server.
    pub async fn replicate_from(&self, source: &Db, opts: ReplicationOptions) -> Result<DocumentCreated> {
        let request = self.replication_request(source, self, opts).await?;
        self.register_replication(request).await
    }

    async fn replication_request(
        &self,
        source: &Db,
        target: &Db,
        opts: ReplicationOptions,
    ) -> Result<ReplicationRequest> {
        let id = match opts.job_id {
            Some(id) => id,
            None => self.server.get_uuid().await?,
        };
        Ok(ReplicationRequest {
            id,
            source: source.server.url_for_db(&source.name)?,
            target: target.server.url_for_db(&target.name)?,
            create_target: opts.create_target,
            continuous: opts.continuous,
        })
    }

    async fn register_replication(&self, request: ReplicationRequest) -> Result<DocumentCreated> {
        let path = format!("_replicator/{}", request.id);
        let value = self
            .server
            .put(&path, Some(&serde_json::to_value(&request)?))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    // ----- tuning -----

    /// Set the database's revision depth limit.
    ///
    /// The range check (1..=10000) fails fast; after that, failures
    /// collapse to `false` like the other database probes. Setting the
    /// limit it already has is a no-op reported as success.
    pub async fn set_revs_limit(&self, limit: u64) -> Result<bool> {
        if !(1..=10_000).contains(&limit) {
            return Err(CouchError::RevsLimitOutOfRange(limit));
        }
        let path = self.path("_revs_limit");
        let current = match self.server.get(&path).await {
            Ok(value) => value.as_u64(),
            Err(e) => {
                tracing::warn!(db = %self.name, error = %e, "revs_limit read failed");
                return Ok(false);
            }
        };
        if current == Some(limit) {
            return Ok(true);
        }
        match self.server.put(&path, Some(&json!(limit))).await {
            Ok(value) => {
                let status: OkStatus = serde_json::from_value(value).unwrap_or_default();
                Ok(status.ok)
            }
            Err(e) => {
                tracing::warn!(db = %self.name, error = %e, "revs_limit write failed");
                Ok(false)
            }
        }
    }
}

/// Stamp `_id`/`_rev` onto a document payload. The payload must be a JSON
/// object; anything else cannot carry store metadata.
fn stamp(mut data: Value, id: Option<&str>, rev: Option<&str>) -> Result<Value> {
    let map = data.as_object_mut().ok_or(CouchError::NotAnObject)?;
    if let Some(id) = id {
        map.insert("_id".to_string(), Value::String(id.to_string()));
    }
    if let Some(rev) = rev {
        map.insert("_rev".to_string(), Value::String(rev.to_string()));
    }
    Ok(data)
}

/// Drop `_`-prefixed rows from an `_all_docs` result and recompute
/// `total_rows`.
fn filter_system_rows(mut result: AllDocs) -> AllDocs {
    if result.total_rows > 0 {
        result.rows.retain(|row| !row.id.starts_with('_'));
        result.total_rows = result.rows.len() as u64;
    }
    result
}

/// Flatten a `_bulk_get` response to the first open-revision body of each
/// group, optionally dropping store-internal entries first.
fn flatten_bulk_get(mut response: BulkGetResponse, remove_system_docs: bool) -> Vec<Value> {
    if remove_system_docs {
        response.results.retain(|group| !group.id.starts_with('_'));
    }
    response
        .results
        .into_iter()
        .filter_map(|group| group.docs.into_iter().next().and_then(|rev| rev.ok))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AllDocsRev, AllDocsRow, BulkGetGroup, BulkGetRev};
    use serde_json::json;

    fn row(id: &str) -> AllDocsRow {
        AllDocsRow {
            id: id.to_string(),
            key: id.to_string(),
            value: AllDocsRev { rev: "1-a".into() },
        }
    }

    #[test]
    fn test_stamp_sets_id_and_rev() {
        let stamped = stamp(json!({"total": 20}), Some("o1"), Some("1-abc")).unwrap();
        assert_eq!(stamped, json!({"total": 20, "_id": "o1", "_rev": "1-abc"}));
    }

    #[test]
    fn test_stamp_rejects_non_objects() {
        assert!(matches!(
            stamp(json!([1, 2]), Some("o1"), None),
            Err(CouchError::NotAnObject)
        ));
    }

    #[test]
    fn test_filter_system_rows_recomputes_total() {
        let result = AllDocs {
            total_rows: 3,
            offset: 0,
            rows: vec![row("_design/x"), row("a"), row("b")],
        };
        let filtered = filter_system_rows(result);
        assert_eq!(filtered.total_rows, 2);
        assert!(filtered.rows.iter().all(|r| !r.id.starts_with('_')));
    }

    #[test]
    fn test_flatten_bulk_get_takes_first_open_rev() {
        let response = BulkGetResponse {
            results: vec![
                BulkGetGroup {
                    id: "a".into(),
                    docs: vec![
                        BulkGetRev {
                            ok: Some(json!({"_id": "a", "n": 1})),
                            error: None,
                        },
                        BulkGetRev {
                            ok: Some(json!({"_id": "a", "n": 0})),
                            error: None,
                        },
                    ],
                },
                BulkGetGroup {
                    id: "missing".into(),
                    docs: vec![BulkGetRev {
                        ok: None,
                        error: Some(json!({"error": "not_found"})),
                    }],
                },
            ],
        };
        let docs = flatten_bulk_get(response, false);
        assert_eq!(docs, vec![json!({"_id": "a", "n": 1})]);
    }

    #[test]
    fn test_flatten_bulk_get_filters_system_docs() {
        let response = BulkGetResponse {
            results: vec![
                BulkGetGroup {
                    id: "_design/x".into(),
                    docs: vec![BulkGetRev {
                        ok: Some(json!({"_id": "_design/x"})),
                        error: None,
                    }],
                },
                BulkGetGroup {
                    id: "a".into(),
                    docs: vec![BulkGetRev {
                        ok: Some(json!({"_id": "a"})),
                        error: None,
                    }],
                },
            ],
        };
        let docs = flatten_bulk_get(response, true);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["_id"], "a");
    }

    #[tokio::test]
    async fn test_set_revs_limit_range_check_runs_before_network() {
        let server = Server::from_url("http://127.0.0.1:1").unwrap();
        let db = server.use_db("orders");
        assert!(matches!(
            db.set_revs_limit(0).await,
            Err(CouchError::RevsLimitOutOfRange(0))
        ));
        assert!(matches!(
            db.set_revs_limit(10_001).await,
            Err(CouchError::RevsLimitOutOfRange(10_001))
        ));
    }

    #[tokio::test]
    async fn test_doc_delete_requires_id_and_rev() {
        let server = Server::from_url("http://127.0.0.1:1").unwrap();
        let db = server.use_db("orders");
        assert!(matches!(db.doc_delete("", "1-a").await, Err(CouchError::MissingId)));
        assert!(matches!(db.doc_delete("o1", "").await, Err(CouchError::MissingRev)));
    }
}
