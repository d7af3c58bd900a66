//! Wire types exchanged with the CouchDB server.
//!
//! Everything here is a plain serde struct shaped after the store's JSON
//! responses, plus two pieces of client-side logic that belong with their
//! data:
//!
//! - **Security set algebra**: [`SecurityDocument`] merge (set union,
//!   first-seen order) and subtraction (set difference) used by the
//!   `_security` read-modify-write operations.
//! - **Sort normalization**: [`SortSpec`] accepts a single sort clause or
//!   an ordered sequence and always renders a sequence on the wire.
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ServerConfig`] | Connection parameters assembled into the base URL |
//! | [`DocumentCreated`] | Per-document write result (`{id, rev, ok, error?, reason?}`) |
//! | [`DatabaseInfo`] | `GET /{db}` metadata |
//! | [`FindRequest`] / [`FindResponse`] | `_find` selector queries |
//! | [`SecurityDocument`] | `_security` names/roles groups |
//! | [`DocGetParams`] / [`DocPutParams`] | Document read/write parameters |
//! | [`ReplicationRequest`] | `_replicator` job document |

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Connection parameters for a CouchDB server.
///
/// Composed once into an opaque base URL of the form
/// `{scheme}://{user}:{password}@{host}:{port}/`; immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// URL scheme, `http` or `https`.
    pub scheme: String,
    /// Username for basic authentication.
    pub user: String,
    /// Password for basic authentication.
    pub password: String,
    /// Hostname or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Result of a single document write, as returned by the store.
///
/// Bulk calls return one of these per input document; a batch succeeding at
/// the transport level does not imply every item succeeded, so callers must
/// inspect [`error`](Self::error) on each entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentCreated {
    /// Document id the result refers to.
    #[serde(default)]
    pub id: String,
    /// New revision token, present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// Whether the write was applied.
    #[serde(default)]
    pub ok: bool,
    /// Error class, e.g. `"conflict"`, present on per-item failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Human-readable failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DocumentCreated {
    /// Whether this entry represents a successful write.
    pub fn is_ok(&self) -> bool {
        self.ok && self.error.is_none()
    }
}

/// Database metadata from `GET /{db}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseInfo {
    /// The name of the database.
    #[serde(default)]
    pub db_name: String,
    /// Count of live documents.
    #[serde(default)]
    pub doc_count: u64,
    /// Count of deleted documents.
    #[serde(default)]
    pub doc_del_count: u64,
    /// Opaque update-sequence token.
    #[serde(default)]
    pub update_seq: String,
    /// Opaque purge-sequence token.
    #[serde(default)]
    pub purge_seq: String,
    /// Whether compaction is currently running.
    #[serde(default)]
    pub compact_running: bool,
    /// Storage sizes, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<DatabaseSizes>,
    /// Cluster sharding/quorum parameters, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterInfo>,
}

/// Storage size block of [`DatabaseInfo`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSizes {
    /// Live data inside the database, in bytes.
    #[serde(default)]
    pub active: u64,
    /// Uncompressed size of database contents, in bytes.
    #[serde(default)]
    pub external: u64,
    /// Size of the database file on disk, in bytes.
    #[serde(default)]
    pub file: u64,
}

/// Cluster block of [`DatabaseInfo`]: replicas, shards and quorums.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterInfo {
    /// Replicas: copies of every document.
    #[serde(default)]
    pub n: u32,
    /// Shards: number of range partitions.
    #[serde(default)]
    pub q: u32,
    /// Read quorum.
    #[serde(default)]
    pub r: u32,
    /// Write quorum.
    #[serde(default)]
    pub w: u32,
}

/// Response shape of `GET|POST /{db}/_all_docs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllDocs {
    /// Number of rows in the view (recomputed after client-side filtering).
    #[serde(default)]
    pub total_rows: u64,
    /// Offset where the row list started.
    #[serde(default)]
    pub offset: u64,
    /// One row per document.
    #[serde(default)]
    pub rows: Vec<AllDocsRow>,
}

/// A single `_all_docs` row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllDocsRow {
    /// Document id.
    pub id: String,
    /// Row key (equals the id for `_all_docs`).
    #[serde(default)]
    pub key: String,
    /// Revision wrapper.
    #[serde(default)]
    pub value: AllDocsRev,
}

/// The `value` field of an `_all_docs` row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllDocsRev {
    /// Current revision of the row's document.
    #[serde(default)]
    pub rev: String,
}

/// One input item for `POST /{db}/_bulk_get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkGetRef {
    /// Document id to fetch.
    pub id: String,
    /// Specific revision, or latest when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// Include attachments only since these revisions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atts_since: Option<Vec<String>>,
}

impl BulkGetRef {
    /// Reference the latest revision of `id`.
    pub fn latest(id: impl Into<String>) -> Self {
        BulkGetRef {
            id: id.into(),
            rev: None,
            atts_since: None,
        }
    }

    /// Reference a specific revision of `id`.
    pub fn at_rev(id: impl Into<String>, rev: impl Into<String>) -> Self {
        BulkGetRef {
            id: id.into(),
            rev: Some(rev.into()),
            atts_since: None,
        }
    }
}

/// Response shape of `POST /{db}/_bulk_get`: one group per requested id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkGetResponse {
    /// One result group per input reference.
    #[serde(default)]
    pub results: Vec<BulkGetGroup>,
}

/// All known open revisions of one requested document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkGetGroup {
    /// The requested id.
    pub id: String,
    /// Open revisions; each entry is either a document body or an error.
    #[serde(default)]
    pub docs: Vec<BulkGetRev>,
}

/// A single open revision inside a [`BulkGetGroup`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkGetRev {
    /// Document body when the revision resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<Value>,
    /// Error payload when it did not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

/// Sort specification for `_find`: a single clause or an ordered sequence.
///
/// CouchDB's wire format is always an array; a single clause is normalized
/// to a one-element sequence before the request is sent.
///
/// # Examples
///
/// ```
/// use megacouch::types::SortSpec;
/// use serde_json::json;
///
/// let single = SortSpec::from(json!({"year": "desc"}));
/// assert_eq!(single.into_clauses(), vec![json!({"year": "desc"})]);
///
/// let many = SortSpec::from(vec![json!("a"), json!({"b": "asc"})]);
/// assert_eq!(many.into_clauses().len(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortSpec {
    /// An ordered sequence of sort clauses.
    Clauses(Vec<Value>),
    /// One sort clause, e.g. `{"year": "desc"}` or `"year"`.
    Clause(Value),
}

impl SortSpec {
    /// Normalize to the wire form: an ordered sequence of clauses.
    pub fn into_clauses(self) -> Vec<Value> {
        match self {
            SortSpec::Clauses(clauses) => clauses,
            SortSpec::Clause(clause) => vec![clause],
        }
    }
}

impl From<Value> for SortSpec {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(clauses) => SortSpec::Clauses(clauses),
            other => SortSpec::Clause(other),
        }
    }
}

impl From<Vec<Value>> for SortSpec {
    fn from(clauses: Vec<Value>) -> Self {
        SortSpec::Clauses(clauses)
    }
}

/// A `_find` selector query.
///
/// Built with chained setters:
///
/// ```
/// use megacouch::types::FindRequest;
/// use serde_json::json;
///
/// let req = FindRequest::selector(json!({"year": {"$gt": 2010}}))
///     .limit(2)
///     .skip(0)
///     .sort(json!([{"year": "asc"}]))
///     .fields(vec!["_id".into(), "year".into()]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindRequest {
    /// Criteria used to select documents.
    pub selector: Value,
    /// Maximum number of results returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Skip the first `n` results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
    /// Sort clauses, always a sequence on the wire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<Value>>,
    /// Restrict returned fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    /// Instruct the query planner to use a specific index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_index: Option<Value>,
    /// Pagination bookmark from a previous response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<String>,
    /// Include execution statistics in the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_stats: Option<bool>,
}

impl FindRequest {
    /// Start a find request from a selector.
    pub fn selector(selector: Value) -> Self {
        FindRequest {
            selector,
            limit: None,
            skip: None,
            sort: None,
            fields: None,
            use_index: None,
            bookmark: None,
            execution_stats: None,
        }
    }

    /// Cap the number of returned documents.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `skip` matches.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Set the sort order. Accepts a single clause or a sequence; either
    /// way a sequence goes on the wire.
    pub fn sort(mut self, spec: impl Into<SortSpec>) -> Self {
        self.sort = Some(spec.into().into_clauses());
        self
    }

    /// Restrict which fields each returned document carries.
    pub fn fields(mut self, fields: Vec<String>) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Pin the query to a specific index.
    pub fn use_index(mut self, index: Value) -> Self {
        self.use_index = Some(index);
        self
    }

    /// Request execution statistics alongside the result.
    pub fn with_execution_stats(mut self) -> Self {
        self.execution_stats = Some(true);
        self
    }
}

/// Response shape of `POST /{db}/_find`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindResponse {
    /// Matching documents, in sort order.
    #[serde(default)]
    pub docs: Vec<Value>,
    /// Present when the request asked for execution statistics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_stats: Option<ExecutionStats>,
    /// Pagination bookmark.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<String>,
    /// Planner warning, e.g. "no matching index found".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Execution statistics block of a `_find` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionStats {
    /// Index keys examined.
    #[serde(default)]
    pub total_keys_examined: u64,
    /// Documents examined.
    #[serde(default)]
    pub total_docs_examined: u64,
    /// Documents examined under quorum reads.
    #[serde(default)]
    pub total_quorum_docs_examined: u64,
    /// Results returned.
    #[serde(default)]
    pub results_returned: u64,
    /// Query execution time in milliseconds.
    #[serde(default)]
    pub execution_time_ms: f64,
}

/// One names/roles group of the `_security` document.
///
/// Names and roles are treated as sets with a stable, first-seen order:
/// merging never introduces duplicates and subtraction removes exactly the
/// listed values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    /// User names in the group.
    #[serde(default)]
    pub names: Vec<String>,
    /// Role names in the group.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl SecurityGroup {
    /// Whether the group carries no names and no roles.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.roles.is_empty()
    }

    /// Union the incoming names and roles into this group, de-duplicating
    /// while preserving first-seen order.
    pub fn merge_from(&mut self, incoming: &SecurityGroup) {
        union_into(&mut self.names, &incoming.names);
        union_into(&mut self.roles, &incoming.roles);
    }

    /// Remove the incoming names and roles from this group (set
    /// difference). An empty incoming group removes nothing.
    pub fn subtract(&mut self, incoming: &SecurityGroup) {
        self.names.retain(|n| !incoming.names.contains(n));
        self.roles.retain(|r| !incoming.roles.contains(r));
    }
}

fn union_into(existing: &mut Vec<String>, incoming: &[String]) {
    for value in incoming {
        if !existing.contains(value) {
            existing.push(value.clone());
        }
    }
}

/// The per-database `_security` document: one admins group, one members
/// group. A missing group deserializes as an empty one, which the merge
/// and subtraction treat as "touch nothing".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityDocument {
    /// Database administrators.
    #[serde(default)]
    pub admins: SecurityGroup,
    /// Database members.
    #[serde(default)]
    pub members: SecurityGroup,
}

impl SecurityDocument {
    /// Whether both groups are empty (the state of a fresh database).
    pub fn is_empty(&self) -> bool {
        self.admins.is_empty() && self.members.is_empty()
    }

    /// Set-union the incoming document into this one, per group and per
    /// field. Idempotent: merging the same input twice changes nothing.
    pub fn merge_from(&mut self, incoming: &SecurityDocument) {
        self.admins.merge_from(&incoming.admins);
        self.members.merge_from(&incoming.members);
    }

    /// Set-subtract the incoming document from this one, per group and per
    /// field. Groups absent from the input delete nothing.
    pub fn subtract(&mut self, incoming: &SecurityDocument) {
        self.admins.subtract(&incoming.admins);
        self.members.subtract(&incoming.members);
    }
}

/// `all` or a list of revisions for the `open_revs` read parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpenRevs {
    /// Return all leaf revisions.
    All(String),
    /// Return the listed leaf revisions.
    Revs(Vec<String>),
}

impl OpenRevs {
    /// The `open_revs=all` form.
    pub fn all() -> Self {
        OpenRevs::All("all".to_string())
    }
}

/// Query parameters for reading a document.
///
/// Array-valued parameters are JSON-encoded on the query string, which is
/// the form the store expects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocGetParams {
    /// Include attachment bodies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<bool>,
    /// Include encoding info in attachment stubs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub att_encoding_info: Option<bool>,
    /// Include attachments only since the given revisions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atts_since: Option<Vec<String>>,
    /// Include conflict information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicts: Option<bool>,
    /// Include deleted-conflict information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_conflicts: Option<bool>,
    /// Force the latest leaf revision regardless of `rev`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<bool>,
    /// Include the document's local update sequence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_seq: Option<bool>,
    /// Shorthand for conflicts + deleted_conflicts + revs_info.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<bool>,
    /// Retrieve the given leaf revisions, or all of them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_revs: Option<OpenRevs>,
    /// Retrieve a specific revision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// Include the list of all known revisions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revs: Option<bool>,
    /// Include detailed revision info.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revs_info: Option<bool>,
}

impl DocGetParams {
    /// Render to query pairs; array values are JSON-encoded.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let flags = [
            ("attachments", self.attachments),
            ("att_encoding_info", self.att_encoding_info),
            ("conflicts", self.conflicts),
            ("deleted_conflicts", self.deleted_conflicts),
            ("latest", self.latest),
            ("local_seq", self.local_seq),
            ("meta", self.meta),
            ("revs", self.revs),
            ("revs_info", self.revs_info),
        ];
        for (name, value) in flags {
            if let Some(v) = value {
                pairs.push((name.to_string(), v.to_string()));
            }
        }
        if let Some(revs) = &self.atts_since {
            if let Ok(encoded) = serde_json::to_string(revs) {
                pairs.push(("atts_since".to_string(), encoded));
            }
        }
        match &self.open_revs {
            Some(OpenRevs::All(_)) => pairs.push(("open_revs".to_string(), "all".to_string())),
            Some(OpenRevs::Revs(revs)) => {
                if let Ok(encoded) = serde_json::to_string(revs) {
                    pairs.push(("open_revs".to_string(), encoded));
                }
            }
            None => {}
        }
        if let Some(rev) = &self.rev {
            pairs.push(("rev".to_string(), rev.clone()));
        }
        pairs
    }
}

/// Parameters for writing a document: the target id plus the revision the
/// caller last read. A stale revision makes the store reject the write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocPutParams {
    /// Target document id.
    pub id: String,
    /// The revision being replaced.
    pub rev: String,
    /// Batch mode (`"ok"`), trading durability for latency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,
    /// `false` lets the replicator insert conflicting revisions verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_edits: Option<bool>,
}

impl DocPutParams {
    /// The common case: update `id`, replacing revision `rev`.
    pub fn new(id: impl Into<String>, rev: impl Into<String>) -> Self {
        DocPutParams {
            id: id.into(),
            rev: rev.into(),
            batch: None,
            new_edits: None,
        }
    }
}

/// Response shape of a view read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewResponse {
    /// Total rows in the view.
    #[serde(default)]
    pub total_rows: u64,
    /// Offset where this row list started.
    #[serde(default)]
    pub offset: u64,
    /// Emitted rows.
    #[serde(default)]
    pub rows: Vec<ViewRow>,
}

/// One emitted view row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewRow {
    /// Id of the document that emitted the row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Emitted key.
    #[serde(default)]
    pub key: Value,
    /// Emitted value.
    #[serde(default)]
    pub value: Value,
}

/// A `_replicator` job document.
///
/// `source` and `target` are fully-qualified, credentialed database URLs;
/// the job is registered on the destination side's server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationRequest {
    /// Job document id.
    #[serde(rename = "_id")]
    pub id: String,
    /// Fully-qualified source database URL.
    pub source: String,
    /// Fully-qualified target database URL.
    pub target: String,
    /// Create the target database if it does not exist.
    pub create_target: bool,
    /// Keep replicating as changes arrive.
    pub continuous: bool,
}

/// Options for registering a replication job.
#[derive(Debug, Clone, Default)]
pub struct ReplicationOptions {
    /// Job id; minted from the server's `_uuids` endpoint when absent.
    pub job_id: Option<String>,
    /// Create the target database if missing.
    pub create_target: bool,
    /// Continuous replication.
    pub continuous: bool,
}

/// Response shape of `GET /_uuids`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UuidsResponse {
    /// The minted identifiers.
    #[serde(default)]
    pub uuids: Vec<String>,
}

/// The store's minimal `{"ok": true}` acknowledgement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OkStatus {
    /// Whether the operation was accepted.
    #[serde(default)]
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn group(names: &[&str], roles: &[&str]) -> SecurityGroup {
        SecurityGroup {
            names: names.iter().map(|s| s.to_string()).collect(),
            roles: roles.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_security_merge_unions_without_duplicates() {
        let mut existing = SecurityDocument {
            admins: group(&["alice"], &["admin"]),
            members: group(&["bob"], &["reader"]),
        };
        let incoming = SecurityDocument {
            admins: group(&["alice", "carol"], &["admin", "ops"]),
            members: group(&["dave"], &["writer"]),
        };
        existing.merge_from(&incoming);
        assert_eq!(existing.admins.names, vec!["alice", "carol"]);
        assert_eq!(existing.admins.roles, vec!["admin", "ops"]);
        assert_eq!(existing.members.names, vec!["bob", "dave"]);
        assert_eq!(existing.members.roles, vec!["reader", "writer"]);
    }

    #[test]
    fn test_security_merge_is_idempotent() {
        let mut existing = SecurityDocument::default();
        let incoming = SecurityDocument {
            members: group(&["x"], &[]),
            ..Default::default()
        };
        existing.merge_from(&incoming);
        existing.merge_from(&incoming);
        assert_eq!(existing.members.names, vec!["x"]);
    }

    #[test]
    fn test_security_subtract_is_set_difference() {
        let mut existing = SecurityDocument {
            members: group(&["x", "y"], &["r1", "r2"]),
            ..Default::default()
        };
        let incoming = SecurityDocument {
            members: group(&["x"], &["r2"]),
            ..Default::default()
        };
        existing.subtract(&incoming);
        assert_eq!(existing.members.names, vec!["y"]);
        assert_eq!(existing.members.roles, vec!["r1"]);
    }

    #[test]
    fn test_security_subtract_absent_group_deletes_nothing() {
        let mut existing = SecurityDocument {
            admins: group(&["alice"], &["admin"]),
            members: group(&["bob"], &[]),
        };
        // A document deserialized from `{}` has two empty groups.
        let incoming: SecurityDocument = serde_json::from_value(json!({})).unwrap();
        existing.subtract(&incoming);
        assert_eq!(existing.admins.names, vec!["alice"]);
        assert_eq!(existing.members.names, vec!["bob"]);
    }

    #[test]
    fn test_sort_spec_normalizes_single_clause() {
        let spec = SortSpec::from(json!({"year": "desc"}));
        assert_eq!(spec.into_clauses(), vec![json!({"year": "desc"})]);
    }

    #[test]
    fn test_sort_spec_keeps_sequence_order() {
        let spec = SortSpec::from(json!([{"a": "asc"}, "b"]));
        assert_eq!(spec.into_clauses(), vec![json!({"a": "asc"}), json!("b")]);
    }

    #[test]
    fn test_find_request_serializes_sort_as_sequence() {
        let req = FindRequest::selector(json!({"year": {"$gt": 2010}})).sort(json!("year"));
        let wire = serde_json::to_value(&req).unwrap();
        assert_eq!(wire["sort"], json!(["year"]));
        assert!(wire.get("limit").is_none());
    }

    #[test]
    fn test_document_created_parses_conflict_entry() {
        let entry: DocumentCreated = serde_json::from_value(json!({
            "id": "a",
            "error": "conflict",
            "reason": "Document update conflict."
        }))
        .unwrap();
        assert!(!entry.is_ok());
        assert_eq!(entry.error.as_deref(), Some("conflict"));
        assert!(entry.rev.is_none());
    }

    #[test]
    fn test_doc_get_params_query_encoding() {
        let params = DocGetParams {
            conflicts: Some(true),
            rev: Some("3-abc".into()),
            atts_since: Some(vec!["1-a".into()]),
            open_revs: Some(OpenRevs::all()),
            ..Default::default()
        };
        let pairs = params.to_query();
        assert!(pairs.contains(&("conflicts".to_string(), "true".to_string())));
        assert!(pairs.contains(&("rev".to_string(), "3-abc".to_string())));
        assert!(pairs.contains(&("atts_since".to_string(), "[\"1-a\"]".to_string())));
        assert!(pairs.contains(&("open_revs".to_string(), "all".to_string())));
    }
}
