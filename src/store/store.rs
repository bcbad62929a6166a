//! The document store
//!
//! # Mutation unit
//!
//! Every create, update and delete runs under the collection's write lock:
//!
//! 1. Authorize (before any lock or state is touched)
//! 2. Replay the recorded outcome if the attempt id was already applied
//! 3. Validate the document and check the expected revision
//! 4. Stage index changes, then aggregation changes
//! 5. Apply documents, indexes, aggregations and the attempt record
//!
//! Steps 1 to 4 may fail; step 5 cannot. A failure at any earlier step
//! leaves the partition exactly as it was.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use uuid::Uuid;

use super::context::RequestContext;
use super::errors::{StoreError, StoreResult};
use super::partition::{Partition, StoredDocument, WriteOutcome};
use crate::aggregation::{AggregationConfiguration, AggregationError, MutationKind};
use crate::auth::{Authorizer, ScopeType};
use crate::config::StoreConfig;
use crate::executor::{paginate, resolve_page_size, PaginatedResult, QueryExecutor};
use crate::index::{Index, IndexError};
use crate::observability::{Event, Logger, MetricsRegistry, MetricsSnapshot};
use crate::planner::{ExplainPlan, Query, QueryPlanner};
use crate::schema::{path, Collection, SchemaError, SchemaLoader, SchemaValidator, ValidationDetails};

type Shared = Arc<RwLock<Partition>>;

pub struct Store {
    config: StoreConfig,
    authorizer: Arc<dyn Authorizer>,
    catalog: RwLock<BTreeMap<String, Shared>>,
    logger: Logger,
    metrics: MetricsRegistry,
}

fn read(partition: &RwLock<Partition>) -> StoreResult<RwLockReadGuard<'_, Partition>> {
    partition.read().map_err(|_| StoreError::poisoned("collection"))
}

fn write(partition: &RwLock<Partition>) -> StoreResult<RwLockWriteGuard<'_, Partition>> {
    partition.write().map_err(|_| StoreError::poisoned("collection"))
}

impl Store {
    pub fn new(config: StoreConfig, authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            logger: Logger::with_quiet(config.quiet),
            config,
            authorizer,
            catalog: RwLock::new(BTreeMap::new()),
            metrics: MetricsRegistry::new(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn collection_count(&self) -> StoreResult<usize> {
        let catalog = self.catalog.read().map_err(|_| StoreError::poisoned("catalog"))?;
        Ok(catalog.len())
    }

    /// Registers every collection definition found by the loader.
    pub fn load_schemas(&self, loader: &SchemaLoader) -> StoreResult<usize> {
        let collections = loader.load_dir()?;
        let count = collections.len();
        let ctx = RequestContext::admin();
        for collection in collections {
            self.create_collection(&ctx, collection)?;
        }
        let dir = loader.schema_dir().display().to_string();
        let loaded = count.to_string();
        self.logger.event(
            Event::SchemasLoaded,
            &[("schema_dir", dir.as_str()), ("collections", loaded.as_str())],
        );
        Ok(count)
    }

    // ==================
    // Authorization
    // ==================

    fn authorize(&self, ctx: &RequestContext, collection: &str, scope: ScopeType) -> StoreResult<()> {
        self.authorizer
            .authorize(&ctx.principal, collection, scope)
            .map_err(|e| self.denied(ctx, e.into()))
    }

    fn authorize_admin(&self, ctx: &RequestContext, action: &str) -> StoreResult<()> {
        self.authorizer
            .authorize_admin(&ctx.principal, action)
            .map_err(|e| self.denied(ctx, e.into()))
    }

    fn denied(&self, ctx: &RequestContext, err: StoreError) -> StoreError {
        if let StoreError::Forbidden(reason) = &err {
            self.metrics.increment_forbidden();
            let request_id = ctx.request_id.to_string();
            self.logger.event(
                Event::AccessDenied,
                &[
                    ("principal", ctx.principal.label()),
                    ("reason", reason.as_str()),
                    ("request_id", request_id.as_str()),
                ],
            );
        }
        err
    }

    fn partition(&self, name: &str) -> StoreResult<Shared> {
        let catalog = self.catalog.read().map_err(|_| StoreError::poisoned("catalog"))?;
        catalog
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::unknown_collection(name).into())
    }

    fn page_size(&self, requested: Option<usize>) -> StoreResult<Option<usize>> {
        Ok(resolve_page_size(
            requested,
            self.config.default_page_size,
            self.config.max_page_size,
        )?)
    }

    // ==================
    // Collections
    // ==================

    /// Registers a collection. Get-or-create by name: an existing definition
    /// is returned unchanged.
    pub fn create_collection(&self, ctx: &RequestContext, collection: Collection) -> StoreResult<Collection> {
        self.authorize_admin(ctx, "create collections")?;
        collection.validate_structure()?;

        let mut catalog = self.catalog.write().map_err(|_| StoreError::poisoned("catalog"))?;
        if let Some(existing) = catalog.get(&collection.name) {
            let existing = read(existing)?.collection.clone();
            return Ok(existing);
        }
        catalog.insert(
            collection.name.clone(),
            Arc::new(RwLock::new(Partition::new(
                collection.clone(),
                self.config.attempt_log_capacity,
            ))),
        );
        self.logger
            .event(Event::CollectionCreated, &[("collection", collection.name.as_str())]);
        Ok(collection)
    }

    pub fn get_collection(&self, ctx: &RequestContext, name: &str) -> StoreResult<Collection> {
        self.authorize_admin(ctx, "read collection definitions")?;
        let partition = self.partition(name)?;
        let collection = read(&partition)?.collection.clone();
        Ok(collection)
    }

    /// Collections ordered by name
    pub fn list_collections(
        &self,
        ctx: &RequestContext,
        page_size: Option<usize>,
        cursor: Option<&str>,
    ) -> StoreResult<PaginatedResult<Collection>> {
        self.authorize_admin(ctx, "list collections")?;
        let page_size = self.page_size(page_size)?;
        let mut collections = Vec::new();
        {
            let catalog = self.catalog.read().map_err(|_| StoreError::poisoned("catalog"))?;
            for partition in catalog.values() {
                collections.push(read(partition)?.collection.clone());
            }
        }
        let items = collections.iter().map(|c| (c.name.as_str(), c));
        Ok(paginate("collections", items, page_size, cursor)?)
    }

    pub fn delete_collection(&self, ctx: &RequestContext, name: &str) -> StoreResult<Collection> {
        self.authorize_admin(ctx, "delete collections")?;
        let removed = {
            let mut catalog = self.catalog.write().map_err(|_| StoreError::poisoned("catalog"))?;
            catalog
                .remove(name)
                .ok_or_else(|| StoreError::from(SchemaError::unknown_collection(name)))?
        };
        let collection = read(&removed)?.collection.clone();
        self.logger.event(Event::CollectionDeleted, &[("collection", name)]);
        Ok(collection)
    }

    // ==================
    // Indexes
    // ==================

    /// Creates an index on `index.collection`, back-filled from the stored
    /// documents. Idempotent by derived name.
    pub fn create_index(&self, ctx: &RequestContext, index: Index) -> StoreResult<Index> {
        self.authorize_admin(ctx, "create indexes")?;
        let partition = self.partition(&index.collection)?;
        let mut guard = write(&partition)?;
        let p = &mut *guard;
        let (index, created) = p.indexes.create(
            &p.collection,
            index,
            &p.observed_paths,
            p.documents.bodies(),
        )?;
        if created {
            let entries = p
                .indexes
                .tree(&index.name)
                .map(|(_, tree)| tree.len())
                .unwrap_or(0)
                .to_string();
            self.logger.event(
                Event::IndexCreated,
                &[
                    ("collection", index.collection.as_str()),
                    ("entries", entries.as_str()),
                    ("index", index.name.as_str()),
                ],
            );
        }
        Ok(index)
    }

    pub fn get_index(&self, ctx: &RequestContext, collection: &str, name: &str) -> StoreResult<Index> {
        self.authorize_admin(ctx, "read indexes")?;
        let partition = self.partition(collection)?;
        let p = read(&partition)?;
        p.indexes
            .get(name)
            .cloned()
            .ok_or_else(|| IndexError::unknown_index(name).into())
    }

    /// Indexes of a collection ordered by name
    pub fn list_indexes(
        &self,
        ctx: &RequestContext,
        collection: &str,
        page_size: Option<usize>,
        cursor: Option<&str>,
    ) -> StoreResult<PaginatedResult<Index>> {
        self.authorize_admin(ctx, "list indexes")?;
        let page_size = self.page_size(page_size)?;
        let partition = self.partition(collection)?;
        let p = read(&partition)?;
        let mut indexes: Vec<&Index> = p.indexes.indexes().collect();
        indexes.sort_by(|a, b| a.name.cmp(&b.name));
        let scan = format!("{}/indexes", collection);
        Ok(paginate(
            &scan,
            indexes.into_iter().map(|i| (i.name.as_str(), i)),
            page_size,
            cursor,
        )?)
    }

    pub fn delete_index(&self, ctx: &RequestContext, collection: &str, name: &str) -> StoreResult<Index> {
        self.authorize_admin(ctx, "delete indexes")?;
        let partition = self.partition(collection)?;
        let mut p = write(&partition)?;
        let removed = p
            .indexes
            .remove(name)
            .ok_or_else(|| StoreError::from(IndexError::unknown_index(name)))?;
        self.logger.event(
            Event::IndexDeleted,
            &[("collection", collection), ("index", name)],
        );
        Ok(removed)
    }

    // ==================
    // Aggregations
    // ==================

    /// Registers an aggregation, back-filled from the stored documents.
    /// Idempotent by derived name.
    pub fn create_aggregation(
        &self,
        ctx: &RequestContext,
        config: AggregationConfiguration,
    ) -> StoreResult<AggregationConfiguration> {
        self.authorize_admin(ctx, "create aggregations")?;
        let partition = self.partition(&config.collection)?;
        let mut guard = write(&partition)?;
        let p = &mut *guard;
        let (config, created) = p.aggregations.create(
            &p.collection,
            config,
            &p.observed_paths,
            p.documents.bodies().map(|(_, doc)| doc),
        )?;
        if created {
            self.logger.event(
                Event::AggregationCreated,
                &[
                    ("aggregation", config.name.as_str()),
                    ("collection", config.collection.as_str()),
                ],
            );
        }
        Ok(config)
    }

    /// Configuration with its current value; needs QUERY on the collection
    pub fn get_aggregation(
        &self,
        ctx: &RequestContext,
        collection: &str,
        name: &str,
    ) -> StoreResult<AggregationConfiguration> {
        self.authorize(ctx, collection, ScopeType::Query)?;
        let partition = self.partition(collection)?;
        let p = read(&partition)?;
        p.aggregations
            .get(name)
            .ok_or_else(|| AggregationError::unknown(name).into())
    }

    /// Configurations of a collection ordered by name
    pub fn list_aggregations(
        &self,
        ctx: &RequestContext,
        collection: &str,
        page_size: Option<usize>,
        cursor: Option<&str>,
    ) -> StoreResult<PaginatedResult<AggregationConfiguration>> {
        self.authorize(ctx, collection, ScopeType::Query)?;
        let page_size = self.page_size(page_size)?;
        let partition = self.partition(collection)?;
        let mut configs = read(&partition)?.aggregations.list();
        configs.sort_by(|a, b| a.name.cmp(&b.name));
        let scan = format!("{}/aggregations", collection);
        Ok(paginate(
            &scan,
            configs.iter().map(|c| (c.name.as_str(), c)),
            page_size,
            cursor,
        )?)
    }

    pub fn delete_aggregation(
        &self,
        ctx: &RequestContext,
        collection: &str,
        name: &str,
    ) -> StoreResult<AggregationConfiguration> {
        self.authorize_admin(ctx, "delete aggregations")?;
        let partition = self.partition(collection)?;
        let removed = write(&partition)?.aggregations.remove(name)?;
        self.logger.event(
            Event::AggregationDeleted,
            &[("aggregation", name), ("collection", collection)],
        );
        Ok(removed)
    }

    // ==================
    // Documents
    // ==================

    /// Inserts a document. The identity comes from the id field, or is a
    /// fresh UUID when the collection auto-generates ids and none is given.
    pub fn create_document(
        &self,
        ctx: &RequestContext,
        collection: &str,
        document: Value,
        attempt_id: Option<&str>,
    ) -> StoreResult<WriteOutcome> {
        self.authorize(ctx, collection, ScopeType::Create)?;
        let partition = self.partition(collection)?;
        let mut p = write(&partition)?;
        let requested_id = SchemaValidator::new(&p.collection).identity(&document)?;
        if let Some(outcome) = self.replay(ctx, &p, attempt_id, MutationKind::Insert, requested_id.as_deref())? {
            return Ok(outcome);
        }

        let mut document = document;
        let validator = SchemaValidator::new(&p.collection);
        if p.collection.auto_generate_id && validator.identity(&document)?.is_none() {
            if let Value::Object(map) = &mut document {
                map.insert(
                    p.collection.id_key.clone(),
                    Value::String(Uuid::new_v4().to_string()),
                );
            }
        }
        validator.validate_document(&document)?;
        let id = validator.identity(&document)?.ok_or_else(|| {
            StoreError::from(SchemaError::document_invalid(
                collection,
                ValidationDetails::missing_field(p.collection.id_key.as_str()),
            ))
        })?;
        if p.documents.contains(&id) {
            return Err(StoreError::Conflict(format!(
                "document '{}' already exists in collection '{}'",
                id, collection
            )));
        }

        self.commit(ctx, &mut p, MutationKind::Insert, &id, Some(document), attempt_id)
    }

    pub fn get_document(&self, ctx: &RequestContext, collection: &str, id: &str) -> StoreResult<StoredDocument> {
        self.authorize(ctx, collection, ScopeType::Get)?;
        let partition = self.partition(collection)?;
        let p = read(&partition)?;
        p.documents
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("document", id))
    }

    /// Replaces a document. The identity field may be omitted but never
    /// changed.
    pub fn update_document(
        &self,
        ctx: &RequestContext,
        collection: &str,
        id: &str,
        document: Value,
        expected_revision: Option<u64>,
        attempt_id: Option<&str>,
    ) -> StoreResult<WriteOutcome> {
        self.authorize(ctx, collection, ScopeType::Update)?;
        let partition = self.partition(collection)?;
        let mut p = write(&partition)?;
        if let Some(outcome) = self.replay(ctx, &p, attempt_id, MutationKind::Update, Some(id))? {
            return Ok(outcome);
        }

        let existing = p
            .documents
            .get(id)
            .ok_or_else(|| StoreError::not_found("document", id))?;
        self.check_revision(collection, existing, expected_revision)?;

        let mut document = document;
        let id_key = p.collection.id_key.clone();
        if let (Value::Object(map), Some(stored_id)) = (&mut document, existing.document.get(&id_key)) {
            map.entry(id_key).or_insert_with(|| stored_id.clone());
        }
        SchemaValidator::new(&p.collection).validate_update(id, &document)?;

        self.commit(ctx, &mut p, MutationKind::Update, id, Some(document), attempt_id)
    }

    pub fn delete_document(
        &self,
        ctx: &RequestContext,
        collection: &str,
        id: &str,
        expected_revision: Option<u64>,
        attempt_id: Option<&str>,
    ) -> StoreResult<WriteOutcome> {
        self.authorize(ctx, collection, ScopeType::Delete)?;
        let partition = self.partition(collection)?;
        let mut p = write(&partition)?;
        if let Some(outcome) = self.replay(ctx, &p, attempt_id, MutationKind::Delete, Some(id))? {
            return Ok(outcome);
        }

        let existing = p
            .documents
            .get(id)
            .ok_or_else(|| StoreError::not_found("document", id))?;
        self.check_revision(collection, existing, expected_revision)?;

        self.commit(ctx, &mut p, MutationKind::Delete, id, None, attempt_id)
    }

    /// Returns the recorded outcome when `attempt_id` was already applied.
    /// An attempt id reused for a different mutation is a conflict.
    fn replay(
        &self,
        ctx: &RequestContext,
        p: &Partition,
        attempt_id: Option<&str>,
        kind: MutationKind,
        id: Option<&str>,
    ) -> StoreResult<Option<WriteOutcome>> {
        let Some(attempt_id) = attempt_id else {
            return Ok(None);
        };
        let Some(record) = p.attempts.get(attempt_id) else {
            return Ok(None);
        };
        if !record.matches(kind, id) {
            return Err(StoreError::Conflict(format!(
                "attempt '{}' was already used for {} of document '{}'",
                attempt_id,
                record.kind.as_str(),
                record.outcome.id
            )));
        }
        let mut outcome = record.outcome.clone();
        outcome.duplicate = true;
        self.metrics.increment_duplicate_attempts();
        let request_id = ctx.request_id.to_string();
        self.logger.event(
            Event::DuplicateAttempt,
            &[
                ("attempt_id", attempt_id),
                ("collection", p.collection.name.as_str()),
                ("request_id", request_id.as_str()),
            ],
        );
        Ok(Some(outcome))
    }

    fn check_revision(&self, collection: &str, existing: &StoredDocument, expected: Option<u64>) -> StoreResult<()> {
        match expected {
            Some(expected) if expected != existing.revision => {
                self.metrics.increment_write_conflicts();
                let found = existing.revision.to_string();
                let wanted = expected.to_string();
                self.logger.event(
                    Event::WriteConflict,
                    &[
                        ("collection", collection),
                        ("expected", wanted.as_str()),
                        ("found", found.as_str()),
                        ("id", existing.id.as_str()),
                    ],
                );
                Err(StoreError::Conflict(format!(
                    "document '{}' is at revision {}, expected {}",
                    existing.id, existing.revision, expected
                )))
            }
            _ => Ok(()),
        }
    }

    /// Stages index and aggregation changes, then applies everything.
    fn commit(
        &self,
        ctx: &RequestContext,
        p: &mut Partition,
        kind: MutationKind,
        id: &str,
        new: Option<Value>,
        attempt_id: Option<&str>,
    ) -> StoreResult<WriteOutcome> {
        let old = p.documents.get(id);
        let old_body = old.map(|row| &row.document);
        let revision = match (kind, old) {
            (MutationKind::Insert, _) | (_, None) => 1,
            (MutationKind::Update, Some(row)) => row.revision + 1,
            (MutationKind::Delete, Some(row)) => row.revision,
        };

        let index_delta = p
            .indexes
            .stage(&p.collection, id, old_body, new.as_ref())
            .map_err(|e| self.rolled_back(ctx, &p.collection.name, id, kind, e.into()))?;
        let aggregation_delta = p
            .aggregations
            .stage(kind, old_body, new.as_ref())
            .map_err(|e| self.rolled_back(ctx, &p.collection.name, id, kind, e.into()))?;

        // Nothing below can fail
        let touched_aggregations = aggregation_delta.len();
        p.indexes.apply(index_delta);
        p.aggregations.apply(aggregation_delta);
        match &new {
            Some(document) => {
                path::collect_paths(document, &mut p.observed_paths);
                p.documents.put(StoredDocument {
                    id: id.to_string(),
                    revision,
                    document: document.clone(),
                });
            }
            None => {
                p.documents.remove(id);
            }
        }

        let outcome = WriteOutcome {
            id: id.to_string(),
            revision,
            document: new,
            duplicate: false,
        };
        if let Some(attempt_id) = attempt_id {
            p.attempts.record(attempt_id.to_string(), kind, outcome.clone());
        }

        self.metrics.increment_writes_committed();
        let request_id = ctx.request_id.to_string();
        let revision = revision.to_string();
        self.logger.event(
            Event::DocumentCommitted,
            &[
                ("collection", p.collection.name.as_str()),
                ("id", id),
                ("kind", kind.as_str()),
                ("request_id", request_id.as_str()),
                ("revision", revision.as_str()),
            ],
        );
        if touched_aggregations > 0 {
            let touched = touched_aggregations.to_string();
            self.logger.event(
                Event::AggregationUpdated,
                &[
                    ("aggregations", touched.as_str()),
                    ("collection", p.collection.name.as_str()),
                ],
            );
        }
        Ok(outcome)
    }

    fn rolled_back(
        &self,
        ctx: &RequestContext,
        collection: &str,
        id: &str,
        kind: MutationKind,
        err: StoreError,
    ) -> StoreError {
        self.metrics.increment_writes_rolled_back();
        let request_id = ctx.request_id.to_string();
        let reason = err.to_string();
        self.logger.event(
            Event::MutationRolledBack,
            &[
                ("code", err.code()),
                ("collection", collection),
                ("id", id),
                ("kind", kind.as_str()),
                ("reason", reason.as_str()),
                ("request_id", request_id.as_str()),
            ],
        );
        err
    }

    // ==================
    // Queries
    // ==================

    /// Plans and executes one page of a query.
    pub fn query(&self, ctx: &RequestContext, query: &Query) -> StoreResult<PaginatedResult<Value>> {
        self.authorize(ctx, &query.collection, ScopeType::Query)?;
        let partition = self.partition(&query.collection)?;
        let p = read(&partition)?;
        let request_id = ctx.request_id.to_string();

        let result = self.page_size(query.page_size).and_then(|page_size| {
            let plan = QueryPlanner::new(&p.collection, &p.indexes).plan(query)?;
            self.logger.event(
                Event::QueryPlanned,
                &[
                    ("collection", plan.collection.as_str()),
                    ("index", plan.index.as_deref().unwrap_or("-")),
                    ("request_id", request_id.as_str()),
                    ("scan_type", plan.scan_type.as_str()),
                ],
            );
            let executor = QueryExecutor::new(&p.collection, &p.documents, &p.indexes);
            Ok(executor.execute(&plan, page_size, query.cursor.as_deref())?)
        });

        match result {
            Ok(execution) => {
                self.metrics.increment_queries_executed();
                self.metrics.add_documents_scanned(execution.scanned_count as u64);
                let returned = execution.page.len().to_string();
                let scanned = execution.scanned_count.to_string();
                self.logger.event(
                    Event::QueryExecuted,
                    &[
                        ("collection", query.collection.as_str()),
                        ("request_id", request_id.as_str()),
                        ("returned", returned.as_str()),
                        ("scanned", scanned.as_str()),
                    ],
                );
                Ok(execution.page)
            }
            Err(err) => {
                self.metrics.increment_queries_rejected();
                let reason = err.to_string();
                self.logger.event(
                    Event::QueryRejected,
                    &[
                        ("code", err.code()),
                        ("collection", query.collection.as_str()),
                        ("reason", reason.as_str()),
                        ("request_id", request_id.as_str()),
                    ],
                );
                Err(err)
            }
        }
    }

    /// Describes the plan a query would run; planning failures are reported
    /// in the explain output rather than as errors.
    pub fn explain(&self, ctx: &RequestContext, query: &Query) -> StoreResult<ExplainPlan> {
        self.authorize(ctx, &query.collection, ScopeType::Query)?;
        let partition = self.partition(&query.collection)?;
        let p = read(&partition)?;
        let explain = match QueryPlanner::new(&p.collection, &p.indexes).plan(query) {
            Ok(plan) => ExplainPlan::from_plan(&plan),
            Err(err) => ExplainPlan::from_error(&err),
        };
        Ok(explain)
    }
}
