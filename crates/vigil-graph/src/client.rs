//! The graph client: executor + registry + identity-stable materialization.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use vigil_core::{NodeKey, PropValue, Result, Uid, VigilConfig, VigilError};
use vigil_query::{QueryBuilder, QueryNode, StrCmp};
use vigil_schema::{EdgeDecl, SchemaRegistry};

use crate::executor::{GraphExecutor, ResultRow};
use crate::view::EntityView;

/// Dead weak entries are swept once the identity map reaches this size.
const IDENTITY_PRUNE_THRESHOLD: usize = 1024;

struct ClientInner {
    executor: Arc<dyn GraphExecutor>,
    registry: Arc<SchemaRegistry>,
    config: VigilConfig,
    /// One view per node identity. Weak so views die by normal refcounting
    /// once no caller holds them.
    identity: Mutex<HashMap<(Uid, NodeKey), Weak<EntityView>>>,
}

/// The single point of access for reads against the graph store.
///
/// Wraps an opaque [`GraphExecutor`] and turns its result rows into
/// identity-stable [`EntityView`]s: within one client, one object exists per
/// `(uid, node_key)`, and re-materializing rows for a known identity updates
/// that object in place. Clone is cheap (inner `Arc`).
///
/// The first execution through a client seals the schema registry, ending
/// the provisioning phase.
#[derive(Clone)]
pub struct GraphClient {
    inner: Arc<ClientInner>,
}

impl GraphClient {
    pub fn new(executor: Arc<dyn GraphExecutor>, registry: Arc<SchemaRegistry>) -> Self {
        Self::with_config(executor, registry, VigilConfig::default())
    }

    pub fn with_config(
        executor: Arc<dyn GraphExecutor>,
        registry: Arc<SchemaRegistry>,
        config: VigilConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                executor,
                registry,
                config,
                identity: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.inner.registry
    }

    pub fn config(&self) -> &VigilConfig {
        &self.inner.config
    }

    /// Execute a compiled query, returning raw rows. Seals the registry.
    pub fn execute(&self, query: &QueryNode) -> Result<Vec<ResultRow>> {
        self.inner.registry.seal();
        self.inner.executor.execute(query)
    }

    /// Execute a compiled query and materialize every root row into a view.
    pub fn query_views(&self, query: &QueryNode) -> Result<Vec<Arc<EntityView>>> {
        let rows = self.execute(query)?;
        let mut views = Vec::with_capacity(rows.len());
        for row in &rows {
            views.push(self.materialize_row(row)?);
        }
        Ok(views)
    }

    // ── Materialization ──────────────────────────────────────────

    /// Create or update the view for a result row, recursing into neighbor
    /// rows. In the default (non-strict) configuration a malformed field or
    /// neighbor row is skipped with a warning, leaving that field uncached;
    /// `strict` promotes it to an error.
    pub(crate) fn materialize_row(&self, row: &ResultRow) -> Result<Arc<EntityView>> {
        let view = self.view_for(row);

        let mut accepted = Vec::with_capacity(row.fields.len());
        for (name, value) in &row.fields {
            match self.validate_field(&row.node_types, name, value) {
                Ok(()) => accepted.push((name.clone(), value.clone())),
                Err(e) if self.inner.config.strict => return Err(e),
                Err(e) => {
                    tracing::warn!(uid = %row.uid, field = %name, error = %e,
                        "Skipping malformed row field");
                }
            }
        }
        view.merge_fields(accepted, &row.node_types);

        for (edge, rows) in &row.neighbors {
            let mut neighbors = Vec::with_capacity(rows.len());
            for neighbor_row in rows {
                match self.materialize_row(neighbor_row) {
                    Ok(neighbor) => neighbors.push(neighbor),
                    Err(e) if self.inner.config.strict => return Err(e),
                    Err(e) => {
                        tracing::warn!(uid = %row.uid, edge = %edge, error = %e,
                            "Skipping malformed neighbor row");
                    }
                }
            }
            view.merge_neighbors(edge, neighbors);
        }

        Ok(view)
    }

    fn view_for(&self, row: &ResultRow) -> Arc<EntityView> {
        let key = (row.uid, row.node_key.clone());
        let mut identity = self.inner.identity.lock();
        if let Some(existing) = identity.get(&key).and_then(Weak::upgrade) {
            return existing;
        }
        if identity.len() >= IDENTITY_PRUNE_THRESHOLD {
            identity.retain(|_, weak| weak.strong_count() > 0);
        }
        let view = Arc::new(EntityView::new(
            self.clone(),
            row.uid,
            row.node_key.clone(),
            row.node_types.clone(),
        ));
        identity.insert(key, Arc::downgrade(&view));
        view
    }

    fn validate_field(
        &self,
        node_types: &BTreeSet<String>,
        name: &str,
        value: &PropValue,
    ) -> Result<()> {
        for type_name in node_types {
            let Ok(schema) = self.inner.registry.lookup(type_name) else {
                continue;
            };
            if let Some(prop) = schema.property(name) {
                if value.matches(prop) {
                    return Ok(());
                }
                return Err(VigilError::Materialize {
                    type_name: type_name.clone(),
                    field: name.to_string(),
                    reason: format!("value does not match declared type {prop:?}"),
                });
            }
            if schema.edge(name).is_some() {
                return Err(VigilError::Materialize {
                    type_name: type_name.clone(),
                    field: name.to_string(),
                    reason: "edge delivered as a scalar field".to_string(),
                });
            }
        }
        Err(VigilError::Materialize {
            type_name: node_types.iter().next().cloned().unwrap_or_default(),
            field: name.to_string(),
            reason: "field not declared by any schema of this node".to_string(),
        })
    }

    // ── Lazy Fetch Paths ─────────────────────────────────────────

    /// Issue a single-field fetch for one view: a query predicated on the
    /// view's `node_key`, projecting exactly the requested field.
    pub(crate) fn fetch_field(&self, view: &EntityView, field: &str) -> Result<Option<PropValue>> {
        let owner = self.property_owner(&view.node_types(), field)?;
        let query = QueryBuilder::new(&self.inner.registry, &owner)?
            .with_str_prop(
                "node_key",
                [StrCmp::Eq(view.node_key().as_str().to_string())],
            )?
            .with_projection([field])?
            .with_first(1)
            .compile();

        let rows = self.execute(&query)?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        if row.node_key != *view.node_key() {
            tracing::warn!(uid = %view.uid(), field,
                "Executor answered a node_key lookup with a different node");
            return Ok(None);
        }
        match row.fields.get(field) {
            None => Ok(None),
            Some(value) => {
                self.validate_field(&row.node_types, field, value)?;
                Ok(Some(value.clone()))
            }
        }
    }

    /// Fetch and materialize the neighbors of one view across `edge`.
    pub(crate) fn fetch_neighbors(
        &self,
        view: &EntityView,
        edge: &str,
        filters: Vec<QueryNode>,
    ) -> Result<Vec<Arc<EntityView>>> {
        let decl = self.edge_decl(view, edge)?;
        let query = QueryBuilder::new(&self.inner.registry, &decl.edge.source_type)?
            .with_str_prop(
                "node_key",
                [StrCmp::Eq(view.node_key().as_str().to_string())],
            )?
            .with_neighbor_nodes(edge, filters)?
            .compile();

        let rows = self.execute(&query)?;
        let mut neighbors = Vec::new();
        for row in &rows {
            if row.node_key != *view.node_key() {
                continue;
            }
            let Some(neighbor_rows) = row.neighbors.get(edge) else {
                continue;
            };
            for neighbor_row in neighbor_rows {
                match self.materialize_row(neighbor_row) {
                    Ok(neighbor) => neighbors.push(neighbor),
                    Err(e) if self.inner.config.strict => return Err(e),
                    Err(e) => {
                        tracing::warn!(uid = %view.uid(), edge, error = %e,
                            "Skipping malformed neighbor row");
                    }
                }
            }
        }
        Ok(neighbors)
    }

    /// Resolve the edge declaration for a view, searching its type tags.
    pub(crate) fn edge_decl(&self, view: &EntityView, edge: &str) -> Result<EdgeDecl> {
        for type_name in view.node_types() {
            if let Ok(schema) = self.inner.registry.lookup(&type_name) {
                if let Some(decl) = schema.edge(edge) {
                    return Ok(decl.clone());
                }
            }
        }
        Err(VigilError::InvalidPredicate {
            type_name: view.node_types().iter().next().cloned().unwrap_or_default(),
            property: edge.to_string(),
            reason: "edge not declared by any schema of this node".to_string(),
        })
    }

    fn property_owner(&self, node_types: &BTreeSet<String>, field: &str) -> Result<String> {
        for type_name in node_types {
            if let Ok(schema) = self.inner.registry.lookup(type_name) {
                if schema.property(field).is_some() {
                    return Ok(type_name.clone());
                }
            }
        }
        Err(VigilError::InvalidPredicate {
            type_name: node_types.iter().next().cloned().unwrap_or_default(),
            property: field.to_string(),
            reason: "property not declared by any schema of this node".to_string(),
        })
    }
}
