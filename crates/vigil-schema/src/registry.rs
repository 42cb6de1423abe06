//! The schema registry: registration, reverse-edge derivation, extension.
//!
//! An explicit, shared registry instance owned by the provisioning routine
//! and threaded through builders and views. All mutation happens during the
//! provisioning phase; the first query execution seals the registry and
//! locks out further registration and extension.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use vigil_core::{Result, VigilError};

use crate::schema::{EdgeDecl, Schema};

/// Audit record of one applied extension fragment.
#[derive(Debug, Clone)]
pub struct ExtensionRecord {
    pub base_type_name: String,
    pub fragment: Schema,
}

#[derive(Default)]
struct Inner {
    schemas: BTreeMap<String, Schema>,
    extensions: Vec<ExtensionRecord>,
    sealed: bool,
}

/// Process-wide registry of node schemas, keyed by type name.
///
/// Shared via `Arc` between the provisioning routine, query builders, and
/// the materializer. Interior locking keeps `register`/`extend` safe against
/// concurrent lookups, though in practice all writes happen up front.
#[derive(Default)]
pub struct SchemaRegistry {
    inner: RwLock<Inner>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema. Fails with `DuplicateType` if the type name is
    /// already present, `SchemaConflict` if the schema declares a property
    /// and an edge under the same name, `SchemaLocked` after sealing.
    pub fn register(&self, schema: Schema) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.sealed {
            return Err(VigilError::SchemaLocked(schema.type_name().to_string()));
        }
        let type_name = schema.type_name().to_string();
        if inner.schemas.contains_key(&type_name) {
            return Err(VigilError::DuplicateType(type_name));
        }
        if let Some(name) = schema.self_collision() {
            return Err(VigilError::SchemaConflict {
                type_name,
                name: name.clone(),
            });
        }
        tracing::debug!(type_name = %type_name, "Registered schema");
        inner.schemas.insert(type_name, schema);
        Ok(())
    }

    /// Register a batch of schemas, failing on the first duplicate.
    pub fn register_all(&self, schemas: impl IntoIterator<Item = Schema>) -> Result<()> {
        for schema in schemas {
            self.register(schema)?;
        }
        Ok(())
    }

    /// Look up a schema by type name, cloning it out.
    pub fn lookup(&self, type_name: &str) -> Result<Schema> {
        self.inner
            .read()
            .schemas
            .get(type_name)
            .cloned()
            .ok_or_else(|| VigilError::UnknownType(type_name.to_string()))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.inner.read().schemas.contains_key(type_name)
    }

    pub fn type_names(&self) -> Vec<String> {
        self.inner.read().schemas.keys().cloned().collect()
    }

    /// For every declared (non-derived) edge in the registry, install the
    /// mirrored edge on the destination schema: swapped endpoints, reversed
    /// cardinality, named by the declared reverse name.
    ///
    /// Runs after all schemas of a deployment are registered so that
    /// mutually-referencing declarations resolve. Idempotent: repeated calls
    /// are no-ops. Fails with `UnknownType` if an edge points at a type that
    /// was never registered, and with `SchemaConflict` if a mirror would land
    /// on a name already taken by a different declaration.
    pub fn derive_reverse_edges(&self) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.sealed {
            return Err(VigilError::SchemaLocked(
                "reverse-edge derivation is a provisioning operation".to_string(),
            ));
        }

        // Validate and collect every mirror before touching any schema, so a
        // failure leaves the registry unchanged. `claimed` catches two
        // declared edges whose mirrors would land on the same destination
        // name.
        let mut mirrors: Vec<(String, String, EdgeDecl)> = Vec::new();
        let mut claimed: BTreeMap<(String, String), EdgeDecl> = BTreeMap::new();
        for schema in inner.schemas.values() {
            for (forward_name, decl) in schema.edges() {
                if decl.derived {
                    continue;
                }
                if !inner.schemas.contains_key(&decl.edge.dest_type) {
                    return Err(VigilError::UnknownType(decl.edge.dest_type.clone()));
                }
                let mirror = EdgeDecl {
                    edge: decl.edge.reversed(),
                    reverse_name: forward_name.clone(),
                    derived: true,
                };
                let key = (decl.edge.dest_type.clone(), decl.reverse_name.clone());
                match claimed.get(&key) {
                    None => {
                        claimed.insert(key.clone(), mirror.clone());
                    }
                    Some(existing) if *existing == mirror => {}
                    Some(_) => {
                        return Err(VigilError::SchemaConflict {
                            type_name: key.0,
                            name: key.1,
                        });
                    }
                }
                mirrors.push((key.0, key.1, mirror));
            }
        }

        for (dest_type, mirror_name, mirror) in &mirrors {
            let dest = inner
                .schemas
                .get(dest_type)
                .ok_or_else(|| VigilError::UnknownType(dest_type.clone()))?;
            match dest.edge(mirror_name) {
                None => {}
                // Re-derivation of the same mirror is a no-op.
                Some(existing) if existing == mirror => {}
                Some(_) => {
                    return Err(VigilError::SchemaConflict {
                        type_name: dest_type.clone(),
                        name: mirror_name.clone(),
                    });
                }
            }
            if dest.properties().contains_key(mirror_name) {
                return Err(VigilError::SchemaConflict {
                    type_name: dest_type.clone(),
                    name: mirror_name.clone(),
                });
            }
        }

        for (dest_type, mirror_name, mirror) in mirrors {
            if let Some(dest) = inner.schemas.get_mut(&dest_type) {
                if dest.edge(&mirror_name).is_none() {
                    tracing::debug!(
                        type_name = %dest_type,
                        edge = %mirror_name,
                        "Installed derived reverse edge"
                    );
                    dest.install_edge(mirror_name, mirror);
                }
            }
        }

        Ok(())
    }

    /// Merge an extension fragment into its base schema.
    ///
    /// The base type is the fragment's type name. Every fragment property and
    /// edge name is checked against the base's merged namespace before any
    /// mutation, so a `SchemaConflict` leaves the base schema unchanged.
    /// Extension is only valid during provisioning; after sealing this fails
    /// with `SchemaLocked`.
    pub fn extend(&self, fragment: Schema) -> Result<()> {
        let mut inner = self.inner.write();
        let base_type = fragment.type_name().to_string();
        if inner.sealed {
            return Err(VigilError::SchemaLocked(base_type));
        }
        let base = inner
            .schemas
            .get(&base_type)
            .ok_or_else(|| VigilError::UnknownType(base_type.clone()))?;

        if let Some(name) = fragment.self_collision() {
            return Err(VigilError::SchemaConflict {
                type_name: base_type,
                name: name.clone(),
            });
        }
        for name in fragment.properties().keys().chain(fragment.edges().keys()) {
            if base.declares(name) {
                return Err(VigilError::SchemaConflict {
                    type_name: base_type,
                    name: name.clone(),
                });
            }
        }

        let record = ExtensionRecord {
            base_type_name: base_type.clone(),
            fragment: fragment.clone(),
        };
        if let Some(base) = inner.schemas.get_mut(&base_type) {
            for (name, prop) in fragment.properties() {
                base.install_property(name.clone(), *prop);
            }
            for (name, decl) in fragment.edges() {
                base.install_edge(name.clone(), decl.clone());
            }
        }
        tracing::debug!(
            type_name = %base_type,
            properties = fragment.properties().len(),
            edges = fragment.edges().len(),
            "Applied extension fragment"
        );
        inner.extensions.push(record);
        Ok(())
    }

    /// Extension fragments applied so far, in order.
    pub fn extensions(&self) -> Vec<ExtensionRecord> {
        self.inner.read().extensions.clone()
    }

    /// Seal the registry, ending the provisioning phase. Idempotent.
    /// Invoked automatically by the first query execution.
    pub fn seal(&self) {
        let mut inner = self.inner.write();
        if !inner.sealed {
            tracing::info!(
                types = inner.schemas.len(),
                "Schema registry sealed, provisioning complete"
            );
            inner.sealed = true;
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.inner.read().sealed
    }
}
