//! The File node module, plus the extension fragment that gives Process its
//! file-related edges.

use std::sync::Arc;

use vigil_core::{EdgeCardinality, PropType, Result};
use vigil_query::{IntCmp, QueryBuilder, QueryNode, StrCmp};
use vigil_schema::{Schema, SchemaRegistry};

use crate::nodes::process::ProcessQuery;
use crate::view::EntityView;

/// The base File type: one node per observed file identity.
pub fn file_schema() -> Schema {
    Schema::new("File")
        .with_property("file_path", PropType::string())
        .with_property("file_extension", PropType::string())
        .with_property("file_mime_type", PropType::string())
        .with_property("md5_hash", PropType::string())
        .with_property("sha1_hash", PropType::string())
        .with_property("sha256_hash", PropType::string())
        .with_property("signed", PropType::string())
        .with_property("signed_status", PropType::string())
        .with_property("file_size", PropType::int())
        .with_property("file_inode", PropType::int())
        .with_display_property("file_path")
}

/// Extension fragment merged into Process when the File module is loaded.
/// Declares the file-related edges Process gains; their mirrors land on
/// File when reverse edges are derived.
pub fn process_file_fragment() -> Schema {
    Schema::fragment("Process")
        .with_edge("spawned_from", "File", EdgeCardinality::ManyToOne, "bin_file")
        .with_edge("created_files", "File", EdgeCardinality::OneToMany, "creator")
        .with_edge("wrote_files", "File", EdgeCardinality::ManyToMany, "writers")
        .with_edge("read_files", "File", EdgeCardinality::ManyToMany, "readers")
        .with_edge("deleted_files", "File", EdgeCardinality::OneToMany, "deleter")
}

/// Typed query wrapper for File.
pub struct FileQuery {
    builder: QueryBuilder,
}

impl FileQuery {
    pub fn new(registry: &Arc<SchemaRegistry>) -> Result<Self> {
        Ok(Self {
            builder: QueryBuilder::new(registry, "File")?,
        })
    }

    pub fn with_file_path(self, cmps: impl IntoIterator<Item = StrCmp>) -> Result<Self> {
        Ok(Self {
            builder: self.builder.with_str_prop("file_path", cmps)?,
        })
    }

    pub fn with_file_extension(self, cmps: impl IntoIterator<Item = StrCmp>) -> Result<Self> {
        Ok(Self {
            builder: self.builder.with_str_prop("file_extension", cmps)?,
        })
    }

    pub fn with_file_mime_type(self, cmps: impl IntoIterator<Item = StrCmp>) -> Result<Self> {
        Ok(Self {
            builder: self.builder.with_str_prop("file_mime_type", cmps)?,
        })
    }

    pub fn with_md5_hash(self, cmps: impl IntoIterator<Item = StrCmp>) -> Result<Self> {
        Ok(Self {
            builder: self.builder.with_str_prop("md5_hash", cmps)?,
        })
    }

    pub fn with_sha1_hash(self, cmps: impl IntoIterator<Item = StrCmp>) -> Result<Self> {
        Ok(Self {
            builder: self.builder.with_str_prop("sha1_hash", cmps)?,
        })
    }

    pub fn with_sha256_hash(self, cmps: impl IntoIterator<Item = StrCmp>) -> Result<Self> {
        Ok(Self {
            builder: self.builder.with_str_prop("sha256_hash", cmps)?,
        })
    }

    pub fn with_signed(self, cmps: impl IntoIterator<Item = StrCmp>) -> Result<Self> {
        Ok(Self {
            builder: self.builder.with_str_prop("signed", cmps)?,
        })
    }

    pub fn with_signed_status(self, cmps: impl IntoIterator<Item = StrCmp>) -> Result<Self> {
        Ok(Self {
            builder: self.builder.with_str_prop("signed_status", cmps)?,
        })
    }

    pub fn with_file_size(self, cmps: impl IntoIterator<Item = IntCmp>) -> Result<Self> {
        Ok(Self {
            builder: self.builder.with_int_prop("file_size", cmps)?,
        })
    }

    pub fn with_file_inode(self, cmps: impl IntoIterator<Item = IntCmp>) -> Result<Self> {
        Ok(Self {
            builder: self.builder.with_int_prop("file_inode", cmps)?,
        })
    }

    /// Require matching processes spawned from this file (reverse of
    /// `spawned_from`).
    pub fn with_bin_file(self, processes: impl IntoIterator<Item = ProcessQuery>) -> Result<Self> {
        Ok(Self {
            builder: self
                .builder
                .with_neighbor_nodes("bin_file", processes.into_iter().map(ProcessQuery::compile))?,
        })
    }

    /// Require a matching creating process (reverse of `created_files`).
    pub fn with_creator(self, processes: impl IntoIterator<Item = ProcessQuery>) -> Result<Self> {
        Ok(Self {
            builder: self
                .builder
                .with_neighbor_nodes("creator", processes.into_iter().map(ProcessQuery::compile))?,
        })
    }

    /// Require matching writing processes (reverse of `wrote_files`).
    pub fn with_writers(self, processes: impl IntoIterator<Item = ProcessQuery>) -> Result<Self> {
        Ok(Self {
            builder: self
                .builder
                .with_neighbor_nodes("writers", processes.into_iter().map(ProcessQuery::compile))?,
        })
    }

    /// Require matching reading processes (reverse of `read_files`).
    pub fn with_readers(self, processes: impl IntoIterator<Item = ProcessQuery>) -> Result<Self> {
        Ok(Self {
            builder: self
                .builder
                .with_neighbor_nodes("readers", processes.into_iter().map(ProcessQuery::compile))?,
        })
    }

    /// Require a matching deleting process (reverse of `deleted_files`).
    pub fn with_deleter(self, processes: impl IntoIterator<Item = ProcessQuery>) -> Result<Self> {
        Ok(Self {
            builder: self
                .builder
                .with_neighbor_nodes("deleter", processes.into_iter().map(ProcessQuery::compile))?,
        })
    }

    pub fn compile(self) -> QueryNode {
        self.builder.compile()
    }

    pub fn into_builder(self) -> QueryBuilder {
        self.builder
    }
}

impl From<QueryBuilder> for FileQuery {
    fn from(builder: QueryBuilder) -> Self {
        Self { builder }
    }
}

impl std::fmt::Debug for FileQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FileQuery").field(&self.builder).finish()
    }
}

/// Typed accessors over an [`EntityView`] tagged as a File.
pub trait FileViewExt {
    fn get_file_path(&self, cached: bool) -> Result<Option<String>>;
    fn get_file_extension(&self, cached: bool) -> Result<Option<String>>;
    fn get_file_mime_type(&self, cached: bool) -> Result<Option<String>>;
    fn get_md5_hash(&self, cached: bool) -> Result<Option<String>>;
    fn get_sha1_hash(&self, cached: bool) -> Result<Option<String>>;
    fn get_sha256_hash(&self, cached: bool) -> Result<Option<String>>;
    fn get_signed(&self, cached: bool) -> Result<Option<String>>;
    fn get_signed_status(&self, cached: bool) -> Result<Option<String>>;
    fn get_file_size(&self, cached: bool) -> Result<Option<i64>>;
    fn get_file_inode(&self, cached: bool) -> Result<Option<i64>>;
    fn get_bin_file(&self, cached: bool) -> Result<Vec<Arc<EntityView>>>;
    fn get_creator(&self, cached: bool) -> Result<Option<Arc<EntityView>>>;
    fn get_writers(&self, cached: bool) -> Result<Vec<Arc<EntityView>>>;
    fn get_readers(&self, cached: bool) -> Result<Vec<Arc<EntityView>>>;
    fn get_deleter(&self, cached: bool) -> Result<Option<Arc<EntityView>>>;
}

impl FileViewExt for EntityView {
    fn get_file_path(&self, cached: bool) -> Result<Option<String>> {
        self.get_str("file_path", cached)
    }

    fn get_file_extension(&self, cached: bool) -> Result<Option<String>> {
        self.get_str("file_extension", cached)
    }

    fn get_file_mime_type(&self, cached: bool) -> Result<Option<String>> {
        self.get_str("file_mime_type", cached)
    }

    fn get_md5_hash(&self, cached: bool) -> Result<Option<String>> {
        self.get_str("md5_hash", cached)
    }

    fn get_sha1_hash(&self, cached: bool) -> Result<Option<String>> {
        self.get_str("sha1_hash", cached)
    }

    fn get_sha256_hash(&self, cached: bool) -> Result<Option<String>> {
        self.get_str("sha256_hash", cached)
    }

    fn get_signed(&self, cached: bool) -> Result<Option<String>> {
        self.get_str("signed", cached)
    }

    fn get_signed_status(&self, cached: bool) -> Result<Option<String>> {
        self.get_str("signed_status", cached)
    }

    fn get_file_size(&self, cached: bool) -> Result<Option<i64>> {
        self.get_int("file_size", cached)
    }

    fn get_file_inode(&self, cached: bool) -> Result<Option<i64>> {
        self.get_int("file_inode", cached)
    }

    fn get_bin_file(&self, cached: bool) -> Result<Vec<Arc<EntityView>>> {
        self.get_neighbors("bin_file", Vec::new(), cached)
    }

    fn get_creator(&self, cached: bool) -> Result<Option<Arc<EntityView>>> {
        self.get_neighbor("creator", Vec::new(), cached)
    }

    fn get_writers(&self, cached: bool) -> Result<Vec<Arc<EntityView>>> {
        self.get_neighbors("writers", Vec::new(), cached)
    }

    fn get_readers(&self, cached: bool) -> Result<Vec<Arc<EntityView>>> {
        self.get_neighbors("readers", Vec::new(), cached)
    }

    fn get_deleter(&self, cached: bool) -> Result<Option<Arc<EntityView>>> {
        self.get_neighbor("deleter", Vec::new(), cached)
    }
}

/// File-edge builders for Process queries, available once the File module's
/// fragment has been applied.
pub trait ProcessQueryFileExt: Sized {
    fn with_spawned_from(self, files: impl IntoIterator<Item = FileQuery>) -> Result<Self>;
    fn with_created_files(self, files: impl IntoIterator<Item = FileQuery>) -> Result<Self>;
    fn with_wrote_files(self, files: impl IntoIterator<Item = FileQuery>) -> Result<Self>;
    fn with_read_files(self, files: impl IntoIterator<Item = FileQuery>) -> Result<Self>;
    fn with_deleted_files(self, files: impl IntoIterator<Item = FileQuery>) -> Result<Self>;
}

impl ProcessQueryFileExt for ProcessQuery {
    fn with_spawned_from(self, files: impl IntoIterator<Item = FileQuery>) -> Result<Self> {
        Ok(self
            .into_builder()
            .with_neighbor_nodes("spawned_from", files.into_iter().map(FileQuery::compile))?
            .into())
    }

    fn with_created_files(self, files: impl IntoIterator<Item = FileQuery>) -> Result<Self> {
        Ok(self
            .into_builder()
            .with_neighbor_nodes("created_files", files.into_iter().map(FileQuery::compile))?
            .into())
    }

    fn with_wrote_files(self, files: impl IntoIterator<Item = FileQuery>) -> Result<Self> {
        Ok(self
            .into_builder()
            .with_neighbor_nodes("wrote_files", files.into_iter().map(FileQuery::compile))?
            .into())
    }

    fn with_read_files(self, files: impl IntoIterator<Item = FileQuery>) -> Result<Self> {
        Ok(self
            .into_builder()
            .with_neighbor_nodes("read_files", files.into_iter().map(FileQuery::compile))?
            .into())
    }

    fn with_deleted_files(self, files: impl IntoIterator<Item = FileQuery>) -> Result<Self> {
        Ok(self
            .into_builder()
            .with_neighbor_nodes("deleted_files", files.into_iter().map(FileQuery::compile))?
            .into())
    }
}

/// File-edge accessors for Process views.
pub trait ProcessViewFileExt {
    /// The binary this process was spawned from. To-one; at most one File.
    fn get_spawned_from(&self, cached: bool) -> Result<Option<Arc<EntityView>>>;
    fn get_created_files(&self, cached: bool) -> Result<Vec<Arc<EntityView>>>;
    fn get_wrote_files(&self, cached: bool) -> Result<Vec<Arc<EntityView>>>;
    fn get_read_files(&self, cached: bool) -> Result<Vec<Arc<EntityView>>>;
    fn get_deleted_files(&self, cached: bool) -> Result<Vec<Arc<EntityView>>>;
}

impl ProcessViewFileExt for EntityView {
    fn get_spawned_from(&self, cached: bool) -> Result<Option<Arc<EntityView>>> {
        self.get_neighbor("spawned_from", Vec::new(), cached)
    }

    fn get_created_files(&self, cached: bool) -> Result<Vec<Arc<EntityView>>> {
        self.get_neighbors("created_files", Vec::new(), cached)
    }

    fn get_wrote_files(&self, cached: bool) -> Result<Vec<Arc<EntityView>>> {
        self.get_neighbors("wrote_files", Vec::new(), cached)
    }

    fn get_read_files(&self, cached: bool) -> Result<Vec<Arc<EntityView>>> {
        self.get_neighbors("read_files", Vec::new(), cached)
    }

    fn get_deleted_files(&self, cached: bool) -> Result<Vec<Arc<EntityView>>> {
        self.get_neighbors("deleted_files", Vec::new(), cached)
    }
}
