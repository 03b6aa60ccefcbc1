//! The meta-config data model: what a real firmware-config grammar parser
//! produces, and what the archive creator annotates in place during
//! creation. The grammar/parser itself is an external collaborator; this
//! module only carries the shape the core needs.

use serde::{Deserialize, Serialize};

use snafu::ResultExt;

use crate::error::{self, Error, Result};

/// A single `file-resource { ... }` section.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileResource {
    pub title: String,
    /// `;`-delimited list of local file paths, concatenated in order.
    pub host_path: String,
    pub assert_size_lte: Option<u64>,
    pub assert_size_gte: Option<u64>,

    // Annotated during creation; absent until `compute_file_metadata` runs.
    pub length: Option<u64>,
    pub sha256: Option<String>,
    pub blake2b_256: Option<String>,
}

impl FileResource {
    pub fn host_paths(&self) -> impl Iterator<Item = &str> {
        self.host_path.split(';').filter(|p| !p.is_empty())
    }
}

/// A named `uboot-environment { ... }` section.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UbootEnvironment {
    pub name: String,
    pub block_offset: u64,
    pub env_size: usize,
}

/// A flat `(arity, name, arg...)*` requirement list, as encoded in
/// configuration. See [`crate::requirement::apply_reqlist`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Reqlist(pub Vec<String>);

/// A single task in the on-target application order: write the named
/// file-resource at `target_block_offset` (in 512-byte sectors) if `reqlist`
/// is satisfied against the device currently being written.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Task {
    pub file_resource: String,
    pub target_block_offset: u64,
    #[serde(default)]
    pub reqlist: Reqlist,
}

/// The parsed, and (during creation) progressively annotated, configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MetaConfig {
    pub meta_creation_date: Option<String>,
    pub meta_fwup_version: Option<String>,
    /// `log2` of the raw-device block size used by the aligned writer during
    /// application. Defaults to 9 (512-byte blocks) when absent.
    pub log2_block_size: Option<u32>,
    pub file_resources: Vec<FileResource>,
    pub uboot_environments: Vec<UbootEnvironment>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl MetaConfig {
    pub fn find_uboot_environment(&self, name: &str) -> Option<&UbootEnvironment> {
        self.uboot_environments.iter().find(|e| e.name == name)
    }

    pub fn find_file_resource(&self, title: &str) -> Option<&FileResource> {
        self.file_resources.iter().find(|r| r.title == title)
    }

    pub fn log2_block_size(&self) -> u32 {
        self.log2_block_size.unwrap_or(9)
    }
}

/// Loads a [`MetaConfig`] from a path. The real firmware-config grammar is
/// an external collaborator; this loads the data model's own serialized
/// form (JSON) so the core is independently testable.
pub trait ConfigSource {
    fn load(&self, path: &std::path::Path) -> Result<MetaConfig>;
}

/// Reads a [`MetaConfig`] serialized as JSON from `path`.
pub struct JsonConfigSource;

impl ConfigSource for JsonConfigSource {
    fn load(&self, path: &std::path::Path) -> Result<MetaConfig> {
        let bytes = std::fs::read(path).map_err(Error::from)?;
        serde_json::from_slice(&bytes).context(error::ConfigParseSnafu)
    }
}
