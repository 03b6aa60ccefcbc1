//! Trait seams for the pieces this crate treats as external collaborators:
//! the FAT filesystem driver, the U-Boot environment codec's variable
//! grammar, and host mount topology. Each is referenced here by the
//! capability it must provide; production backends live outside this crate.

/// A resolved view of a FAT filesystem image, as would be produced by a real
/// FAT driver backend.
pub trait FatCache {
    /// Whether `name` exists in the filesystem.
    fn exists(&self, name: &str) -> bool;

    /// Whether the contents of `name` match `pattern`.
    fn matches(&self, name: &str, pattern: &str) -> bool;
}

/// Resolves a block offset (in 512-byte sectors) on the output image to a
/// cached view of the FAT filesystem living there.
pub trait FatCacheResolver {
    fn resolve(&mut self, block_offset: u64) -> crate::error::Result<Box<dyn FatCache>>;
}

/// Host-side mount topology lookups, backing `require-path-on-device`.
pub trait HostTopology {
    /// Whether `path` resolves to a location backed by `device`.
    fn is_path_on_device(&self, path: &str, device: &str) -> bool;
}

/// The real mount-table-based implementation. Kept trivial on purpose: the
/// actual mount topology walk is the stuff of a full block-device library,
/// out of scope here.
pub struct SystemHostTopology;

impl HostTopology for SystemHostTopology {
    fn is_path_on_device(&self, path: &str, device: &str) -> bool {
        // A full implementation resolves `path`'s backing device via
        // `stat`'s st_dev and cross-references it against `device`'s
        // major/minor. That resolution is the out-of-scope collaborator;
        // callers needing real behavior provide their own `HostTopology`.
        let _ = (path, device);
        false
    }
}
