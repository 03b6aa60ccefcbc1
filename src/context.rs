//! The per-evaluation function context threaded through every requirement
//! predicate: argv, the parsed configuration, the output image's file
//! descriptor, and the FAT-cache resolution capability.

use std::fs::File;

use crate::collaborators::{FatCache, FatCacheResolver, HostTopology};
use crate::config::MetaConfig;
use crate::error::Error;

/// The fixed small bound on requirement argument count.
pub const FUN_MAX_ARGS: usize = 4;

/// Stack-scoped per-evaluation context passed to every requirement
/// predicate's `validate`/`evaluate`.
pub struct FunContext<'a> {
    pub argc: usize,
    pub argv: [Option<String>; FUN_MAX_ARGS],
    pub config: &'a MetaConfig,
    pub output_file: Option<&'a File>,
    pub fat_cache: Option<&'a mut dyn FatCacheResolver>,
    pub host_topology: Option<&'a dyn HostTopology>,
}

impl<'a> FunContext<'a> {
    pub fn new(config: &'a MetaConfig) -> Self {
        FunContext {
            argc: 0,
            argv: Default::default(),
            config,
            output_file: None,
            fat_cache: None,
            host_topology: None,
        }
    }

    pub fn with_output_file(mut self, file: &'a File) -> Self {
        self.output_file = Some(file);
        self
    }

    pub fn with_fat_cache(mut self, resolver: &'a mut dyn FatCacheResolver) -> Self {
        self.fat_cache = Some(resolver);
        self
    }

    pub fn with_host_topology(mut self, topology: &'a dyn HostTopology) -> Self {
        self.host_topology = Some(topology);
        self
    }

    pub fn arg(&self, index: usize) -> &str {
        self.argv[index].as_deref().unwrap_or("")
    }

    /// Sets argc/argv for a single predicate invocation, clearing the
    /// remaining argv slots to avoid stale reads, mirroring the C
    /// original's defensive clear in `apply_reqlist`.
    pub fn set_args(&mut self, args: &[String]) -> Result<(), Error> {
        if args.is_empty() || args.len() > FUN_MAX_ARGS {
            return Err(Error::BadReqlistArity);
        }
        self.argc = args.len();
        for (i, slot) in self.argv.iter_mut().enumerate() {
            *slot = args.get(i).cloned();
        }
        Ok(())
    }

    pub fn resolve_fat_cache(&mut self, block_offset: u64) -> Result<Box<dyn FatCache>, Error> {
        let resolver = self.fat_cache.as_mut().ok_or(Error::MalformedReqlist)?;
        resolver.resolve(block_offset)
    }
}
