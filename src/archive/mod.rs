//! Streaming file hashing, metadata synthesis, and deterministic archive
//! assembly: walks file-resource declarations, hashes their contents, and
//! emits a signed, deflate-compressed ZIP firmware archive.

pub mod hash;

use std::io::Write;
use std::path::Path;

use ed25519_dalek::{Signer as _, SigningKey};
use snafu::ResultExt;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::MetaConfig;
use crate::context::FunContext;
use crate::error::{self, Error, Result};
use crate::progress::{Progress, ProgressMode};
use crate::requirement;

use hash::{hash_file, HashCapability, StreamingHash};

const META_CONF_ENTRY: &str = "meta.conf";
const META_CONF_SIG_ENTRY: &str = "meta.conf.sig";

/// For each `file-resource`, streams its `host-path` files through a dual
/// hash and writes `length`/`sha256`/`blake2b-256` back into the config.
pub fn compute_file_metadata(config: &mut MetaConfig, capability: HashCapability) -> Result<()> {
    for section in &mut config.file_resources {
        if section.host_path.is_empty() {
            return Err(Error::MissingHostPath { title: section.title.clone() });
        }

        let mut hash = StreamingHash::new(capability);
        for path in section.host_paths() {
            hash_file(&mut hash, Path::new(path)).map_err(|source| Error::CantOpenResourcePath {
                title: section.title.clone(),
                path: path.to_string(),
                source,
            })?;
        }

        let output = hash.finalize();
        section.length = Some(output.length);
        section.sha256 = Some(output.sha256_hex);
        section.blake2b_256 = output.blake2b_256_hex;
    }
    Ok(())
}

/// Checks every task's reqlist for syntactic well-formedness - known
/// predicate names, correct arity - without touching a target device. Called
/// at creation time so a malformed reqlist aborts packaging instead of
/// surfacing only when the archive is later applied.
fn validate_tasks(config: &MetaConfig) -> Result<()> {
    for task in &config.tasks {
        let mut ctx = FunContext::new(config);
        requirement::apply_reqlist(&mut ctx, &task.reqlist, |ctx| requirement::validate(ctx).map(|_| true))?;
    }
    Ok(())
}

fn check_size_assertions(title: &str, actual: u64, lte: Option<u64>, gte: Option<u64>) -> Result<()> {
    if let Some(limit) = lte {
        let limit = limit * 512;
        if actual > limit {
            return Err(Error::SizeAssertionExceeded { title: title.to_string(), actual, limit });
        }
    }
    if let Some(limit) = gte {
        let limit = limit * 512;
        if actual < limit {
            return Err(Error::SizeAssertionUnmet { title: title.to_string(), actual, limit });
        }
    }
    Ok(())
}

fn zip_options() -> SimpleFileOptions {
    // Setting the compression level is best-effort for backward
    // compatibility with older container libraries; on the modern `zip`
    // crate the builder itself can't fail, so there's nothing to ignore.
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9))
}

fn write_meta_config<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    config: &MetaConfig,
    signing_key: Option<&SigningKey>,
) -> Result<()> {
    let serialized = serde_json::to_vec_pretty(config).expect("MetaConfig always serializes");

    zip.start_file(META_CONF_ENTRY, zip_options())?;
    zip.write_all(&serialized).context(error::IoSnafu)?;

    if let Some(key) = signing_key {
        let signature = key.sign(&serialized);
        zip.start_file(META_CONF_SIG_ENTRY, zip_options())?;
        zip.write_all(&signature.to_bytes()).context(error::IoSnafu)?;
    }

    Ok(())
}

fn add_file_resources<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    config: &MetaConfig,
    progress: &mut Progress,
) -> Result<()> {
    for section in &config.file_resources {
        if section.host_path.is_empty() {
            return Err(Error::MissingHostPath { title: section.title.clone() });
        }

        zip.start_file(&section.title, zip_options())?;
        let mut total = 0u64;
        for path in section.host_paths() {
            let bytes = std::fs::read(path).map_err(|source| Error::CantOpenResourcePath {
                title: section.title.clone(),
                path: path.to_string(),
                source,
            })?;
            total += bytes.len() as u64;
            zip.write_all(&bytes).context(error::IoSnafu)?;
        }

        check_size_assertions(&section.title, total, section.assert_size_lte, section.assert_size_gte)?;
        progress.report(1);
    }
    Ok(())
}

/// Produces a deflate-compressed ZIP container at `output_path` whose first
/// entry is the (optionally signed) meta-config and whose remaining entries
/// are the file resources, in configuration order.
pub fn create(
    config: &mut MetaConfig,
    output_path: &Path,
    signing_key: Option<&SigningKey>,
    capability: HashCapability,
    progress_mode: ProgressMode,
) -> Result<()> {
    config.meta_creation_date = Some(chrono::Utc::now().to_rfc3339());
    config.meta_fwup_version = Some(env!("CARGO_PKG_VERSION").to_string());

    validate_tasks(config).map_err(error::record)?;

    let resource_count = config.file_resources.len() as u64;
    let mut progress = Progress::init(progress_mode, resource_count * 2 + 1, None);

    compute_file_metadata(config, capability).map_err(error::record)?;
    for _ in &config.file_resources {
        progress.report(1);
    }

    let file = std::fs::File::create(output_path).map_err(Error::from).map_err(error::record)?;
    let mut zip = ZipWriter::new(file);

    let result = (|| -> Result<()> {
        write_meta_config(&mut zip, config, signing_key)?;
        progress.report(1);
        add_file_resources(&mut zip, config, &mut progress)?;
        Ok(())
    })();

    // Both success and failure paths must close and release the archive
    // writer.
    let finish_result = zip.finish().map_err(Error::from);

    result.map_err(error::record)?;
    finish_result.map_err(error::record)?;

    progress.complete();
    Ok(())
}
