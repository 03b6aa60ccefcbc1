//! The on-target application loop: reads a signed archive, gates each task
//! on its reqlist against the device currently being written, and streams
//! the admitted tasks' file-resources through the aligned writer.

use std::fs::{File, OpenOptions};
use std::io::Read;
use std::path::Path;

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use snafu::ResultExt;

use crate::aligned_writer::AlignedWriter;
use crate::config::MetaConfig;
use crate::context::FunContext;
use crate::error::{self, Error, Result};
use crate::progress::{Progress, ProgressMode};
use crate::requirement;

const META_CONF_ENTRY: &str = "meta.conf";
const META_CONF_SIG_ENTRY: &str = "meta.conf.sig";

fn read_entry(archive: &mut zip::ZipArchive<File>, name: &str) -> Result<Vec<u8>> {
    let mut entry = archive.by_name(name).map_err(Error::from)?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes).context(error::IoSnafu)?;
    Ok(bytes)
}

/// Opens `archive_path`, optionally checks `meta.conf` against `meta.conf.sig`
/// using `verifying_key`, and returns the parsed configuration.
///
/// When `verifying_key` is `Some` but the archive carries no signature entry,
/// or the signature doesn't verify, this fails closed. When `verifying_key`
/// is `None` the archive is trusted unconditionally - the caller made that
/// choice, typically for local development builds.
pub fn verify(archive_path: &Path, verifying_key: Option<&VerifyingKey>) -> Result<MetaConfig> {
    let file = File::open(archive_path).map_err(Error::from)?;
    let mut archive = zip::ZipArchive::new(file).map_err(Error::from)?;

    let meta_bytes = read_entry(&mut archive, META_CONF_ENTRY)?;

    if let Some(key) = verifying_key {
        let sig_bytes = read_entry(&mut archive, META_CONF_SIG_ENTRY)?;
        let sig_array: [u8; 64] = sig_bytes.as_slice().try_into().map_err(|_| Error::MalformedSignature)?;
        let signature = Signature::from_bytes(&sig_array);
        key.verify(&meta_bytes, &signature)
            .context(error::BadSigningKeySnafu)?;
    }

    serde_json::from_slice(&meta_bytes).context(error::ConfigParseSnafu)
}

/// Applies `archive_path` to `device_path`: for each task, evaluates its
/// reqlist against the device and, if met, streams the referenced
/// file-resource's bytes to `target_block_offset * 512` via the aligned
/// writer.
pub fn apply(
    archive_path: &Path,
    device_path: &Path,
    verifying_key: Option<&VerifyingKey>,
    progress_mode: ProgressMode,
) -> Result<()> {
    let config = verify(archive_path, verifying_key).map_err(error::record)?;

    let archive_file = File::open(archive_path).map_err(Error::from).map_err(error::record)?;
    let mut archive = zip::ZipArchive::new(archive_file).map_err(Error::from).map_err(error::record)?;

    let device_file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(device_path)
        .map_err(Error::from)
        .map_err(error::record)?;

    let mut writer = AlignedWriter::init(&device_file, config.log2_block_size()).map_err(error::record)?;
    let mut progress = Progress::init(progress_mode, config.tasks.len() as u64, None);

    let result = (|| -> Result<()> {
        for task in &config.tasks {
            let mut ctx = FunContext::new(&config).with_output_file(&device_file);
            let met = requirement::apply_reqlist(&mut ctx, &task.reqlist, requirement::evaluate)?;
            if !met {
                progress.report(1);
                continue;
            }

            let resource = config
                .find_file_resource(&task.file_resource)
                .ok_or_else(|| Error::MissingHostPath { title: task.file_resource.clone() })?;

            let bytes = read_entry(&mut archive, &resource.title)?;
            writer.pwrite(&bytes, task.target_block_offset * 512)?;
            progress.report(1);
        }
        Ok(())
    })();

    let free_result = writer.free();

    result.map_err(error::record)?;
    free_result.map_err(error::record)?;

    progress.complete();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive;
    use crate::archive::hash::HashCapability;
    use crate::config::{FileResource, Task};
    use ed25519_dalek::SigningKey;
    use rand_core::OsRng;
    use std::io::Write as _;
    use tempfile::{tempdir, NamedTempFile};

    fn sample_config(resource_path: &Path) -> MetaConfig {
        let mut config = MetaConfig::default();
        config.file_resources.push(FileResource {
            title: "rootfs".into(),
            host_path: resource_path.to_str().unwrap().to_string(),
            assert_size_lte: None,
            assert_size_gte: None,
            length: None,
            sha256: None,
            blake2b_256: None,
        });
        config.tasks.push(Task {
            file_resource: "rootfs".into(),
            target_block_offset: 2,
            reqlist: Default::default(),
        });
        config
    }

    #[test]
    fn apply1_unconditional_task_writes_resource_at_offset() {
        let mut payload = NamedTempFile::new().unwrap();
        write!(payload, "IMAGEDATA").unwrap();

        let mut config = sample_config(payload.path());
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("out.fw");
        archive::create(&mut config, &archive_path, None, HashCapability { blake2b: false }, ProgressMode::Off)
            .unwrap();

        let device_path = dir.path().join("device.img");
        std::fs::write(&device_path, vec![0u8; 4096]).unwrap();

        apply(&archive_path, &device_path, None, ProgressMode::Off).unwrap();

        let image = std::fs::read(&device_path).unwrap();
        assert_eq!(&image[1024..1024 + 9], b"IMAGEDATA");
    }

    #[test]
    fn verify_rejects_tampered_archive_with_signature() {
        let mut payload = NamedTempFile::new().unwrap();
        write!(payload, "IMAGEDATA").unwrap();

        let mut config = sample_config(payload.path());
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("out.fw");

        let signing_key = SigningKey::generate(&mut OsRng);
        archive::create(
            &mut config,
            &archive_path,
            Some(&signing_key),
            HashCapability { blake2b: false },
            ProgressMode::Off,
        )
        .unwrap();

        let verifying_key = signing_key.verifying_key();
        assert!(verify(&archive_path, Some(&verifying_key)).is_ok());

        let wrong_key = SigningKey::generate(&mut OsRng).verifying_key();
        assert!(verify(&archive_path, Some(&wrong_key)).is_err());
    }
}
