//! `require-partition-offset`: the MBR partition at the given index starts
//! at the given block offset.

use std::os::unix::fs::FileExt;

use crate::context::FunContext;
use crate::error::Error;
use crate::mbr;

pub fn validate(ctx: &FunContext) -> Result<(), Error> {
    if ctx.argc != 3 {
        return Err(Error::InvalidArgument {
            function: "require-partition-offset",
            expected: "a partition number and a block offset",
        });
    }

    let partition: i64 = ctx.arg(1).parse().map_err(|_| Error::InvalidArgument {
        function: "require-partition-offset",
        expected: "the partition number to be between 0, 1, 2, or 3",
    })?;
    if !(0..=3).contains(&partition) {
        return Err(Error::InvalidArgument {
            function: "require-partition-offset",
            expected: "the partition number to be between 0, 1, 2, or 3",
        });
    }

    ctx.arg(2).parse::<u64>().map_err(|_| Error::InvalidArgument {
        function: "require-partition-offset",
        expected: "a non-negative integer block offset",
    })?;

    Ok(())
}

pub fn evaluate(ctx: &mut FunContext) -> Result<bool, Error> {
    let partition: usize = ctx.arg(1).parse().map_err(|_| Error::InvalidArgument {
        function: "require-partition-offset",
        expected: "the partition number to be between 0, 1, 2, or 3",
    })?;
    let expected_offset: u64 = ctx.arg(2).parse().map_err(|_| Error::InvalidArgument {
        function: "require-partition-offset",
        expected: "a non-negative integer block offset",
    })?;

    let output = match ctx.output_file {
        Some(f) => f,
        None => return Ok(false),
    };

    let mut sector = [0u8; 512];
    if output.read_exact_at(&mut sector, 0).is_err() {
        // Not seekable, or too short: the constraint can't be met either way.
        return Ok(false);
    }

    let partitions = match mbr::decode(&sector) {
        Some(p) => p,
        None => return Ok(false),
    };

    Ok(partitions[partition].block_offset as u64 == expected_offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetaConfig;
    use tempfile::tempfile;

    fn image_with_partition(index: usize, lba_start: u32) -> std::fs::File {
        let file = tempfile().unwrap();
        let mut sector = [0u8; 512];
        let entry_offset = 0x1BE + index * 16;
        sector[entry_offset + 8..entry_offset + 12].copy_from_slice(&lba_start.to_le_bytes());
        sector[510..512].copy_from_slice(&[0x55, 0xAA]);
        file.write_all_at(&sector, 0).unwrap();
        file
    }

    #[test]
    fn req1_met_when_offset_matches() {
        let config = MetaConfig::default();
        let file = image_with_partition(1, 63);
        let mut ctx = FunContext::new(&config).with_output_file(&file);
        ctx.set_args(&["require-partition-offset".into(), "1".into(), "63".into()]).unwrap();
        assert_eq!(evaluate(&mut ctx).unwrap(), true);
    }

    #[test]
    fn req1_not_met_when_offset_differs() {
        let config = MetaConfig::default();
        let file = image_with_partition(1, 64);
        let mut ctx = FunContext::new(&config).with_output_file(&file);
        ctx.set_args(&["require-partition-offset".into(), "1".into(), "63".into()]).unwrap();
        assert_eq!(evaluate(&mut ctx).unwrap(), false);
    }

    #[test]
    fn validate_rejects_out_of_range_partition() {
        let config = MetaConfig::default();
        let mut ctx = FunContext::new(&config);
        ctx.set_args(&["require-partition-offset".into(), "4".into(), "0".into()]).unwrap();
        assert!(validate(&ctx).is_err());
    }
}
