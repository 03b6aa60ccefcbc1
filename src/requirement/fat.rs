//! `require-fat-file-exists` and `require-fat-file-match`: inspect a FAT
//! filesystem cached from a block offset on the output image.

use crate::context::FunContext;
use crate::error::Error;

pub fn exists_validate(ctx: &FunContext) -> Result<(), Error> {
    if ctx.argc != 3 {
        return Err(Error::InvalidArgument {
            function: "require-fat-file-exists",
            expected: "a FAT FS block offset and a filename",
        });
    }
    ctx.arg(1).parse::<u64>().map_err(|_| Error::InvalidArgument {
        function: "require-fat-file-exists",
        expected: "a non-negative integer block offset",
    })?;
    Ok(())
}

pub fn exists_evaluate(ctx: &mut FunContext) -> Result<bool, Error> {
    // Belt-and-braces re-check preserved from the original: the validator
    // already enforces this, but the evaluator doesn't trust it blindly.
    if ctx.argc != 3 {
        return Ok(false);
    }
    let block_offset: u64 = ctx.arg(1).parse().map_err(|_| Error::InvalidArgument {
        function: "require-fat-file-exists",
        expected: "a non-negative integer block offset",
    })?;
    let name = ctx.arg(2).to_string();
    let cache = ctx.resolve_fat_cache(block_offset)?;
    Ok(cache.exists(&name))
}

pub fn match_validate(ctx: &FunContext) -> Result<(), Error> {
    if ctx.argc != 4 {
        return Err(Error::InvalidArgument {
            function: "require-fat-file-match",
            expected: "a FAT FS block offset, a filename, and a pattern",
        });
    }
    ctx.arg(1).parse::<u64>().map_err(|_| Error::InvalidArgument {
        function: "require-fat-file-match",
        expected: "a non-negative integer block offset",
    })?;
    Ok(())
}

pub fn match_evaluate(ctx: &mut FunContext) -> Result<bool, Error> {
    if ctx.argc != 4 {
        return Ok(false);
    }
    let block_offset: u64 = ctx.arg(1).parse().map_err(|_| Error::InvalidArgument {
        function: "require-fat-file-match",
        expected: "a non-negative integer block offset",
    })?;
    let name = ctx.arg(2).to_string();
    let pattern = ctx.arg(3).to_string();
    let cache = ctx.resolve_fat_cache(block_offset)?;
    Ok(cache.matches(&name, &pattern))
}
