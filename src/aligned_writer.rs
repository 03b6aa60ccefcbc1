//! A coalescing write buffer that upgrades arbitrary `(offset, length)`
//! writes into block-aligned, block-multiple I/O against raw devices that
//! do not buffer.
//!
//! Raw block devices (eMMC, SD cards accessed directly) require aligned,
//! block-multiple writes to hit their rated throughput; unaligned writes
//! degrade badly. [`AlignedWriter`] holds at most one pending block at a
//! time and flushes it whenever a write can't extend it. Starting a fresh
//! buffer mid-block reads the block back first, so a flush never emits
//! bytes the caller never supplied.

use std::fs::File;
use std::os::unix::fs::FileExt;

use snafu::ResultExt;

use crate::error::{self, Error, Result};

/// Binds a [`File`] to a fixed power-of-two block size and coalesces writes
/// against it into aligned, block-multiple `pwrite`s.
pub struct AlignedWriter<'f> {
    file: &'f File,
    block_size: u64,
    mask: u64,
    buffer: Box<[u8]>,
    buffer_offset: u64,
    buffer_count: usize,
}

impl<'f> AlignedWriter<'f> {
    /// Binds to `file`, allocating a single block-sized bounce buffer.
    ///
    /// `log2_block_size` is `log2(block_size)`; e.g. 9 for 512-byte blocks,
    /// 12 for 4096-byte blocks.
    pub fn init(file: &'f File, log2_block_size: u32) -> Result<Self> {
        let block_size = 1u64 << log2_block_size;
        Ok(AlignedWriter {
            file,
            block_size,
            mask: block_size - 1,
            buffer: vec![0u8; block_size as usize].into_boxed_slice(),
            buffer_offset: 0,
            buffer_count: 0,
        })
    }

    fn block(&self, offset: u64) -> u64 {
        offset & !self.mask
    }

    /// Fills the bounce buffer with the current on-device contents of the
    /// block starting at `block_start`, so a partial-block write merges with
    /// what's already there instead of clobbering it with whatever the
    /// buffer happened to hold. A device too short to hold this block yet
    /// (e.g. a sparse file under test) reads back as zero, not an error.
    fn load_block(&mut self, block_start: u64) -> Result<()> {
        match self.file.read_exact_at(&mut self.buffer[..], block_start) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.buffer.fill(0);
                Ok(())
            }
            Err(err) => Err(err).context(error::IoSnafu),
        }
    }

    /// Writes `buf` at absolute `offset`. Does not advance a cursor; callers
    /// supply offsets for every call. May coalesce or defer the write into
    /// the bounce buffer.
    pub fn pwrite(&mut self, buf: &[u8], offset: u64) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        // Anything other than a contiguous append flushes the pending
        // block first: a gap or a jump to another block both invalidate
        // treating the buffer as still growing.
        if self.buffer_count > 0 && offset != self.buffer_offset + self.buffer_count as u64 {
            self.flush_buffer()?;
        }

        // Contiguous append within the same block.
        if self.buffer_count > 0 && offset == self.buffer_offset + self.buffer_count as u64 {
            let space = self.block_size as usize - self.buffer_count;
            let take = space.min(buf.len());
            self.buffer[self.buffer_count..self.buffer_count + take]
                .copy_from_slice(&buf[..take]);
            self.buffer_count += take;

            if self.buffer_count == self.block_size as usize {
                self.flush_buffer()?;
            }

            if take < buf.len() {
                let wrote = self.pwrite(&buf[take..], offset + take as u64)?;
                return Ok(take + wrote);
            }
            return Ok(take);
        }

        debug_assert_eq!(self.buffer_count, 0);

        let aligned = offset & self.mask == 0;
        if aligned && buf.len() as u64 >= self.block_size {
            let whole_len = (buf.len() as u64 & !self.mask) as usize;
            self.write_direct(&buf[..whole_len], offset)?;

            let tail = &buf[whole_len..];
            if !tail.is_empty() {
                self.buffer_offset = self.block(offset + whole_len as u64);
                self.buffer[..tail.len()].copy_from_slice(tail);
                self.buffer_count = tail.len();
            }
            return Ok(buf.len());
        }

        // Head is short of a block boundary (or the whole write is shorter
        // than one block): buffer it, splitting across the rest of this
        // block if it overruns.
        let block_start = self.block(offset);
        let offset_in_block = (offset - block_start) as usize;
        let space = self.block_size as usize - offset_in_block;
        let take = space.min(buf.len());

        // The bytes before `offset_in_block` in this block are not part of
        // this write. Read them back from the device rather than flushing
        // whatever stale bytes the reused buffer holds.
        if offset_in_block > 0 {
            self.load_block(block_start)?;
        }

        self.buffer_offset = block_start;
        self.buffer[offset_in_block..offset_in_block + take].copy_from_slice(&buf[..take]);
        self.buffer_count = offset_in_block + take;

        if self.buffer_count == self.block_size as usize {
            self.flush_buffer()?;
        }

        if take < buf.len() {
            let wrote = self.pwrite(&buf[take..], offset + take as u64)?;
            return Ok(take + wrote);
        }
        Ok(take)
    }

    fn write_direct(&self, buf: &[u8], offset: u64) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        self.file.write_all_at(buf, offset).context(error::IoSnafu)
    }

    fn flush_buffer(&mut self) -> Result<()> {
        if self.buffer_count == 0 {
            return Ok(());
        }
        let wrote = self
            .file
            .write_at(&self.buffer[..self.buffer_count], self.buffer_offset)
            .context(error::IoSnafu)?;
        if wrote != self.buffer_count {
            return Err(Error::ShortWrite { wrote, expected: self.buffer_count });
        }
        self.buffer_count = 0;
        Ok(())
    }

    /// Flushes the pending block. Returns an error if the final flush wrote
    /// fewer bytes than buffered.
    pub fn free(mut self) -> Result<()> {
        self.flush_buffer()
    }
}

impl Drop for AlignedWriter<'_> {
    fn drop(&mut self) {
        if self.buffer_count > 0 {
            if let Err(err) = self.flush_buffer() {
                tracing::warn!(error = %err, "aligned writer dropped with a pending block that failed to flush");
            }
        }
    }
}
