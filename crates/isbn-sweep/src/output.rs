//! Buffered, gzip-compressed, newline-delimited identifier output.
//!
//! Accepted identifiers are collected in memory and written to the encoder in
//! one bulk write once `flush_threshold` of them are buffered. [`finish`]
//! drains the buffer and closes the gzip stream. If a writer is dropped
//! without `finish` (an early return on error, a panic unwinding), `Drop`
//! still writes out the buffer and lets the encoder emit its trailer.
//!
//! [`finish`]: OutputWriter::finish

use crate::{ISBN_LEN, Isbn13};
use flate2::{Compression, write::GzEncoder};
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

/// Default gzip level.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 5;

const LINE_LEN: usize = ISBN_LEN + 1;

pub struct OutputWriter<W: Write> {
    encoder: Option<GzEncoder<W>>,
    buffer: Vec<u8>,
    buffered: usize,
    flush_threshold: usize,
    written: u64,
}

impl OutputWriter<BufWriter<File>> {
    /// Creates (or truncates) `path` and wraps it in a writer.
    pub fn create(path: impl AsRef<Path>, level: u32, flush_threshold: usize) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), level, flush_threshold))
    }
}

impl<W: Write> OutputWriter<W> {
    /// Wraps `sink`. A `flush_threshold` of zero behaves like one.
    pub fn new(sink: W, level: u32, flush_threshold: usize) -> Self {
        let flush_threshold = flush_threshold.max(1);
        Self {
            encoder: Some(GzEncoder::new(sink, Compression::new(level))),
            buffer: Vec::with_capacity(flush_threshold.saturating_mul(LINE_LEN).min(1 << 24)),
            buffered: 0,
            flush_threshold,
            written: 0,
        }
    }

    /// Buffers one identifier, flushing if the threshold is reached.
    #[inline]
    pub fn push(&mut self, isbn: &Isbn13) -> io::Result<()> {
        self.buffer.extend_from_slice(isbn.as_bytes());
        self.buffer.push(b'\n');
        self.buffered += 1;
        if self.buffered >= self.flush_threshold {
            self.flush_buffer()?;
        }
        Ok(())
    }

    /// Writes every buffered identifier to the encoder in a single write.
    pub fn flush_buffer(&mut self) -> io::Result<()> {
        if self.buffered == 0 {
            return Ok(());
        }
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| io::Error::other("output writer already finished"))?;
        encoder.write_all(&self.buffer)?;

        #[cfg(feature = "tracing")]
        tracing::trace!(count = self.buffered, "Flushed buffered identifiers");

        self.written += self.buffered as u64;
        self.buffer.clear();
        self.buffered = 0;
        Ok(())
    }

    /// Identifiers waiting in memory.
    pub const fn buffered(&self) -> usize {
        self.buffered
    }

    /// Identifiers already handed to the encoder.
    pub const fn written(&self) -> u64 {
        self.written
    }

    /// Drains the buffer, writes the gzip trailer and flushes the sink.
    ///
    /// Returns the sink so callers can inspect or sync it.
    pub fn finish(mut self) -> io::Result<W> {
        self.flush_buffer()?;
        let encoder = self
            .encoder
            .take()
            .ok_or_else(|| io::Error::other("output writer already finished"))?;
        let mut sink = encoder.finish()?;
        sink.flush()?;
        Ok(sink)
    }
}

impl<W: Write> Drop for OutputWriter<W> {
    fn drop(&mut self) {
        if self.encoder.is_none() {
            return;
        }
        if let Err(_e) = self.flush_buffer() {
            #[cfg(feature = "tracing")]
            tracing::error!(
                lost = self.buffered,
                "Failed to drain output buffer on drop: {_e}"
            );
        }
        // Dropping the encoder writes the gzip trailer on a best-effort basis.
        if let Some(mut encoder) = self.encoder.take() {
            if let Err(_e) = encoder.try_finish() {
                #[cfg(feature = "tracing")]
                tracing::error!("Failed to close gzip stream on drop: {_e}");
            }
        }
    }
}
