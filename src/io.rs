//! I/O wrappers that drive a [`Bar`] from data transfer.
//!
//! [`ProgressReader`] and [`ProgressWriter`] wrap any [`std::io::Read`] or
//! [`std::io::Write`] and add every byte that passes through to their bar. The
//! overhead is a single atomic update per call. Useful for downloads, hashing
//! and (de)compression streams rendered by a [`Pool`](crate::Pool).

use std::io::{self, Read, Write};

use crate::Bar;

/// A wrapper around [`Read`] that advances a [`Bar`] by the bytes read.
///
/// Reaching end of input completes the bar, which matters for bars whose
/// total was never known.
#[derive(Debug)]
pub struct ProgressReader<R> {
    inner: R,
    bar: Bar,
}

impl<R> ProgressReader<R> {
    /// Wraps `inner`, reporting into `bar`.
    pub const fn new(inner: R, bar: Bar) -> Self {
        Self { inner, bar }
    }

    /// Unwraps the reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.bar.complete();
        } else {
            self.bar.inc(n as u64);
        }
        Ok(n)
    }
}

/// A wrapper around [`Write`] that advances a [`Bar`] by the bytes written.
#[derive(Debug)]
pub struct ProgressWriter<W> {
    inner: W,
    bar: Bar,
}

impl<W> ProgressWriter<W> {
    /// Wraps `inner`, reporting into `bar`.
    pub const fn new(inner: W, bar: Bar) -> Self {
        Self { inner, bar }
    }

    /// Unwraps the writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for ProgressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.bar.inc(n as u64);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read as _, Write as _};

    use super::{ProgressReader, ProgressWriter};
    use crate::Bar;

    /// Bytes read are counted; EOF completes a bar of unknown size.
    #[test]
    fn test_io_reader() {
        let data = vec![0u8; 100];
        let bar = Bar::new(0, "read", 0);
        let mut reader = ProgressReader::new(Cursor::new(&data), bar.clone());

        let mut buf = [0u8; 10];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(bar.get_current(), 10);
        assert!(!bar.is_complete());

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(bar.get_current(), 100);
        assert!(bar.is_complete());
    }

    /// Bytes written are counted and clamp at a known total.
    #[test]
    fn test_io_writer() {
        let bar = Bar::new(0, "write", 3);
        let mut writer = ProgressWriter::new(Vec::new(), bar.clone());

        writer.write_all(&[1, 2, 3, 4, 5]).unwrap();

        assert_eq!(bar.get_current(), 3);
        assert!(bar.is_complete());
        assert_eq!(writer.into_inner().len(), 5);
    }
}
