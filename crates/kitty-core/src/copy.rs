//! Chunked stream copy with a reusable buffer.
//!
//! Staging and publishing move every byte through [`copy_stream`], which
//! reads fixed-size chunks into one buffer allocated per operation rather
//! than per file.

use std::io;
use std::io::Read;
use std::io::Write;

/// Default chunk size for staging and publishing copies (256 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Heap buffer reused across every copy of one operation.
///
/// # Examples
///
/// ```
/// use kitty_core::copy::CopyBuffer;
/// use kitty_core::copy::copy_stream;
///
/// let mut buffer = CopyBuffer::with_size(4);
/// let mut output = Vec::new();
/// let copied = copy_stream(&mut &b"hello world"[..], &mut output, &mut buffer)?;
///
/// assert_eq!(copied, 11);
/// assert_eq!(output, b"hello world");
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct CopyBuffer {
    buf: Vec<u8>,
}

impl CopyBuffer {
    /// Creates a buffer of [`DEFAULT_CHUNK_SIZE`] bytes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_size(DEFAULT_CHUNK_SIZE)
    }

    /// Creates a buffer of `size` bytes (at least one).
    #[must_use]
    pub fn with_size(size: usize) -> Self {
        Self {
            buf: vec![0u8; size.max(1)],
        }
    }

    /// Returns the chunk size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.buf.len()
    }
}

impl Default for CopyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies `reader` into `writer` chunk by chunk and flushes the writer.
///
/// Interrupted reads are retried; any other error aborts the copy.
pub fn copy_stream<R, W>(reader: &mut R, writer: &mut W, buffer: &mut CopyBuffer) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut total: u64 = 0;

    loop {
        let bytes_read = match reader.read(&mut buffer.buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        writer.write_all(&buffer.buf[..bytes_read])?;
        total = total.saturating_add(bytes_read as u64);
    }

    writer.flush()?;
    Ok(total)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Error;
    use std::io::ErrorKind;

    #[test]
    fn test_default_chunk_size() {
        assert_eq!(CopyBuffer::new().size(), 256 * 1024);
        assert_eq!(CopyBuffer::with_size(0).size(), 1);
    }

    #[test]
    fn test_copy_empty_source() {
        let mut buffer = CopyBuffer::new();
        let mut output = Vec::new();
        let copied = copy_stream(&mut Cursor::new(Vec::new()), &mut output, &mut buffer).unwrap();
        assert_eq!(copied, 0);
        assert!(output.is_empty());
    }

    #[test]
    fn test_copy_multiple_chunks() {
        let mut buffer = CopyBuffer::with_size(1000);
        let input = vec![0x55u8; 3 * 1000 + 17];
        let mut output = Vec::new();
        let copied = copy_stream(&mut Cursor::new(&input), &mut output, &mut buffer).unwrap();
        assert_eq!(copied, input.len() as u64);
        assert_eq!(output, input);
    }

    #[test]
    fn test_copy_retries_interrupted_reads() {
        struct Flaky {
            data: Cursor<Vec<u8>>,
            calls: usize,
        }

        impl Read for Flaky {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                self.calls += 1;
                if self.calls % 2 == 1 {
                    return Err(Error::new(ErrorKind::Interrupted, "interrupted"));
                }
                self.data.read(buf)
            }
        }

        let mut reader = Flaky {
            data: Cursor::new(vec![7u8; 100]),
            calls: 0,
        };
        let mut output = Vec::new();
        let copied = copy_stream(&mut reader, &mut output, &mut CopyBuffer::with_size(16)).unwrap();
        assert_eq!(copied, 100);
    }

    #[test]
    fn test_copy_propagates_read_failure() {
        struct Broken;

        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(Error::other("device gone"))
            }
        }

        let mut output = Vec::new();
        let err = copy_stream(&mut Broken, &mut output, &mut CopyBuffer::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }
}
