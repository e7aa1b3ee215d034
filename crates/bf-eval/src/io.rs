//! Byte stream capabilities injected into a run.
//!
//! The machine never touches process stdio; callers pass whatever source and
//! sink they want (`&[u8]` and `Vec<u8>` in tests, locked stdio in a front end).

use std::io::{self, Read, Write};

/// Source of input bytes for `,`.
pub trait ByteInput {
    /// The next byte, or `None` at end of input.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;
}

/// Sink for bytes written by `.`.
pub trait ByteOutput {
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ByteInput for &[u8] {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        match self.split_first() {
            Some((&byte, rest)) => {
                *self = rest;
                Ok(Some(byte))
            }
            None => Ok(None),
        }
    }
}

impl<T: ByteInput + ?Sized> ByteInput for &mut T {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        (**self).read_byte()
    }
}

impl<T: ByteInput + ?Sized> ByteInput for Box<T> {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        (**self).read_byte()
    }
}

impl ByteOutput for Vec<u8> {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.push(byte);
        Ok(())
    }
}

impl<T: ByteOutput + ?Sized> ByteOutput for &mut T {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        (**self).write_byte(byte)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

impl<T: ByteOutput + ?Sized> ByteOutput for Box<T> {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        (**self).write_byte(byte)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Adapts any [`Read`] into a [`ByteInput`], one byte per call.
#[derive(Debug)]
pub struct ReadInput<R>(pub R);

impl<R: Read> ByteInput for ReadInput<R> {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            match self.0.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Adapts any [`Write`] into a [`ByteOutput`].
#[derive(Debug)]
pub struct WriteOutput<W>(pub W);

impl<W: Write> ByteOutput for WriteOutput<W> {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.0.write_all(&[byte])
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_input_drains() {
        let mut input: &[u8] = b"ab";
        assert_eq!(input.read_byte().unwrap(), Some(b'a'));
        assert_eq!(input.read_byte().unwrap(), Some(b'b'));
        assert_eq!(input.read_byte().unwrap(), None);
        assert_eq!(input.read_byte().unwrap(), None);
    }

    #[test]
    fn test_read_adapter_reports_eof() {
        let mut input = ReadInput(io::Cursor::new(vec![7u8]));
        assert_eq!(input.read_byte().unwrap(), Some(7));
        assert_eq!(input.read_byte().unwrap(), None);
    }

    #[test]
    fn test_write_adapter_forwards() {
        let mut output = WriteOutput(Vec::new());
        output.write_byte(b'x').unwrap();
        output.flush().unwrap();
        assert_eq!(output.0, b"x");
    }
}
