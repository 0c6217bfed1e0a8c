use crate::command::Streams;
use std::cell::RefCell;
use std::io::{self, Cursor, Read, Result as IoResult, Write};
use std::process::Stdio;
use std::rc::Rc;

/// Source of the standard streams each command starts from, before its own
/// redirections are applied.
pub trait Console {
    fn streams(&self) -> Streams;
}

/// The shell process' own stdin, stdout and stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct Terminal;

impl Console for Terminal {
    fn streams(&self) -> Streams {
        Streams {
            stdin: Box::new(InheritedStdin(io::stdin())),
            stdout: Box::new(io::stdout()),
            stderr: Box::new(io::stderr()),
        }
    }
}

/// Console that collects builtin output and diagnostics in memory.
///
/// External programs started without a redirection get a null stream, so only
/// in-process output ends up in the buffers.
#[derive(Debug, Clone, Default)]
pub struct Captured {
    out: Rc<RefCell<Vec<u8>>>,
    err: Rc<RefCell<Vec<u8>>>,
}

impl Captured {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written to stdout so far, lossily decoded.
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.out.borrow()).into_owned()
    }

    /// Everything written to stderr so far, lossily decoded.
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.err.borrow()).into_owned()
    }
}

impl Console for Captured {
    fn streams(&self) -> Streams {
        Streams {
            stdin: Box::new(MemReader::new(Vec::new())),
            stdout: Box::new(MemWriter::sharing(self.out.clone())),
            stderr: Box::new(MemWriter::sharing(self.err.clone())),
        }
    }
}

struct InheritedStdin(io::Stdin);

impl Read for InheritedStdin {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        self.0.read(buf)
    }
}

impl crate::command::Stdin for InheritedStdin {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::inherit()
    }
}

/// Memory-backed reader for builtins.
pub struct MemReader {
    cursor: Cursor<Vec<u8>>,
}

impl MemReader {
    /// Create a MemReader that will read from the provided buffer.
    pub fn new(buf: Vec<u8>) -> Self {
        Self {
            cursor: Cursor::new(buf),
        }
    }
}

impl Read for MemReader {
    fn read(&mut self, out: &mut [u8]) -> IoResult<usize> {
        self.cursor.read(out)
    }
}

impl crate::command::Stdin for MemReader {
    /// For in-memory reader return Stdio::null() because this adapter is used
    /// only for builtin commands executed in-process.
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::null()
    }
}

/// Memory-backed writer for capturing output of builtins.
pub struct MemWriter {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl MemWriter {
    pub fn new() -> Self {
        Self::sharing(Rc::new(RefCell::new(Vec::new())))
    }

    /// Writer appending to an existing shared buffer.
    pub fn sharing(buf: Rc<RefCell<Vec<u8>>>) -> Self {
        Self { buf }
    }
}

impl Default for MemWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

impl crate::command::Stdout for MemWriter {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::null()
    }

    fn try_clone(&self) -> IoResult<Box<dyn crate::command::Stdout>> {
        Ok(Box::new(MemWriter::sharing(self.buf.clone())))
    }
}
