//! Serialized console sink shared by progress bars, styled output and logs
//!
//! Every line printed while a sweep runs goes through [`Console`]. A single
//! mutex guards the underlying writer and each write happens with the
//! progress bars suspended, so text never lands in the middle of a redraw
//! and concurrent lines never interleave.

use indicatif::{MultiProgress, ProgressDrawTarget};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing_subscriber::fmt::MakeWriter;

pub struct Console {
    multi: MultiProgress,
    sink: Mutex<Box<dyn Write + Send>>,
    draws_progress: AtomicBool,
}

impl Console {
    /// Console on stderr. Progress stays hidden until [`Console::enable_progress`].
    pub fn stderr() -> Self {
        Self {
            multi: MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
            sink: Mutex::new(Box::new(io::stderr())),
            draws_progress: AtomicBool::new(false),
        }
    }

    /// Console writing into memory with progress hidden; used by tests
    pub fn buffered() -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let console = Self {
            multi: MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
            sink: Mutex::new(Box::new(buffer.clone())),
            draws_progress: AtomicBool::new(false),
        };
        (console, buffer)
    }

    /// Start drawing progress on stderr if it is a terminal. Returns whether drawing is on.
    pub fn enable_progress(&self) -> bool {
        if !atty::is(atty::Stream::Stderr) {
            return false;
        }
        self.multi.set_draw_target(ProgressDrawTarget::stderr());
        self.draws_progress.store(true, Ordering::Release);
        true
    }

    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }

    pub fn draws_progress(&self) -> bool {
        self.draws_progress.load(Ordering::Acquire)
    }

    /// Write one line above the progress display
    pub fn println(&self, line: &str) {
        let mut record = Vec::with_capacity(line.len() + 1);
        record.extend_from_slice(line.as_bytes());
        record.push(b'\n');
        self.write_record(&record);
    }

    /// Write a pre-formatted record (already newline terminated) in one piece
    pub fn write_record(&self, record: &[u8]) {
        let mut sink = self.lock_sink();
        self.multi.suspend(|| {
            // Console output is best effort: a closed stderr must not fail a task
            let _ = sink.write_all(record);
            let _ = sink.flush();
        });
    }

    fn lock_sink(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        // A panic while holding the lock leaves the writer usable
        self.sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// In-memory writer for [`Console::buffered`]
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// `tracing_subscriber` writer that routes log records through a [`Console`]
#[derive(Clone)]
pub struct LogWriter {
    console: Arc<Console>,
}

impl LogWriter {
    pub fn new(console: Arc<Console>) -> Self {
        Self { console }
    }
}

impl<'a> MakeWriter<'a> for LogWriter {
    type Writer = LogRecord;

    fn make_writer(&'a self) -> Self::Writer {
        LogRecord {
            console: self.console.clone(),
            buffer: Vec::new(),
        }
    }
}

/// Buffers one formatted event and hands it to the console when dropped
pub struct LogRecord {
    console: Arc<Console>,
    buffer: Vec<u8>,
}

impl Write for LogRecord {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for LogRecord {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            self.console.write_record(&self.buffer);
        }
    }
}
