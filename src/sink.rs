use parking_lot::Mutex;
use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Append-only output collaborator, safe for concurrent append from
/// multiple picker workers.
pub trait Sink<T>: Send + Sync {
    /// Append one item. An error here is fatal for the run: a silently
    /// dropped record would break exactly-once delivery.
    fn append(&self, item: T) -> io::Result<()>;

    /// Flush any buffered records. Called once after all pickers join.
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// In-memory sink collecting items for verification.
pub struct MemorySink<T> {
    items: Mutex<Vec<T>>,
}

impl<T> MemorySink<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    /// Number of records appended so far.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume the sink and return the collected items.
    pub fn into_items(self) -> Vec<T> {
        self.items.into_inner()
    }
}

impl<T: Clone> MemorySink<T> {
    /// Snapshot of the collected items.
    pub fn items(&self) -> Vec<T> {
        self.items.lock().clone()
    }
}

impl<T> Default for MemorySink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Sink<T> for MemorySink<T> {
    fn append(&self, item: T) -> io::Result<()> {
        self.items.lock().push(item);
        Ok(())
    }
}

/// File sink writing one record per line through a shared buffered
/// writer. Record order is whatever the pickers produce; only the
/// record count and multiset are meaningful.
pub struct LineSink {
    writer: Mutex<BufWriter<File>>,
}

impl LineSink {
    /// Create (truncating) the output file at `path`.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl<T: Display + Send> Sink<T> for LineSink {
    fn append(&self, item: T) -> io::Result<()> {
        let mut writer = self.writer.lock();
        writeln!(writer, "{item}")
    }

    fn flush(&self) -> io::Result<()> {
        self.writer.lock().flush()
    }
}
