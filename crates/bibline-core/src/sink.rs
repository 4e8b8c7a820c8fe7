//! Output sinks: atomic file output and JSON-lines batch writer

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Consumer side of a pipeline: receives converted records batch by batch.
pub trait BatchSink<T> {
    /// Write one batch of converted records, in order
    fn write_batch(&mut self, records: Vec<T>) -> io::Result<()>;

    /// Flush and finalize the output
    fn finish(self) -> io::Result<()>
    where
        Self: Sized;
}

/// Buffered file writer with atomic tmp→rename
pub struct OutputFile {
    writer: BufWriter<File>,
    tmp_path: PathBuf,
    final_path: PathBuf,
}

impl std::fmt::Debug for OutputFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputFile")
            .field("final_path", &self.final_path)
            .finish_non_exhaustive()
    }
}

impl OutputFile {
    /// Create `<path>.tmp`, replacing a stale one from an earlier run
    pub fn create(path: &Path) -> io::Result<Self> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp_path = PathBuf::from(tmp);

        if tmp_path.exists() {
            log::warn!("Removing stale tmp file: {}", tmp_path.display());
            fs::remove_file(&tmp_path)?;
        }
        let writer = BufWriter::new(File::create(&tmp_path)?);
        Ok(Self {
            writer,
            tmp_path,
            final_path: path.to_path_buf(),
        })
    }

    /// Flush and atomically rename tmp → final
    pub fn commit(mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        fs::rename(&self.tmp_path, &self.final_path)
    }
}

impl Write for OutputFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Where converted output goes: a file (committed on finish) or stdout
#[derive(Debug)]
pub enum Output {
    Stdout(BufWriter<io::Stdout>),
    File(OutputFile),
}

impl Output {
    /// `None` means stdout
    pub fn create(path: Option<&Path>) -> io::Result<Self> {
        match path {
            Some(path) => OutputFile::create(path).map(Self::File),
            None => Ok(Self::Stdout(BufWriter::new(io::stdout()))),
        }
    }

    pub fn commit(self) -> io::Result<()> {
        match self {
            Self::Stdout(mut w) => w.flush(),
            Self::File(f) => f.commit(),
        }
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stdout(w) => w.write(buf),
            Self::File(f) => f.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(f) => f.flush(),
        }
    }
}

/// Writes each record as one JSON line
pub struct JsonLinesSink<T> {
    out: Output,
    written: usize,
    _marker: PhantomData<fn(T)>,
}

impl<T> JsonLinesSink<T> {
    pub fn new(out: Output) -> Self {
        Self {
            out,
            written: 0,
            _marker: PhantomData,
        }
    }

    /// Records written so far
    pub fn written(&self) -> usize {
        self.written
    }
}

impl<T: Serialize> BatchSink<T> for JsonLinesSink<T> {
    fn write_batch(&mut self, records: Vec<T>) -> io::Result<()> {
        for record in &records {
            serde_json::to_writer(&mut self.out, record)?;
            self.out.write_all(b"\n")?;
        }
        self.written += records.len();
        Ok(())
    }

    fn finish(self) -> io::Result<()> {
        log::debug!("json sink: {} records", self.written);
        self.out.commit()
    }
}

/// Collects records in memory
impl<T> BatchSink<T> for &mut Vec<T> {
    fn write_batch(&mut self, mut records: Vec<T>) -> io::Result<()> {
        self.append(&mut records);
        Ok(())
    }

    fn finish(self) -> io::Result<()> {
        Ok(())
    }
}
