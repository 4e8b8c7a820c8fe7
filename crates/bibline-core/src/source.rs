//! Byte sources: local files, stdin and HTTP downloads.
//!
//! Content is sniffed by magic bytes. Zip archives yield all members
//! concatenated in archive order, gzip streams are decompressed, anything
//! else passes through untouched. Downloads are spooled into an anonymous
//! temporary file first, since zip needs random access.
//!
//! HTTP uses async reqwest internally with tokio::time::timeout for stall
//! detection, but presents a sync interface to the decoder thread.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, OnceLock};
use std::task::Context;
use std::time::Duration;

use flate2::read::{DeflateDecoder, MultiGzDecoder};
use futures_util::StreamExt;
use tokio::io::{AsyncRead, ReadBuf};
use zip::{CompressionMethod, ZipArchive};

use crate::error::StreamError;
use crate::retry::retry_with_backoff;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Buffer size for source readers (256KB)
const SOURCE_BUF_SIZE: usize = 256 * 1024;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];

/// HTTP behaviour shared by all downloads of a process.
#[derive(Debug, Clone, Copy)]
pub struct HttpConfig {
    /// No data for this long counts as a stall
    pub read_timeout: Duration,
    /// Retry attempts for transient failures
    pub max_retries: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

static HTTP_CONFIG: OnceLock<HttpConfig> = OnceLock::new();

/// Install the process-wide HTTP config. Only the first call takes effect.
pub fn set_http_config(config: HttpConfig) {
    if HTTP_CONFIG.set(config).is_err() {
        log::debug!("HTTP config already set, ignoring");
    }
}

/// Current HTTP config (defaults unless [`set_http_config`] was called).
pub fn http_config() -> HttpConfig {
    HTTP_CONFIG.get().copied().unwrap_or_default()
}

/// Shared async HTTP client with connection pooling.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_max_idle_per_host(4)
        .build()
        .expect("failed to build HTTP client")
});

/// Shared tokio runtime for HTTP operations.
static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Where the bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Stdin,
    File(PathBuf),
    Url(String),
}

impl Source {
    /// `-` is stdin, `http://` and `https://` are URLs, everything else a path.
    pub fn parse(s: &str) -> Self {
        if s == "-" {
            Self::Stdin
        } else if s.starts_with("http://") || s.starts_with("https://") {
            Self::Url(s.to_string())
        } else {
            Self::File(PathBuf::from(s))
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdin => write!(f, "<stdin>"),
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

/// Shared byte counter for progress tracking
pub type ByteCounter = Arc<AtomicU64>;

/// Buffered, decompressed byte stream ready for a decoder.
pub type SourceReader = Box<dyn BufRead + Send>;

/// An opened source with its progress counter.
pub struct OpenedSource {
    pub reader: SourceReader,
    /// Bytes consumed from the underlying file or stream
    pub counter: ByteCounter,
    /// Size of the underlying file, when known
    pub total_bytes: Option<u64>,
}

impl std::fmt::Debug for OpenedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedSource")
            .field("counter", &self.counter.load(Ordering::Relaxed))
            .field("total_bytes", &self.total_bytes)
            .finish_non_exhaustive()
    }
}

/// Open a source for decoding.
pub fn open_source(source: &Source) -> Result<OpenedSource, StreamError> {
    match source {
        Source::File(path) => open_file(path),
        Source::Stdin => {
            let stdin = BufReader::with_capacity(SOURCE_BUF_SIZE, io::stdin());
            open_stream(stdin, None)
        }
        Source::Url(url) => {
            let label = url.rsplit('/').next().unwrap_or(url.as_str()).to_string();
            let file = retry_with_backoff(&label, http_config().max_retries, || {
                download_to_tempfile(url)
            })?;
            open_seekable(file)
        }
    }
}

fn open_file(path: &Path) -> Result<OpenedSource, StreamError> {
    let file = File::open(path)?;
    open_seekable(file)
}

/// Open a seekable file, sniffing zip / gzip / plain.
fn open_seekable(mut file: File) -> Result<OpenedSource, StreamError> {
    let total_bytes = file.metadata().ok().map(|m| m.len());
    let mut magic = [0u8; 4];
    let n = read_prefix(&mut file, &mut magic)?;
    file.seek(SeekFrom::Start(0))?;

    if magic[..n].starts_with(ZIP_MAGIC) {
        let members = ZipMembers::new(file)?;
        return Ok(counted(members, None));
    }
    let counter = ByteCounter::default();
    let raw = CountingReader {
        inner: file,
        count: counter.clone(),
    };
    let reader: SourceReader = if magic[..n].starts_with(GZIP_MAGIC) {
        Box::new(BufReader::with_capacity(
            SOURCE_BUF_SIZE,
            MultiGzDecoder::new(raw),
        ))
    } else {
        Box::new(BufReader::with_capacity(SOURCE_BUF_SIZE, raw))
    };
    Ok(OpenedSource {
        reader,
        counter,
        total_bytes,
    })
}

/// Open a non-seekable stream; zip content is spooled to a temporary file.
fn open_stream<R: BufRead + Send + 'static>(
    mut reader: R,
    total_bytes: Option<u64>,
) -> Result<OpenedSource, StreamError> {
    let head = reader.fill_buf()?;
    let (is_zip, is_gzip) = (head.starts_with(ZIP_MAGIC), head.starts_with(GZIP_MAGIC));
    if is_zip {
        let mut spool = tempfile::tempfile()?;
        io::copy(&mut reader, &mut spool)?;
        spool.seek(SeekFrom::Start(0))?;
        return open_seekable(spool);
    }
    if is_gzip {
        let gz = BufReader::with_capacity(SOURCE_BUF_SIZE, MultiGzDecoder::new(reader));
        return Ok(counted(gz, total_bytes));
    }
    Ok(counted(reader, total_bytes))
}

fn counted<R: Read + Send + 'static>(inner: R, total_bytes: Option<u64>) -> OpenedSource {
    let counter = ByteCounter::default();
    let reader = CountingReader {
        inner,
        count: counter.clone(),
    };
    OpenedSource {
        reader: Box::new(BufReader::with_capacity(SOURCE_BUF_SIZE, reader)),
        counter,
        total_bytes,
    }
}

fn read_prefix(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// HTTP GET → anonymous temp file, rewound to the start.
fn download_to_tempfile(url: &str) -> Result<File, StreamError> {
    let timeout = http_config().read_timeout;
    let url = url.to_string();

    let mut reader = SHARED_RUNTIME.handle().block_on(async {
        let response = SHARED_CLIENT
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| StreamError::from_reqwest(&e))?;

        // Convert response body stream to AsyncRead
        let stream = response.bytes_stream();
        let async_reader = tokio_util::io::StreamReader::new(
            stream.map(|result| result.map_err(io::Error::other)),
        );

        Ok::<_, StreamError>(TimeoutReader::new(Box::pin(async_reader), timeout))
    })?;

    let mut file = tempfile::tempfile()?;
    let bytes = io::copy(&mut reader, &mut file)?;
    file.seek(SeekFrom::Start(0))?;
    log::debug!("downloaded {bytes} bytes from {url}");
    Ok(file)
}

/// Reader wrapper that tracks bytes read
pub struct CountingReader<R> {
    inner: R,
    count: ByteCounter,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Async-to-sync bridge with read timeout.
///
/// Each read has a deadline; if no data arrives in time the read fails
/// with `TimedOut`, which the download retry treats as transient.
pub struct TimeoutReader {
    inner: Pin<Box<dyn AsyncRead + Send + Sync>>,
    timeout: Duration,
}

impl TimeoutReader {
    fn new(inner: Pin<Box<dyn AsyncRead + Send + Sync>>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl Read for TimeoutReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let timeout = self.timeout;
        SHARED_RUNTIME.handle().block_on(async {
            let read_future = async {
                let mut read_buf = ReadBuf::new(buf);
                std::future::poll_fn(|cx: &mut Context<'_>| {
                    Pin::as_mut(&mut self.inner).poll_read(cx, &mut read_buf)
                })
                .await?;
                Ok::<_, io::Error>(read_buf.filled().len())
            };

            match tokio::time::timeout(timeout, read_future).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("read timeout ({}s with no data)", timeout.as_secs()),
                )),
            }
        })
    }
}

/// Where one member's compressed bytes live in the archive
#[derive(Debug, Clone, Copy)]
struct MemberSpan {
    start: u64,
    compressed_size: u64,
    deflated: bool,
}

/// Inflating reader over one member; hands the archive back when done.
enum Member<R> {
    Stored(io::Take<R>),
    Deflated(DeflateDecoder<io::Take<R>>),
}

impl<R: Read> Member<R> {
    fn new(inner: R, span: MemberSpan) -> Self {
        let take = inner.take(span.compressed_size);
        if span.deflated {
            Self::Deflated(DeflateDecoder::new(take))
        } else {
            Self::Stored(take)
        }
    }

    fn into_inner(self) -> R {
        match self {
            Self::Stored(take) => take.into_inner(),
            Self::Deflated(d) => d.into_inner().into_inner(),
        }
    }
}

impl<R: Read> Read for Member<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Stored(r) => r.read(buf),
            Self::Deflated(r) => r.read(buf),
        }
    }
}

enum ZipState<R> {
    Between(R),
    Reading(Member<R>),
}

/// Concatenated content of all archive members.
///
/// The central directory is read once; member data is then inflated
/// straight from the archive, so memory stays constant whatever the member
/// size. Directory entries are skipped. Only stored and deflated members
/// are supported.
pub struct ZipMembers<R: Read + Seek> {
    spans: VecDeque<MemberSpan>,
    state: Option<ZipState<R>>,
}

impl<R: Read + Seek> ZipMembers<R> {
    pub fn new(inner: R) -> Result<Self, StreamError> {
        let zip_err = |e: zip::result::ZipError| StreamError::Zip(e.to_string());
        let mut archive = ZipArchive::new(inner).map_err(zip_err)?;
        let mut spans = VecDeque::with_capacity(archive.len());
        for i in 0..archive.len() {
            let member = archive.by_index_raw(i).map_err(zip_err)?;
            if member.is_dir() {
                continue;
            }
            if member.encrypted() {
                return Err(StreamError::Zip(format!("{}: encrypted member", member.name())));
            }
            let deflated = match member.compression() {
                CompressionMethod::Stored => false,
                CompressionMethod::Deflated => true,
                other => {
                    return Err(StreamError::Zip(format!(
                        "{}: unsupported compression {other:?}",
                        member.name()
                    )));
                }
            };
            spans.push_back(MemberSpan {
                start: member.data_start(),
                compressed_size: member.compressed_size(),
                deflated,
            });
        }
        log::debug!("zip archive with {} members", spans.len());
        Ok(Self {
            spans,
            state: Some(ZipState::Between(archive.into_inner())),
        })
    }
}

impl<R: Read + Seek> Read for ZipMembers<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.state.take() {
                Some(ZipState::Reading(mut member)) => match member.read(buf) {
                    Ok(0) if !buf.is_empty() => {
                        self.state = Some(ZipState::Between(member.into_inner()));
                    }
                    result => {
                        self.state = Some(ZipState::Reading(member));
                        return result;
                    }
                },
                Some(ZipState::Between(mut inner)) => {
                    let Some(span) = self.spans.pop_front() else {
                        self.state = Some(ZipState::Between(inner));
                        return Ok(0);
                    };
                    inner.seek(SeekFrom::Start(span.start))?;
                    self.state = Some(ZipState::Reading(Member::new(inner, span)));
                }
                None => return Err(io::Error::other("zip archive lost after an earlier error")),
            }
        }
    }
}
