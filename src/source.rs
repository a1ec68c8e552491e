//! The external text source a World is loaded from.
//!
//! The crate never decides where text comes from. Callers hand in a
//! [`TextSource`]. Anything that delivers content piecewise implements
//! [`ChunkSource`] instead and gets [`TextSource`] through [`collect_chunks`].
//! [`FsSource`] is the tokio-backed chunk source for local files.

use std::future::Future;
use std::io;
use std::path::Path;

use futures::{Stream, TryStreamExt, stream};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Reads the whole content at a path as text.
///
/// Implementations fail with an [`io::Error`] on a missing file, a permission
/// problem, a transport error, or content that is not UTF-8. They never
/// return partial content.
pub trait TextSource {
    fn read_text(&self, path: &Path) -> impl Future<Output = io::Result<String>> + Send;
}

/// Delivers the content at a path as an ordered stream of chunks.
///
/// A stream error part-way through fails the whole read.
pub trait ChunkSource {
    fn chunks(&self, path: &Path) -> impl Stream<Item = io::Result<Chunk>> + Send;
}

impl<T: ChunkSource + Sync> TextSource for T {
    fn read_text(&self, path: &Path) -> impl Future<Output = io::Result<String>> + Send {
        collect_chunks(self.chunks(path))
    }
}

/// A piece of content as delivered by a streaming reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Text(String),
    Bytes(Vec<u8>),
}

impl Chunk {
    fn as_bytes(&self) -> &[u8] {
        match self {
            Chunk::Text(text) => text.as_bytes(),
            Chunk::Bytes(bytes) => bytes,
        }
    }
}

/// Drains a chunk stream in arrival order and decodes the result once.
///
/// Decoding happens after the last chunk, so a multi-byte character split
/// across two chunks is handled. The first stream error aborts the read.
pub async fn collect_chunks<S>(chunks: S) -> io::Result<String>
where
    S: Stream<Item = io::Result<Chunk>>,
{
    let bytes = chunks
        .try_fold(Vec::new(), |mut acc, chunk| async move {
            acc.extend_from_slice(chunk.as_bytes());
            Ok(acc)
        })
        .await?;

    String::from_utf8(bytes).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

/// Reads local files through tokio in fixed-size chunks.
#[derive(Debug, Clone, Copy)]
pub struct FsSource {
    chunk_size: usize,
}

impl FsSource {
    pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

    pub fn new() -> Self {
        Self::with_chunk_size(Self::DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Default for FsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkSource for FsSource {
    fn chunks(&self, path: &Path) -> impl Stream<Item = io::Result<Chunk>> + Send {
        let chunk_size = self.chunk_size;
        let path = path.to_path_buf();
        stream::once(File::open(path))
            .map_ok(move |file| stream::try_unfold(file, move |file| next_chunk(file, chunk_size)))
            .try_flatten()
    }
}

async fn next_chunk(mut file: File, chunk_size: usize) -> io::Result<Option<(Chunk, File)>> {
    let mut buf = vec![0; chunk_size];
    let n = file.read(&mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    buf.truncate(n);
    Ok(Some((Chunk::Bytes(buf), file)))
}
