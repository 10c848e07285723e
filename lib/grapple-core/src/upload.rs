//! File attachments.
//!
//! An [`Upload`] pairs a form field name and a filename with a [`ByteSource`].
//! Sources are single-use streams: nothing is read when the upload is
//! attached, and the encoder reads each source once, in attachment order.

use std::fmt;
use std::io;
use std::pin::Pin;

use bytes::Bytes;
use futures_core::Stream;
use futures_util::stream;

/// Boxed stream of upload bytes.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Readable byte source of an upload.
///
/// Build one from in-memory data with `From`, or wrap any stream of
/// `io::Result<Bytes>` with [`ByteSource::from_stream`].
pub struct ByteSource {
    stream: ByteStream,
}

impl ByteSource {
    /// Wrap a byte stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            stream: Box::pin(stream),
        }
    }

    /// An empty source.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_stream(stream::empty())
    }

    /// Consume the source into its stream.
    #[must_use]
    pub fn into_stream(self) -> ByteStream {
        self.stream
    }
}

impl fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteSource").finish_non_exhaustive()
    }
}

impl From<Bytes> for ByteSource {
    fn from(bytes: Bytes) -> Self {
        Self::from_stream(stream::once(async move { Ok(bytes) }))
    }
}

impl From<Vec<u8>> for ByteSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for ByteSource {
    fn from(bytes: &'static [u8]) -> Self {
        Self::from(Bytes::from_static(bytes))
    }
}

impl From<&'static str> for ByteSource {
    fn from(text: &'static str) -> Self {
        Self::from(Bytes::from_static(text.as_bytes()))
    }
}

impl From<String> for ByteSource {
    fn from(text: String) -> Self {
        Self::from(Bytes::from(text))
    }
}

/// A file attached to a request.
#[derive(Debug)]
pub struct Upload {
    field: String,
    filename: String,
    source: ByteSource,
}

impl Upload {
    /// Create an upload.
    #[must_use]
    pub fn new(
        field: impl Into<String>,
        filename: impl Into<String>,
        source: impl Into<ByteSource>,
    ) -> Self {
        Self {
            field: field.into(),
            filename: filename.into(),
            source: source.into(),
        }
    }

    /// Form field name, also the variable path the file fills.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Display filename.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// MIME type guessed from the filename extension.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        crate::multipart::guess_content_type(&self.filename)
    }

    /// Consume into (field, filename, source).
    #[must_use]
    pub fn into_parts(self) -> (String, String, ByteSource) {
        (self.field, self.filename, self.source)
    }
}
