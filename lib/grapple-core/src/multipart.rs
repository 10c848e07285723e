//! Multipart form data writer.
//!
//! Parts hold either in-memory bytes or a streamed [`ByteSource`]. The form
//! is written as a single stream: a part's source is only polled once every
//! preceding part has been emitted, so large uploads are never buffered.
//!
//! # Example
//!
//! ```ignore
//! use grapple_core::{Form, Part};
//!
//! let form = Form::new()
//!     .part(Part::text("operations", operations_json))
//!     .part(Part::stream("avatar", "photo.jpg", source));
//!
//! let (content_type, body) = form.into_stream();
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use futures_util::{StreamExt, TryStreamExt, stream};

use crate::{BodyStream, BoxError, ByteSource, UploadError};

enum PartData {
    Bytes(Bytes),
    Stream(ByteSource),
}

/// A single part in a multipart form.
pub struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: PartData,
}

impl std::fmt::Debug for Part {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Part")
            .field("name", &self.name)
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

impl Part {
    /// Create a new part with the given name and data.
    #[must_use]
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            data: PartData::Bytes(data.into()),
        }
    }

    /// Create a text part.
    ///
    /// No content type is written, as the `operations` and `map` fields of a
    /// GraphQL multipart request are plain form fields.
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, Bytes::from(value.into()))
    }

    /// Create a streamed file part.
    ///
    /// The content type is guessed from the filename extension, or defaults
    /// to `application/octet-stream` if unknown.
    #[must_use]
    pub fn stream(
        name: impl Into<String>,
        filename: impl Into<String>,
        source: impl Into<ByteSource>,
    ) -> Self {
        let filename = filename.into();
        let content_type = guess_content_type(&filename).to_string();
        Self {
            name: name.into(),
            filename: Some(filename),
            content_type: Some(content_type),
            data: PartData::Stream(source.into()),
        }
    }

    /// Set the content type for this part.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Get the part name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the filename, if set.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Get the content type, if set.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns `true` if the part data is streamed.
    #[must_use]
    pub const fn is_stream(&self) -> bool {
        matches!(self.data, PartData::Stream(_))
    }

    fn head(&self, boundary: &str) -> Bytes {
        let mut buf = BytesMut::new();

        buf.put_slice(b"--");
        buf.put_slice(boundary.as_bytes());
        buf.put_slice(b"\r\n");

        buf.put_slice(b"Content-Disposition: form-data; name=\"");
        buf.put_slice(escape_quoted(&self.name).as_bytes());
        buf.put_slice(b"\"");
        if let Some(filename) = &self.filename {
            buf.put_slice(b"; filename=\"");
            buf.put_slice(escape_quoted(filename).as_bytes());
            buf.put_slice(b"\"");
        }
        buf.put_slice(b"\r\n");

        if let Some(content_type) = &self.content_type {
            buf.put_slice(b"Content-Type: ");
            buf.put_slice(content_type.as_bytes());
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"\r\n");
        buf.freeze()
    }

    fn into_stream(self, boundary: &str) -> BodyStream {
        let head = stream::once(std::future::ready(Ok::<_, BoxError>(self.head(boundary))));
        let tail = stream::once(std::future::ready(Ok::<_, BoxError>(Bytes::from_static(
            b"\r\n",
        ))));

        match self.data {
            PartData::Bytes(bytes) => {
                let data = stream::once(std::future::ready(Ok::<_, BoxError>(bytes)));
                Box::pin(head.chain(data).chain(tail))
            }
            PartData::Stream(source) => {
                let field = self.name;
                let filename = self.filename.unwrap_or_default();
                let data = source.into_stream().map_err(move |err| -> BoxError {
                    Box::new(UploadError::new(field.clone(), filename.clone(), err))
                });
                Box::pin(head.chain(data).chain(tail))
            }
        }
    }
}

/// Escape `"` and line breaks in a quoted header parameter.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Guess the content type from a filename extension.
pub(crate) fn guess_content_type(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        // Documents
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        // Text
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "xml" => "application/xml",
        "csv" => "text/csv",
        "md" => "text/markdown",
        // Archives
        "zip" => "application/zip",
        "gz" | "gzip" => "application/gzip",
        "tar" => "application/x-tar",
        // Audio/Video
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => crate::ContentType::OctetStream.as_str(),
    }
}

/// A multipart form containing multiple parts.
#[derive(Debug)]
pub struct Form {
    parts: Vec<Part>,
    boundary: String,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Create a new empty form with a generated boundary.
    #[must_use]
    pub fn new() -> Self {
        Self::with_boundary(generate_boundary())
    }

    /// Create a new form with a custom boundary.
    ///
    /// The boundary should be a unique string that doesn't appear in any part data.
    #[must_use]
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            parts: Vec::new(),
            boundary: boundary.into(),
        }
    }

    /// Add a part to the form.
    #[must_use]
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Add a text field to the form.
    #[must_use]
    pub fn text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.part(Part::text(name, value))
    }

    /// Add a streamed file to the form.
    #[must_use]
    pub fn stream(
        self,
        name: impl Into<String>,
        filename: impl Into<String>,
        source: impl Into<ByteSource>,
    ) -> Self {
        self.part(Part::stream(name, filename, source))
    }

    /// Get the boundary string.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Get the parts in this form.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Get the Content-Type header value for this form.
    ///
    /// Returns `multipart/form-data; boundary=<boundary>`.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!(
            "{}; boundary={}",
            crate::ContentType::MultipartFormData,
            self.boundary
        )
    }

    /// Convert the form into a streamed body.
    ///
    /// Returns a tuple of (content-type header value, body stream).
    #[must_use]
    pub fn into_stream(self) -> (String, BodyStream) {
        let content_type = self.content_type();
        let boundary = self.boundary;

        let closing = Bytes::from(format!("--{boundary}--\r\n"));
        let parts: Vec<BodyStream> = self
            .parts
            .into_iter()
            .map(|part| part.into_stream(&boundary))
            .collect();

        let body = stream::iter(parts)
            .flatten()
            .chain(stream::once(std::future::ready(Ok::<_, BoxError>(closing))));

        (content_type, Box::pin(body))
    }

    /// Write the whole form into memory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Upload`](crate::Error::Upload) if a streamed part fails.
    pub async fn collect(self) -> crate::Result<(String, Bytes)> {
        let (content_type, body) = self.into_stream();
        let bytes = crate::Body::Stream(body).collect().await?;
        Ok((content_type, bytes))
    }
}

/// Generate a boundary string.
fn generate_boundary() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let sequence = COUNTER.fetch_add(1, Ordering::Relaxed);

    format!("----GrappleBoundary{timestamp:x}{sequence:04x}")
}
