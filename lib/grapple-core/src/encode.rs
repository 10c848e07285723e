//! Wire encoding of GraphQL requests.
//!
//! A request without files becomes a JSON body `{"query", "variables"}`. A
//! request with at least one file becomes a multipart form with, in order:
//!
//! 1. `operations`: the same JSON, with every file-bound variable set to `null`,
//! 2. `map`: `{"<index>": ["variables", <path>...]}` in attachment order,
//! 3. one streamed part per file, named after its field.
//!
//! The field name of an upload is its variable path, `.` separating nested
//! segments (`input.avatar`). Uploads sharing a field name fill a list: each
//! gets a trailing index counted within that field.

use std::collections::HashMap;
use std::fmt;

use serde::ser::SerializeMap;
use tracing::debug;
use url::Url;

use crate::{
    Body, ContentType, Error, Form, HttpRequest, Part, Request, Result, Upload, Variables,
    to_json,
};

/// Header name used for the body content type.
pub const CONTENT_TYPE: &str = "Content-Type";

/// Header name used for the accepted response type.
pub const ACCEPT: &str = "Accept";

/// Wire encoding of a request, chosen only by whether files are attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingMode {
    /// `application/json` body.
    Json,
    /// `multipart/form-data` body.
    Multipart,
}

impl EncodingMode {
    /// Encoding mode for a set of uploads.
    #[must_use]
    pub fn for_files(files: &[Upload]) -> Self {
        if files.is_empty() {
            Self::Json
        } else {
            Self::Multipart
        }
    }

    /// Encoding mode for a request.
    #[must_use]
    pub fn of(request: &Request) -> Self {
        Self::for_files(request.files())
    }
}

impl fmt::Display for EncodingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Multipart => f.write_str("multipart"),
        }
    }
}

/// The `{query, variables}` JSON document.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Operations {
    /// Query text.
    pub query: String,
    /// Variables, `{}` when none were set.
    pub variables: Variables,
}

/// The multipart `map` document: file index to variable path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMap {
    paths: Vec<Vec<String>>,
}

impl FileMap {
    /// Plan the variable path of every upload, in attachment order.
    #[must_use]
    pub fn plan(files: &[Upload]) -> Self {
        let mut per_field: HashMap<&str, usize> = HashMap::new();
        for upload in files {
            *per_field.entry(upload.field()).or_default() += 1;
        }

        let mut seen: HashMap<&str, usize> = HashMap::new();
        let paths = files
            .iter()
            .map(|upload| {
                let field = upload.field();
                let mut path: Vec<String> = field.split('.').map(str::to_string).collect();
                if per_field.get(field).copied().unwrap_or_default() > 1 {
                    let ordinal = seen.entry(field).or_default();
                    path.push(ordinal.to_string());
                    *ordinal += 1;
                }
                path
            })
            .collect();

        Self { paths }
    }

    /// Variable paths (without the leading `variables` segment), by file index.
    #[must_use]
    pub fn paths(&self) -> &[Vec<String>] {
        &self.paths
    }

    /// Set every planned path to `null` in `variables`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUploadPath`] when a numeric segment lies past
    /// the end of its list.
    pub fn nullify(&self, variables: &mut Variables) -> Result<()> {
        for path in &self.paths {
            if let Some((head, rest)) = path.split_first() {
                let slot = variables
                    .entry(head.clone())
                    .or_insert(serde_json::Value::Null);
                if !set_null(slot, rest) {
                    return Err(Error::invalid_upload_path(path.join(".")));
                }
            }
        }
        Ok(())
    }
}

impl serde::Serialize for FileMap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.paths.len()))?;
        for (index, path) in self.paths.iter().enumerate() {
            let mut entry = Vec::with_capacity(path.len() + 1);
            entry.push("variables");
            entry.extend(path.iter().map(String::as_str));
            map.serialize_entry(&index.to_string(), &entry)?;
        }
        map.end()
    }
}

/// Write `null` at `path` below `target`, creating lists and objects on the way.
///
/// Numeric segments index into a list and may grow it by one item at most;
/// other segments are object keys. Returns `false` if an index is out of range.
fn set_null(target: &mut serde_json::Value, path: &[String]) -> bool {
    use serde_json::Value;

    let Some((head, rest)) = path.split_first() else {
        *target = Value::Null;
        return true;
    };

    if let Ok(index) = head.parse::<usize>() {
        if !target.is_array() {
            *target = Value::Array(Vec::new());
        }
        let Value::Array(items) = target else {
            return false;
        };
        if index == items.len() {
            items.push(Value::Null);
        }
        items.get_mut(index).is_some_and(|item| set_null(item, rest))
    } else {
        if !target.is_object() {
            *target = Value::Object(serde_json::Map::new());
        }
        let Value::Object(fields) = target else {
            return false;
        };
        let item = fields.entry(head.clone()).or_insert(Value::Null);
        set_null(item, rest)
    }
}

/// Encode a request for `url`.
///
/// Nothing is read from upload sources here: multipart bodies are streams
/// that read each source when the transport pulls it.
///
/// # Errors
///
/// - [`Error::Deferred`](crate::Error::Deferred) if an error was reported on the request,
/// - [`Error::Serialization`](crate::Error::Serialization) if a variable could not be converted,
/// - [`Error::InvalidUploadPath`](crate::Error::InvalidUploadPath) if an upload index lies
///   past the end of its list.
pub fn encode(request: Request, url: &Url) -> Result<HttpRequest> {
    let (query, mut variables, files, mut headers) = request.into_parts()?;
    let mode = EncodingMode::for_files(&files);

    debug!(
        %mode,
        variables = variables.len(),
        files = files.len(),
        "encoding GraphQL request"
    );

    if !headers.contains(ACCEPT) {
        headers.insert(ACCEPT, ContentType::Json.as_str());
    }

    let body = match mode {
        EncodingMode::Json => {
            let body = to_json(&Operations { query, variables })?;
            headers.insert(CONTENT_TYPE, ContentType::Json.as_str());
            Body::Full(body)
        }
        EncodingMode::Multipart => {
            let file_map = FileMap::plan(&files);
            file_map.nullify(&mut variables)?;

            let operations = to_json(&Operations { query, variables })?;
            let map = to_json(&file_map)?;

            let mut form = Form::new()
                .part(Part::new("operations", operations))
                .part(Part::new("map", map));
            for upload in files {
                let (field, filename, source) = upload.into_parts();
                form = form.stream(field, filename, source);
            }

            let (content_type, stream) = form.into_stream();
            headers.insert(CONTENT_TYPE, content_type);
            Body::Stream(stream)
        }
    };

    Ok(HttpRequest::new(url.clone(), headers, body))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::task::Poll;

    use assert2::{check, let_assert};
    use bytes::Bytes;
    use futures_util::{StreamExt, stream};
    use serde_json::json;

    use super::*;
    use crate::{ByteSource, ErrorKind, from_json};

    fn endpoint() -> Url {
        Url::parse("https://api.example.com/graphql").expect("valid URL")
    }

    struct FormPart {
        name: String,
        filename: Option<String>,
        content: String,
    }

    /// Split a multipart body produced by [`Form`] into its parts.
    fn parse_parts(content_type: &str, body: &[u8]) -> Vec<FormPart> {
        let boundary = content_type
            .split_once("boundary=")
            .map(|(_, boundary)| boundary)
            .expect("boundary");
        let body = String::from_utf8_lossy(body);
        let delimiter = format!("--{boundary}");

        body.split(delimiter.as_str())
            .filter(|chunk| !chunk.is_empty() && !chunk.starts_with("--"))
            .map(|chunk| {
                let chunk = chunk.trim_start_matches("\r\n");
                let (head, content) = chunk.split_once("\r\n\r\n").expect("part head");
                let disposition = head.lines().next().expect("disposition");
                let name = disposition
                    .split("name=\"")
                    .nth(1)
                    .and_then(|rest| rest.split('"').next())
                    .expect("name")
                    .to_string();
                let filename = disposition
                    .split("filename=\"")
                    .nth(1)
                    .and_then(|rest| rest.split('"').next())
                    .map(str::to_string);
                FormPart {
                    name,
                    filename,
                    content: content.trim_end_matches("\r\n").to_string(),
                }
            })
            .collect()
    }

    async fn encode_multipart(request: Request) -> (HttpRequest, Vec<FormPart>) {
        let_assert!(Ok(encoded) = encode(request, &endpoint()));
        let content_type = encoded
            .headers()
            .get(CONTENT_TYPE)
            .expect("content type")
            .to_string();
        let (url, headers, body) = encoded.into_parts();
        let bytes = body.collect().await.expect("body");
        let parts = parse_parts(&content_type, &bytes);
        (
            HttpRequest::new(url, headers, Body::Full(bytes)),
            parts,
        )
    }

    #[test]
    fn json_mode_has_query_and_variables_only() {
        let request = Request::new("{ me { id } }").var("a", 1);

        let_assert!(Ok(encoded) = encode(request, &endpoint()));
        check!(encoded.headers().get(CONTENT_TYPE) == Some("application/json; charset=utf-8"));
        let_assert!(Some(bytes) = encoded.body().as_bytes());

        let value: serde_json::Value = from_json(bytes).expect("json body");
        let_assert!(Some(object) = value.as_object());
        let mut keys: Vec<_> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        check!(keys == ["query", "variables"]);
    }

    #[test]
    fn json_round_trip() {
        let request = Request::new("query($a: Int, $b: String) { x }")
            .var("a", 1)
            .var("b", "x");

        let_assert!(Ok(encoded) = encode(request, &endpoint()));
        let_assert!(Some(bytes) = encoded.body().as_bytes());
        let operations: Operations = from_json(bytes).expect("operations");

        check!(operations.query == "query($a: Int, $b: String) { x }");
        check!(serde_json::Value::Object(operations.variables) == json!({ "a": 1, "b": "x" }));
    }

    #[test]
    fn json_mode_without_variables_sends_empty_object() {
        let_assert!(Ok(encoded) = encode(Request::new("{ ping }"), &endpoint()));
        let_assert!(Some(bytes) = encoded.body().as_bytes());
        check!(bytes.as_ref() == br#"{"query":"{ ping }","variables":{}}"#);
    }

    #[test]
    fn caller_headers_are_kept() {
        let request = Request::new("q")
            .header("Authorization", "Bearer t")
            .header("Accept", "application/graphql-response+json")
            .header("content-type", "text/plain");

        let_assert!(Ok(encoded) = encode(request, &endpoint()));
        let headers = encoded.headers();
        check!(headers.get("authorization") == Some("Bearer t"));
        check!(headers.get(ACCEPT) == Some("application/graphql-response+json"));
        check!(headers.get(CONTENT_TYPE) == Some("application/json; charset=utf-8"));
    }

    #[test]
    fn deferred_error_stops_encoding() {
        let request = Request::new("q").file("f", "a.txt", "x").report("missing input");

        let_assert!(Err(err) = encode(request, &endpoint()));
        check!(err.kind() == ErrorKind::Deferred);
    }

    #[test]
    fn encoding_mode_follows_files() {
        check!(EncodingMode::of(&Request::new("q").var("f", 1)) == EncodingMode::Json);
        check!(EncodingMode::of(&Request::new("q").file("f", "a", "")) == EncodingMode::Multipart);
    }

    #[tokio::test]
    async fn upload_scenario() {
        let query = "query($f: Upload!){ upload(file:$f) }";
        let request = Request::new(query)
            .var("f", "placeholder")
            .file("f", "a.txt", "hello");

        let (encoded, parts) = encode_multipart(request).await;
        let_assert!(Some(content_type) = encoded.headers().get(CONTENT_TYPE));
        check!(content_type.starts_with("multipart/form-data; boundary="));

        check!(parts.len() == 3);
        let_assert!([operations, map, file] = parts.as_slice());

        check!(operations.name == "operations");
        let operations: serde_json::Value =
            serde_json::from_str(&operations.content).expect("operations json");
        check!(operations == json!({ "query": query, "variables": { "f": null } }));

        check!(map.name == "map");
        check!(map.content == r#"{"0":["variables","f"]}"#);

        check!(file.name == "f");
        check!(file.filename.as_deref() == Some("a.txt"));
        check!(file.content == "hello");
    }

    #[tokio::test]
    async fn files_keep_attachment_order() {
        let request = Request::new("mutation($docs: [Upload!]!, $cover: Upload) { x }")
            .file("docs", "one.txt", "1")
            .file("cover", "cover.png", "c")
            .file("docs", "two.txt", "2");

        let (_, parts) = encode_multipart(request).await;
        check!(parts.len() == 2 + 3);

        let files: Vec<_> = parts
            .iter()
            .skip(2)
            .map(|part| (part.name.as_str(), part.filename.as_deref(), part.content.as_str()))
            .collect();
        check!(
            files
                == [
                    ("docs", Some("one.txt"), "1"),
                    ("cover", Some("cover.png"), "c"),
                    ("docs", Some("two.txt"), "2"),
                ]
        );

        let_assert!(Some(map) = parts.get(1));
        let map: serde_json::Value = serde_json::from_str(&map.content).expect("map json");
        check!(
            map == json!({
                "0": ["variables", "docs", "0"],
                "1": ["variables", "cover"],
                "2": ["variables", "docs", "1"],
            })
        );

        let_assert!(Some(operations) = parts.first());
        let operations: Operations =
            serde_json::from_str(&operations.content).expect("operations json");
        check!(
            serde_json::Value::Object(operations.variables)
                == json!({ "docs": [null, null], "cover": null })
        );
    }

    #[test]
    fn nested_paths_are_nullified() {
        let files = vec![
            Upload::new("input.avatar", "me.png", ""),
            Upload::new("input.gallery.2", "third.png", ""),
        ];
        let plan = FileMap::plan(&files);

        let mut variables = Variables::new();
        variables.insert(
            "input".to_string(),
            json!({ "name": "alice", "avatar": "x", "gallery": ["a", "b", "c"] }),
        );
        let_assert!(Ok(()) = plan.nullify(&mut variables));

        check!(
            serde_json::Value::Object(variables)
                == json!({
                    "input": {
                        "name": "alice",
                        "avatar": null,
                        "gallery": ["a", "b", null],
                    }
                })
        );

        let_assert!(Ok(map) = serde_json::to_value(&plan));
        check!(
            map == json!({
                "0": ["variables", "input", "avatar"],
                "1": ["variables", "input", "gallery", "2"],
            })
        );
    }

    #[test]
    fn upload_index_may_append_one_item() {
        let plan = FileMap::plan(&[Upload::new("list.1", "b.txt", "")]);

        let mut variables = Variables::new();
        variables.insert("list".to_string(), json!(["a"]));
        let_assert!(Ok(()) = plan.nullify(&mut variables));

        check!(serde_json::Value::Object(variables) == json!({ "list": ["a", null] }));
    }

    #[test]
    fn out_of_range_upload_index_is_rejected() {
        for field in ["f.18446744073709551615", "f.100000000000000", "f.2"] {
            let plan = FileMap::plan(&[Upload::new(field, "a.txt", "")]);

            let mut variables = Variables::new();
            variables.insert("f".to_string(), json!(["keep"]));
            let_assert!(Err(err) = plan.nullify(&mut variables));

            check!(err.kind() == ErrorKind::Encoding);
            let_assert!(Error::InvalidUploadPath(path) = err);
            check!(path == field);
            check!(serde_json::Value::Object(variables) == json!({ "f": ["keep"] }));
        }
    }

    #[test]
    fn huge_upload_index_fails_encoding() {
        let request = Request::new("q").file("f.100000000000000", "a.txt", "x");

        let_assert!(Err(err) = encode(request, &endpoint()));
        check!(err.kind() == ErrorKind::Encoding);
    }

    /// Label a body chunk: part heads by filename or name, file data, part ends.
    fn chunk_label(chunk: &[u8]) -> Option<String> {
        let text = String::from_utf8_lossy(chunk);
        let quoted = |key: &str| {
            text.split(key)
                .nth(1)
                .and_then(|rest| rest.split('"').next())
                .map(str::to_string)
        };

        if let Some(filename) = quoted("filename=\"") {
            return Some(format!("head {filename}"));
        }
        if let Some(name) = quoted(" name=\"") {
            return Some(format!("head {name}"));
        }
        match text.as_ref() {
            "\r\n" => Some("end".to_string()),
            "one" | "two" => Some(format!("data {text}")),
            _ => None,
        }
    }

    /// Single-chunk source recording each poll in `log`.
    fn logged_source(content: &'static str, log: &Arc<Mutex<Vec<String>>>) -> ByteSource {
        let log = Arc::clone(log);
        let mut chunks = vec![Bytes::from_static(content.as_bytes())].into_iter();
        ByteSource::from_stream(stream::poll_fn(move |_| {
            log.lock().expect("log").push(format!("poll {content}"));
            Poll::Ready(chunks.next().map(Ok))
        }))
    }

    #[tokio::test]
    async fn sources_are_read_lazily_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let request = Request::new("mutation($docs: [Upload!]!) { x }")
            .file("docs", "one.txt", logged_source("one", &log))
            .file("docs", "two.txt", logged_source("two", &log));
        check!(log.lock().expect("log").is_empty());

        let_assert!(Ok(encoded) = encode(request, &endpoint()));
        check!(log.lock().expect("log").is_empty());

        let (_, _, body) = encoded.into_parts();
        let_assert!(Body::Stream(mut body) = body);
        while let Some(chunk) = body.next().await {
            let_assert!(Ok(chunk) = chunk);
            if let Some(label) = chunk_label(&chunk) {
                log.lock().expect("log").push(label);
            }
        }

        let log = log.lock().expect("log").clone();
        check!(
            log == [
                "head operations",
                "end",
                "head map",
                "end",
                "head one.txt",
                "poll one",
                "data one",
                "poll one",
                "end",
                "head two.txt",
                "poll two",
                "data two",
                "poll two",
                "end",
            ]
        );
    }
}
