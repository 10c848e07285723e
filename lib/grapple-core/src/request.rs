//! GraphQL request building.
//!
//! A [`Request`] accumulates the query, variables, uploads and headers of one
//! operation. Every builder call succeeds; problems are stored on the request
//! and returned when it is executed.
//!
//! # Example
//!
//! ```
//! use grapple_core::Request;
//!
//! let request = Request::new("mutation($f: Upload!) { upload(file: $f) }")
//!     .header("Authorization", "Bearer token")
//!     .var("f", serde_json::Value::Null)
//!     .file("f", "a.txt", "hello");
//!
//! assert_eq!(request.files().len(), 1);
//! assert_eq!(request.get_header("authorization"), Some("Bearer token"));
//! ```
//!
//! A `Request` has no internal synchronization: it is built by one owner and
//! consumed once by an [`Executor`](crate::Executor).

use std::future::Future;

use crate::{BoxError, ByteSource, Executor, Headers, Response, Result, Upload};

/// Variable values, keyed by variable name.
pub type Variables = serde_json::Map<String, serde_json::Value>;

/// A GraphQL operation: query text, variables, uploads and headers.
#[derive(Debug)]
pub struct Request {
    query: String,
    variables: Option<Variables>,
    files: Vec<Upload>,
    headers: Headers,
    deferred: Option<BoxError>,
    variable_error: Option<serde_json::Error>,
}

impl Request {
    /// Creates a request for the given query text.
    ///
    /// The query is not parsed or validated.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: None,
            files: Vec::new(),
            headers: Headers::new(),
            deferred: None,
            variable_error: None,
        }
    }

    /// Sets a header, replacing any existing values.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Adds a header value, keeping existing values.
    #[must_use]
    pub fn add_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Removes every value of a header.
    #[must_use]
    pub fn remove_header(mut self, name: &str) -> Self {
        self.headers.remove(name);
        self
    }

    /// First value of a header.
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Sets a variable, overwriting any previous value for `name`.
    ///
    /// The value is converted to JSON now; if that fails the error is kept and
    /// returned when the request is executed.
    #[must_use]
    pub fn var(mut self, name: impl Into<String>, value: impl serde::Serialize) -> Self {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(err) => {
                self.variable_error.get_or_insert(err);
                serde_json::Value::Null
            }
        };
        self.variables
            .get_or_insert_with(Variables::new)
            .insert(name.into(), value);
        self
    }

    /// Variables set so far, or `None` if no variable was ever set.
    #[must_use]
    pub fn variables(&self) -> Option<&Variables> {
        self.variables.as_ref()
    }

    /// Attaches a file.
    ///
    /// `field` is both the multipart field name and the variable path the file
    /// fills (`.` separates nested segments). The source is not read until the
    /// request is executed.
    #[must_use]
    pub fn file(
        mut self,
        field: impl Into<String>,
        filename: impl Into<String>,
        source: impl Into<ByteSource>,
    ) -> Self {
        self.files.push(Upload::new(field, filename, source));
        self
    }

    /// Attached files, in attachment order.
    #[must_use]
    pub fn files(&self) -> &[Upload] {
        &self.files
    }

    /// Query text.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Stores an error to return when the request is executed.
    ///
    /// Overwrites any previously reported error. Executing a request carrying
    /// a reported error fails without encoding or sending anything.
    #[must_use]
    pub fn report(mut self, err: impl Into<BoxError>) -> Self {
        self.deferred = Some(err.into());
        self
    }

    /// The reported error, if any.
    #[must_use]
    pub fn deferred_error(&self) -> Option<&BoxError> {
        self.deferred.as_ref()
    }

    /// Executes this request with the given executor.
    ///
    /// # Errors
    ///
    /// See [`Executor::execute`].
    pub fn run<E: Executor>(self, executor: &E) -> impl Future<Output = Result<Response>> + Send {
        executor.execute(self)
    }

    /// Checks the stored errors, then consumes into the pieces needed for
    /// encoding: (query, variables, files, headers).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Deferred`](crate::Error::Deferred) if an error was
    /// reported, otherwise [`Error::Serialization`](crate::Error::Serialization)
    /// if a variable could not be converted.
    pub fn into_parts(self) -> Result<(String, Variables, Vec<Upload>, Headers)> {
        if let Some(err) = self.deferred {
            return Err(crate::Error::Deferred(err));
        }
        if let Some(err) = self.variable_error {
            return Err(err.into());
        }
        Ok((
            self.query,
            self.variables.unwrap_or_default(),
            self.files,
            self.headers,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use assert2::{check, let_assert};
    use serde_json::json;

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn new_request_is_empty() {
        let request = Request::new("{ me { id } }");

        check!(request.query() == "{ me { id } }");
        check!(request.variables().is_none());
        check!(request.files().is_empty());
        check!(request.headers().is_empty());
        check!(request.deferred_error().is_none());
    }

    #[test]
    fn any_query_text_is_accepted() {
        check!(Request::new("").query() == "");
        check!(Request::new("query {").query() == "query {");
    }

    #[test]
    fn var_overwrites_existing_key() {
        let request = Request::new("q").var("a", 1).var("b", "x").var("a", 2);

        let_assert!(Some(vars) = request.variables());
        check!(vars.len() == 2);
        check!(vars.get("a") == Some(&json!(2)));
        check!(vars.get("b") == Some(&json!("x")));
    }

    #[test]
    fn var_accepts_nested_values() {
        let mut input = BTreeMap::new();
        input.insert("tags", vec!["a", "b"]);

        let request = Request::new("q")
            .var("input", &input)
            .var("flag", true)
            .var("nothing", Option::<u8>::None);

        let_assert!(Some(vars) = request.variables());
        check!(vars.get("input") == Some(&json!({ "tags": ["a", "b"] })));
        check!(vars.get("flag") == Some(&json!(true)));
        check!(vars.get("nothing") == Some(&json!(null)));
    }

    #[test]
    fn unserializable_var_fails_at_execution() {
        // JSON object keys must be strings
        let mut bad = BTreeMap::new();
        bad.insert(vec![1_u8], "x");

        let request = Request::new("q").var("bad", bad).var("ok", 1);
        check!(request.variables().map(Variables::len) == Some(2));

        let_assert!(Err(err) = request.into_parts());
        check!(err.kind() == ErrorKind::Encoding);
    }

    #[test]
    fn headers_chain() {
        let request = Request::new("q")
            .header("X", "1")
            .add_header("X", "2")
            .header("Y", "3")
            .remove_header("y");

        check!(request.get_header("x") == Some("1"));
        check!(request.headers().get_all("X").collect::<Vec<_>>() == ["1", "2"]);
        check!(request.get_header("Y").is_none());
    }

    #[test]
    fn files_keep_attachment_order() {
        let request = Request::new("q")
            .file("docs", "a.pdf", "a")
            .file("docs", "b.pdf", "b")
            .file("cover", "c.png", "c");

        let names: Vec<_> = request.files().iter().map(Upload::filename).collect();
        check!(names == ["a.pdf", "b.pdf", "c.png"]);
    }

    #[test]
    fn report_overwrites_previous_error() {
        let request = Request::new("q").report("first").report("second");

        let_assert!(Some(err) = request.deferred_error());
        check!(err.to_string() == "second");
    }

    #[test]
    fn deferred_error_wins_over_variable_error() {
        let mut bad = BTreeMap::new();
        bad.insert(vec![1_u8], "x");

        let request = Request::new("q").var("bad", bad).report("not ready");
        let_assert!(Err(err) = request.into_parts());
        check!(err.kind() == ErrorKind::Deferred);
    }

    #[test]
    fn into_parts_defaults_variables() {
        let_assert!(Ok((query, vars, files, _)) = Request::new("q").into_parts());
        check!(query == "q");
        check!(vars.is_empty());
        check!(files.is_empty());
    }
}
