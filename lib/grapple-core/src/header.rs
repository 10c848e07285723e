//! Request header store.
//!
//! [`Headers`] is an ordered, case-insensitive, multi-valued mapping. Names
//! and values are not validated here; the transport rejects invalid ones when
//! the request is sent.

/// Case-insensitive multi-valued header mapping.
///
/// Names keep the spelling used on first insertion; lookups compare ASCII
/// case-insensitively.
///
/// # Example
///
/// ```
/// use grapple_core::Headers;
///
/// let mut headers = Headers::new();
/// headers.insert("X-Trace", "1");
/// headers.append("x-trace", "2");
///
/// assert_eq!(headers.get("X-TRACE"), Some("1"));
/// assert_eq!(headers.get_all("x-trace").collect::<Vec<_>>(), ["1", "2"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    /// Create an empty header store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
    }

    /// Append a value, keeping existing values for the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        match self.position(&name) {
            Some(index) => {
                if let Some((_, values)) = self.entries.get_mut(index) {
                    values.push(value.into());
                }
            }
            None => self.entries.push((name, vec![value.into()])),
        }
    }

    /// Replace all values for `name` with a single value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        match self.position(&name) {
            Some(index) => {
                if let Some((_, values)) = self.entries.get_mut(index) {
                    *values = vec![value.into()];
                }
            }
            None => self.entries.push((name, vec![value.into()])),
        }
    }

    /// First value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name)
            .and_then(|index| self.entries.get(index))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    /// All values for `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.position(name)
            .and_then(|index| self.entries.get(index))
            .into_iter()
            .flat_map(|(_, values)| values.iter().map(String::as_str))
    }

    /// Remove every value for `name`.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
    }

    /// Returns `true` if at least one value is set for `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no header is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs, one pair per value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(name, values)| {
            values
                .iter()
                .map(move |value| (name.as_str(), value.as_str()))
        })
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        headers.extend(iter);
        headers
    }
}

impl<K, V> Extend<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.append(name, value);
        }
    }
}
