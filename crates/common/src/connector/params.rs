//! Request parameters as a multimap.
//!
//! Keys ending in `[]` collect every value into a list; any other key keeps
//! its first value. This mirrors how the client encodes arrays in query
//! strings and forms.

use std::collections::BTreeMap;

const LIST_SUFFIX: &str = "[]";

/// A file part of a multipart upload.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

impl std::fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedFile")
            .field("name", &self.name)
            .field("len", &self.content.len())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Params {
    values: BTreeMap<String, Vec<String>>,
    files: Vec<UploadedFile>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.entry(key.into()).or_default().push(value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn add_file(&mut self, file: UploadedFile) {
        self.files.push(file);
    }

    /// First value of a scalar key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of a list key; `get_list("targets")` reads `targets[]`.
    pub fn get_list(&self, key: &str) -> &[String] {
        let key = if key.ends_with(LIST_SUFFIX) {
            key.to_string()
        } else {
            format!("{key}{LIST_SUFFIX}")
        };
        self.values.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn take_files(&mut self) -> Vec<UploadedFile> {
        std::mem::take(&mut self.files)
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// Boolean flags as sent by the client: `1`, `true`, `on`, `yes` or
/// `0`, `false`, `off`, `no`, empty.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" | "" => Some(false),
        _ => None,
    }
}
