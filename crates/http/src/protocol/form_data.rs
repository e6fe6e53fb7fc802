use bytes::Bytes;
use std::collections::HashMap;

/// A file uploaded through a `multipart/form-data` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    file_name: String,
    data: Bytes,
}

impl FilePart {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self { file_name: file_name.into(), data: data.into() }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Decoded `multipart/form-data` payload.
///
/// A field name maps to the value of its last part. A file input name maps to
/// every file sent under it, in the order the parts were encountered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, Vec<FilePart>>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Like [`FormData::field`] but treats an empty value as absent.
    pub fn non_empty_field(&self, name: &str) -> Option<&str> {
        self.field(name).filter(|value| !value.is_empty())
    }

    pub fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }

    /// All files sent under `name`, empty when there is none.
    pub fn files(&self, name: &str) -> &[FilePart] {
        self.files.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn first_file(&self, name: &str) -> Option<&FilePart> {
        self.files(name).first()
    }

    pub fn insert_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn push_file(&mut self, name: impl Into<String>, file: FilePart) {
        self.files.entry(name.into()).or_default().push(file);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.files.is_empty()
    }
}
