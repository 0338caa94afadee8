//! multipart/form-data body builder

use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

/// Text fields encoded as a multipart/form-data body
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    fields: Vec<(String, String)>,
}

impl MultipartForm {
    pub fn new(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            fields: Vec::new(),
        }
    }

    /// Form with a fresh random boundary
    pub fn with_generated_boundary() -> Self {
        Self::new(format!("----LoadgenFormBoundary{}", Uuid::new_v4().simple()))
    }

    /// Append a text field; fields are encoded in insertion order
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the `Content-Type` header; carries the exact boundary
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Encode the body, terminated by the closing delimiter
    pub fn build(&self) -> Bytes {
        let mut buf = BytesMut::new();
        for (name, value) in &self.fields {
            buf.put_slice(b"--");
            buf.put_slice(self.boundary.as_bytes());
            buf.put_slice(b"\r\n");
            buf.put_slice(b"Content-Disposition: form-data; name=\"");
            buf.put_slice(name.as_bytes());
            buf.put_slice(b"\"\r\n\r\n");
            buf.put_slice(value.as_bytes());
            buf.put_slice(b"\r\n");
        }
        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");
        buf.freeze()
    }
}
