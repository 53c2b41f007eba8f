//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. The dispatcher builds an
//! `HttpRequest` whose `path` is relative to the API server; a `Backend`
//! (see `backend.rs`) joins it onto its base URL and performs the round-trip.
//! Keeping these as owned values means a request can be inspected, logged, or
//! replayed by a fake backend in tests without touching the network.

use uuid::Uuid;

/// HTTP method for a request. The slim conventions only use GET and POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// A `multipart/form-data` payload with one text field per entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: Vec<(String, String)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Encode the fields as a multipart body. Returns the `Content-Type`
    /// header value (carrying the boundary) and the body bytes.
    pub fn encode(&self) -> (String, Vec<u8>) {
        let boundary = format!("----slimapi{}", Uuid::new_v4().simple());
        (
            format!("multipart/form-data; boundary={boundary}"),
            self.encode_with_boundary(&boundary),
        )
    }

    fn encode_with_boundary(&self, boundary: &str) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in &self.fields {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    escape_field_name(name)
                )
                .as_bytes(),
            );
            body.extend_from_slice(value.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        body
    }
}

// Same escaping browsers apply to form field names.
fn escape_field_name(name: &str) -> String {
    name.replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// An HTTP request described as plain data.
///
/// `path` is relative to the API server (e.g. `/api/user/get?id=1`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<FormData>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data, as returned by a `Backend`.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_data_encodes_each_field_as_a_part() {
        let mut form = FormData::new();
        form.append("username", "alice");
        form.append("password", "s3cret");

        let body = form.encode_with_boundary("XYZ");
        let text = String::from_utf8(body).unwrap();
        assert_eq!(
            text,
            "--XYZ\r\n\
             Content-Disposition: form-data; name=\"username\"\r\n\r\nalice\r\n\
             --XYZ\r\n\
             Content-Disposition: form-data; name=\"password\"\r\n\r\ns3cret\r\n\
             --XYZ--\r\n"
        );
    }

    #[test]
    fn encode_content_type_carries_boundary() {
        let mut form = FormData::new();
        form.append("a", "1");
        let (content_type, body) = form.encode();
        let boundary = content_type
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap();
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with(&format!("--{boundary}\r\n")));
        assert!(text.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn field_names_with_quotes_are_escaped() {
        assert_eq!(escape_field_name("a\"b"), "a%22b");
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let req = HttpRequest {
            method: HttpMethod::Get,
            path: "/api/misc/info".to_string(),
            headers: vec![("AccessToken".to_string(), "tok".to_string())],
            body: None,
        };
        assert_eq!(req.header("accesstoken"), Some("tok"));
        assert_eq!(req.header("Role"), None);
    }

    #[test]
    fn response_success_range() {
        let mut resp = HttpResponse {
            status: 204,
            headers: Vec::new(),
            body: String::new(),
        };
        assert!(resp.is_success());
        resp.status = 404;
        assert!(!resp.is_success());
    }
}
