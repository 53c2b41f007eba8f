//! Generic CRUD client for one backend resource.
//!
//! # Design
//! A `SlimViewRequest` is a resource path plus a handle to the shared
//! `Requester`. URLs follow the slim view conventions under `/api/{path}`:
//! `get`, `list/{page}[/{size}]`, `update`, `new`, `delete`.

use serde_json::Value;

use crate::dispatch::Requester;
use crate::error::ApiError;
use crate::filter::{filter_values, Filter};
use crate::types::{ApiResponse, Params};

pub const DEFAULT_PAGE: u32 = 1;

#[derive(Clone)]
pub struct SlimViewRequest {
    path: String,
    url_prefix: String,
    requester: Requester,
}

impl SlimViewRequest {
    pub fn from_path(requester: Requester, path: &str) -> Self {
        Self {
            path: path.to_string(),
            url_prefix: format!("/api/{path}"),
            requester,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    pub(crate) fn requester(&self) -> &Requester {
        &self.requester
    }

    /// Fetch one record.
    pub fn get(&self, params: Option<&Params>, role: Option<&str>) -> Result<ApiResponse, ApiError> {
        let params = params.map(with_serialized_loadfk);
        self.requester
            .do_get(&format!("{}/get", self.url_prefix), params.as_ref(), role)
    }

    /// Fetch one page of records. `size: None` or `Some(0)` leaves the page
    /// size to the server.
    pub fn list(
        &self,
        params: Option<&Params>,
        page: u32,
        size: Option<u32>,
        role: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        let params = params.map(with_serialized_loadfk);
        let mut url = format!("{}/list/{page}", self.url_prefix);
        if let Some(size) = size.filter(|&size| size > 0) {
            url.push_str(&format!("/{size}"));
        }
        self.requester.do_get(&url, params.as_ref(), role)
    }

    /// Alias of `update`.
    pub fn set(
        &self,
        params: Option<&Params>,
        data: Params,
        role: Option<&str>,
        filter: Option<&Filter>,
    ) -> Result<ApiResponse, ApiError> {
        self.update(params, data, role, filter)
    }

    pub fn update(
        &self,
        params: Option<&Params>,
        data: Params,
        role: Option<&str>,
        filter: Option<&Filter>,
    ) -> Result<ApiResponse, ApiError> {
        let data = apply_filter(filter, data);
        self.requester.do_post(
            &format!("{}/update", self.url_prefix),
            params,
            Some(&data),
            role,
        )
    }

    /// Create a record.
    pub fn new(
        &self,
        data: Params,
        role: Option<&str>,
        filter: Option<&Filter>,
    ) -> Result<ApiResponse, ApiError> {
        let data = apply_filter(filter, data);
        self.requester
            .do_post(&format!("{}/new", self.url_prefix), None, Some(&data), role)
    }

    pub fn delete(&self, params: Option<&Params>, role: Option<&str>) -> Result<ApiResponse, ApiError> {
        self.requester
            .do_post(&format!("{}/delete", self.url_prefix), params, None, role)
    }
}

fn apply_filter(filter: Option<&Filter>, data: Params) -> Params {
    match filter {
        Some(filter) => filter_values(filter, data),
        None => data,
    }
}

/// Copy of `params` with `loadfk` encoded as JSON text, strings included.
/// Empty values (`null`, `false`, `0`, `""`) are passed through as given.
fn with_serialized_loadfk(params: &Params) -> Params {
    let mut params = params.clone();
    if let Some(loadfk) = params.get_mut("loadfk") {
        if is_truthy(loadfk) {
            *loadfk = Value::String(loadfk.to_string());
        }
    }
    params
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn structured_loadfk_is_encoded_once() {
        let params = json!({"id": 1, "loadfk": {"user_id": null}}).as_object().cloned().unwrap();
        let out = with_serialized_loadfk(&params);
        assert_eq!(out["loadfk"], json!(r#"{"user_id":null}"#));
        assert_eq!(out["id"], json!(1));
        // The caller's mapping is untouched.
        assert!(params["loadfk"].is_object());
    }

    #[test]
    fn string_loadfk_is_encoded_as_json_text() {
        let params = json!({"loadfk": "user_id"}).as_object().cloned().unwrap();
        let out = with_serialized_loadfk(&params);
        assert_eq!(out["loadfk"], json!("\"user_id\""));
    }

    #[test]
    fn empty_loadfk_is_passed_through() {
        for empty in [json!(null), json!(false), json!(0), json!("")] {
            let params = json!({"loadfk": empty.clone()}).as_object().cloned().unwrap();
            assert_eq!(with_serialized_loadfk(&params)["loadfk"], empty);
        }
    }

    #[test]
    fn no_filter_passes_data_through() {
        let data = json!({"a": 1}).as_object().cloned().unwrap();
        assert_eq!(apply_filter(None, data.clone()), data);
    }
}
