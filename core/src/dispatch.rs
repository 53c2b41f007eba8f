//! Request dispatcher shared by every resource client.
//!
//! # Design
//! `Requester` is the only place that knows about auth headers, query strings
//! and form bodies. Building a request is pure (`build_request`); executing it
//! goes through the `Backend`, and the response passes through `intercept`,
//! which unwraps the `{code, data, msg}` envelope of 2xx responses and turns
//! everything else into an `ApiError` carrying the raw status and body.

use std::sync::Arc;

use tracing::debug;

use crate::backend::Backend;
use crate::config::AuthMode;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::serialize::{build_form_data, param_serialize};
use crate::storage::{TokenStore, TOKEN_KEY};
use crate::types::{ApiResponse, Params};

pub const ACCESS_TOKEN_HEADER: &str = "AccessToken";
pub const ROLE_HEADER: &str = "Role";

#[derive(Clone)]
pub struct Requester {
    backend: Arc<dyn Backend>,
    store: Arc<dyn TokenStore>,
    auth_mode: AuthMode,
}

impl Requester {
    pub fn new(backend: Arc<dyn Backend>, store: Arc<dyn TokenStore>, auth_mode: AuthMode) -> Self {
        Self {
            backend,
            store,
            auth_mode,
        }
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.auth_mode
    }

    /// The stored token; an empty string counts as no token.
    pub fn get_access_token(&self) -> Result<Option<String>, ApiError> {
        Ok(self.store.get(TOKEN_KEY)?.filter(|t| !t.is_empty()))
    }

    pub fn save_access_token(&self, token: &str) -> Result<(), ApiError> {
        self.store.set(TOKEN_KEY, token)
    }

    /// Assemble the request `do_request` would send, without sending it.
    pub fn build_request(
        &self,
        url: &str,
        method: HttpMethod,
        params: Option<&Params>,
        data: Option<&Params>,
        role: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        let mut headers = Vec::new();
        let mut path = url.to_string();
        let mut params = params.cloned();

        if let Some(token) = self.get_access_token()? {
            match self.auth_mode {
                AuthMode::AccessToken => headers.push((ACCESS_TOKEN_HEADER.to_string(), token)),
                AuthMode::AccessTokenInParams => {
                    params
                        .get_or_insert_with(Params::new)
                        .insert(ACCESS_TOKEN_HEADER.to_string(), token.into());
                }
            }
        }

        if let Some(role) = role {
            headers.push((ROLE_HEADER.to_string(), role.to_string()));
        }

        if let Some(params) = &params {
            path.push('?');
            path.push_str(&param_serialize(params));
        }

        Ok(HttpRequest {
            method,
            path,
            headers,
            body: build_form_data(data),
        })
    }

    pub fn do_request(
        &self,
        url: &str,
        method: HttpMethod,
        params: Option<&Params>,
        data: Option<&Params>,
        role: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        let request = self.build_request(url, method, params, data, role)?;
        debug!(
            method = method.as_str(),
            path = %request.path,
            token = request.header(ACCESS_TOKEN_HEADER).is_some(),
            role = role.unwrap_or(""),
            "dispatching request"
        );
        intercept(self.backend.send(&request)?)
    }

    pub fn do_get(
        &self,
        url: &str,
        params: Option<&Params>,
        role: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        self.do_request(url, HttpMethod::Get, params, None, role)
    }

    pub fn do_post(
        &self,
        url: &str,
        params: Option<&Params>,
        data: Option<&Params>,
        role: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        self.do_request(url, HttpMethod::Post, params, data, role)
    }
}

/// Unwrap a 2xx body into its envelope; reject anything else unchanged.
fn intercept(response: HttpResponse) -> Result<ApiResponse, ApiError> {
    if !response.is_success() {
        return Err(ApiError::HttpError {
            status: response.status,
            body: response.body,
        });
    }
    serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::storage::{Context, ContextStorage, MemoryStorage};

    struct Canned {
        status: u16,
        body: &'static str,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Backend for Canned {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(HttpResponse {
                status: self.status,
                headers: Vec::new(),
                body: self.body.to_string(),
            })
        }
    }

    fn requester(status: u16, body: &'static str, mode: AuthMode) -> (Requester, Arc<Canned>) {
        let backend = Arc::new(Canned {
            status,
            body,
            seen: Mutex::new(Vec::new()),
        });
        let store = Arc::new(ContextStorage::new(Context::new(Arc::new(MemoryStorage::new()))));
        (Requester::new(backend.clone(), store, mode), backend)
    }

    fn params(value: serde_json::Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn no_token_no_role_means_no_headers() {
        let (r, _) = requester(200, "{}", AuthMode::AccessToken);
        let req = r
            .build_request("/api/misc/info", HttpMethod::Get, None, None, None)
            .unwrap();
        assert!(req.headers.is_empty());
        assert_eq!(req.path, "/api/misc/info");
        assert!(req.body.is_none());
    }

    #[test]
    fn token_and_role_become_headers() {
        let (r, _) = requester(200, "{}", AuthMode::AccessToken);
        r.save_access_token("tok").unwrap();
        let req = r
            .build_request("/api/x/get", HttpMethod::Get, None, None, Some("admin"))
            .unwrap();
        assert_eq!(req.header("AccessToken"), Some("tok"));
        assert_eq!(req.header("Role"), Some("admin"));
    }

    #[test]
    fn empty_token_is_treated_as_absent() {
        let (r, _) = requester(200, "{}", AuthMode::AccessToken);
        r.save_access_token("").unwrap();
        let req = r
            .build_request("/api/x/get", HttpMethod::Get, None, None, None)
            .unwrap();
        assert!(req.header("AccessToken").is_none());
    }

    #[test]
    fn token_in_params_mode_moves_token_to_query() {
        let (r, _) = requester(200, "{}", AuthMode::AccessTokenInParams);
        r.save_access_token("tok").unwrap();
        let req = r
            .build_request("/api/x/get", HttpMethod::Get, Some(&params(json!({"id": 1}))), None, None)
            .unwrap();
        assert!(req.header("AccessToken").is_none());
        assert_eq!(req.path, "/api/x/get?id=1&AccessToken=tok");
    }

    #[test]
    fn params_are_appended_and_data_becomes_form() {
        let (r, _) = requester(200, "{}", AuthMode::AccessToken);
        let req = r
            .build_request(
                "/api/x/update",
                HttpMethod::Post,
                Some(&params(json!({"id": "a b"}))),
                Some(&params(json!({"title": "t"}))),
                None,
            )
            .unwrap();
        assert_eq!(req.path, "/api/x/update?id=a%20b");
        assert_eq!(req.body.unwrap().get("title"), Some("t"));
    }

    #[test]
    fn success_body_is_unwrapped() {
        let (r, backend) = requester(200, r#"{"code":0,"data":{"n":1}}"#, AuthMode::AccessToken);
        let resp = r.do_get("/api/misc/info", None, None).unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.data, json!({"n": 1}));
        assert_eq!(backend.seen.lock().unwrap()[0].method, HttpMethod::Get);
    }

    #[test]
    fn non_2xx_is_rejected_with_status_and_body() {
        let (r, _) = requester(500, "boom", AuthMode::AccessToken);
        let err = r.do_post("/api/x/new", None, None, None).unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 500, ref body } if body == "boom"));
    }

    #[test]
    fn non_envelope_body_is_a_deserialization_error() {
        let (r, _) = requester(200, "not json", AuthMode::AccessToken);
        let err = r.do_get("/api/misc/info", None, None).unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }
}
