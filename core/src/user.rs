//! The `user` resource: generic CRUD plus the account endpoints.

use std::ops::Deref;

use serde_json::Value;
use tracing::{info, warn};

use crate::dispatch::Requester;
use crate::error::ApiError;
use crate::resource::SlimViewRequest;
use crate::types::{ApiResponse, Params};

pub const USER_PATH: &str = "user";

/// Account operations layered over a `SlimViewRequest` for `user`.
/// Derefs to the inner view so `get`/`list`/`update`/... remain callable.
#[derive(Clone)]
pub struct UserViewRequest {
    view: SlimViewRequest,
}

impl UserViewRequest {
    pub fn from_requester(requester: Requester) -> Self {
        Self {
            view: SlimViewRequest::from_path(requester, USER_PATH),
        }
    }

    pub fn view(&self) -> &SlimViewRequest {
        &self.view
    }

    fn url(&self, op: &str) -> String {
        format!("{}/{op}", self.view.url_prefix())
    }

    /// Sign in and, on success, remember the returned access token.
    /// The response is returned whatever its code.
    pub fn signin(&self, data: Params) -> Result<ApiResponse, ApiError> {
        let requester = self.view.requester();
        let ret = requester.do_post(&self.url("signin"), None, Some(&data), None)?;
        if ret.is_success() {
            match ret.data.get("access_token").and_then(Value::as_str) {
                Some(token) => {
                    requester.save_access_token(token)?;
                    info!("signed in, access token saved");
                }
                None => warn!("signin succeeded without an access_token in the response"),
            }
        }
        Ok(ret)
    }

    pub fn signup(&self, data: Params) -> Result<ApiResponse, ApiError> {
        self.view
            .requester()
            .do_post(&self.url("signup"), None, Some(&data), None)
    }

    pub fn change_password(&self, old_password: &str, password: &str) -> Result<ApiResponse, ApiError> {
        let mut data = Params::new();
        data.insert("old_password".to_string(), old_password.into());
        data.insert("password".to_string(), password.into());
        self.view
            .requester()
            .do_post(&self.url("change_password"), None, Some(&data), None)
    }

    /// Server-side sign-out. The locally stored token is left in place.
    pub fn signout(&self) -> Result<ApiResponse, ApiError> {
        self.view
            .requester()
            .do_post(&self.url("signout"), None, None, None)
    }
}

impl Deref for UserViewRequest {
    type Target = SlimViewRequest;

    fn deref(&self) -> &SlimViewRequest {
        &self.view
    }
}
