//! Entry point: one `ApiRequester` wired to a backend and a token store.

use std::sync::Arc;

use crate::backend::{Backend, UreqBackend};
use crate::config::{AuthMode, ClientConfig};
use crate::dispatch::Requester;
use crate::error::ApiError;
use crate::resource::SlimViewRequest;
use crate::storage::{Context, ContextStorage, LocalStorage, TokenStore};
use crate::types::{ApiResponse, Params, RetCode, RETINFO};
use crate::user::UserViewRequest;

/// Build a requester from `config`. With a host `ctx` the token lives in the
/// host's universal storage; without one it lives in `LocalStorage`.
pub fn create_api_requester(config: &ClientConfig, ctx: Option<Context>) -> Result<ApiRequester, ApiError> {
    let store: Arc<dyn TokenStore> = match ctx {
        Some(ctx) => Arc::new(ContextStorage::new(ctx)),
        None => {
            let path = match &config.storage_path {
                Some(path) => path.clone(),
                None => LocalStorage::default_path()?,
            };
            Arc::new(LocalStorage::new(path))
        }
    };
    let backend = Arc::new(UreqBackend::new(&config.remote.api_server, &config.transport));
    Ok(ApiRequester::with_parts(backend, store, config.remote.auth_mode))
}

#[derive(Clone)]
pub struct ApiRequester {
    requester: Requester,
    /// Free for the caller to set; the client itself never reads it.
    pub access_token: Option<String>,
    pub user: UserViewRequest,
    pub example: SlimViewRequest,
}

impl ApiRequester {
    pub fn with_parts(backend: Arc<dyn Backend>, store: Arc<dyn TokenStore>, auth_mode: AuthMode) -> Self {
        let requester = Requester::new(backend, store, auth_mode);
        Self {
            access_token: None,
            user: UserViewRequest::from_requester(requester.clone()),
            example: SlimViewRequest::from_path(requester.clone(), "example"),
            requester,
        }
    }

    /// Message table entries as `(code, text)`.
    pub fn retinfo_table(&self) -> &'static [(RetCode, &'static str)] {
        RETINFO
    }

    pub fn retinfo(&self, code: i64) -> Option<&'static str> {
        RetCode::from_code(code).and_then(RetCode::message)
    }

    pub fn get_access_token(&self) -> Result<Option<String>, ApiError> {
        self.requester.get_access_token()
    }

    pub fn save_access_token(&self, token: &str) -> Result<(), ApiError> {
        self.requester.save_access_token(token)
    }

    /// A client for any other resource, sharing this requester's backend and token.
    pub fn resource(&self, path: &str) -> SlimViewRequest {
        SlimViewRequest::from_path(self.requester.clone(), path)
    }

    pub fn requester(&self) -> &Requester {
        &self.requester
    }

    /// Backend configuration summary.
    pub fn misc(&self) -> Result<ApiResponse, ApiError> {
        self.requester.do_get("/api/misc/info", None, None)
    }

    /// Periodic heartbeat.
    pub fn tick(&self, auid: &str) -> Result<ApiResponse, ApiError> {
        let mut params = Params::new();
        params.insert("auid".to_string(), auid.into());
        self.requester.do_get("/api/misc/tick", Some(&params), None)
    }
}
