//! Synchronous API client for slim-style admin backends.
//!
//! # Overview
//! Wraps the REST-ish conventions of a slim backend (`/api/{resource}/get`,
//! `list/{page}`, `new`, `update`, `delete`, plus the user account endpoints)
//! behind typed resource clients that share one dispatcher, one transport
//! backend and one access-token store.
//!
//! # Design
//! - Requests are built as plain data (`HttpRequest`) and executed by a
//!   `Backend`; `UreqBackend` is the real one, tests plug in fakes.
//! - Every endpoint answers with a `{code, data, msg}` envelope
//!   (`ApiResponse`). Application failures are `Ok` with a non-success code;
//!   only HTTP and transport failures are `Err`.
//! - The access token is read before each request and written on a
//!   successful sign-in, through a `TokenStore` picked once at construction.

pub mod backend;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod http;
pub mod requester;
pub mod resource;
pub mod serialize;
pub mod storage;
pub mod types;
pub mod user;

pub use backend::{Backend, UreqBackend};
pub use config::{AuthMode, ClientConfig};
pub use dispatch::Requester;
pub use error::ApiError;
pub use filter::{filter_values, Filter};
pub use http::{FormData, HttpMethod, HttpRequest, HttpResponse};
pub use requester::{create_api_requester, ApiRequester};
pub use resource::{SlimViewRequest, DEFAULT_PAGE};
pub use serialize::{build_form_data, param_serialize};
pub use storage::{Context, ContextStorage, LocalStorage, MemoryStorage, TokenStore, UniversalStorage};
pub use types::{ApiResponse, Params, RetCode, RETINFO};
pub use user::UserViewRequest;
