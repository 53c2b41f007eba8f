//! Wire-level DTOs shared by every resource client.
//!
//! # Design
//! The slim backend answers every call with a `{code, data, msg}` envelope;
//! `code` is the application-level outcome and is independent of the HTTP
//! status. Payloads vary per resource, so `data` stays a `serde_json::Value`.
//! DTOs are defined independently from the mock-server crate; integration
//! tests catch schema drift.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A flat key/value mapping used for query parameters and form bodies.
/// Iteration follows insertion order.
pub type Params = serde_json::Map<String, Value>;

/// Application-level return codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum RetCode {
    Success = 0,
    Failed = -255,
}

impl RetCode {
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(RetCode::Success),
            -255 => Some(RetCode::Failed),
            _ => None,
        }
    }

    /// Human-readable text from `RETINFO`, when the table has one.
    pub fn message(self) -> Option<&'static str> {
        RETINFO
            .iter()
            .find(|(code, _)| *code == self)
            .map(|(_, text)| *text)
    }
}

/// Message table. Deliberately partial: only success has a canned message.
pub const RETINFO: &[(RetCode, &str)] = &[(RetCode::Success, "操作已成功完成")];

/// The `{code, data, msg}` body every slim endpoint responds with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub code: i64,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.code == RetCode::Success.code()
    }

    pub fn retcode(&self) -> Option<RetCode> {
        RetCode::from_code(self.code)
    }
}
