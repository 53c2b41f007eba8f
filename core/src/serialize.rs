//! Query-string and form-body serialization of flat parameter mappings.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

use crate::http::FormData;
use crate::types::Params;

/// Characters left unescaped by `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Render a parameter value as the text sent on the wire.
///
/// Strings go out verbatim; everything else uses its JSON text, so numbers and
/// booleans look as expected and nested values at least survive intact.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, URI_COMPONENT).to_string()
}

/// Serialize `params` as `k1=v1&k2=v2`, in the mapping's insertion order.
pub fn param_serialize(params: &Params) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(&render_value(v))))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build a form body with one field per key. `None` means "no body".
pub fn build_form_data(data: Option<&Params>) -> Option<FormData> {
    let data = data?;
    let mut form = FormData::new();
    for (k, v) in data {
        form.append(k.as_str(), render_value(v));
    }
    Some(form)
}
