//! Response envelope decoding
//!
//! The API wraps results as `{ success, message, data }`, but auth payloads
//! have been seen both inside `data` and at the top level. Both are accepted.

use serde_json::Value;

use crate::auth::User;

/// User and token carried by login and refresh responses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthPayload {
    pub user: Option<User>,
    pub access_token: Option<String>,
}

impl AuthPayload {
    pub fn from_value(body: &Value) -> Self {
        let top = Self::extract(body);
        if top.access_token.is_some() {
            return top;
        }
        match body.get("data") {
            Some(data) => Self::extract(data),
            None => top,
        }
    }

    fn extract(value: &Value) -> Self {
        let access_token = value
            .get("accessToken")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        let user = value
            .get("user")
            .and_then(|u| serde_json::from_value::<User>(u.clone()).ok());
        Self { user, access_token }
    }
}

/// The `data` member of an envelope, or the body itself when unwrapped
pub fn envelope_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
        other => other,
    }
}
