use crate::server::http_result::{ApiError, ApiResult};

/// GitHub caps logins at 39 characters
pub const MAX_LOGIN_LEN: usize = 39;

/// First value of `name` in a raw query string, percent-decoded
pub fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// The `username` query parameter, checked against GitHub's login rules.
pub fn required_username(query: Option<&str>) -> ApiResult<String> {
    let username = query_param(query, "username")
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::Validation("Username is required".to_string()))?;

    if !is_valid_login(&username) {
        return Err(ApiError::Validation("Invalid username".to_string()));
    }
    Ok(username)
}

/// ASCII letters, digits and inner hyphens, at most 39 characters
fn is_valid_login(login: &str) -> bool {
    login.len() <= MAX_LOGIN_LEN
        && !login.starts_with('-')
        && !login.ends_with('-')
        && login.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}
