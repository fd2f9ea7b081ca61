//! Input validators run before any network use.
//!
//! Each check returns [`ClientError::InvalidParameter`] carrying the caller's
//! context, with the offending field named in `additional_info`.

use crate::error::{ClientError, ClientResult, ErrorContext};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

#[allow(clippy::expect_used)]
static SERVER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._\-]*$").expect("server name pattern compiles")
});

fn invalid(field: &str, message: impl Into<String>, context: &ErrorContext) -> ClientError {
    ClientError::invalid_parameter(message, context.clone().with_info("field", field))
}

fn require_non_blank(field: &str, value: &str, context: &ErrorContext) -> ClientResult<()> {
    if value.trim().is_empty() {
        return Err(invalid(field, format!("{field} must not be empty"), context));
    }
    Ok(())
}

/// Check a server name: non-empty, letters, digits, `.`, `_` and `-` only.
///
/// # Errors
///
/// Returns `InvalidParameter` for an empty name or one with other characters.
pub fn validate_server_name(server_name: &str, context: &ErrorContext) -> ClientResult<()> {
    require_non_blank("server_name", server_name, context)?;
    if !SERVER_NAME.is_match(server_name) {
        return Err(invalid(
            "server_name",
            format!("server name '{server_name}' contains characters outside [A-Za-z0-9._-]"),
            context,
        ));
    }
    Ok(())
}

/// Check a platform or endpoint URL: `http`/`https` scheme and a host.
///
/// # Errors
///
/// Returns `InvalidParameter` when the URL does not parse, has another
/// scheme, or has no host.
pub fn validate_url(url: &str, context: &ErrorContext) -> ClientResult<Url> {
    require_non_blank("url", url, context)?;
    let parsed = Url::parse(url.trim())
        .map_err(|e| invalid("url", format!("'{url}' is not a valid URL: {e}"), context))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(
            "url",
            format!("'{url}' must use the http or https scheme"),
            context,
        ));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("url", format!("'{url}' has no host"), context));
    }
    Ok(parsed)
}

/// Check a user id is present.
///
/// # Errors
///
/// Returns `InvalidParameter` for an empty or blank user id.
pub fn validate_user_id(user_id: &str, context: &ErrorContext) -> ClientResult<()> {
    require_non_blank("user_id", user_id, context)
}

/// Check a GUID is present.
///
/// # Errors
///
/// Returns `InvalidParameter` for an empty or blank GUID.
pub fn validate_guid(guid: &str, context: &ErrorContext) -> ClientResult<()> {
    require_non_blank("guid", guid, context)
}

/// Check an element name is present.
///
/// # Errors
///
/// Returns `InvalidParameter` for an empty or blank name.
pub fn validate_name(name: &str, context: &ErrorContext) -> ClientResult<()> {
    require_non_blank("name", name, context)
}

/// Check a search string is present and not the bare `*` wildcard.
///
/// # Errors
///
/// Returns `InvalidParameter` for an empty string or a lone `*`.
pub fn validate_search_string(search: &str, context: &ErrorContext) -> ClientResult<()> {
    require_non_blank("search_string", search, context)?;
    if search.trim() == "*" {
        return Err(invalid(
            "search_string",
            "use a match-all search instead of a bare '*'",
            context,
        ));
    }
    Ok(())
}
