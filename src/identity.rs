/// Account identifier extraction for provider identity lookups
use crate::error::{OAuthError, Result};
use serde_json::Value;

/// Resolve a `$.field.nested` path against an identity response body
///
/// Only the root marker and dotted object keys are understood, which is
/// all an `account_identifier` expression needs.
///
/// # Examples
///
/// ```
/// use farbe::identity::resolve;
/// use serde_json::json;
///
/// let body = json!({ "id": "usrAbc", "email": "a@example.com" });
/// assert_eq!(resolve(&body, "$.id").unwrap(), "usrAbc");
/// ```
pub fn resolve(body: &Value, path: &str) -> Result<String> {
    let rest = path
        .strip_prefix('$')
        .ok_or_else(|| OAuthError::InvalidResponse(format!("Unsupported identity path: {path}")))?;

    let mut current = body;
    if !rest.is_empty() {
        let keys = rest.strip_prefix('.').ok_or_else(|| {
            OAuthError::InvalidResponse(format!("Unsupported identity path: {path}"))
        })?;

        for key in keys.split('.') {
            if key.is_empty() {
                return Err(OAuthError::InvalidResponse(format!(
                    "Empty segment in identity path: {path}"
                )));
            }
            current = current
                .get(key)
                .ok_or_else(|| OAuthError::MissingField(path.to_string()))?;
        }
    }

    match current {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Err(OAuthError::MissingField(path.to_string())),
        other => Err(OAuthError::InvalidResponse(format!(
            "Identity path {path} selected a non-scalar value: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_top_level_field() {
        let body = json!({ "id": "usrXYZ", "scopes": ["data.records:read"] });
        assert_eq!(resolve(&body, "$.id").unwrap(), "usrXYZ");
    }

    #[test]
    fn test_resolve_nested_and_numeric() {
        let body = json!({ "user": { "account": { "id": 42 } } });
        assert_eq!(resolve(&body, "$.user.account.id").unwrap(), "42");
    }

    #[test]
    fn test_resolve_root_scalar() {
        let body = json!("usrRoot");
        assert_eq!(resolve(&body, "$").unwrap(), "usrRoot");
    }

    #[test]
    fn test_missing_field() {
        let body = json!({ "email": "someone@example.com" });
        assert!(matches!(
            resolve(&body, "$.id"),
            Err(OAuthError::MissingField(_))
        ));

        let body = json!({ "id": null });
        assert!(matches!(
            resolve(&body, "$.id"),
            Err(OAuthError::MissingField(_))
        ));
    }

    #[test]
    fn test_malformed_paths() {
        let body = json!({ "id": "usr" });
        assert!(matches!(
            resolve(&body, "id"),
            Err(OAuthError::InvalidResponse(_))
        ));
        assert!(matches!(
            resolve(&body, "$id"),
            Err(OAuthError::InvalidResponse(_))
        ));
        assert!(matches!(
            resolve(&body, "$..id"),
            Err(OAuthError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_non_scalar_selection() {
        let body = json!({ "user": { "id": "usr" } });
        assert!(matches!(
            resolve(&body, "$.user"),
            Err(OAuthError::InvalidResponse(_))
        ));
    }
}
