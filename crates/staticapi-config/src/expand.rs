//! Environment variable expansion for configuration strings.
//!
//! Supports `${VAR}` (errors if unset) and `${VAR:-default}` (falls back to
//! the default if unset).

use crate::ConfigError;

/// Expand environment variable references in a configuration string.
///
/// `field` is the config field path used in error messages (e.g.
/// `links.base_url`).
///
/// # Errors
///
/// Returns [`ConfigError::EnvVar`] for an unclosed `${` reference, an empty
/// variable name, or an unset variable without a default.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    let env_err = |message: String| ConfigError::EnvVar {
        field: field.to_owned(),
        message,
    };

    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            return Err(env_err("unclosed ${ reference".to_owned()));
        };

        let expr = &after[..end];
        let (name, default) = match expr.split_once(":-") {
            Some((name, default)) => (name, Some(default)),
            None => (expr, None),
        };
        if name.is_empty() {
            return Err(env_err("empty variable name in ${} reference".to_owned()));
        }

        match std::env::var(name) {
            Ok(resolved) => out.push_str(&resolved),
            Err(_) => match default {
                Some(default) => out.push_str(default),
                None => return Err(env_err(format!("${{{name}}} not set"))),
            },
        }

        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}
