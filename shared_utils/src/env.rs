use thiserror::Error;

/// An environment variable required by the application is not set.
#[derive(Debug, Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVarError(pub String);

/// Reads an environment variable, returning a structured error if it's missing.
///
/// A variable that is set but blank counts as missing, so an empty line in a
/// `.env` file does not turn into an empty credential.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, MissingEnvVarError> {
    get_optional_env_var(name).ok_or_else(|| MissingEnvVarError(name.to_string()))
}

/// Reads an environment variable that is allowed to be absent.
///
/// Surrounding whitespace is trimmed; blank values yield `None`.
pub fn get_optional_env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Returns `explicit` when it carries a value, otherwise falls back to the
/// environment variable `name`.
///
/// Command-line flags take priority over the environment this way.
pub fn explicit_or_env(explicit: Option<String>, name: &str) -> Result<String, MissingEnvVarError> {
    match explicit.filter(|value| !value.trim().is_empty()) {
        Some(value) => Ok(value),
        None => get_env_var(name),
    }
}
