//! Credential resolution.
//!
//! Explicit parameters win; environment variables are the fallback. Missing
//! credentials are a fatal configuration error raised before any remote
//! call is attempted.

use crate::reconciler::ApplyError;

/// Environment fallback for the API key.
pub const API_KEY_ENV: &str = "NIMBUS_API_KEY";
/// Environment fallback for the API secret.
pub const API_SECRET_ENV: &str = "NIMBUS_API_SECRET";

/// API key/secret pair.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
}

/// Resolves credentials from explicit parameters or the environment.
pub fn resolve_credentials(
    key: Option<String>,
    secret: Option<String>,
) -> Result<Credentials, ApplyError> {
    resolve_from(key, secret, |name| std::env::var(name).ok())
}

fn resolve_from(
    key: Option<String>,
    secret: Option<String>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Credentials, ApplyError> {
    let key = key.or_else(|| env(API_KEY_ENV)).ok_or_else(|| {
        ApplyError::Config(format!(
            "API key missing: pass --api-key or set {}",
            API_KEY_ENV
        ))
    })?;
    let secret = secret.or_else(|| env(API_SECRET_ENV)).ok_or_else(|| {
        ApplyError::Config(format!(
            "API secret missing: pass --api-secret or set {}",
            API_SECRET_ENV
        ))
    })?;
    Ok(Credentials { key, secret })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn explicit_parameters_win_over_environment() {
        let creds = resolve_from(Some("k1".into()), Some("s1".into()), |name| {
            Some(format!("env-{}", name))
        })
        .unwrap();
        assert_eq!(creds.key, "k1");
        assert_eq!(creds.secret, "s1");
    }

    #[test]
    fn environment_fills_missing_parameters() {
        let creds = resolve_from(None, None, |name| match name {
            API_KEY_ENV => Some("ek".into()),
            API_SECRET_ENV => Some("es".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(creds.key, "ek");
        assert_eq!(creds.secret, "es");
    }

    #[test]
    fn missing_credentials_are_a_config_error() {
        let err = resolve_from(None, None, no_env).unwrap_err();
        assert!(matches!(err, ApplyError::Config(_)));

        let err = resolve_from(Some("k".into()), None, no_env).unwrap_err();
        assert!(matches!(err, ApplyError::Config(_)));
    }
}
