//! S3 credential resolution
//!
//! Credentials given in the configuration file win. Otherwise the AWS
//! default provider chain is used (environment, profile, IMDS, ...), which
//! resolves lazily on the first signed request.

use crate::config::S3Config;
use aws_credential_types::Credentials;
use thiserror::Error;

/// Provider name reported by the SDK for configured keys
const PROVIDER_NAME: &str = "bulk-uploadr-config";

/// Credential loading errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
}

/// Where the S3 client gets its credentials
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Keys from the configuration file
    Static(Credentials),
    /// AWS default provider chain
    DefaultChain,
}

impl CredentialSource {
    /// Pick the credential source for an S3 configuration
    pub fn from_config(config: &S3Config) -> Result<Self, CredentialsError> {
        match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => Ok(CredentialSource::Static(Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                config.session_token.clone(),
                None,
                PROVIDER_NAME,
            ))),
            (None, None) => Ok(CredentialSource::DefaultChain),
            (Some(_), None) => Err(CredentialsError::MissingCredentials(
                "secret_key not set in config".into(),
            )),
            (None, Some(_)) => Err(CredentialsError::MissingCredentials(
                "access_key not set in config".into(),
            )),
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, CredentialSource::Static(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s3_config(access_key: Option<&str>, secret_key: Option<&str>) -> S3Config {
        S3Config {
            access_key: access_key.map(String::from),
            secret_key: secret_key.map(String::from),
            ..S3Config::default()
        }
    }

    #[test]
    fn test_from_config_static() {
        let source =
            CredentialSource::from_config(&s3_config(Some("config-access"), Some("config-secret")))
                .unwrap();
        match source {
            CredentialSource::Static(creds) => {
                assert_eq!(creds.access_key_id(), "config-access");
                assert_eq!(creds.secret_access_key(), "config-secret");
                assert!(creds.session_token().is_none());
            }
            CredentialSource::DefaultChain => panic!("Expected static credentials"),
        }
    }

    #[test]
    fn test_from_config_session_token() {
        let mut config = s3_config(Some("access"), Some("secret"));
        config.session_token = Some("token".into());
        match CredentialSource::from_config(&config).unwrap() {
            CredentialSource::Static(creds) => assert_eq!(creds.session_token(), Some("token")),
            CredentialSource::DefaultChain => panic!("Expected static credentials"),
        }
    }

    #[test]
    fn test_from_config_default_chain() {
        let source = CredentialSource::from_config(&s3_config(None, None)).unwrap();
        assert!(!source.is_static());
    }

    #[test]
    fn test_from_config_missing_half() {
        assert!(CredentialSource::from_config(&s3_config(Some("access"), None)).is_err());
        assert!(CredentialSource::from_config(&s3_config(None, Some("secret"))).is_err());
    }
}
