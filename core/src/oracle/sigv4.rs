//! SigV4 signing for Bedrock `InvokeModel` when no Bedrock API key is set.
//!
//! Credentials come from the standard AWS chain (environment, shared profile,
//! SSO, container and instance roles) unless the oracle was handed a provider.

use std::time::Duration;
use std::time::SystemTime;

use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_credential_types::Credentials;
use aws_credential_types::provider::ProvideCredentials;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::provider::error::CredentialsError;
use aws_sigv4::http_request::SignableBody;
use aws_sigv4::http_request::SignableRequest;
use aws_sigv4::http_request::SigningSettings;
use aws_sigv4::http_request::sign;
use aws_sigv4::sign::v4;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;

use super::OracleError;
use super::OracleResult;

/// Service name Bedrock runtime expects in the credential scope.
const BEDROCK_SIGNING_NAME: &str = "bedrock";

/// Resolve credentials from `provider`, or from the default chain for
/// `region` when none was given. Bounded by `timeout`.
pub(crate) async fn resolve_credentials(
    provider: Option<&SharedCredentialsProvider>,
    region: &str,
    timeout: Duration,
) -> OracleResult<Credentials> {
    let lookup = async {
        let provider = match provider {
            Some(provider) => provider.clone(),
            None => aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(region.to_string()))
                .load()
                .await
                .credentials_provider()
                .ok_or(OracleError::NotAuthenticated)?,
        };
        provider
            .provide_credentials()
            .await
            .map_err(credentials_error)
    };

    tokio::time::timeout(timeout, lookup)
        .await
        .map_err(|_| OracleError::Timeout)?
}

fn credentials_error(err: CredentialsError) -> OracleError {
    match err {
        CredentialsError::CredentialsNotLoaded(_) => OracleError::NotAuthenticated,
        other => OracleError::AwsCredentials(other.to_string()),
    }
}

/// Add SigV4 headers (`authorization`, `x-amz-date`, and
/// `x-amz-security-token` for temporary credentials) to `headers`.
pub(crate) fn sign_request(
    url: &str,
    headers: &mut HeaderMap,
    body: &[u8],
    region: &str,
    credentials: Credentials,
) -> OracleResult<()> {
    let identity = credentials.into();
    let params = v4::SigningParams::builder()
        .identity(&identity)
        .region(region)
        .name(BEDROCK_SIGNING_NAME)
        .time(SystemTime::now())
        .settings(SigningSettings::default())
        .build()
        .map_err(|e| OracleError::Signing(e.to_string()))?
        .into();

    let instructions = {
        let signed_headers = headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)));
        let signable =
            SignableRequest::new("POST", url, signed_headers, SignableBody::Bytes(body))
                .map_err(|e| OracleError::Signing(e.to_string()))?;
        let (instructions, _signature) = sign(signable, &params)
            .map_err(|e| OracleError::Signing(e.to_string()))?
            .into_parts();
        instructions
    };

    for (name, value) in instructions.headers() {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| OracleError::Signing(e.to_string()))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| OracleError::Signing(e.to_string()))?;
        headers.insert(name, value);
    }
    Ok(())
}
