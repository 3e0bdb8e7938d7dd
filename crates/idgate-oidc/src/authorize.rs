//! Authorization request URL.

use crate::config::ProviderConfig;
use crate::errors::{OidcError, Result};
use crate::types::OidcConfiguration;
use url::Url;

/// Build the provider authorization URL for the code flow
pub fn build_authorization_url(
    config: &ProviderConfig,
    discovery: &OidcConfiguration,
    redirect_uri: &str,
    state: &str,
    nonce: &str,
) -> Result<String> {
    let mut url = Url::parse(&discovery.authorization_endpoint).map_err(|e| {
        OidcError::Discovery(format!("Invalid authorization endpoint: {e}"))
    })?;

    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("client_id", &config.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &config.scopes.join(" "))
            .append_pair("state", state)
            .append_pair("nonce", nonce);

        if let Some(acr_values) = &config.acr_values {
            query.append_pair("acr_values", acr_values);
        }
    }

    Ok(url.to_string())
}
