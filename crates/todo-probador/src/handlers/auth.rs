//! Login command handler

use crate::config::CliConfig;
use crate::error::CliResult;
use todo_probar::{login_and_store, AuthToken, HarnessConfig, ToDoClient, TokenStore};

/// Execute `todo-probador login`: authenticate once and persist the token.
pub async fn execute_login(config: &CliConfig) -> CliResult<()> {
    let harness = HarnessConfig::from_env()?;
    let token = login_with(&harness).await?;
    if !config.verbosity.is_quiet() {
        println!(
            "Token saved to {} ({})",
            harness.token_path.display(),
            token.preview()
        );
    }
    Ok(())
}

/// Log in with the configured credentials and store the token.
pub(crate) async fn login_with(harness: &HarnessConfig) -> CliResult<AuthToken> {
    let credentials = harness.require_credentials()?;
    let client = base_client(harness)?;
    let store = TokenStore::new(&harness.token_path);
    Ok(login_and_store(&client, credentials, &store).await?)
}

/// Client configured with the harness' timeouts and TLS policy, without a token.
pub fn base_client(harness: &HarnessConfig) -> CliResult<ToDoClient> {
    Ok(ToDoClient::with_client(
        &harness.base_url,
        harness.http_client()?,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use todo_probar::ProbeError;

    #[tokio::test]
    async fn test_login_requires_credentials() {
        let harness = HarnessConfig::new("http://127.0.0.1:9");
        let err = login_with(&harness).await.unwrap_err();
        assert!(matches!(err, CliError::Probe(ProbeError::Config { .. })));
        assert!(err.to_string().contains("API_EMAIL"));
    }

    #[test]
    fn test_client_uses_base_url() {
        let harness = HarnessConfig::new("https://localhost:7001/");
        let client = base_client(&harness).unwrap();
        assert_eq!(client.base_url(), "https://localhost:7001");
        assert!(!client.is_authenticated());
    }
}
