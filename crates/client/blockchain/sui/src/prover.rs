//! HTTP client for the zkLogin proving service.

use async_trait::async_trait;
use zk::{ProofRequest, ProvingService, ZkLoginError, ZkLoginProof};

use crate::config::SuiConfig;

/// Proving service reached over HTTP (`POST <prover_url>` with a JSON body).
pub struct HttpProvingService {
    /// Prover endpoint
    url: String,

    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpProvingService {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Prover configured for the network in `config`.
    pub fn from_config(config: &SuiConfig) -> Self {
        Self::new(config.prover_url())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ProvingService for HttpProvingService {
    async fn prove(&self, request: &ProofRequest) -> Result<ZkLoginProof, ZkLoginError> {
        tracing::debug!(url = %self.url, max_epoch = %request.max_epoch, "Requesting zkLogin proof");

        let response = self
            .http_client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| ZkLoginError::ProofFailure(format!("Prover request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ZkLoginError::ProofFailure(format!(
                "Prover returned status {}: {}",
                status, error_text
            )));
        }

        let proof: ZkLoginProof = response
            .json()
            .await
            .map_err(|e| ZkLoginError::ProofFailure(format!("Invalid prover response: {e}")))?;

        tracing::info!(address = %request.inputs.address, "✓ zkLogin proof received");
        Ok(proof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SuiNetwork;

    #[test]
    fn test_prover_url_follows_network() {
        let prover = HttpProvingService::from_config(&SuiConfig::new(SuiNetwork::Mainnet));
        assert_eq!(prover.url(), "https://prover.mystenlabs.com/v1");

        let config = SuiConfig::new(SuiNetwork::Testnet).with_prover_url("http://localhost:8001/v1");
        assert_eq!(HttpProvingService::from_config(&config).url(), "http://localhost:8001/v1");
    }

    #[tokio::test]
    async fn test_unreachable_prover_is_a_proof_failure() {
        let ephemeral = client_blockchain_core::Ed25519Keypair::from_secret_bytes([3; 32]);
        let claims = zk::JwtClaims {
            iss: "https://accounts.google.com".to_string(),
            aud: "client".to_string(),
            sub: "1234".to_string(),
            nonce: Some(zk::generate_nonce(&ephemeral.public_key(), 10, 1).unwrap()),
        };
        let request =
            zk::build_proof_inputs("h.p.s", &claims, &ephemeral.public_key(), 1, 10, 42).unwrap();

        let prover = HttpProvingService::new("http://127.0.0.1:1/v1");
        match prover.prove(&request).await {
            Err(ZkLoginError::ProofFailure(message)) => {
                assert!(message.starts_with("Prover request failed"))
            }
            other => panic!("expected ProofFailure, got {other:?}"),
        }
    }
}
