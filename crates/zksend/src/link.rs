//! Claim link encoding.
//!
//! A link is an ordinary URL. The query carries the network and an optional
//! redirect; the fragment carries the ephemeral secret key:
//!
//! ```text
//! https://zksend.com/claim?network=testnet&redirect_url=...&name=...#$<base64 secret>
//! ```
//!
//! `network` is omitted for mainnet. Besides the `$`-prefixed form, decoding
//! accepts the legacy fragment (base64 of scheme flag and secret) and a
//! Bech32 `suiprivkey` fragment.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use url::{Url, form_urlencoded};

use client_blockchain_core::crypto::PRIVATE_KEY_HRP;
use client_blockchain_core::{Ed25519Keypair, SuiAddress};
use client_blockchain_sui::SuiNetwork;

use crate::error::{Result, ZkSendError};

pub const DEFAULT_LINK_HOST: &str = "https://zksend.com";
pub const DEFAULT_LINK_PATH: &str = "/claim";

const NETWORK_PARAM: &str = "network";
const REDIRECT_URL_PARAM: &str = "redirect_url";
const REDIRECT_NAME_PARAM: &str = "name";
/// Query parameter carrying the claimer's address on the post-claim redirect.
pub const CLAIMER_ADDRESS_PARAM: &str = "zksend_address";

/// Marks the current fragment format (raw 32-byte secret).
const SECRET_MARKER: char = '$';

/// Where to send the claimer once the link is claimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Redirect {
    pub url: String,
    pub name: String,
}

impl Redirect {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
        }
    }

    /// Parse the redirect target, which must be an http(s) URL.
    pub fn parsed_url(&self) -> Result<Url> {
        let url = Url::parse(&self.url)
            .map_err(|e| ZkSendError::InvalidConfig(format!("Invalid redirect URL {}: {}", self.url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ZkSendError::InvalidConfig(format!(
                "Invalid redirect URL {}: scheme must be http or https",
                self.url
            )));
        }
        Ok(url)
    }

    /// Redirect target with the claimer's address appended.
    pub fn with_claimer(&self, claimer: SuiAddress) -> Result<Url> {
        let mut url = self.parsed_url()?;
        url.query_pairs_mut()
            .append_pair(CLAIMER_ADDRESS_PARAM, &claimer.to_hex());
        Ok(url)
    }
}

/// Decoded contents of a claim link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimLink {
    pub keypair: Ed25519Keypair,
    pub network: SuiNetwork,
    pub redirect: Option<Redirect>,
}

impl ClaimLink {
    pub fn new(keypair: Ed25519Keypair, network: SuiNetwork) -> Self {
        Self {
            keypair,
            network,
            redirect: None,
        }
    }

    pub fn with_redirect(mut self, redirect: Redirect) -> Self {
        self.redirect = Some(redirect);
        self
    }

    /// The ephemeral address holding the link's assets.
    pub fn address(&self) -> SuiAddress {
        self.keypair.address()
    }

    /// Parse a link produced by any [`LinkEncoder`] host.
    pub fn decode(link: &str) -> Result<Self> {
        let url = Url::parse(link.trim()).map_err(|e| ZkSendError::MalformedLink(e.to_string()))?;

        let fragment = url
            .fragment()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| ZkSendError::MalformedLink("missing secret key fragment".into()))?;
        let keypair = decode_secret(fragment)?;

        let mut network = None;
        let mut redirect_url = None;
        let mut redirect_name = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                NETWORK_PARAM => network = Some(value.into_owned()),
                REDIRECT_URL_PARAM => redirect_url = Some(value.into_owned()),
                REDIRECT_NAME_PARAM => redirect_name = Some(value.into_owned()),
                _ => {}
            }
        }

        let network = match network {
            Some(tag) => tag
                .parse::<SuiNetwork>()
                .map_err(|_| ZkSendError::MalformedLink(format!("unsupported network {tag:?}")))?,
            None => SuiNetwork::Mainnet,
        };

        let redirect = match (redirect_url, redirect_name) {
            (Some(url), Some(name)) => Some(Redirect { url, name }),
            (None, None) => None,
            _ => {
                return Err(ZkSendError::MalformedLink(
                    "redirect_url and name must be given together".into(),
                ));
            }
        };

        Ok(Self {
            keypair,
            network,
            redirect,
        })
    }
}

fn decode_secret(fragment: &str) -> Result<Ed25519Keypair> {
    let malformed = |e: &dyn std::fmt::Display| ZkSendError::MalformedLink(e.to_string());

    if let Some(encoded) = fragment.strip_prefix(SECRET_MARKER) {
        let bytes = STANDARD.decode(encoded).map_err(|e| malformed(&e))?;
        return Ed25519Keypair::from_secret_slice(&bytes).map_err(|e| malformed(&e));
    }

    if fragment.starts_with(PRIVATE_KEY_HRP) {
        return Ed25519Keypair::from_bech32(fragment).map_err(|e| malformed(&e));
    }

    let bytes = STANDARD.decode(fragment).map_err(|e| malformed(&e))?;
    Ed25519Keypair::from_flagged_secret(&bytes).map_err(|e| malformed(&e))
}

/// Produces claim URLs under a fixed host and path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEncoder {
    /// Normalized `<host><path>` without query or fragment
    base: String,
}

impl LinkEncoder {
    pub fn new(host: &str, path: &str) -> Result<Self> {
        let host = Url::parse(host)
            .map_err(|e| ZkSendError::InvalidConfig(format!("Invalid link host {host}: {e}")))?;
        if host.cannot_be_a_base() || !matches!(host.scheme(), "http" | "https") {
            return Err(ZkSendError::InvalidConfig(format!(
                "Invalid link host {host}: expected an http(s) base URL"
            )));
        }

        let mut base = host
            .join(path)
            .map_err(|e| ZkSendError::InvalidConfig(format!("Invalid link path {path}: {e}")))?;
        base.set_query(None);
        base.set_fragment(None);

        Ok(Self {
            base: base.to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn encode(&self, link: &ClaimLink) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if link.network != SuiNetwork::Mainnet {
            query.append_pair(NETWORK_PARAM, link.network.as_ref());
        }
        if let Some(redirect) = &link.redirect {
            query.append_pair(REDIRECT_URL_PARAM, &redirect.url);
            query.append_pair(REDIRECT_NAME_PARAM, &redirect.name);
        }
        let query = query.finish();

        let secret = STANDARD.encode(link.keypair.secret_bytes());
        if query.is_empty() {
            format!("{}#{SECRET_MARKER}{secret}", self.base)
        } else {
            format!("{}?{query}#{SECRET_MARKER}{secret}", self.base)
        }
    }
}

impl Default for LinkEncoder {
    fn default() -> Self {
        Self {
            base: format!("{DEFAULT_LINK_HOST}{DEFAULT_LINK_PATH}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_blockchain_core::ED25519_FLAG;
    use proptest::prelude::*;

    fn keypair(seed: u8) -> Ed25519Keypair {
        Ed25519Keypair::from_secret_bytes([seed; 32])
    }

    #[test]
    fn test_mainnet_link_has_no_query() {
        let link = ClaimLink::new(keypair(1), SuiNetwork::Mainnet);
        let encoded = LinkEncoder::default().encode(&link);

        assert!(encoded.starts_with("https://zksend.com/claim#$"));
        assert_eq!(ClaimLink::decode(&encoded).unwrap(), link);
    }

    #[test]
    fn test_round_trip_with_network_and_redirect() {
        let link = ClaimLink::new(keypair(2), SuiNetwork::Testnet)
            .with_redirect(Redirect::new("https://shop.example/thanks?order=7", "Example Shop"));
        let encoder = LinkEncoder::new("https://links.example", "/c").unwrap();
        let encoded = encoder.encode(&link);

        assert!(encoded.starts_with("https://links.example/c?network=testnet&"));
        assert_eq!(ClaimLink::decode(&encoded).unwrap(), link);
    }

    #[test]
    fn test_legacy_and_bech32_fragments() {
        let key = keypair(3);

        let mut flagged = vec![ED25519_FLAG];
        flagged.extend_from_slice(&key.secret_bytes());
        let legacy = format!("https://zksend.com/claim#{}", STANDARD.encode(&flagged));
        assert_eq!(ClaimLink::decode(&legacy).unwrap().keypair, key);

        let bech32 = format!("https://zksend.com/claim#{}", key.to_bech32().unwrap());
        assert_eq!(ClaimLink::decode(&bech32).unwrap().keypair, key);
    }

    #[test]
    fn test_malformed_links() {
        let cases = [
            "https://zksend.com/claim",
            "https://zksend.com/claim#",
            "https://zksend.com/claim#$not-base64!",
            "https://zksend.com/claim#$AAAA",
            "https://zksend.com/claim?network=moonnet#$AQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQE=",
            "https://zksend.com/claim?redirect_url=https%3A%2F%2Fa.example#$AQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQE=",
            "not a url",
        ];
        for case in cases {
            assert!(
                matches!(ClaimLink::decode(case), Err(ZkSendError::MalformedLink(_))),
                "{case} should be malformed"
            );
        }
    }

    #[test]
    fn test_redirect_with_claimer() {
        let redirect = Redirect::new("https://shop.example/done?x=1", "Shop");
        let claimer: SuiAddress = "0x42".parse().unwrap();
        let url = redirect.with_claimer(claimer).unwrap();

        assert_eq!(url.query_pairs().count(), 2);
        assert!(
            url.query_pairs()
                .any(|(k, v)| k == CLAIMER_ADDRESS_PARAM && v == claimer.to_hex())
        );
    }

    fn network_strategy() -> impl Strategy<Value = SuiNetwork> {
        prop_oneof![
            Just(SuiNetwork::Mainnet),
            Just(SuiNetwork::Testnet),
            Just(SuiNetwork::Devnet),
            Just(SuiNetwork::Localnet),
        ]
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(
            secret in any::<[u8; 32]>(),
            network in network_strategy(),
            redirect in proptest::option::of(("[a-z]{1,12}", "[ -~]{1,24}")),
        ) {
            let mut link = ClaimLink::new(Ed25519Keypair::from_secret_bytes(secret), network);
            if let Some((domain, name)) = redirect {
                link = link.with_redirect(Redirect::new(format!("https://{domain}.example/ok"), name));
            }

            let encoded = LinkEncoder::default().encode(&link);
            prop_assert_eq!(ClaimLink::decode(&encoded).unwrap(), link);
        }
    }
}
