//! Derive a zkLogin address.

use anyhow::Result;
use clap::Parser;
use client_blockchain_core::Ed25519Keypair;
use zk::ZkAddressInputs;

use super::parse_keypair;

/// Derive a zkLogin address (and optionally a nonce)
#[derive(Debug, Parser)]
pub struct ZkAddress {
    /// OAuth issuer (`iss` claim)
    #[arg(long)]
    pub iss: String,

    /// OAuth client id (`aud` claim)
    #[arg(long)]
    pub aud: String,

    /// Subject identifier (`sub` claim)
    #[arg(long)]
    pub sub: String,

    /// User salt
    #[arg(long)]
    pub salt: u128,

    /// Ephemeral private key (bech32); a fresh key is generated when omitted
    #[arg(long, env = "ZKSEND_EPHEMERAL_KEY", hide_env_values = true)]
    pub ephemeral_key: Option<String>,

    /// Last epoch the ephemeral key is valid for
    #[arg(long)]
    pub max_epoch: u64,

    /// Nonce randomness; a fresh value is generated when omitted
    #[arg(long)]
    pub randomness: Option<u128>,
}

impl ZkAddress {
    pub fn execute(&self) -> Result<()> {
        let (ephemeral, generated) = match &self.ephemeral_key {
            Some(encoded) => (parse_keypair(encoded)?, false),
            None => (Ed25519Keypair::generate(), true),
        };
        let randomness = self.randomness.unwrap_or_else(zk::generate_randomness);

        let inputs = self.inputs(&ephemeral);
        let address = zk::derive_address(&inputs)?;
        let nonce = zk::generate_nonce(&ephemeral.public_key(), self.max_epoch, randomness)?;

        println!("Address:     {address}");
        println!("Nonce:       {nonce}");
        println!("Randomness:  {randomness}");
        println!("Max epoch:   {}", self.max_epoch);

        if generated {
            println!();
            println!("⚠️  WARNING: Do NOT share the ephemeral private key!");
            println!("Ephemeral key (Bech32):");
            println!("{}", ephemeral.to_bech32()?);
        }

        Ok(())
    }

    fn inputs(&self, ephemeral: &Ed25519Keypair) -> ZkAddressInputs {
        ZkAddressInputs {
            ephemeral_public_key: ephemeral.public_key().0,
            issuer: self.iss.clone(),
            audience: self.aud.clone(),
            subject: self.sub.clone(),
            salt: self.salt,
            max_epoch: self.max_epoch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inputs_use_the_given_key() {
        let ephemeral = Ed25519Keypair::from_secret_bytes([9; 32]);
        let command = ZkAddress {
            iss: "https://accounts.google.com".to_string(),
            aud: "client".to_string(),
            sub: "1234".to_string(),
            salt: 42,
            ephemeral_key: Some(ephemeral.to_bech32().unwrap()),
            max_epoch: 7,
            randomness: Some(1),
        };

        let inputs = command.inputs(&ephemeral);
        assert_eq!(inputs.ephemeral_public_key, ephemeral.public_key().0);
        assert_eq!(
            zk::derive_address(&inputs).unwrap(),
            zk::derive_address(&command.inputs(&ephemeral)).unwrap()
        );
        assert!(command.execute().is_ok());
    }
}
