//! Keypair-backed wallet signer.

use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use secrecy::{ExposeSecret, SecretString};
use solana_sdk::{
    pubkey::Pubkey,
    signature::Signature,
    signer::{Signer, keypair::Keypair},
    transaction::VersionedTransaction,
};
use tracing::{debug, instrument};

use crate::domain::{AppError, TransactionError, ValidationError, WalletSigner};

/// Signs transactions with an in-process keypair
pub struct KeypairSigner {
    keypair: Keypair,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    /// Build a signer from an ed25519-dalek signing key
    pub fn from_signing_key(signing_key: &SigningKey) -> Result<Self, AppError> {
        let keypair_bytes = signing_key.to_keypair_bytes();
        let keypair = Keypair::try_from(keypair_bytes.as_slice()).map_err(|e| {
            AppError::Validation(ValidationError::InvalidField {
                field: "wallet_private_key".to_string(),
                message: format!("Failed to create keypair: {}", e),
            })
        })?;
        Ok(Self::new(keypair))
    }

    /// Build a signer from a base58 secret (32-byte seed or 64-byte keypair)
    pub fn from_base58(secret: &SecretString) -> Result<Self, AppError> {
        let signing_key = signing_key_from_base58(secret)?;
        Self::from_signing_key(&signing_key)
    }
}

#[async_trait]
impl WalletSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    #[instrument(skip(self, transaction), fields(wallet = %self.keypair.pubkey()))]
    async fn sign_transaction(
        &self,
        mut transaction: VersionedTransaction,
    ) -> Result<VersionedTransaction, TransactionError> {
        let pubkey = self.keypair.pubkey();
        let required = usize::from(transaction.message.header().num_required_signatures);
        let signers = transaction.message.static_account_keys();
        let position = signers
            .iter()
            .take(required)
            .position(|key| *key == pubkey)
            .ok_or_else(|| {
                TransactionError::Signing(format!(
                    "Wallet {} is not a required signer of this transaction",
                    pubkey
                ))
            })?;

        if transaction.signatures.len() != required {
            transaction.signatures.resize(required, Signature::default());
        }

        let message_bytes = transaction.message.serialize();
        transaction.signatures[position] = self.keypair.sign_message(&message_bytes);

        debug!(position = position, required = required, "Transaction signed");
        Ok(transaction)
    }
}

/// Parse a base58-encoded private key into a SigningKey
pub fn signing_key_from_base58(secret: &SecretString) -> Result<SigningKey, AppError> {
    let invalid = |message: String| {
        AppError::Validation(ValidationError::InvalidField {
            field: "wallet_private_key".to_string(),
            message,
        })
    };

    let key_bytes = bs58::decode(secret.expose_secret())
        .into_vec()
        .map_err(|e| invalid(e.to_string()))?;

    // Handle both 32-byte (seed) and 64-byte (keypair) formats
    match key_bytes.len() {
        64 => {
            let keypair: [u8; 64] = key_bytes
                .try_into()
                .map_err(|_| invalid("Invalid keypair format".to_string()))?;
            // The public half must match the key derived from the seed
            SigningKey::from_keypair_bytes(&keypair).map_err(|_| {
                invalid("Public key does not match the secret key".to_string())
            })
        }
        32 => {
            let seed: [u8; 32] = key_bytes
                .try_into()
                .map_err(|v: Vec<u8>| invalid(format!("Key must be 32 bytes, got {}", v.len())))?;
            Ok(SigningKey::from_bytes(&seed))
        }
        len => Err(invalid(format!("Key must be 32 or 64 bytes, got {}", len))),
    }
}
