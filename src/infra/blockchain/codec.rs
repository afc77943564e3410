//! Wire encoding for transactions: bincode bytes wrapped in base64.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use solana_sdk::transaction::VersionedTransaction;

use crate::domain::TransactionError;

/// Serialize a transaction the way `sendTransaction` expects with `"encoding": "base64"`
pub fn encode_transaction(transaction: &VersionedTransaction) -> Result<String, TransactionError> {
    let bytes = bincode::serialize(transaction)
        .map_err(|e| TransactionError::Serialization(format!("Failed to serialize: {}", e)))?;
    Ok(BASE64_STANDARD.encode(bytes))
}

/// Decode a base64 transaction as returned by swap and mint endpoints
pub fn decode_transaction(encoded: &str) -> Result<VersionedTransaction, TransactionError> {
    let bytes = BASE64_STANDARD
        .decode(encoded.trim())
        .map_err(|e| TransactionError::Serialization(format!("Invalid base64: {}", e)))?;
    bincode::deserialize(&bytes)
        .map_err(|e| TransactionError::Serialization(format!("Invalid transaction bytes: {}", e)))
}

/// Decode base64 account data
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, TransactionError> {
    BASE64_STANDARD
        .decode(encoded)
        .map_err(|e| TransactionError::Serialization(format!("Invalid base64: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{
        hash::Hash,
        message::{Message, VersionedMessage},
        pubkey::Pubkey,
        signature::Signature,
    };
    use solana_system_interface::instruction as system_instruction;

    fn sample_transaction() -> VersionedTransaction {
        let payer = Pubkey::new_unique();
        let to = Pubkey::new_unique();
        let ix = system_instruction::transfer(&payer, &to, 42);
        let blockhash = Hash::new_from_array([7u8; 32]);
        let message = Message::new_with_blockhash(&[ix], Some(&payer), &blockhash);
        VersionedTransaction {
            signatures: vec![Signature::default()],
            message: VersionedMessage::Legacy(message),
        }
    }

    #[test]
    fn test_decode_rejects_invalid_base64() {
        let result = decode_transaction("not base64!!");
        assert!(matches!(result, Err(TransactionError::Serialization(_))));
    }

    #[test]
    fn test_decode_rejects_garbage_bytes() {
        let encoded = BASE64_STANDARD.encode([1u8, 2, 3]);
        let result = decode_transaction(&encoded);
        assert!(matches!(result, Err(TransactionError::Serialization(_))));
    }

    #[test]
    fn test_decode_tolerates_surrounding_whitespace() {
        let tx = sample_transaction();
        let encoded = format!("  {}\n", encode_transaction(&tx).unwrap());
        let decoded = decode_transaction(&encoded).unwrap();
        assert_eq!(decoded.message, tx.message);
    }
}
