use libsecp256k1::{Message, PublicKey, SecretKey};

use crate::codec::{
    AccountKey, Address, HashAlgorithm, SignatureAlgorithm, Transaction, TransactionSignature,
};

/// Signing capability for one account key: holds the secret key material
/// and knows how to produce an envelope signature at its key index.
#[derive(Clone)]
pub struct AccountSigner {
    pub address: Address,
    pub key_index: u32,
    pub signature_algorithm: SignatureAlgorithm,
    pub hash_algorithm: HashAlgorithm,
    secret_key: SecretKey,
}

impl AccountSigner {
    pub fn new(
        address: Address,
        key_index: u32,
        signature_algorithm: SignatureAlgorithm,
        hash_algorithm: HashAlgorithm,
        secret_key_hex: &str,
    ) -> Result<AccountSigner, String> {
        let stripped = secret_key_hex.strip_prefix("0x").unwrap_or(secret_key_hex);
        let secret_bytes = hex::decode(stripped)
            .map_err(|e| format!("unable to parse secret key for {} ({})", address, e))?;
        let secret_key = SecretKey::parse_slice(&secret_bytes)
            .map_err(|e| format!("invalid secret key for {} ({:?})", address, e))?;
        Ok(AccountSigner {
            address,
            key_index,
            signature_algorithm,
            hash_algorithm,
            secret_key,
        })
    }

    /// Raw 64-byte public key (uncompressed, prefix byte stripped).
    pub fn public_key(&self) -> Vec<u8> {
        let public_key = PublicKey::from_secret_key(&self.secret_key);
        public_key.serialize()[1..].to_vec()
    }

    pub fn account_key(&self, weight: u32) -> AccountKey {
        AccountKey {
            public_key: self.public_key(),
            signature_algorithm: self.signature_algorithm,
            hash_algorithm: self.hash_algorithm,
            weight,
        }
    }

    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, String> {
        let digest = self.hash_algorithm.digest(message);
        let message = Message::parse_slice(&digest)
            .map_err(|e| format!("unable to hash message for signing ({:?})", e))?;
        let (signature, _) = libsecp256k1::sign(&message, &self.secret_key);
        Ok(signature.serialize().to_vec())
    }

    /// Appends this signer's envelope signature to the transaction. The
    /// proposal key and reference block must already be assigned.
    pub fn sign_transaction(&self, transaction: &mut Transaction) -> Result<(), String> {
        let message = transaction.signable_message()?;
        let signature = self.sign(&message)?;
        transaction.envelope_signatures.push(TransactionSignature {
            address: self.address,
            key_index: self.key_index,
            signature,
        });
        Ok(())
    }
}

pub fn parse_public_key(public_key_hex: &str) -> Result<Vec<u8>, String> {
    let stripped = public_key_hex.strip_prefix("0x").unwrap_or(public_key_hex);
    let bytes = hex::decode(stripped)
        .map_err(|e| format!("unable to parse public key {} ({})", public_key_hex, e))?;
    if bytes.len() != 64 {
        return Err(format!(
            "unable to parse public key {} (expected 64 bytes, got {})",
            public_key_hex,
            bytes.len()
        ));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Block, Transaction};

    const SECRET_KEY: &str = "7287ba251d44a4d3fd9276c88ce34c5c52a038955511cccaf77e61068649c178";

    fn test_signer() -> AccountSigner {
        AccountSigner::new(
            Address::from_hex("0xf8d6e0586b0a20c7").unwrap(),
            0,
            SignatureAlgorithm::EcdsaSecp256k1,
            HashAlgorithm::Sha3_256,
            SECRET_KEY,
        )
        .unwrap()
    }

    #[test]
    fn test_public_key_is_64_bytes() {
        assert_eq!(test_signer().public_key().len(), 64);
    }

    #[test]
    fn test_sign_transaction_appends_envelope_signature() {
        let signer = test_signer();
        let mut tx = Transaction::new(
            b"transaction {}".to_vec(),
            vec![],
            signer.address,
            vec![signer.address],
        );
        tx.set_reference_block(&Block {
            id: "abcd".to_string(),
            height: 1,
        });
        tx.set_proposal_key(signer.address, 0, 0);

        signer.sign_transaction(&mut tx).unwrap();
        assert_eq!(tx.envelope_signatures.len(), 1);
        assert_eq!(tx.envelope_signatures[0].key_index, 0);
        assert_eq!(tx.envelope_signatures[0].signature.len(), 64);
    }

    #[test]
    fn test_sign_transaction_requires_proposal_key() {
        let signer = test_signer();
        let mut tx = Transaction::new(b"transaction {}".to_vec(), vec![], signer.address, vec![]);
        assert!(signer.sign_transaction(&mut tx).is_err());
    }
}
