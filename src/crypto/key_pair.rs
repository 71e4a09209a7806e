//! Recoverable ECDSA key pairs on secp256k1.
//!
//! Signatures carry a recovery byte, so verification recovers the signing key
//! from `(message, signature)` and compares it with the key embedded in the
//! payload. The key is supplied explicitly rather than trusted from recovery
//! alone; a mismatch or any decode failure is a plain `false`, never a panic.

use crate::types::address::{Address, ADDRESS_LEN};
use crate::types::formatting;
use k256::ecdsa::signature::DigestSigner;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use rand_core::OsRng;
use sha3::{Digest, Sha3_256};
use zeroize::Zeroizing;

/// Serialized signature length: 64 signature bytes plus one recovery byte.
pub const SIGNATURE_LEN: usize = 65;

/// Private key for signing payloads.
///
/// Generated from OS entropy. Only the checksummed text form ever leaves this
/// type, and that buffer is zeroized on drop.
#[derive(Clone)]
pub struct PrivateKey {
    key: SigningKey,
}

/// Public key for signature verification.
///
/// Its checksummed text form doubles as the account address embedded in
/// payloads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    key: VerifyingKey,
}

/// A 64-byte ECDSA signature together with its recovery id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecoverableSignature {
    sig: Signature,
    recovery: RecoveryId,
}

fn message_digest(message: &[u8]) -> Sha3_256 {
    Sha3_256::new_with_prefix(message)
}

impl PrivateKey {
    /// Generates a new random private key.
    ///
    /// The base-58 text of a compressed public key is 50 characters for most
    /// keys and 51 for the rest; the payload field is exactly [`ADDRESS_LEN`]
    /// bytes wide, so keys whose encoding overflows it are discarded and
    /// redrawn here rather than failing later at encode time.
    pub fn generate() -> Self {
        loop {
            let key = SigningKey::random(&mut OsRng);
            let candidate = Self { key };
            if candidate.public_key().address().fits_payload() {
                return candidate;
            }
        }
    }

    /// Creates a private key from a raw secret scalar.
    ///
    /// Returns `None` if the bytes are not a valid scalar for secp256k1.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        SigningKey::from_slice(bytes).ok().map(|key| Self { key })
    }

    /// Restores a private key from its checksummed text form.
    pub fn from_encoded(text: &str) -> Option<Self> {
        let bytes = Zeroizing::new(formatting::decode(text).ok()?);
        Self::from_slice(&bytes)
    }

    /// Returns the checksummed text form of the secret scalar.
    pub fn encoded(&self) -> Zeroizing<String> {
        let bytes = Zeroizing::new(self.key.to_bytes());
        Zeroizing::new(formatting::encode(bytes.as_slice()))
    }

    /// Derives the corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            key: *self.key.verifying_key(),
        }
    }

    /// Signs a message, producing a recoverable signature over its SHA3-256
    /// digest.
    pub fn sign(&self, message: &[u8]) -> RecoverableSignature {
        let (sig, recovery) = self.key.sign_digest(message_digest(message));
        RecoverableSignature { sig, recovery }
    }
}

impl PublicKey {
    /// Compressed SEC1 bytes of the key.
    pub fn to_bytes(&self) -> Box<[u8]> {
        self.key.to_sec1_bytes()
    }

    /// Parses a key from compressed or uncompressed SEC1 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        VerifyingKey::from_sec1_bytes(bytes).ok().map(|key| Self { key })
    }

    /// Restores a key from its checksummed text form.
    pub fn from_encoded(text: &str) -> Option<Self> {
        Self::from_slice(&formatting::decode(text).ok()?)
    }

    /// Returns the checksummed text form of the compressed key.
    pub fn encoded(&self) -> String {
        formatting::encode(&self.to_bytes())
    }

    /// The account address this key controls.
    pub fn address(&self) -> Address {
        Address::new(self.encoded())
    }

    /// Verifies a recoverable signature against the given message.
    ///
    /// Recovers the signing key from the signature and requires it to match
    /// this key exactly.
    pub fn verify(&self, message: &[u8], signature: &RecoverableSignature) -> bool {
        match VerifyingKey::recover_from_digest(
            message_digest(message),
            &signature.sig,
            signature.recovery,
        ) {
            Ok(recovered) => recovered.to_sec1_bytes() == self.to_bytes(),
            Err(_) => false,
        }
    }
}

impl RecoverableSignature {
    /// Serializes to 64 signature bytes followed by the recovery byte.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        let mut out = [0u8; SIGNATURE_LEN];
        out[..64].copy_from_slice(&self.sig.to_bytes());
        out[64] = self.recovery.to_byte();
        out
    }

    /// Parses the 65-byte wire form.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != SIGNATURE_LEN {
            return None;
        }
        let sig = Signature::from_slice(&bytes[..64]).ok()?;
        let recovery = RecoveryId::from_byte(bytes[64])?;
        Some(Self { sig, recovery })
    }

    /// Returns the checksummed text form carried inside payloads.
    pub fn encoded(&self) -> String {
        formatting::encode(&self.to_bytes())
    }

    /// Restores a signature from its checksummed text form.
    pub fn from_encoded(text: &str) -> Option<Self> {
        Self::from_slice(&formatting::decode(text).ok()?)
    }
}

/// Verifies a `(pubkey, message, signature)` triple in encoded text form.
///
/// Any decode failure of the key or signature text is a verification failure.
pub fn verify_encoded(pubkey_text: &str, message: &[u8], signature_text: &str) -> bool {
    let Some(pubkey) = PublicKey::from_encoded(pubkey_text) else {
        return false;
    };
    let Some(signature) = RecoverableSignature::from_encoded(signature_text) else {
        return false;
    };
    pubkey.verify(message, &signature)
}
