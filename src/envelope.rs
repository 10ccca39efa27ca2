//! Hybrid encryption envelope
//!
//! A payload is sealed with a fresh AES-256-CBC key and IV, and the key is
//! wrapped with the recipient's RSA public key using OAEP (SHA-256). The
//! serialized envelope is the concatenation
//!
//! ```text
//! wrapped_key ++ iv ++ ciphertext
//! ```
//!
//! with no length prefixes: the wrapped key is exactly the RSA modulus
//! size and the IV is the AES block size, so the format is self-delimiting
//! for a reader that knows the recipient key.
//!
//! A fresh key and IV are generated per call; neither is ever reused.
//! Unusable key material fails the call; a payload meant to be encrypted
//! is never allowed to fall back to plaintext.

use crate::error::{CourierError, CourierResult};
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use std::path::Path;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES-256 key length in bytes
const KEY_LEN: usize = 32;
/// AES block / IV length in bytes
const IV_LEN: usize = 16;
/// File extension given to sealed artifacts
const SEALED_EXT: &str = "sealed";

/// Seal `payload` for the holder of the private key matching
/// `recipient_pem` (an SPKI public key in PEM form).
///
/// The PEM is parsed on every call; parse and key-wrap failures both
/// surface as [`CourierError::KeyFormat`].
pub fn seal(payload: &[u8], recipient_pem: &str) -> CourierResult<Vec<u8>> {
    let recipient = RsaPublicKey::from_public_key_pem(recipient_pem)
        .map_err(|e| CourierError::key_format(format!("invalid PEM public key: {e}")))?;

    let mut rng = rand::thread_rng();
    let mut sym_key = [0u8; KEY_LEN];
    let mut iv = [0u8; IV_LEN];
    rng.fill_bytes(&mut sym_key);
    rng.fill_bytes(&mut iv);

    let ciphertext =
        Aes256CbcEnc::new(&sym_key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(payload);

    // The symmetric key is wrapped; the IV travels in the clear.
    let wrapped_key = recipient
        .encrypt(&mut rng, Oaep::new::<Sha256>(), &sym_key)
        .map_err(|e| CourierError::key_format(format!("key wrap failed: {e}")))?;

    let mut envelope = Vec::with_capacity(wrapped_key.len() + IV_LEN + ciphertext.len());
    envelope.extend_from_slice(&wrapped_key);
    envelope.extend_from_slice(&iv);
    envelope.extend_from_slice(&ciphertext);
    Ok(envelope)
}

/// Open an envelope produced by [`seal`] with the recipient's private key.
pub fn open(envelope: &[u8], recipient: &RsaPrivateKey) -> CourierResult<Vec<u8>> {
    let key_len = recipient.size();
    if envelope.len() < key_len + IV_LEN {
        return Err(CourierError::Unseal {
            reason: format!(
                "envelope too short: {} bytes, need at least {}",
                envelope.len(),
                key_len + IV_LEN
            ),
        });
    }

    let (wrapped_key, rest) = envelope.split_at(key_len);
    let (iv, ciphertext) = rest.split_at(IV_LEN);

    let sym_key = recipient
        .decrypt(Oaep::new::<Sha256>(), wrapped_key)
        .map_err(|e| CourierError::Unseal {
            reason: format!("key unwrap failed: {e}"),
        })?;
    let sym_key: [u8; KEY_LEN] = sym_key.as_slice().try_into().map_err(|_| {
        CourierError::Unseal {
            reason: format!("unwrapped key has {} bytes, expected {}", sym_key.len(), KEY_LEN),
        }
    })?;

    let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| CourierError::Unseal {
        reason: "short IV".to_string(),
    })?;

    Aes256CbcDec::new(&sym_key.into(), &iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|e| CourierError::Unseal {
            reason: format!("payload decryption failed: {e}"),
        })
}

/// File name for the sealed form of an artifact: the original extension is
/// replaced with `.sealed`.
pub fn sealed_name(name: &str) -> String {
    Path::new(name)
        .with_extension(SEALED_EXT)
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::EncodePublicKey;
    use rsa::pkcs8::LineEnding;
    use std::sync::OnceLock;

    // Key generation dominates test time, so all tests share one keypair.
    fn recipient() -> &'static RsaPrivateKey {
        static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
        KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap())
    }

    fn recipient_pem() -> String {
        recipient()
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .unwrap()
    }

    #[test]
    fn seal_open_round_trip() {
        let payload = b"collected artifact contents";
        let envelope = seal(payload, &recipient_pem()).unwrap();
        let opened = open(&envelope, recipient()).unwrap();
        assert_eq!(opened, payload);
    }

    #[test]
    fn empty_payload_round_trips() {
        let envelope = seal(b"", &recipient_pem()).unwrap();
        assert_eq!(open(&envelope, recipient()).unwrap(), b"");
    }

    #[test]
    fn layout_is_key_then_iv_then_ciphertext() {
        let payload = vec![0x42u8; 40];
        let envelope = seal(&payload, &recipient_pem()).unwrap();

        let key_len = recipient().size();
        // 40 payload bytes pad to 48 ciphertext bytes
        assert_eq!(envelope.len(), key_len + 16 + 48);

        let sym_key = recipient()
            .decrypt(Oaep::new::<Sha256>(), &envelope[..key_len])
            .unwrap();
        assert_eq!(sym_key.len(), 32);
    }

    #[test]
    fn fresh_key_and_iv_per_call() {
        let pem = recipient_pem();
        let a = seal(b"same payload", &pem).unwrap();
        let b = seal(b"same payload", &pem).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_pem_is_key_format_error() {
        let err = seal(b"data", "not a pem key").unwrap_err();
        assert!(matches!(err, CourierError::KeyFormat { .. }));
    }

    #[test]
    fn truncated_envelope_fails_to_open() {
        let envelope = seal(b"data", &recipient_pem()).unwrap();
        let err = open(&envelope[..10], recipient()).unwrap_err();
        assert!(matches!(err, CourierError::Unseal { .. }));
    }

    #[test]
    fn tampered_wrapped_key_fails_to_open() {
        let mut envelope = seal(b"data", &recipient_pem()).unwrap();
        envelope[0] ^= 0xFF;
        assert!(open(&envelope, recipient()).is_err());
    }

    #[test]
    fn sealed_name_swaps_extension() {
        assert_eq!(sealed_name("report.txt"), "report.sealed");
        assert_eq!(sealed_name("archive.tar.gz"), "archive.tar.sealed");
        assert_eq!(sealed_name("noext"), "noext.sealed");
    }
}
