//! AES-128-ECB payload cipher and packet signing
//!
//! Every device speaks AES-128 in ECB mode keyed by its 16-byte local key
//! (or, on 3.4, a negotiated session key). The two version families differ in
//! who pads:
//!
//! - 3.1 - 3.3: PKCS7 padding is applied and removed here.
//! - 3.4: the caller pads before [`Cipher::encrypt`]; decryption strips the
//!   padding manually and then any `"3.4"` header block.

use aes::Aes128;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use parking_lot::RwLock;
use rand::RngCore;
use sha2::Sha256;
use tracing::{debug, trace};
use tuyalan_types::ProtocolVersion;

use crate::{
    constants::{BLOCK_SIZE, LEGACY_ENVELOPE_PREFIX_SIZE, VERSION_HEADER_SIZE},
    error::{Error, Result},
    session::KeyState,
};

type HmacSha256 = Hmac<Sha256>;

/// Cipher engine bound to one device
///
/// The key state is swapped under a write lock. Each method reads one
/// snapshot of it; a caller that needs several operations under the same key
/// (encrypt then sign) takes [`Cipher::key`] once and uses the `*_with`
/// variants.
#[derive(Debug)]
pub struct Cipher {
    version: ProtocolVersion,
    local_key: [u8; 16],
    key_state: RwLock<KeyState>,
}

impl Cipher {
    /// Create a cipher for a device
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyLength`] unless `key` is exactly 16 bytes.
    pub fn new(key: &[u8], version: ProtocolVersion) -> Result<Self> {
        let local_key = to_key(key)?;

        Ok(Self {
            version,
            local_key,
            key_state: RwLock::new(KeyState::Static),
        })
    }

    /// Protocol version this cipher was built for
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Static local key
    pub fn local_key(&self) -> &[u8; 16] {
        &self.local_key
    }

    /// Current key state
    pub fn key_state(&self) -> KeyState {
        *self.key_state.read()
    }

    /// Key used for encryption and HMAC: the session key if set, else the local key
    pub fn key(&self) -> [u8; 16] {
        *self.key_state.read().resolve(&self.local_key)
    }

    /// Install the negotiated session key
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidKeyLength`] unless `key` is 16 bytes
    /// - [`Error::SessionKeyAlreadySet`] on a second call
    pub fn set_session_key(&self, key: &[u8]) -> Result<()> {
        let key = to_key(key)?;
        let mut state = self.key_state.write();

        if state.is_negotiated() {
            return Err(Error::SessionKeyAlreadySet);
        }

        *state = KeyState::NegotiatedSession(key);
        debug!("Session key installed");
        Ok(())
    }

    /// Encrypt a payload
    ///
    /// With `want_base64` the ciphertext is returned as base64 text (ASCII
    /// bytes), otherwise as raw bytes.
    ///
    /// # Errors
    ///
    /// On 3.4 returns [`Error::UnalignedPlaintext`] if `plaintext` was not
    /// padded to a multiple of 16 bytes.
    pub fn encrypt(&self, plaintext: &[u8], want_base64: bool) -> Result<Vec<u8>> {
        self.encrypt_with(&self.key(), plaintext, want_base64)
    }

    /// [`Cipher::encrypt`] under an explicit key
    pub fn encrypt_with(&self, key: &[u8; 16], plaintext: &[u8], want_base64: bool) -> Result<Vec<u8>> {
        let ciphertext = if self.version.is_extended() {
            if plaintext.len() % BLOCK_SIZE != 0 {
                return Err(Error::UnalignedPlaintext {
                    len: plaintext.len(),
                });
            }
            let mut buf = plaintext.to_vec();
            ecb_encrypt(key, &mut buf);
            buf
        } else {
            let mut buf = pkcs7_pad(plaintext);
            ecb_encrypt(key, &mut buf);
            buf
        };

        trace!(
            version = %self.version,
            plain_len = plaintext.len(),
            cipher_len = ciphertext.len(),
            "Encrypted payload"
        );

        if want_base64 {
            Ok(STANDARD.encode(&ciphertext).into_bytes())
        } else {
            Ok(ciphertext)
        }
    }

    /// Decrypt a payload
    ///
    /// # Errors
    ///
    /// Returns [`Error::DecryptFailure`] if the input is not block aligned,
    /// not valid base64 (3.1 envelope), or the padding does not check out.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.decrypt_with(&self.key(), data)
    }

    /// [`Cipher::decrypt`] under an explicit key
    pub fn decrypt_with(&self, key: &[u8; 16], data: &[u8]) -> Result<Vec<u8>> {
        if self.version.is_extended() {
            self.decrypt_extended(key, data)
        } else {
            self.decrypt_legacy(key, data)
        }
    }

    fn decrypt_legacy(&self, key: &[u8; 16], data: &[u8]) -> Result<Vec<u8>> {
        let has_header = data.starts_with(self.version.as_bytes());

        let mut body = match (has_header, self.version) {
            (true, ProtocolVersion::V31) => {
                let encoded = data.get(LEGACY_ENVELOPE_PREFIX_SIZE..).ok_or_else(|| {
                    Error::DecryptFailure("truncated 3.1 envelope".into())
                })?;
                STANDARD
                    .decode(encoded)
                    .map_err(|e| Error::DecryptFailure(format!("invalid base64: {e}")))?
            }
            (true, _) => data
                .get(VERSION_HEADER_SIZE..)
                .ok_or_else(|| Error::DecryptFailure("truncated version header".into()))?
                .to_vec(),
            (false, _) => data.to_vec(),
        };

        trace!(version = %self.version, has_header, len = body.len(), "Decrypting payload");

        ecb_decrypt(key, &mut body)?;
        pkcs7_unpad(&mut body)?;

        Ok(body)
    }

    fn decrypt_extended(&self, key: &[u8; 16], data: &[u8]) -> Result<Vec<u8>> {
        let mut body = data.to_vec();

        ecb_decrypt(key, &mut body)?;
        pkcs7_unpad(&mut body)?;

        if body.starts_with(self.version.as_bytes()) {
            let strip = VERSION_HEADER_SIZE.min(body.len());
            body.drain(..strip);
        }

        Ok(body)
    }

    /// MD5 signature of the 3.1 signed envelope
    ///
    /// The middle 8 bytes (offset 4..12) of the MD5 digest.
    pub fn md5_signature(data: &[u8]) -> [u8; 8] {
        let digest = Md5::digest(data);
        let mut signature = [0u8; 8];
        signature.copy_from_slice(&digest[4..12]);
        signature
    }

    /// HMAC-SHA256 keyed by the active key
    pub fn hmac_signature(&self, data: &[u8]) -> Result<[u8; 32]> {
        Self::hmac_signature_with(&self.key(), data)
    }

    /// HMAC-SHA256 under an explicit key
    pub fn hmac_signature_with(key: &[u8; 16], data: &[u8]) -> Result<[u8; 32]> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
            .map_err(|_| Error::InvalidKeyLength { actual: key.len() })?;
        mac.update(data);

        let mut signature = [0u8; 32];
        signature.copy_from_slice(&mac.finalize().into_bytes());
        Ok(signature)
    }

    /// HMAC-SHA256 keyed by the active key, hex encoded
    pub fn hmac_signature_hex(&self, data: &[u8]) -> Result<String> {
        self.hmac_signature(data).map(hex::encode)
    }

    /// 16 random bytes for the session key negotiation
    pub fn random_nonce() -> [u8; 16] {
        let mut nonce = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);
        nonce
    }
}

fn to_key(key: &[u8]) -> Result<[u8; 16]> {
    key.try_into()
        .map_err(|_| Error::InvalidKeyLength { actual: key.len() })
}

/// Pad to the next 16-byte boundary; every pad byte holds the pad length (1..=16)
pub fn pkcs7_pad(data: &[u8]) -> Vec<u8> {
    let pad = BLOCK_SIZE - data.len() % BLOCK_SIZE;
    let mut buf = Vec::with_capacity(data.len() + pad);
    buf.extend_from_slice(data);
    buf.resize(data.len() + pad, pad as u8);
    buf
}

fn pkcs7_unpad(buf: &mut Vec<u8>) -> Result<()> {
    let pad = match buf.last() {
        Some(&n) => n as usize,
        None => return Err(Error::DecryptFailure("empty plaintext".into())),
    };

    if pad == 0 || pad > BLOCK_SIZE || pad > buf.len() {
        return Err(Error::DecryptFailure(format!("bad padding length {pad}")));
    }

    let start = buf.len() - pad;
    if buf[start..].iter().any(|&b| b as usize != pad) {
        return Err(Error::DecryptFailure("inconsistent padding bytes".into()));
    }

    buf.truncate(start);
    Ok(())
}

fn ecb_encrypt(key: &[u8; 16], buf: &mut [u8]) {
    let cipher = <Aes128 as KeyInit>::new(GenericArray::from_slice(key));

    for block in buf.chunks_exact_mut(BLOCK_SIZE) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
}

fn ecb_decrypt(key: &[u8; 16], buf: &mut [u8]) -> Result<()> {
    if buf.is_empty() || buf.len() % BLOCK_SIZE != 0 {
        return Err(Error::DecryptFailure(format!(
            "ciphertext of {} bytes is not block aligned",
            buf.len()
        )));
    }

    let cipher = <Aes128 as KeyInit>::new(GenericArray::from_slice(key));

    for block in buf.chunks_exact_mut(BLOCK_SIZE) {
        cipher.decrypt_block(GenericArray::from_mut_slice(block));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const KEY: &[u8; 16] = b"f33444a6362a9664";

    #[test]
    fn test_cipher_invalid_key() {
        let result = Cipher::new(b"too-short", ProtocolVersion::V33);
        assert!(matches!(result, Err(Error::InvalidKeyLength { actual: 9 })));
    }

    #[test]
    fn test_encrypt_decrypt_v33() {
        let cipher = Cipher::new(KEY, ProtocolVersion::V33).unwrap();
        let plaintext = br#"{"dps":{"1":true}}"#;

        let ciphertext = cipher.encrypt(plaintext, false).unwrap();
        assert_eq!(ciphertext.len() % 16, 0);
        assert_eq!(cipher.decrypt(&ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn test_encrypt_base64_is_reencoding() {
        let cipher = Cipher::new(KEY, ProtocolVersion::V31).unwrap();
        let plaintext = b"hello";

        let raw = cipher.encrypt(plaintext, false).unwrap();
        let b64 = cipher.encrypt(plaintext, true).unwrap();

        assert_eq!(STANDARD.decode(&b64).unwrap(), raw);
    }

    #[test]
    fn test_decrypt_v33_strips_version_header() {
        let cipher = Cipher::new(KEY, ProtocolVersion::V33).unwrap();
        let ciphertext = cipher.encrypt(b"{}", false).unwrap();

        let mut framed = b"3.3".to_vec();
        framed.extend_from_slice(&[0u8; 12]);
        framed.extend_from_slice(&ciphertext);

        assert_eq!(cipher.decrypt(&framed).unwrap(), b"{}");
    }

    #[test]
    fn test_decrypt_v31_envelope() {
        let cipher = Cipher::new(KEY, ProtocolVersion::V31).unwrap();
        let b64 = cipher.encrypt(b"{\"devId\":\"x\"}", true).unwrap();

        let mut envelope = b"3.1".to_vec();
        envelope.extend_from_slice(b"0123456789abcdef");
        envelope.extend_from_slice(&b64);

        assert_eq!(cipher.decrypt(&envelope).unwrap(), b"{\"devId\":\"x\"}");
    }

    #[test]
    fn test_encrypt_v34_requires_alignment() {
        let cipher = Cipher::new(KEY, ProtocolVersion::V34).unwrap();
        let result = cipher.encrypt(b"abc", false);

        assert!(matches!(result, Err(Error::UnalignedPlaintext { len: 3 })));
    }

    #[test]
    fn test_encrypt_decrypt_v34() {
        let cipher = Cipher::new(KEY, ProtocolVersion::V34).unwrap();
        let padded = pkcs7_pad(b"{\"t\":1}");

        let ciphertext = cipher.encrypt(&padded, false).unwrap();
        // Raw block transform: no extra padding block
        assert_eq!(ciphertext.len(), padded.len());
        assert_eq!(cipher.decrypt(&ciphertext).unwrap(), b"{\"t\":1}");
    }

    #[test]
    fn test_decrypt_v34_strips_inner_header() {
        let cipher = Cipher::new(KEY, ProtocolVersion::V34).unwrap();

        let mut plain = b"3.4".to_vec();
        plain.extend_from_slice(&[0u8; 12]);
        plain.extend_from_slice(b"{\"dps\":{}}");

        let ciphertext = cipher.encrypt(&pkcs7_pad(&plain), false).unwrap();
        assert_eq!(cipher.decrypt(&ciphertext).unwrap(), b"{\"dps\":{}}");
    }

    #[test]
    fn test_decrypt_unaligned_fails() {
        let cipher = Cipher::new(KEY, ProtocolVersion::V33).unwrap();
        assert!(matches!(cipher.decrypt(b"{}"), Err(Error::DecryptFailure(_))));
        assert!(matches!(cipher.decrypt(b""), Err(Error::DecryptFailure(_))));
    }

    #[test]
    fn test_decrypt_wrong_key_fails() {
        let sender = Cipher::new(KEY, ProtocolVersion::V33).unwrap();
        let receiver = Cipher::new(b"ce3d019c816cd28c", ProtocolVersion::V33).unwrap();

        let ciphertext = sender.encrypt(br#"{"dps":{"1":true,"2":0}}"#, false).unwrap();
        assert!(matches!(receiver.decrypt(&ciphertext), Err(Error::DecryptFailure(_))));
    }

    #[test]
    fn test_md5_signature() {
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        let signature = Cipher::md5_signature(b"");
        assert_eq!(hex::encode(signature), "8f00b204e9800998");
        assert_eq!(Cipher::md5_signature(b"data=abc").len(), 8);
    }

    #[test]
    fn test_hmac_uses_session_key() {
        let cipher = Cipher::new(KEY, ProtocolVersion::V34).unwrap();
        let before = cipher.hmac_signature(b"frame").unwrap();

        cipher.set_session_key(b"0123456789abcdef").unwrap();
        let after = cipher.hmac_signature(b"frame").unwrap();

        assert_ne!(before, after);
        assert_eq!(cipher.hmac_signature_hex(b"frame").unwrap(), hex::encode(after));
    }

    #[test]
    fn test_session_key_set_once() {
        let cipher = Cipher::new(KEY, ProtocolVersion::V34).unwrap();

        assert!(matches!(
            cipher.set_session_key(b"short"),
            Err(Error::InvalidKeyLength { actual: 5 })
        ));
        cipher.set_session_key(b"0123456789abcdef").unwrap();
        assert!(matches!(
            cipher.set_session_key(b"fedcba9876543210"),
            Err(Error::SessionKeyAlreadySet)
        ));
        assert_eq!(&cipher.key(), b"0123456789abcdef");
        assert_eq!(cipher.local_key(), KEY);
    }

    #[test]
    fn test_random_nonce() {
        let a = Cipher::random_nonce();
        let b = Cipher::random_nonce();
        assert_ne!(a, b);
    }

    #[test]
    fn test_pkcs7_pad_full_block() {
        let padded = pkcs7_pad(&[0u8; 16]);
        assert_eq!(padded.len(), 32);
        assert!(padded[16..].iter().all(|&b| b == 16));
    }
}
