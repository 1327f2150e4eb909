//! Sealing allows a controller to encrypt keeper secrets (salts and seeds)
//! so they can be persisted alongside the rest of the keeper's parameters.
//!
//! The sealing key comes from the controller's passcode: the passcode is
//! turned into a salt, stretched with Argon2id, then run through HKDF.

use crate::{
    crypto::salter::{Salter, Tier},
    error::{Error, Result},
    util::ser::human_bytes,
};
use chacha20poly1305::{aead::Aead, KeyInit};
use rand::{CryptoRng, RngCore};
use serde_derive::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Passcodes shorter than this don't carry enough entropy for a salt.
pub const PASSCODE_LEN: usize = 21;

/// The path the controller's passcode is stretched on.
const CONTROLLER_PATH: &str = "signify:controller";

/// A sealed blob, with the nonce needed to open it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct Sealed {
    #[serde(with = "human_bytes")]
    nonce: Vec<u8>,
    #[serde(with = "human_bytes")]
    ciphertext: Vec<u8>,
}

/// The symmetric key that seals keeper secrets.
#[derive(Clone)]
pub struct SealKey {
    key: Zeroizing<[u8; 32]>,
}

impl std::fmt::Debug for SealKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealKey").field("key", &"<secret>").finish()
    }
}

impl SealKey {
    /// Derive the seal key from a passcode at the default work factor.
    pub fn from_passcode(passcode: &str) -> Result<Self> {
        Self::from_passcode_tiered(passcode, Tier::Low, false)
    }

    /// Derive the seal key from a passcode at a given work factor.
    pub fn from_passcode_tiered(passcode: &str, tier: Tier, temp: bool) -> Result<Self> {
        if passcode.len() < PASSCODE_LEN || !passcode.is_ascii() {
            Err(Error::KeeperInvalid(format!("passcode must be at least {} characters", PASSCODE_LEN)))?;
        }
        let salter = Salter::from_qb64(&format!("0AA{}", &passcode[..PASSCODE_LEN]), tier)?;
        let stretched = salter.stretch(32, CONTROLLER_PATH, None, temp)?;
        let mut key = Zeroizing::new([0u8; 32]);
        stretch_key(&stretched, &mut *key, Some(b"keri-core/seal"), None)?;
        Ok(Self { key })
    }

    /// Create a seal key from raw bytes.
    pub fn from_bytes(key: [u8; 32]) -> Self {
        Self { key: Zeroizing::new(key) }
    }

    /// Encrypt some data.
    pub fn seal<R: RngCore + CryptoRng>(&self, rng: &mut R, plaintext: &[u8]) -> Result<Sealed> {
        let mut nonce = [0u8; 24];
        rng.fill_bytes(&mut nonce);
        let cipher = chacha20poly1305::XChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(self.key.as_slice()));
        let ciphertext = cipher
            .encrypt(chacha20poly1305::XNonce::from_slice(&nonce), plaintext)
            .map_err(|_| Error::CryptoSealFailed)?;
        Ok(Sealed { nonce: nonce.to_vec(), ciphertext })
    }

    /// Decrypt something we sealed.
    pub fn open(&self, sealed: &Sealed) -> Result<Zeroizing<Vec<u8>>> {
        if sealed.nonce.len() != 24 {
            Err(Error::CryptoOpenFailed)?;
        }
        let cipher = chacha20poly1305::XChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(self.key.as_slice()));
        let plaintext = cipher
            .decrypt(chacha20poly1305::XNonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())
            .map_err(|_| Error::CryptoOpenFailed)?;
        Ok(Zeroizing::new(plaintext))
    }

    /// Seal a string (a qb64 salt or seed).
    pub fn seal_str<R: RngCore + CryptoRng>(&self, rng: &mut R, plaintext: &str) -> Result<Sealed> {
        self.seal(rng, plaintext.as_bytes())
    }

    /// Open something sealed with [`seal_str`][Self::seal_str].
    pub fn open_str(&self, sealed: &Sealed) -> Result<Zeroizing<String>> {
        let plaintext = self.open(sealed)?;
        let string = String::from_utf8(plaintext.to_vec()).map_err(|_| Error::CryptoOpenFailed)?;
        Ok(Zeroizing::new(string))
    }
}

/// Given the bytes from a secret key, derive some other key of N length in a
/// secure manner.
pub fn stretch_key<const N: usize>(input: &[u8], output: &mut [u8; N], info: Option<&[u8]>, salt: Option<&[u8]>) -> Result<()> {
    let hkdf = hkdf::SimpleHkdf::<blake3::Hasher>::new(salt, input);
    hkdf.expand(info.unwrap_or(b"keri-core/hkdf"), output)
        .map_err(|_| Error::CryptoHKDFFailed)?;
    Ok(())
}
