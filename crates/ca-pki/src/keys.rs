//! Password-protected key material.
//!
//! Private keys never touch disk unencrypted. Each key is sealed with
//! ChaCha20-Poly1305 under a key derived from the operator password with
//! Argon2id. The sealed format is `salt || nonce || ciphertext || tag`.
//!
//! This module also produces the Ed25519 keys for the first JWK
//! provisioner and for SSH certificate signing.

use argon2::Argon2;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit},
};
use ed25519_dalek::SigningKey;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::pem;

/// PEM label for password-sealed private keys.
pub const ENCRYPTED_KEY_LABEL: &str = "ENCRYPTED PRIVATE KEY";

const SALT_SIZE: usize = 16;
const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;
const KEY_SIZE: usize = 32;

/// Seals `plaintext` under `password`.
///
/// # Errors
///
/// Returns an error if the password is empty or encryption fails.
pub fn seal(password: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    if password.is_empty() {
        return Err(Error::Encryption("password must not be empty".into()));
    }

    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);

    let key = derive_key(password, &salt)?;
    let cipher = ChaCha20Poly1305::new_from_slice(key.as_slice())
        .map_err(|e| Error::Encryption(format!("failed to create cipher: {e}")))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| Error::Encryption(format!("encryption failed: {e}")))?;

    let mut output = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + ciphertext.len());
    output.extend_from_slice(&salt);
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Opens data produced by [`seal`].
///
/// # Errors
///
/// Returns an error if the data is truncated, the password is wrong or
/// the data was tampered with.
pub fn open(password: &[u8], sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if sealed.len() < SALT_SIZE + NONCE_SIZE + TAG_SIZE {
        return Err(Error::Encryption(format!(
            "sealed key too short: {} bytes",
            sealed.len()
        )));
    }

    let (salt, rest) = sealed.split_at(SALT_SIZE);
    let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);

    let key = derive_key(password, salt)?;
    let cipher = ChaCha20Poly1305::new_from_slice(key.as_slice())
        .map_err(|e| Error::Encryption(format!("failed to create cipher: {e}")))?;
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map(Zeroizing::new)
        .map_err(|e| Error::Encryption(format!("decryption failed: {e}")))
}

/// Seals a DER private key and wraps it in a PEM block.
///
/// # Errors
///
/// Returns an error if sealing fails.
pub fn seal_pem(password: &[u8], der: &[u8]) -> Result<String> {
    Ok(pem::encode(ENCRYPTED_KEY_LABEL, &seal(password, der)?))
}

/// Opens a PEM block produced by [`seal_pem`].
///
/// # Errors
///
/// Returns an error if the PEM is malformed or cannot be opened.
pub fn open_pem(password: &[u8], text: &str) -> Result<Zeroizing<Vec<u8>>> {
    let (label, sealed) = pem::decode(text.as_bytes())?;
    if label != ENCRYPTED_KEY_LABEL {
        return Err(Error::Parse(format!("expected {ENCRYPTED_KEY_LABEL}, found {label}")));
    }
    open(password, &sealed)
}

fn derive_key(password: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    Argon2::default()
        .hash_password_into(password, salt, key.as_mut_slice())
        .map_err(|e| Error::Encryption(format!("key derivation failed: {e}")))?;
    Ok(key)
}

/// Public Ed25519 JSON Web Key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, always `OKP`.
    pub kty: String,
    /// Curve, always `Ed25519`.
    pub crv: String,
    /// Base64url public key.
    pub x: String,
    /// RFC 7638 thumbprint.
    pub kid: String,
    /// Intended use, always `sig`.
    #[serde(rename = "use")]
    pub usage: String,
    /// Signature algorithm, always `EdDSA`.
    pub alg: String,
}

impl Jwk {
    fn ed25519(public: &[u8; 32]) -> Self {
        let x = URL_SAFE_NO_PAD.encode(public);
        // Members in lexicographic order, no whitespace.
        let canonical = format!(r#"{{"crv":"Ed25519","kty":"OKP","x":"{x}"}}"#);
        let kid = URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes()));
        Self {
            kty: "OKP".into(),
            crv: "Ed25519".into(),
            x,
            kid,
            usage: "sig".into(),
            alg: "EdDSA".into(),
        }
    }
}

#[derive(Serialize)]
struct PrivateJwk<'a> {
    #[serde(flatten)]
    public: &'a Jwk,
    d: String,
}

/// Key material for the first JWK provisioner.
#[derive(Debug, Clone)]
pub struct ProvisionerKey {
    /// Provisioner name.
    pub name: String,
    /// Public key.
    pub jwk: Jwk,
    /// Base64 sealed private JWK.
    pub encrypted_key: String,
}

/// Generates an Ed25519 JWK provisioner key sealed with `password`.
///
/// # Errors
///
/// Returns an error if the private key cannot be sealed.
pub fn generate_provisioner(name: &str, password: &[u8]) -> Result<ProvisionerKey> {
    let signing_key = SigningKey::generate(&mut OsRng);
    let jwk = Jwk::ed25519(&signing_key.verifying_key().to_bytes());

    let private = Zeroizing::new(
        serde_json::to_vec(&PrivateJwk {
            public: &jwk,
            d: URL_SAFE_NO_PAD.encode(signing_key.to_bytes()),
        })
        .map_err(|e| Error::Serialization(format!("failed to encode provisioner key: {e}")))?,
    );

    Ok(ProvisionerKey {
        name: name.to_string(),
        jwk,
        encrypted_key: STANDARD.encode(seal(password, &private)?),
    })
}

/// An SSH certificate-signing key pair.
#[derive(Debug, Clone)]
pub struct SshKeyPair {
    /// OpenSSH `authorized_keys` style public key.
    pub public: String,
    /// Sealed private key in PEM form.
    pub private_pem: String,
}

/// Generates an Ed25519 SSH signing key sealed with `password`.
///
/// # Errors
///
/// Returns an error if the private key cannot be sealed.
pub fn generate_ssh_key(password: &[u8]) -> Result<SshKeyPair> {
    let signing_key = SigningKey::generate(&mut OsRng);
    let secret = Zeroizing::new(signing_key.to_bytes());
    Ok(SshKeyPair {
        public: openssh_public_key(&signing_key.verifying_key().to_bytes()),
        private_pem: seal_pem(password, secret.as_slice())?,
    })
}

/// Renders an Ed25519 public key in OpenSSH wire format.
fn openssh_public_key(public: &[u8; 32]) -> String {
    const ALGORITHM: &str = "ssh-ed25519";
    let mut wire = Vec::with_capacity(4 + ALGORITHM.len() + 4 + public.len());
    for field in [ALGORITHM.as_bytes(), public.as_slice()] {
        wire.extend_from_slice(&(field.len() as u32).to_be_bytes());
        wire.extend_from_slice(field);
    }
    format!("{ALGORITHM} {}", STANDARD.encode(wire))
}
