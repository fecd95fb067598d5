//! PKCE (Proof Key for Code Exchange) implementation per RFC 7636
//!
//! A fresh verifier is minted for every consent event. The S256 challenge
//! goes into the authorization URL; the verifier stays server-side in
//! `PendingConsents` until the callback arrives.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use sha2::{Digest, Sha256};

use crate::constants::VERIFIER_LEN;

/// RFC 7636 unreserved characters: `ALPHA / DIGIT / "-" / "." / "_" / "~"`
const UNRESERVED: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// A verifier and its derived S256 challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceParameters {
    pub verifier: String,
    pub challenge: String,
}

impl PkceParameters {
    /// Mint a new verifier/challenge pair.
    pub fn generate() -> Self {
        let verifier = generate_verifier();
        let challenge = compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

/// Generate a 128-character verifier drawn uniformly from the unreserved set.
///
/// Uses the thread-local CSPRNG, which is seeded from the OS and panics if
/// the OS entropy source is unavailable.
pub fn generate_verifier() -> String {
    let mut rng = rand::rng();
    (0..VERIFIER_LEN)
        .map(|_| UNRESERVED[rng.random_range(0..UNRESERVED.len())] as char)
        .collect()
}

/// Compute the S256 code challenge from a verifier.
///
/// `challenge = BASE64URL(SHA256(ASCII(verifier)))`, unpadded.
pub fn compute_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}
