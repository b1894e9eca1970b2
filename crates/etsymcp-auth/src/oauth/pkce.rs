//! PKCE (Proof Key for Code Exchange)
//!
//! Implements RFC 7636 for secure authorization code flow.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use sha2::{Digest, Sha256};

/// PKCE code verifier and challenge pair
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// The code verifier (kept secret, sent in token exchange)
    pub verifier: String,
    /// The code challenge (sent in authorization request)
    pub challenge: String,
    /// Challenge method (always S256)
    pub method: String,
}

impl PkceChallenge {
    /// Generate a new PKCE challenge.
    ///
    /// 32 random bytes from the thread CSPRNG, base64-URL encoded without
    /// padding, yield a 43-character verifier - inside the 43-128 range the
    /// RFC requires.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let random_bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();

        let verifier = URL_SAFE_NO_PAD.encode(&random_bytes);

        // Challenge: SHA256(verifier) then base64-URL encode
        let mut hasher = Sha256::new();
        hasher.update(verifier.as_bytes());
        let hash = hasher.finalize();
        let challenge = URL_SAFE_NO_PAD.encode(hash);

        Self {
            verifier,
            challenge,
            method: "S256".to_string(),
        }
    }
}

impl Default for PkceChallenge {
    fn default() -> Self {
        Self::generate()
    }
}

/// Generate a random state parameter for CSRF binding.
///
/// 32 bytes of entropy before encoding; the state only proves that a callback
/// corresponds to a request this process initiated, it is never used as a
/// secret in the code exchange.
pub fn generate_state() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}
