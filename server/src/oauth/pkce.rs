use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{thread_rng, RngCore};
use sha2::{Digest, Sha256};

/// Number of random bytes in a PKCE code verifier
const VERIFIER_BYTES: usize = 32;

/// PKCE code verifier and its S256 challenge
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// The original random string, sent with the token request
    pub verifier: String,
    /// The hashed and encoded verifier, sent with the authorization request
    pub challenge: String,
}

impl PkceChallenge {
    /// Generate a fresh verifier and challenge
    pub fn generate() -> Self {
        let mut verifier_bytes = [0u8; VERIFIER_BYTES];
        thread_rng().fill_bytes(&mut verifier_bytes);

        let verifier = Base64UrlUnpadded::encode_string(&verifier_bytes);
        let challenge = challenge_for(&verifier);

        Self {
            verifier,
            challenge,
        }
    }
}

/// Derive the S256 code challenge for a verifier
pub fn challenge_for(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    Base64UrlUnpadded::encode_string(&hasher.finalize())
}

/// Random value for the OAuth `state` parameter
pub fn generate_state() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
