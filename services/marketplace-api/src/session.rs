//! Session token cipher
//!
//! Session tokens are the user's cache key encrypted with AES-128 in
//! OFB mode and hex encoded. The ciphertext layout is a random IV
//! followed by the keystream-encrypted, block-padded plaintext, so
//! tokens for the same address differ between logins.

use aes::Aes128;
use ofb::cipher::{KeyIvInit, StreamCipher};
use ofb::Ofb;
use rand::RngCore;
use thiserror::Error;

type Aes128Ofb = Ofb<Aes128>;

/// AES block size; the session secret must be exactly this long.
pub const CIPHER_BLOCK_SIZE: usize = 16;

/// Prefix of the per-address session record in the cache store. The
/// token plaintext is this prefix plus the wallet address, so the
/// address can be recovered from a decrypted token directly.
pub const LOGIN_SESSION_KEY_PREFIX: &str = "cache:login:address:data:";

/// Prefix of the pending login-message record keyed by address.
pub const LOGIN_MESSAGE_KEY_PREFIX: &str = "cache:login:address:msg:";

/// Session lifetime: 30 days.
pub const SESSION_TTL_SECONDS: u64 = 30 * 24 * 3600;

/// Unclaimed login message lifetime: 72 hours.
pub const LOGIN_MESSAGE_TTL_SECONDS: u64 = 72 * 3600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("token is not valid hex")]
    Encoding,
    #[error("ciphertext malformed")]
    Malformed,
    #[error("invalid padding")]
    Padding,
}

pub fn login_session_key(address: &str) -> String {
    format!("{LOGIN_SESSION_KEY_PREFIX}{address}")
}

pub fn login_message_key(address: &str) -> String {
    format!("{LOGIN_MESSAGE_KEY_PREFIX}{address}")
}

/// Recovers the wallet address from a decrypted session plaintext.
pub fn extract_address(plaintext: &str) -> Option<&str> {
    plaintext
        .strip_prefix(LOGIN_SESSION_KEY_PREFIX)
        .filter(|addr| !addr.is_empty())
}

fn pad(mut data: Vec<u8>) -> Vec<u8> {
    let fill = CIPHER_BLOCK_SIZE - data.len() % CIPHER_BLOCK_SIZE;
    data.extend(std::iter::repeat(fill as u8).take(fill));
    data
}

/// Strips trailing-count padding. The count byte must name between 1
/// and a full block of bytes and cannot exceed the message length;
/// anything else rejects the whole token.
fn unpad(data: &[u8]) -> Result<&[u8], CipherError> {
    let count = *data.last().ok_or(CipherError::Padding)? as usize;
    if count == 0 || count > CIPHER_BLOCK_SIZE || count > data.len() {
        return Err(CipherError::Padding);
    }
    Ok(&data[..data.len() - count])
}

/// Encrypts a session plaintext into a hex token.
pub fn encrypt_token(plaintext: &str, secret: &[u8]) -> Result<String, CipherError> {
    let mut iv = [0u8; CIPHER_BLOCK_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);

    let mut body = pad(plaintext.as_bytes().to_vec());
    let mut cipher =
        Aes128Ofb::new_from_slices(secret, &iv).map_err(|_| CipherError::Malformed)?;
    cipher.apply_keystream(&mut body);

    let mut out = iv.to_vec();
    out.extend_from_slice(&body);
    Ok(hex::encode(out))
}

/// Decrypts a hex session token back to its plaintext.
///
/// Rejects tokens whose decoded length cannot hold an IV plus at
/// least one block, or whose body is not block aligned.
pub fn decrypt_token(token: &str, secret: &[u8]) -> Result<String, CipherError> {
    let raw = hex::decode(token).map_err(|_| CipherError::Encoding)?;
    if raw.len() < 2 * CIPHER_BLOCK_SIZE {
        return Err(CipherError::Malformed);
    }
    let (iv, body) = raw.split_at(CIPHER_BLOCK_SIZE);
    if body.len() % CIPHER_BLOCK_SIZE != 0 {
        return Err(CipherError::Malformed);
    }

    let mut cipher = Aes128Ofb::new_from_slices(secret, iv).map_err(|_| CipherError::Malformed)?;
    let mut body = body.to_vec();
    cipher.apply_keystream(&mut body);

    let stripped = unpad(&body)?;
    String::from_utf8(stripped.to_vec()).map_err(|_| CipherError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"om_login_salt&$%";

    #[test]
    fn test_round_trip() {
        let plain = login_session_key("0xabc123");
        let token = encrypt_token(&plain, SECRET).unwrap();
        assert_eq!(decrypt_token(&token, SECRET).unwrap(), plain);
    }

    #[test]
    fn test_tokens_are_randomized() {
        let plain = login_session_key("0xabc123");
        let a = encrypt_token(&plain, SECRET).unwrap();
        let b = encrypt_token(&plain, SECRET).unwrap();
        assert_ne!(a, b);
        assert_eq!(decrypt_token(&a, SECRET).unwrap(), decrypt_token(&b, SECRET).unwrap());
    }

    #[test]
    fn test_rejects_non_hex() {
        assert_eq!(decrypt_token("zz-not-hex", SECRET), Err(CipherError::Encoding));
    }

    #[test]
    fn test_rejects_short_and_misaligned_ciphertext() {
        // Too short to hold IV + one block.
        let short = hex::encode([0u8; CIPHER_BLOCK_SIZE + 8]);
        assert_eq!(decrypt_token(&short, SECRET), Err(CipherError::Malformed));

        // IV plus a body that is not block aligned.
        let misaligned = hex::encode([0u8; 2 * CIPHER_BLOCK_SIZE + 1]);
        assert_eq!(decrypt_token(&misaligned, SECRET), Err(CipherError::Malformed));
    }

    #[test]
    fn test_rejects_out_of_range_padding_count() {
        // A corrupted final byte decrypts to a padding count outside
        // 1..=16 with overwhelming probability; build one directly by
        // encrypting then flipping bits in the last body byte until
        // unpadding fails.
        let plain = login_session_key("0xabc123");
        let token = encrypt_token(&plain, SECRET).unwrap();
        let raw = hex::decode(&token).unwrap();

        let last = raw.len() - 1;
        let mut rejected = false;
        for flip in 1..=255u8 {
            let mut tampered = raw.clone();
            tampered[last] ^= flip;
            if decrypt_token(&hex::encode(&tampered), SECRET).is_err() {
                rejected = true;
                break;
            }
        }
        assert!(rejected);
        assert!(decrypt_token(&hex::encode(&raw), SECRET).is_ok());
    }

    #[test]
    fn test_unpad_bounds() {
        assert_eq!(unpad(&[1, 2, 3, 0]), Err(CipherError::Padding));
        assert_eq!(unpad(&[1, 2, 3, 17]), Err(CipherError::Padding));
        assert_eq!(unpad(&[1, 2, 3, 4]), Err(CipherError::Padding));
        assert_eq!(unpad(&[1, 2, 3, 2]).unwrap(), &[1, 2]);
        assert!(unpad(&[]).is_err());
    }

    #[test]
    fn test_extract_address() {
        assert_eq!(extract_address("cache:login:address:data:0xabc"), Some("0xabc"));
        assert_eq!(extract_address("cache:login:address:data:"), None);
        assert_eq!(extract_address("something else"), None);
    }
}
