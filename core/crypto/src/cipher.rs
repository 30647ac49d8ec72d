//! Authenticated encryption: AES-256-CBC with HMAC-SHA-256.
//!
//! Sealed blobs have the layout
//!
//! ```text
//! IV (16) || ciphertext (k * 16) || HMAC-SHA-256(IV || ciphertext) (32)
//! ```
//!
//! There is no length prefix. The MAC is verified before the block cipher
//! ever touches the ciphertext.

use aes::Aes256;
use cbc::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::{ConstantTimeEq, ConstantTimeGreater};

use crate::keys::KeyMaterial;
use crate::rng;
use cairn_common::{Error, Result};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Initialization vector size (one block).
pub const IV_SIZE: usize = BLOCK_SIZE;

/// HMAC-SHA-256 tag size.
pub const MAC_SIZE: usize = 32;

/// Fixed overhead of a sealed blob, excluding padding.
pub const OVERHEAD: usize = IV_SIZE + MAC_SIZE;

/// Smallest well-formed blob: IV, one padded block, MAC.
const MIN_SEALED_LEN: usize = IV_SIZE + BLOCK_SIZE + MAC_SIZE;

/// Encrypt and authenticate `plaintext` under `keys`.
///
/// # Postconditions
/// - Returns IV || ciphertext || MAC
/// - The IV is freshly drawn from the OS random source on every call
/// - The output length is `OVERHEAD + padded_len(plaintext.len())`
///
/// # Errors
/// - [`Error::RandomSource`] if no IV could be generated
pub fn seal(keys: &KeyMaterial, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut iv = [0u8; IV_SIZE];
    rng::fill(&mut iv)?;

    let body_len = padded_len(plaintext.len());
    let mut out = Vec::with_capacity(IV_SIZE + body_len + MAC_SIZE);
    out.extend_from_slice(&iv);
    out.extend_from_slice(plaintext);
    pad(&mut out, plaintext.len());

    Aes256CbcEnc::new_from_slices(keys.encryption_key(), &iv)
        .map_err(|e| Error::Crypto(format!("Unable to create cipher: {}", e)))?
        .encrypt_padded_mut::<NoPadding>(&mut out[IV_SIZE..], body_len)
        .map_err(|e| Error::Crypto(format!("Encryption failed: {}", e)))?;

    let tag = compute_mac(keys, &out)?;
    out.extend_from_slice(&tag);

    Ok(out)
}

/// Verify and decrypt a blob produced by [`seal`].
///
/// # Errors
/// - [`Error::Unauthenticated`] if the blob is malformed or the MAC does not
///   match; no decryption is attempted in that case
/// - [`Error::MalformedPadding`] if the authenticated plaintext carries
///   invalid padding
pub fn open(keys: &KeyMaterial, blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < MIN_SEALED_LEN || (blob.len() - OVERHEAD) % BLOCK_SIZE != 0 {
        return Err(Error::Unauthenticated);
    }

    let (signed, tag) = blob.split_at(blob.len() - MAC_SIZE);
    let expected = compute_mac(keys, signed)?;
    if !bool::from(expected[..].ct_eq(tag)) {
        return Err(Error::Unauthenticated);
    }

    let (iv, ciphertext) = signed.split_at(IV_SIZE);
    let mut plaintext = ciphertext.to_vec();

    Aes256CbcDec::new_from_slices(keys.encryption_key(), iv)
        .map_err(|e| Error::Crypto(format!("Unable to create cipher: {}", e)))?
        .decrypt_padded_mut::<NoPadding>(&mut plaintext)
        .map_err(|e| Error::Crypto(format!("Decryption failed: {}", e)))?;

    let len = unpad(&plaintext)?;
    plaintext.truncate(len);
    Ok(plaintext)
}

/// Length of `len` plaintext bytes after padding.
pub fn padded_len(len: usize) -> usize {
    len + (BLOCK_SIZE - len % BLOCK_SIZE)
}

/// Bytes a sealed blob adds on top of `plaintext_len`, padding included.
pub fn overhead(plaintext_len: usize) -> usize {
    OVERHEAD + padded_len(plaintext_len) - plaintext_len
}

fn compute_mac(keys: &KeyMaterial, data: &[u8]) -> Result<[u8; MAC_SIZE]> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(keys.signing_key())
        .map_err(|e| Error::Crypto(format!("Unable to create HMAC: {}", e)))?;
    mac.update(data);

    let mut tag = [0u8; MAC_SIZE];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    Ok(tag)
}

/// Append 1..=BLOCK_SIZE padding bytes, each equal to the pad length.
fn pad(buf: &mut Vec<u8>, plaintext_len: usize) {
    let n = BLOCK_SIZE - plaintext_len % BLOCK_SIZE;
    buf.resize(buf.len() + n, n as u8);
}

/// Validate padding and return the plaintext length.
///
/// Every byte of the final block is inspected regardless of where the first
/// mismatch is, so timing does not reveal its position.
fn unpad(buf: &[u8]) -> Result<usize> {
    if buf.len() < BLOCK_SIZE || buf.len() % BLOCK_SIZE != 0 {
        return Err(Error::MalformedPadding);
    }

    let last_block = &buf[buf.len() - BLOCK_SIZE..];
    let n = last_block[BLOCK_SIZE - 1];

    let mut bad = n.ct_eq(&0) | n.ct_gt(&(BLOCK_SIZE as u8));
    for (i, byte) in last_block.iter().enumerate() {
        // distance from the end of the buffer, 1 for the final byte
        let distance = (BLOCK_SIZE - i) as u8;
        let in_padding = !distance.ct_gt(&n);
        bad |= in_padding & !byte.ct_eq(&n);
    }

    if bool::from(bad) {
        return Err(Error::MalformedPadding);
    }
    Ok(buf.len() - n as usize)
}
