// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! SHA-512-crypt password hashing for platform-provisioned users.
//!
//! Implements the crypt(3) SHA-512 scheme so that a plaintext password
//! handed over by a provisioning document can be turned into a shadow-file
//! value. The salt is injectable to keep the expander deterministic under
//! test.

use rand::Rng;
use sha2::{Digest, Sha512};

/// The crypt-flavored base64 alphabet. Not interchangeable with RFC 4648.
const ALPHABET: &[u8; 64] =
    b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

const DEFAULT_ROUNDS: u32 = 5000;
const MIN_ROUNDS: u32 = 1000;
const MAX_ROUNDS: u32 = 999_999_999;

/// Salts longer than this are truncated, per the scheme.
const MAX_SALT_LEN: usize = 16;

/// Prefixes marking a password that is already in crypt format and must be
/// passed through untouched.
const HASHED_PREFIXES: [&str; 7] =
    ["$1$", "$2a$", "$2b$", "$2y$", "$5$", "$6$", "$y$"];

pub fn is_password_hashed(password: &str) -> bool {
    HASHED_PREFIXES.iter().any(|prefix| password.starts_with(prefix))
}

/// Draws a fresh 16-character salt from the crypt alphabet.
pub fn generate_salt<R: Rng>(rng: &mut R) -> String {
    (0..MAX_SALT_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Hashes `password` with the default round count, producing
/// `$6$<salt>$<86-char digest>`.
pub fn sha512_crypt(password: &str, salt: &str) -> String {
    sha512_crypt_with_rounds(password, salt, None)
}

/// Hashes `password`, spelling out the round count in the result when one
/// is given (the default count is conventionally elided).
pub fn sha512_crypt_with_rounds(
    password: &str,
    salt: &str,
    rounds: Option<u32>,
) -> String {
    let salt: String = salt
        .strip_prefix("$6$")
        .unwrap_or(salt)
        .chars()
        .take_while(|c| *c != '$')
        .take(MAX_SALT_LEN)
        .collect();
    let effective_rounds =
        rounds.unwrap_or(DEFAULT_ROUNDS).clamp(MIN_ROUNDS, MAX_ROUNDS);

    let digest = crypt_digest(
        password.as_bytes(),
        salt.as_bytes(),
        effective_rounds as usize,
    );

    let mut out = String::with_capacity(4 + salt.len() + 1 + 86);
    out.push_str("$6$");
    if rounds.is_some() {
        out.push_str(&format!("rounds={effective_rounds}$"));
    }
    out.push_str(&salt);
    out.push('$');
    encode_digest(&digest, &mut out);
    out
}

fn crypt_digest(key: &[u8], salt: &[u8], rounds: usize) -> [u8; 64] {
    // Digest B: key / salt / key.
    let mut b = Sha512::new();
    b.update(key);
    b.update(salt);
    b.update(key);
    let b: [u8; 64] = b.finalize().into();

    // Digest A: key, salt, then B stretched to the key length, then one of
    // B or the key per bit of the key length.
    let mut a = Sha512::new();
    a.update(key);
    a.update(salt);
    let mut remaining = key.len();
    while remaining > 64 {
        a.update(b);
        remaining -= 64;
    }
    a.update(&b[..remaining]);
    let mut bits = key.len();
    while bits > 0 {
        if bits & 1 != 0 {
            a.update(b);
        } else {
            a.update(key);
        }
        bits >>= 1;
    }
    let a: [u8; 64] = a.finalize().into();

    // Byte sequence P: the key hashed key-length times, recycled out to the
    // key length.
    let mut dp = Sha512::new();
    for _ in 0..key.len() {
        dp.update(key);
    }
    let dp: [u8; 64] = dp.finalize().into();
    let p = recycle(&dp, key.len());

    // Byte sequence S: the salt hashed (16 + A[0]) times, recycled out to
    // the salt length.
    let mut ds = Sha512::new();
    for _ in 0..(16 + a[0] as usize) {
        ds.update(salt);
    }
    let ds: [u8; 64] = ds.finalize().into();
    let s = recycle(&ds, salt.len());

    // The stretching rounds.
    let mut c = a;
    for round in 0..rounds {
        let mut ctx = Sha512::new();
        if round % 2 != 0 {
            ctx.update(&p);
        } else {
            ctx.update(c);
        }
        if round % 3 != 0 {
            ctx.update(&s);
        }
        if round % 7 != 0 {
            ctx.update(&p);
        }
        if round % 2 != 0 {
            ctx.update(c);
        } else {
            ctx.update(&p);
        }
        c = ctx.finalize().into();
    }
    c
}

fn recycle(digest: &[u8; 64], len: usize) -> Vec<u8> {
    digest.iter().cycle().take(len).copied().collect()
}

/// The scheme's peculiar transposed base64: bytes are consumed in a fixed
/// shuffle, three at a time, little-end first.
fn encode_digest(digest: &[u8; 64], out: &mut String) {
    const ORDER: [(usize, usize, usize); 21] = [
        (0, 21, 42),
        (22, 43, 1),
        (44, 2, 23),
        (3, 24, 45),
        (25, 46, 4),
        (47, 5, 26),
        (6, 27, 48),
        (28, 49, 7),
        (50, 8, 29),
        (9, 30, 51),
        (31, 52, 10),
        (53, 11, 32),
        (12, 33, 54),
        (34, 55, 13),
        (56, 14, 35),
        (15, 36, 57),
        (37, 58, 16),
        (59, 17, 38),
        (18, 39, 60),
        (40, 61, 19),
        (62, 20, 41),
    ];

    for (b2, b1, b0) in ORDER {
        encode_24bit(digest[b2], digest[b1], digest[b0], 4, out);
    }
    encode_24bit(0, 0, digest[63], 2, out);
}

fn encode_24bit(b2: u8, b1: u8, b0: u8, chars: usize, out: &mut String) {
    let mut word =
        ((b2 as u32) << 16) | ((b1 as u32) << 8) | (b0 as u32);
    for _ in 0..chars {
        out.push(ALPHABET[(word & 0x3f) as usize] as char);
        word >>= 6;
    }
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    // Reference vectors from the scheme's published test suite.
    #[test]
    fn reference_vectors() {
        assert_eq!(
            sha512_crypt("Hello world!", "saltstring"),
            "$6$saltstring$svn8UoSVapNtMuq1ukKS4tPQd8iKwSMHWjl/O817G3uBnIFNjnQJuesI68u4OTLiBFdcbYEdFCoEOfaS35inz1"
        );
        assert_eq!(
            sha512_crypt_with_rounds(
                "Hello world!",
                "saltstringsaltst",
                Some(10000)
            ),
            "$6$rounds=10000$saltstringsaltst$OW1/O6BYHV6BcXZu8QVeXbDWra3Oeqh0sbHbbMCVNSnCM/UrjmM0Dp8vOuZeHBy/YTBmSK6H9qs/y3RnOaw5v."
        );
    }

    #[test]
    fn salt_is_sanitized() {
        // A pre-formatted salt string and a long salt both collapse to the
        // same 16-character effective salt.
        let reference = sha512_crypt("secret", "abcdefghijklmnop");
        assert_eq!(sha512_crypt("secret", "$6$abcdefghijklmnop"), reference);
        assert_eq!(
            sha512_crypt("secret", "abcdefghijklmnopqrstuvwx"),
            reference
        );
        assert_eq!(sha512_crypt("secret", "abcdefghijklmnop$junk"), reference);
    }

    #[test]
    fn output_shape() {
        let mut rng = StdRng::seed_from_u64(1);
        let salt = generate_salt(&mut rng);
        assert_eq!(salt.len(), 16);
        assert!(salt.bytes().all(|b| ALPHABET.contains(&b)));

        let hash = sha512_crypt("testpassword123", &salt);
        let parts: Vec<&str> = hash.split('$').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[1], "6");
        assert_eq!(parts[2].len(), 16);
        assert_eq!(parts[3].len(), 86);
    }

    #[test]
    fn hashed_detection() {
        for hashed in [
            "$6$salt$hash",
            "$5$salt$hash",
            "$y$salt$hash",
            "$2a$10$hash",
            "$2b$10$hash",
            "$2y$10$hash",
            "$1$salt$hash",
        ] {
            assert!(is_password_hashed(hashed), "{hashed}");
        }
        for plain in ["plaintext", "$invalid", ""] {
            assert!(!is_password_hashed(plain), "{plain:?}");
        }
    }
}
