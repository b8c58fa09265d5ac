// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Functional code for resource references: verification hash parsing and
//! source URL classification.

use thiserror::Error;

use crate::latest::ignition::{Resource, Verification};

/// URL schemes a resource source may use. An empty source is also legal and
/// means "no content".
pub const SUPPORTED_SCHEMES: [&str; 7] =
    ["data", "http", "https", "tftp", "s3", "gs", "oem"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashFunction {
    Sha256,
    Sha512,
}

impl HashFunction {
    /// Length in characters of this function's hex digest.
    pub fn hex_len(&self) -> usize {
        match self {
            HashFunction::Sha256 => 64,
            HashFunction::Sha512 => 128,
        }
    }
}

impl std::fmt::Display for HashFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashFunction::Sha256 => f.write_str("sha256"),
            HashFunction::Sha512 => f.write_str("sha512"),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ResourceError {
    #[error("hash {0:?} is not of the form <function>-<digest>")]
    MalformedHash(String),

    #[error("unsupported hash function {0:?}")]
    UnsupportedHashFunction(String),

    #[error("wrong digest length {found} for {function} (expected {expected})")]
    WrongDigestLength {
        function: HashFunction,
        found: usize,
        expected: usize,
    },

    #[error("digest contains non-hex characters")]
    DigestNotHex,

    #[error("unsupported URL scheme in {0:?}")]
    UnsupportedScheme(String),

    #[error("source {0:?} is not a URL")]
    NotAUrl(String),
}

impl std::fmt::Display for HashRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.function, self.digest)
    }
}

/// A parsed verification hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashRef<'a> {
    pub function: HashFunction,
    pub digest: &'a str,
}

impl Verification {
    /// Parses the verification hash, if one is present.
    pub fn parsed_hash(&self) -> Option<Result<HashRef<'_>, ResourceError>> {
        let raw = self.hash.as_deref()?;
        Some(HashRef::parse(raw))
    }
}

impl<'a> HashRef<'a> {
    /// Parses a `<function>-<hex digest>` verification string.
    pub fn parse(raw: &'a str) -> Result<Self, ResourceError> {
        let (function, digest) = raw
            .split_once('-')
            .ok_or_else(|| ResourceError::MalformedHash(raw.to_owned()))?;
        let function = match function {
            "sha256" => HashFunction::Sha256,
            "sha512" => HashFunction::Sha512,
            other => {
                return Err(ResourceError::UnsupportedHashFunction(
                    other.to_owned(),
                ))
            }
        };
        if digest.len() != function.hex_len() {
            return Err(ResourceError::WrongDigestLength {
                function,
                found: digest.len(),
                expected: function.hex_len(),
            });
        }
        if !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ResourceError::DigestNotHex);
        }
        Ok(HashRef { function, digest })
    }
}

/// Checks a source URL's scheme against the supported set. Empty sources
/// are fine: they mean "no content".
pub fn check_scheme(source: &str) -> Result<(), ResourceError> {
    if source.is_empty() {
        return Ok(());
    }
    let scheme = source
        .split_once(':')
        .map(|(scheme, _)| scheme)
        .ok_or_else(|| ResourceError::NotAUrl(source.to_owned()))?;
    if SUPPORTED_SCHEMES.contains(&scheme) {
        Ok(())
    } else {
        Err(ResourceError::UnsupportedScheme(source.to_owned()))
    }
}

impl Resource {
    /// Checks the source URL scheme against the supported set. Empty or
    /// absent sources are fine.
    pub fn check_source_scheme(&self) -> Result<(), ResourceError> {
        check_scheme(self.source.as_deref().unwrap_or_default())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hash_parse_accepts_both_functions() {
        let sha256 = format!("sha256-{}", "ab".repeat(32));
        let sha512 = format!("sha512-{}", "cd".repeat(64));
        for (raw, function) in
            [(sha256, HashFunction::Sha256), (sha512, HashFunction::Sha512)]
        {
            let verification = Verification { hash: Some(raw.clone()) };
            let parsed = verification
                .parsed_hash()
                .expect("hash present")
                .expect("hash parses");
            assert_eq!(parsed.function, function);
            assert_eq!(parsed.to_string(), raw);
        }
    }

    #[test]
    fn hash_parse_rejects_bad_inputs() {
        for raw in [
            "md5-abcdef",
            "sha256-abcd",
            "sha512-xyz",
            "sha256",
            &format!("sha256-{}", "zz".repeat(32)),
        ] {
            let verification = Verification { hash: Some(raw.to_owned()) };
            assert!(
                verification.parsed_hash().expect("hash present").is_err(),
                "{raw:?} should not parse"
            );
        }
    }

    #[test]
    fn source_schemes() {
        for source in [
            "data:,hello",
            "https://example.com/config.ign",
            "s3://bucket/key",
            "oem://base",
            "tftp://10.0.0.1/cfg",
        ] {
            let resource = Resource {
                source: Some(source.to_owned()),
                ..Default::default()
            };
            assert!(resource.check_source_scheme().is_ok(), "{source:?}");
        }

        let bad = Resource {
            source: Some("ftp://example.com/x".to_owned()),
            ..Default::default()
        };
        assert!(matches!(
            bad.check_source_scheme(),
            Err(ResourceError::UnsupportedScheme(_))
        ));

        let not_a_url = Resource {
            source: Some("just some text".to_owned()),
            ..Default::default()
        };
        assert!(matches!(
            not_a_url.check_source_scheme(),
            Err(ResourceError::NotAUrl(_))
        ));

        let empty = Resource { source: Some(String::new()), ..Default::default() };
        assert!(empty.check_source_scheme().is_ok());
        assert!(Resource::default().check_source_scheme().is_ok());
    }
}
