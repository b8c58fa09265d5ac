// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Path and data-URL helpers shared by the pipeline stages.

/// Bytes that survive data-URL percent-encoding unescaped: the RFC 3986
/// unreserved set plus the reserved characters a path segment may carry
/// verbatim. Everything else becomes `%XX`. This byte set is part of the
/// wire contract for translated inline content and must not drift.
fn escape_exempt(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
        || matches!(
            byte,
            b'-' | b'_' | b'.' | b'~' | b'$' | b'&' | b'+' | b':' | b'=' | b'@'
        )
}

/// Renders inline content as a `data:` URL with a percent-encoded body.
pub(crate) fn data_url(contents: &[u8]) -> String {
    let mut encoded = String::with_capacity(contents.len() + 6);
    encoded.push_str("data:,");
    for &byte in contents {
        if escape_exempt(byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

/// Decodes the body of a plain-text `data:,` URL produced by [`data_url`].
/// Returns `None` for other data-URL flavors or stray escapes.
pub(crate) fn decode_data_url(url: &str) -> Option<Vec<u8>> {
    let body = url.strip_prefix("data:,")?;
    let mut bytes = Vec::with_capacity(body.len());
    let mut rest = body.bytes();
    while let Some(byte) = rest.next() {
        if byte == b'%' {
            let hex = [rest.next()?, rest.next()?];
            let hex = std::str::from_utf8(&hex).ok()?;
            bytes.push(u8::from_str_radix(hex, 16).ok()?);
        } else {
            bytes.push(byte);
        }
    }
    Some(bytes)
}

/// Lexically joins an absolute base path and a (possibly absolute) relative
/// path, cleaning the result.
pub(crate) fn join_paths(base: &str, rest: &str) -> String {
    clean_path(&format!("{base}/{rest}"))
}

/// Removes empty, `.`, and `..` components without consulting the
/// filesystem; the result is always absolute.
pub(crate) fn clean_path(path: &str) -> String {
    let mut components: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                components.pop();
            }
            other => components.push(other),
        }
    }
    if components.is_empty() {
        "/".to_owned()
    } else {
        format!("/{}", components.join("/"))
    }
}

/// Whether `path` is absolute and already in the form [`clean_path`] would
/// produce.
pub(crate) fn is_clean_abs_path(path: &str) -> bool {
    path.starts_with('/') && clean_path(path) == path
}

/// Tri-state knobs count as set only when explicitly true.
pub(crate) fn is_true(value: Option<bool>) -> bool {
    value == Some(true)
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn data_url_matches_wire_encoding() {
        // The exact escape set is load-bearing: brackets, newlines, bangs,
        // stars, and spaces are escaped; '=' is not.
        assert_eq!(
            data_url(b"[Match]\nType=!vlan bond bridge\nName=eth*\n\n[Network]\nBond=bond0"),
            "data:,%5BMatch%5D%0AType=%21vlan%20bond%20bridge%0AName=eth%2A%0A%0A%5BNetwork%5D%0ABond=bond0"
        );
        assert_eq!(
            data_url(b"[Match]\nName=bond0\n\n[Network]\nDHCP=true"),
            "data:,%5BMatch%5D%0AName=bond0%0A%0A%5BNetwork%5D%0ADHCP=true"
        );
    }

    #[test]
    fn join_handles_absolute_rest() {
        assert_eq!(join_paths("/", "/empty"), "/empty");
        assert_eq!(join_paths("/var", "/varfile"), "/var/varfile");
        assert_eq!(join_paths("/mnt/oem", "grub.cfg"), "/mnt/oem/grub.cfg");
        assert_eq!(join_paths("/var", "../etc/passwd"), "/etc/passwd");
    }

    #[test]
    fn clean_abs_path_detection() {
        for ok in ["/", "/etc", "/etc/systemd/system"] {
            assert!(is_clean_abs_path(ok), "{ok:?}");
        }
        for bad in ["", "etc", "/etc/", "/etc//x", "/etc/./x", "/a/../b"] {
            assert!(!is_clean_abs_path(bad), "{bad:?}");
        }
    }

    proptest! {
        #[test]
        fn data_url_roundtrips(contents in proptest::collection::vec(any::<u8>(), 0..256)) {
            prop_assert_eq!(
                decode_data_url(&data_url(&contents)),
                Some(contents)
            );
        }
    }
}
