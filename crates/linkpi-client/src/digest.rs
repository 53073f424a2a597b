//! HTTP Digest support for the LinkPi control API
//!
//! Only the subset the encoder speaks is implemented: MD5, `qop=auth` and a
//! fixed nonce-count of `00000001`. Every header gets a fresh client nonce.

use std::collections::HashMap;

use md5::{Digest, Md5};
use rand::rngs::OsRng;
use rand::RngCore;

/// Nonce-count sent with every request. The device accepts a repeated
/// count for the same nonce, so it is never incremented.
pub const NONCE_COUNT: &str = "00000001";

/// Default quality of protection when the challenge omits `qop`
pub const DEFAULT_QOP: &str = "auth";

/// Number of random bytes in a client nonce
const CNONCE_LEN: usize = 8;

/// Challenge parameters taken from a `WWW-Authenticate` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub qop: String,
    pub opaque: String,
}

impl DigestChallenge {
    /// Parse a raw `WWW-Authenticate` header value.
    ///
    /// Missing directives fall back to empty strings (`qop` to `auth`), so
    /// this never fails; callers decide whether a header was offered at all.
    pub fn from_header(header: &str) -> Self {
        let mut directives = parse_www_authenticate(header);
        let mut take = |key: &str| directives.remove(key).unwrap_or_default();

        let realm = take("realm");
        let nonce = take("nonce");
        let opaque = take("opaque");
        let qop = directives
            .remove("qop")
            .unwrap_or_else(|| DEFAULT_QOP.to_string());

        Self {
            realm,
            nonce,
            qop,
            opaque,
        }
    }
}

/// Split a `Digest k1="v1", k2=v2` header into directive name and unquoted value.
///
/// Segments without `=` or with an empty name are skipped.
pub fn parse_www_authenticate(header: &str) -> HashMap<String, String> {
    let header = header.trim();
    let body = match header.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("digest") => rest,
        _ => header,
    };

    body.split(',')
        .filter_map(|part| part.trim().split_once('='))
        .filter(|(key, _)| !key.trim().is_empty())
        .map(|(key, value)| {
            (
                key.trim().to_string(),
                value.trim().trim_matches('"').to_string(),
            )
        })
        .collect()
}

/// Lowercase hex MD5 of `input`
pub fn md5_hex(input: impl AsRef<[u8]>) -> String {
    hex::encode(Md5::digest(input.as_ref()))
}

/// Generate a fresh client nonce from the OS random source
pub fn generate_cnonce() -> String {
    let mut bytes = [0u8; CNONCE_LEN];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Build an `Authorization` header value with a freshly generated cnonce
pub fn authorization_header(
    username: &str,
    password: &str,
    method: &str,
    uri: &str,
    challenge: &DigestChallenge,
) -> String {
    authorization_header_with_cnonce(
        username,
        password,
        method,
        uri,
        challenge,
        &generate_cnonce(),
    )
}

/// Build an `Authorization` header value for a caller-supplied cnonce
pub fn authorization_header_with_cnonce(
    username: &str,
    password: &str,
    method: &str,
    uri: &str,
    challenge: &DigestChallenge,
    cnonce: &str,
) -> String {
    let ha1 = md5_hex(format!("{}:{}:{}", username, challenge.realm, password));
    let ha2 = md5_hex(format!("{}:{}", method, uri));
    let response = md5_hex(format!(
        "{}:{}:{}:{}:{}:{}",
        ha1, challenge.nonce, NONCE_COUNT, cnonce, challenge.qop, ha2
    ));

    format!(
        "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", \
         algorithm=\"MD5\", response=\"{}\", qop={}, nc={}, cnonce=\"{}\", opaque=\"{}\"",
        username,
        challenge.realm,
        challenge.nonce,
        uri,
        response,
        challenge.qop,
        NONCE_COUNT,
        cnonce,
        challenge.opaque
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn challenge() -> DigestChallenge {
        DigestChallenge::from_header(r#"Digest realm="x", nonce="n1", qop="auth", opaque="o""#)
    }

    #[test]
    fn test_parse_skips_malformed_segments() {
        let parsed = parse_www_authenticate(
            r#"Digest realm="linkpi", garbage, nonce="abc123",, qop=auth, =, opaque="zz""#,
        );
        assert_eq!(parsed.get("realm").map(String::as_str), Some("linkpi"));
        assert_eq!(parsed.get("nonce").map(String::as_str), Some("abc123"));
        assert_eq!(parsed.get("qop").map(String::as_str), Some("auth"));
        assert_eq!(parsed.get("opaque").map(String::as_str), Some("zz"));
        assert_eq!(parsed.len(), 4);
        assert!(!parsed.contains_key("garbage"));
    }

    #[test]
    fn test_parse_keeps_equals_inside_value() {
        let parsed = parse_www_authenticate(r#"Digest nonce="YWJj==", realm="r""#);
        assert_eq!(parsed["nonce"], "YWJj==");
        assert_eq!(parsed["realm"], "r");
    }

    #[test]
    fn test_parse_empty_header() {
        assert!(parse_www_authenticate("").is_empty());
        assert!(parse_www_authenticate("Digest").is_empty());
    }

    #[test]
    fn test_challenge_defaults() {
        let challenge = DigestChallenge::from_header(r#"Digest nonce="n""#);
        assert_eq!(challenge.nonce, "n");
        assert_eq!(challenge.realm, "");
        assert_eq!(challenge.opaque, "");
        assert_eq!(challenge.qop, "auth");
    }

    #[test]
    fn test_md5_hex() {
        assert_eq!(md5_hex("admin"), "21232f297a57a5a743894a0e4a801fc3");
        assert_eq!(md5_hex(""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_cnonce_is_fresh_hex() {
        let a = generate_cnonce();
        let b = generate_cnonce();
        assert_eq!(a.len(), CNONCE_LEN * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_header_matches_reference_computation() {
        let header = authorization_header_with_cnonce(
            "admin",
            "secret",
            "POST",
            "/link/system/get_sys_state",
            &challenge(),
            "0a1b2c3d4e5f6071",
        );

        let ha1 = md5_hex("admin:x:secret");
        let ha2 = md5_hex("POST:/link/system/get_sys_state");
        let response = md5_hex(format!("{}:n1:00000001:0a1b2c3d4e5f6071:auth:{}", ha1, ha2));

        assert_eq!(
            header,
            format!(
                "Digest username=\"admin\", realm=\"x\", nonce=\"n1\", \
                 uri=\"/link/system/get_sys_state\", algorithm=\"MD5\", response=\"{}\", \
                 qop=auth, nc=00000001, cnonce=\"0a1b2c3d4e5f6071\", opaque=\"o\"",
                response
            )
        );
    }

    #[test]
    fn test_same_cnonce_is_deterministic() {
        let build = |cnonce: &str| {
            authorization_header_with_cnonce("u", "p", "POST", "/a", &challenge(), cnonce)
        };
        assert_eq!(build("1111111111111111"), build("1111111111111111"));
    }

    #[test]
    fn test_different_cnonce_changes_only_cnonce_and_response() {
        let a = authorization_header_with_cnonce("u", "p", "POST", "/a", &challenge(), "aaaa");
        let b = authorization_header_with_cnonce("u", "p", "POST", "/a", &challenge(), "bbbb");

        let fields = |h: &str| parse_www_authenticate(h);
        let (fa, fb) = (fields(&a), fields(&b));
        assert_eq!(fa.len(), fb.len());
        for (key, value) in &fa {
            match key.as_str() {
                "cnonce" | "response" => assert_ne!(value, &fb[key], "{} should differ", key),
                _ => assert_eq!(value, &fb[key], "{} should match", key),
            }
        }
    }

    #[test]
    fn test_random_header_round_trips_through_parser() {
        let header = authorization_header("u", "p", "POST", "/link/user/lph_login", &challenge());
        let fields = parse_www_authenticate(&header);
        assert_eq!(fields["username"], "u");
        assert_eq!(fields["uri"], "/link/user/lph_login");
        assert_eq!(fields["nc"], NONCE_COUNT);
        assert_eq!(fields["cnonce"].len(), CNONCE_LEN * 2);
    }
}
