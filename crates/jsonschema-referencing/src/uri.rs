//! A minimal, dependency-free RFC 3986 URI type.
//!
//! The engine cannot lean on a general-purpose URI crate here: correctness depends on
//! bit-exact behavior around empty fragments, percent-encoding normalization and
//! case-folding that general crates do not all agree on. `percent-encoding` is still used
//! underneath for the byte-level escaping primitives, the way the rest of this codebase
//! treats it as a utility rather than a URI model.
use std::fmt;

use once_cell::sync::Lazy;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::Error;

/// Characters that must be percent-encoded in a path segment.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^');

/// A parsed absolute or relative URI reference.
///
/// Stored as the original string plus byte offsets of each component, mirroring the
/// index-based parsers elsewhere in this codebase rather than allocating per-component.
#[derive(Debug, Clone, Eq)]
pub struct Uri {
    value: String,
    scheme_end: Option<usize>,
    authority: Option<(usize, usize)>,
    host: Option<(usize, usize)>,
    port: Option<u16>,
    path: (usize, usize),
    query: Option<(usize, usize)>,
    fragment: Option<(usize, usize)>,
}

impl PartialEq for Uri {
    fn eq(&self, other: &Self) -> bool {
        self.scheme().map(str::to_ascii_lowercase) == other.scheme().map(str::to_ascii_lowercase)
            && self.host().map(str::to_ascii_lowercase) == other.host().map(str::to_ascii_lowercase)
            && self.port() == other.port()
            && decode(self.path()) == decode(other.path())
            && self.query().map(decode) == other.query().map(decode)
            && self.fragment().map(decode) == other.fragment().map(decode)
    }
}

impl std::hash::Hash for Uri {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.scheme().map(str::to_ascii_lowercase).hash(state);
        self.host().map(str::to_ascii_lowercase).hash(state);
        self.port().hash(state);
        decode(self.path()).hash(state);
        self.query().map(decode).hash(state);
        self.fragment().map(decode).hash(state);
    }
}

fn decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

impl Uri {
    /// Parse a URI (or URI reference) from its string form.
    pub fn parse(input: &str) -> Result<Uri, Error> {
        Parser::new(input).parse()
    }

    /// Parse a URI reference, resolving it against the library's default root
    /// (`json-schema:///`) if it has no scheme of its own.
    pub fn from_str(input: &str) -> Result<Uri, Error> {
        let uri = Parser::new(input).parse()?.normalize();
        if uri.scheme().is_some() {
            Ok(uri)
        } else {
            DEFAULT_ROOT_URI.resolve(input)
        }
    }

    /// Resolve `reference` against `self` and normalize the result.
    pub fn resolve_against(&self, reference: &str) -> Result<Uri, Error> {
        Ok(self.resolve(reference)?.normalize())
    }

    /// The full original string form.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme_end.map(|end| &self.value[..end])
    }

    pub fn has_scheme(&self) -> bool {
        self.scheme_end.is_some()
    }

    pub fn authority(&self) -> Option<&str> {
        self.authority.map(|(s, e)| &self.value[s..e])
    }

    pub fn host(&self) -> Option<&str> {
        self.host.map(|(s, e)| &self.value[s..e])
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.value[self.path.0..self.path.1]
    }

    pub fn query(&self) -> Option<&str> {
        self.query.map(|(s, e)| &self.value[s..e])
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.map(|(s, e)| &self.value[s..e])
    }

    /// True only if a fragment is present and non-empty.
    pub fn has_non_empty_fragment(&self) -> bool {
        matches!(self.fragment(), Some(f) if !f.is_empty())
    }

    /// Return a copy of this URI with the fragment component removed entirely.
    pub fn without_fragment(&self) -> Uri {
        let end = self
            .fragment
            .map(|(s, _)| s - 1) // drop the leading '#'
            .unwrap_or(self.value.len());
        Parser::new(&self.value[..end])
            .parse()
            .expect("stripping a fragment from a valid URI stays valid")
    }

    /// RFC 3986 §5.2.2/§5.2.3/§5.2.4 reference resolution: resolve `reference` against `self`
    /// (`self` acting as the base URI).
    pub fn resolve(&self, reference: &str) -> Result<Uri, Error> {
        let r = Parser::new(reference).parse()?;
        if r.scheme().is_some() {
            return Ok(normalize_path_in_place(r));
        }
        let mut scheme = self.scheme().map(str::to_string);
        let authority;
        let path;
        let query;
        if r.authority().is_some() {
            authority = r.authority().map(str::to_string);
            path = remove_dot_segments(r.path());
            query = r.query().map(str::to_string);
        } else {
            authority = self.authority().map(str::to_string);
            if r.path().is_empty() {
                path = self.path().to_string();
                query = r.query().map(str::to_string).or_else(|| self.query().map(str::to_string));
            } else if r.path().starts_with('/') {
                path = remove_dot_segments(r.path());
                query = r.query().map(str::to_string);
            } else {
                path = remove_dot_segments(&merge_paths(self, r.path()));
                query = r.query().map(str::to_string);
            }
        }
        if scheme.is_none() {
            scheme = self.scheme().map(str::to_string);
        }
        let fragment = r.fragment().map(str::to_string);
        build(scheme, authority, path, query, fragment)
    }

    /// Normalize: lowercase scheme/host, remove dot-segments, strip an empty fragment.
    pub fn normalize(&self) -> Uri {
        let scheme = self.scheme().map(str::to_ascii_lowercase);
        let path = remove_dot_segments(self.path());
        let fragment = match self.fragment() {
            Some("") | None => None,
            Some(f) => Some(f.to_string()),
        };
        let authority = match self.host() {
            Some(host) => {
                let lowered_host = host.to_ascii_lowercase();
                self.authority()
                    .map(|auth| auth.replacen(host, &lowered_host, 1))
            }
            None => self.authority().map(str::to_string),
        };
        build(scheme, authority, path, self.query().map(str::to_string), fragment)
            .expect("normalizing a valid URI stays valid")
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

pub(crate) static DEFAULT_ROOT_URI: Lazy<Uri> =
    Lazy::new(|| Uri::parse("json-schema:///").expect("default root URI is valid"));

fn normalize_path_in_place(u: Uri) -> Uri {
    let path = remove_dot_segments(u.path());
    build(
        u.scheme().map(str::to_string),
        u.authority().map(str::to_string),
        path,
        u.query().map(str::to_string),
        u.fragment().map(str::to_string),
    )
    .expect("re-building a parsed URI stays valid")
}

fn merge_paths(base: &Uri, reference_path: &str) -> String {
    if base.authority().is_some() && base.path().is_empty() {
        format!("/{reference_path}")
    } else if let Some(slash) = base.path().rfind('/') {
        format!("{}{}", &base.path()[..=slash], reference_path)
    } else {
        reference_path.to_string()
    }
}

/// RFC 3986 §5.2.4.
fn remove_dot_segments(path: &str) -> String {
    let mut input: Vec<&str> = Vec::new();
    let absolute = path.starts_with('/');
    let trailing_slash = path.ends_with('/') && path != "/";
    for segment in path.split('/') {
        input.push(segment);
    }
    let mut output: Vec<&str> = Vec::new();
    let last = input.len().saturating_sub(1);
    for (i, seg) in input.iter().enumerate() {
        match *seg {
            "." => {}
            ".." => {
                if output.last().map(|s| *s != "").unwrap_or(false) {
                    output.pop();
                } else if !absolute {
                    output.push("..");
                }
            }
            "" if i == 0 && absolute => output.push(""),
            "" if i == last => {}
            other => output.push(other),
        }
    }
    let mut result = output.join("/");
    if absolute && !result.starts_with('/') {
        result = format!("/{result}");
    }
    if trailing_slash && !result.ends_with('/') {
        result.push('/');
    }
    if result.is_empty() && absolute {
        result.push('/');
    }
    result
}

#[allow(clippy::too_many_arguments)]
fn build(
    scheme: Option<String>,
    authority: Option<String>,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
) -> Result<Uri, Error> {
    let mut out = String::new();
    if let Some(scheme) = &scheme {
        out.push_str(scheme);
        out.push(':');
    }
    if let Some(authority) = &authority {
        out.push_str("//");
        out.push_str(authority);
    }
    out.push_str(&path);
    if let Some(query) = &query {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = &fragment {
        out.push('#');
        out.push_str(fragment);
    }
    Parser::new(&out).parse()
}

/// Percent-encode a path segment using the engine's own allowed-character set.
pub fn encode_to(input: &str, buffer: &mut String) {
    for ch in utf8_percent_encode(input, PATH) {
        buffer.push_str(ch);
    }
}

struct Parser<'a> {
    input: &'a str,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input }
    }

    fn parse(self) -> Result<Uri, Error> {
        validate_percent_encoding(self.input)?;
        let bytes = self.input.as_bytes();
        let mut i;
        let mut scheme_end = None;
        let mut authority_range: Option<(usize, usize)> = None;
        let mut host_range: Option<(usize, usize)> = None;
        let mut port: Option<u16> = None;
        let path_start;
        let path_end;
        let mut query: Option<(usize, usize)> = None;
        let mut fragment: Option<(usize, usize)> = None;

        let mut has_scheme = false;
        if let Some(colon) = bytes.iter().position(|&b| b == b':') {
            let candidate = &self.input[..colon];
            if !candidate.is_empty()
                && candidate.as_bytes()[0].is_ascii_alphabetic()
                && candidate
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'-' || b == b'.')
                && !candidate.contains('/')
            {
                scheme_end = Some(colon);
                has_scheme = true;
            }
        }
        if scheme_end == Some(0) {
            return Err(Error::invalid_uri("empty scheme"));
        }

        i = if has_scheme { scheme_end.unwrap() + 1 } else { 0 };

        if has_scheme && self.input[i..].starts_with("//") {
            i += 2;
            let authority_start = i;
            let mut end = self.input.len();
            for (idx, c) in self.input[i..].char_indices() {
                if c == '/' || c == '?' || c == '#' {
                    end = i + idx;
                    break;
                }
            }
            authority_range = Some((authority_start, end));
            let (h, p) = parse_authority(&self.input[authority_start..end])?;
            host_range = h.map(|(s, e)| (authority_start + s, authority_start + e));
            port = p;
            i = end;
        }
        path_start = i;

        let rest = &self.input[path_start..];
        let path_len = if let Some(q) = rest.find('?') {
            q
        } else if let Some(h) = rest.find('#') {
            h
        } else {
            rest.len()
        };
        path_end = path_start + path_len;

        let after_path = &self.input[path_end..];
        if let Some(stripped) = after_path.strip_prefix('?') {
            let q_start = path_end + 1;
            let q_len = stripped.find('#').unwrap_or(stripped.len());
            query = Some((q_start, q_start + q_len));
            let frag_part = &stripped[q_len..];
            if let Some(f) = frag_part.strip_prefix('#') {
                let f_start = q_start + q_len + 1;
                fragment = Some((f_start, f_start + f.len()));
            }
        } else if let Some(f) = after_path.strip_prefix('#') {
            let f_start = path_end + 1;
            fragment = Some((f_start, f_start + f.len()));
        }

        validate_path(&self.input[path_start..path_end], authority_range.is_some())?;

        Ok(Uri {
            value: self.input.to_string(),
            scheme_end,
            authority: authority_range,
            host: host_range,
            port,
            path: (path_start, path_end),
            query,
            fragment,
        })
    }
}

fn validate_path(path: &str, has_authority: bool) -> Result<(), Error> {
    if has_authority && !path.is_empty() && !path.starts_with('/') {
        return Err(Error::invalid_uri(
            "path in a URI with authority must be empty or absolute",
        ));
    }
    Ok(())
}

fn parse_authority(authority: &str) -> Result<(Option<(usize, usize)>, Option<u16>), Error> {
    let host_part = if let Some(at) = authority.rfind('@') {
        &authority[at + 1..]
    } else {
        authority
    };
    let offset = authority.len() - host_part.len();

    if let Some(stripped) = host_part.strip_prefix('[') {
        let close = stripped
            .find(']')
            .ok_or_else(|| Error::invalid_uri("missing ']' for IP-literal"))?;
        let ipv6 = &stripped[..close];
        validate_ipv6(ipv6)?;
        let after = &stripped[close + 1..];
        let port = parse_port(after)?;
        let host_start = offset;
        let host_end = offset + close + 2;
        return Ok((Some((host_start, host_end)), port));
    }

    let (host, port_str) = match host_part.rfind(':') {
        Some(idx) => (&host_part[..idx], Some(&host_part[idx + 1..])),
        None => (host_part, None),
    };
    let port = match port_str {
        Some(p) => parse_port(&format!(":{p}"))?,
        None => None,
    };
    let host_start = offset;
    let host_end = offset + host.len();
    Ok((Some((host_start, host_end)), port))
}

fn parse_port(with_colon: &str) -> Result<Option<u16>, Error> {
    if with_colon.is_empty() {
        return Ok(None);
    }
    let digits = with_colon
        .strip_prefix(':')
        .ok_or_else(|| Error::invalid_uri("malformed port"))?;
    if digits.is_empty() {
        return Ok(None);
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::invalid_uri("non-digit port"));
    }
    digits
        .parse::<u16>()
        .map(Some)
        .map_err(|_| Error::invalid_uri("port out of range"))
}

fn validate_ipv6(ipv6: &str) -> Result<(), Error> {
    if ipv6.matches("::").count() > 1 {
        return Err(Error::invalid_uri("IPv6 address with more than one '::'"));
    }
    let (halves, compressed): (Vec<&str>, bool) = if let Some(idx) = ipv6.find("::") {
        let (left, right) = (&ipv6[..idx], &ipv6[idx + 2..]);
        let mut words: Vec<&str> = Vec::new();
        if !left.is_empty() {
            words.extend(left.split(':'));
        }
        if !right.is_empty() {
            words.extend(right.split(':'));
        }
        (words, true)
    } else {
        (ipv6.split(':').collect(), false)
    };
    if !compressed && halves.len() != 8 {
        return Err(Error::invalid_uri("IPv6 address with wrong word count"));
    }
    if compressed && halves.len() > 7 {
        return Err(Error::invalid_uri("IPv6 address with wrong word count"));
    }
    for (idx, word) in halves.iter().enumerate() {
        if idx == halves.len() - 1 && word.contains('.') {
            validate_ipv4(word)?;
            continue;
        }
        if word.is_empty() || word.len() > 4 || !word.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::invalid_uri("IPv6 word is not 1-4 hex digits"));
        }
    }
    Ok(())
}

fn validate_ipv4(ipv4: &str) -> Result<(), Error> {
    let parts: Vec<&str> = ipv4.split('.').collect();
    if parts.len() != 4 {
        return Err(Error::invalid_uri("IPv4 address must have four octets"));
    }
    for part in parts {
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid_uri("IPv4 octet is not numeric"));
        }
        if part.len() > 1 && part.starts_with('0') {
            return Err(Error::invalid_uri("IPv4 octet has a leading zero"));
        }
        if part.parse::<u16>().unwrap_or(256) > 255 {
            return Err(Error::invalid_uri("IPv4 octet greater than 255"));
        }
    }
    Ok(())
}

fn validate_percent_encoding(input: &str) -> Result<(), Error> {
    if !input.is_ascii() {
        return Err(Error::invalid_uri(
            "non-ASCII character outside percent-encoding",
        ));
    }
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 >= bytes.len()
                || !bytes[i + 1].is_ascii_hexdigit()
                || !bytes[i + 2].is_ascii_hexdigit()
            {
                return Err(Error::invalid_uri("malformed percent-encoded triplet"));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("http://example.com/a/b", "http"; "scheme and host")]
    #[test_case("urn:isbn:0451450523", "urn"; "urn scheme")]
    fn test_scheme(input: &str, expected: &str) {
        let uri = Uri::parse(input).expect("valid");
        assert_eq!(uri.scheme(), Some(expected));
    }

    #[test]
    fn test_normalize_dot_segments() {
        let uri = Uri::parse("HTTP://Ex.com/a/./b/../c").expect("valid");
        assert_eq!(uri.normalize().to_string(), "http://ex.com/a/c");
    }

    #[test]
    fn test_normalize_idempotent() {
        let uri = Uri::parse("HTTP://Ex.COM/a/./b/../c#").expect("valid");
        let once = uri.normalize();
        let twice = once.normalize();
        assert_eq!(once.to_string(), twice.to_string());
    }

    #[test]
    fn test_resolve_empty_reference_is_identity() {
        let base = Uri::parse("http://example.com/a/b").expect("valid");
        let resolved = base.resolve("").expect("valid");
        assert_eq!(resolved.to_string(), "http://example.com/a/b");
    }

    #[test]
    fn test_resolve_relative() {
        let base = Uri::parse("http://example.com/a/b").expect("valid");
        let resolved = base.resolve("c").expect("valid");
        assert_eq!(resolved.to_string(), "http://example.com/a/c");
    }

    #[test]
    fn test_resolve_fragment_only() {
        let base = Uri::parse("http://example.com/a/b").expect("valid");
        let resolved = base.resolve("#frag").expect("valid");
        assert_eq!(resolved.to_string(), "http://example.com/a/b#frag");
    }

    #[test]
    fn test_has_non_empty_fragment() {
        assert!(Uri::parse("http://e.com#x").unwrap().has_non_empty_fragment());
        assert!(!Uri::parse("http://e.com#").unwrap().has_non_empty_fragment());
        assert!(!Uri::parse("http://e.com").unwrap().has_non_empty_fragment());
    }

    #[test]
    fn test_without_fragment() {
        let uri = Uri::parse("http://e.com/a#frag").unwrap();
        assert_eq!(uri.without_fragment().to_string(), "http://e.com/a");
    }

    #[test]
    fn test_invalid_empty_scheme() {
        assert!(Uri::parse(":/example.com").is_err());
    }

    #[test]
    fn test_invalid_ipv6_double_compression() {
        assert!(Uri::parse("http://[::1::2]/").is_err());
    }

    #[test]
    fn test_invalid_ipv4_leading_zero() {
        assert!(Uri::parse("http://192.168.001.1/").is_err());
    }

    #[test]
    fn test_invalid_port() {
        assert!(Uri::parse("http://example.com:abc/").is_err());
    }

    #[test]
    fn test_equality_case_insensitive_scheme_host() {
        let a = Uri::parse("HTTP://Example.COM/a").unwrap();
        let b = Uri::parse("http://example.com/a").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_malformed_percent_triplet() {
        assert!(Uri::parse("http://example.com/%zz").is_err());
    }

    #[test]
    fn test_from_str_resolves_relative_to_default_root() {
        let uri = Uri::from_str("schema.json").expect("valid");
        assert_eq!(uri.scheme(), Some("json-schema"));
    }
}
