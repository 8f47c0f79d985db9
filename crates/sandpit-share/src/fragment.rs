//! Source text in the location fragment: `code/<token>` or `example/<key>`.

use std::io::{Read, Write};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;

use crate::ShareError;
use crate::presets::ExampleSet;

pub const CODE_PREFIX: &str = "code/";
pub const EXAMPLE_PREFIX: &str = "example/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentRef<'a> {
    Code(&'a str),
    Example(&'a str),
}

/// Deflate then base64url, so the token needs no further escaping.
pub fn encode_source(text: &str) -> Result<String, ShareError> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(text.as_bytes())
        .map_err(ShareError::Compress)?;
    let compressed = encoder.finish().map_err(ShareError::Compress)?;
    Ok(URL_SAFE_NO_PAD.encode(compressed))
}

/// Tries the token as-is first, then its percent-decoded form, since link
/// shorteners and chat clients sometimes escape it a second time.
pub fn decode_source(token: &str) -> Result<String, ShareError> {
    let token = token.trim();
    let first_error = match decode_token(token) {
        Ok(text) => return Ok(text),
        Err(err) => err,
    };

    match urlencoding::decode(token) {
        Ok(unescaped) if unescaped != token => decode_token(unescaped.trim()).map_err(|_| first_error),
        _ => Err(first_error),
    }
}

fn decode_token(token: &str) -> Result<String, ShareError> {
    let compressed = URL_SAFE_NO_PAD.decode(token)?;
    let mut text = String::new();
    DeflateDecoder::new(compressed.as_slice())
        .read_to_string(&mut text)
        .map_err(ShareError::Decompress)?;
    Ok(text)
}

/// Fragment body (without `#`) for `text`.
pub fn fragment_for(text: &str, examples: &ExampleSet) -> Result<String, ShareError> {
    match examples.find_by_content(text) {
        Some(example) => Ok(format!("{EXAMPLE_PREFIX}{}", example.key)),
        None => Ok(format!("{CODE_PREFIX}{}", encode_source(text)?)),
    }
}

pub fn example_fragment(key: &str) -> String {
    format!("{EXAMPLE_PREFIX}{key}")
}

pub fn parse_fragment(fragment: &str) -> Option<FragmentRef<'_>> {
    let fragment = fragment.trim().trim_start_matches('#');

    if let Some(key) = fragment.strip_prefix(EXAMPLE_PREFIX) {
        return Some(FragmentRef::Example(key.trim()));
    }
    if let Some(token) = fragment.strip_prefix(CODE_PREFIX) {
        return Some(FragmentRef::Code(token.trim()));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiline_unicode_source_survives_encoding() {
        let text = "<?php\n\n// größe: 日本語 🚀\necho \"a+b=c&d\";\r\n\ttrailing   \n";

        let token = encode_source(text).expect("encode");

        assert!(
            token
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'),
            "token should be URL-safe: {token}"
        );
        assert_eq!(decode_source(&token).expect("decode"), text);
    }

    #[test]
    fn empty_source_round_trips() {
        let token = encode_source("").expect("encode");
        assert_eq!(decode_source(&token).expect("decode"), "");
    }

    #[test]
    fn percent_encoded_token_is_accepted() {
        let text = "<?php echo 1;";
        let token = encode_source(text).expect("encode");
        let doubled = format!("%{:02X}{}", token.as_bytes()[0], &token[1..]);

        assert_ne!(doubled, token);
        assert_eq!(decode_source(&doubled).expect("decode"), text);
    }

    #[test]
    fn large_source_encodes_to_a_decodable_token() {
        let text = "<?php\n".to_owned() + &"echo \"line\";\n".repeat(20_000);

        let token = encode_source(&text).expect("encode");

        assert!(!token.is_empty());
        assert!(token.len() < text.len());
        assert_eq!(decode_source(&token).expect("decode"), text);
    }

    #[test]
    fn garbage_token_is_a_decode_failure() {
        assert!(decode_source("!!not-a-token!!").is_err());
        assert!(decode_source("%ZZ%%").is_err());
    }

    #[test]
    fn fragments_parse_by_prefix() {
        assert_eq!(
            parse_fragment("#example/calculator"),
            Some(FragmentRef::Example("calculator"))
        );
        assert_eq!(parse_fragment("code/abc"), Some(FragmentRef::Code("abc")));
        assert_eq!(parse_fragment("settings"), None);
        assert_eq!(parse_fragment(""), None);
    }

    #[test]
    fn example_content_is_shared_by_key() {
        let examples = ExampleSet::builtin();
        let calculator = examples.get("calculator").expect("calculator");

        assert_eq!(
            fragment_for(calculator.content, &examples).expect("fragment"),
            "example/calculator"
        );
        assert!(
            fragment_for("<?php echo 2;", &examples)
                .expect("fragment")
                .starts_with(CODE_PREFIX)
        );
    }
}
