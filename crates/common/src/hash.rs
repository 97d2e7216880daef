//! Reversible node addressing.
//!
//! Every node on the wire is identified by an opaque token of the form
//! `<encode(volume id)>_<encode(path)>`. Tokens use an unpadded base64
//! variant whose two extra symbols are `-` and `.`, so `_` never occurs
//! inside an encoded half and can be used as the separator.

use std::fmt;
use std::str::FromStr;
use std::string::FromUtf8Error;

use base64::alphabet::Alphabet;
use base64::engine::general_purpose::{GeneralPurpose, NO_PAD};
use base64::Engine;

/// Separator between the volume and path halves of a node hash.
pub const SEPARATOR: char = '_';

const HASH_ALPHABET: Alphabet =
    match Alphabet::new("ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-.") {
        Ok(alphabet) => alphabet,
        Err(_) => panic!("node hash alphabet must be 64 unique printable symbols"),
    };

const ENGINE: GeneralPurpose = GeneralPurpose::new(&HASH_ALPHABET, NO_PAD);

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid token encoding: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("token does not decode to UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
    #[error("node hash is missing the '{SEPARATOR}' separator")]
    MissingSeparator,
}

/// Encode arbitrary text into a URL-safe token.
pub fn encode(text: &str) -> String {
    ENGINE.encode(text.as_bytes())
}

/// Exact inverse of [`encode`].
pub fn decode(token: &str) -> Result<String, DecodeError> {
    let bytes = ENGINE.decode(token.as_bytes())?;
    Ok(String::from_utf8(bytes)?)
}

/// A decoded node hash: volume id plus the (not yet normalized) path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeHash {
    pub root: String,
    pub path: String,
}

impl NodeHash {
    pub fn new(root: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            path: path.into(),
        }
    }

    /// Split once on the first separator and decode both halves.
    pub fn parse(token: &str) -> Result<Self, DecodeError> {
        let (root, path) = token
            .split_once(SEPARATOR)
            .ok_or(DecodeError::MissingSeparator)?;
        Ok(Self {
            root: decode(root)?,
            path: decode(path)?,
        })
    }

    /// The volume half of the token including its trailing separator.
    pub fn volume_token(root: &str) -> String {
        format!("{}{}", encode(root), SEPARATOR)
    }
}

impl FromStr for NodeHash {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for NodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::volume_token(&self.root), encode(&self.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let samples = [
            "",
            "/",
            "Media",
            "/share/icons/readme.txt",
            "/путь/к/файлу.txt",
            "/日本語/ファイル",
            "/emoji/🦀 crab.png",
            "under_score_and-dash.and.dot",
            "a+b/c=d?e&f",
            "\u{0}\u{7f}",
        ];
        for sample in samples {
            let token = encode(sample);
            assert_eq!(decode(&token).unwrap(), sample, "token {token}");
        }
    }

    #[test]
    fn test_tokens_are_url_safe_and_unpadded() {
        for sample in ["a", "ab", "abc", "/????>>>>", "ÿÿÿ", "\u{fffd}~~"] {
            let token = encode(sample);
            assert!(!token.contains(SEPARATOR));
            assert!(!token.contains('='));
            assert!(token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.'));
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode("ab_c"), Err(DecodeError::Encoding(_))));
        assert!(matches!(decode("a"), Err(DecodeError::Encoding(_))));
        assert!(matches!(decode("abc="), Err(DecodeError::Encoding(_))));
        // 0xff 0xfe is valid base64 but not UTF-8
        assert!(matches!(decode("..4"), Err(DecodeError::Utf8(_))));
    }

    #[test]
    fn test_node_hash_parse() {
        let hash = NodeHash::new("Media", "/docs/report.txt");
        let token = hash.to_string();
        assert!(token.starts_with(&format!("{}_", encode("Media"))));
        assert_eq!(NodeHash::parse(&token).unwrap(), hash);
    }

    #[test]
    fn test_node_hash_root_with_separator_in_id() {
        let hash = NodeHash::new("my_volume", "/");
        let parsed: NodeHash = hash.to_string().parse().unwrap();
        assert_eq!(parsed.root, "my_volume");
        assert_eq!(parsed.path, "/");
    }

    #[test]
    fn test_node_hash_missing_separator() {
        assert!(matches!(
            NodeHash::parse("TWVkaWE"),
            Err(DecodeError::MissingSeparator)
        ));
    }
}
