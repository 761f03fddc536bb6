//! String context codec
//!
//! A string's context is a list of `(path, string)` pairs. Each pair is encoded
//! into one token of the `context` column; tokens are joined with `;`.
//! The codec is pluggable; the default one is `EscapedContextCodec`.

use crate::{Error, Result};

/// Reversible encoding of one context pair into a column token.
///
/// Implementations must round-trip byte-exactly and must never emit the
/// column separator `;` in an encoded token.
pub trait ContextCodec: Send + Sync {
    /// Encode a `(path, string)` pair, path first
    fn encode(&self, path: &str, name: &str) -> String;

    /// Decode a token produced by `encode`
    fn decode(&self, token: &str) -> Result<(String, String)>;
}

/// Default codec: `escape(path) "!" escape(string)`.
///
/// `%`, `!` and `;` are percent-encoded, so the first `!` of a token is always
/// the pair separator and `;` never appears in a token.
#[derive(Debug, Clone, Copy, Default)]
pub struct EscapedContextCodec;

const PAIR_SEPARATOR: char = '!';

impl ContextCodec for EscapedContextCodec {
    fn encode(&self, path: &str, name: &str) -> String {
        let mut out = String::with_capacity(path.len() + name.len() + 1);
        escape_into(path, &mut out);
        out.push(PAIR_SEPARATOR);
        escape_into(name, &mut out);
        out
    }

    fn decode(&self, token: &str) -> Result<(String, String)> {
        let (path, name) = token
            .split_once(PAIR_SEPARATOR)
            .ok_or_else(|| Error::InvalidContext(format!("missing '!' in {:?}", token)))?;
        Ok((unescape(path)?, unescape(name)?))
    }
}

fn escape_into(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            '!' => out.push_str("%21"),
            ';' => out.push_str("%3B"),
            c => out.push(c),
        }
    }
}

fn unescape(s: &str) -> Result<String> {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let escape = rest
            .get(pos..pos + 3)
            .ok_or_else(|| Error::InvalidContext(format!("truncated escape in {:?}", s)))?;
        match escape {
            "%25" => out.push('%'),
            "%21" => out.push('!'),
            "%3B" => out.push(';'),
            other => {
                return Err(Error::InvalidContext(format!("unknown escape {:?} in {:?}", other, s)));
            }
        }
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    Ok(out)
}
