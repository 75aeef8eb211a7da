//! Canonical content hashing for identity surrogates.
//!
//! Contexts and rule parameters identify themselves by a digest over their
//! fields, so dependents can use a cheap string comparison instead of deep
//! equality. The rendering is length-prefixed and tag-discriminated, which
//! keeps `("ab", "c")` and `("a", "bc")` distinct.

use sha2::{Digest, Sha256};
use toml::Value;

pub(crate) struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    /// Feeds a string, prefixed with its length.
    pub fn push_str(&mut self, s: &str) {
        self.hasher.update((s.len() as u64).to_le_bytes());
        self.hasher.update(s.as_bytes());
    }

    /// Feeds a TOML value with a tag byte per variant.
    pub fn push_value(&mut self, value: &Value) {
        match value {
            Value::String(s) => {
                self.hasher.update([b's']);
                self.push_str(s);
            }
            Value::Integer(i) => {
                self.hasher.update([b'i']);
                self.hasher.update(i.to_le_bytes());
            }
            Value::Float(f) => {
                self.hasher.update([b'f']);
                self.hasher.update(f.to_le_bytes());
            }
            Value::Boolean(b) => {
                self.hasher.update([b'b', u8::from(*b)]);
            }
            Value::Datetime(dt) => {
                self.hasher.update([b'd']);
                self.push_str(&dt.to_string());
            }
            Value::Array(items) => {
                self.hasher.update([b'a']);
                self.hasher.update((items.len() as u64).to_le_bytes());
                for item in items {
                    self.push_value(item);
                }
            }
            Value::Table(table) => {
                self.hasher.update([b't']);
                self.hasher.update((table.len() as u64).to_le_bytes());
                for (key, item) in table {
                    self.push_str(key);
                    self.push_value(item);
                }
            }
        }
    }

    /// Returns the hex-encoded digest.
    pub fn finish(self) -> String {
        let digest = self.hasher.finalize();
        let mut out = String::with_capacity(digest.len() * 2);
        for byte in digest {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_of(values: &[Value]) -> String {
        let mut fp = Fingerprint::new();
        for value in values {
            fp.push_value(value);
        }
        fp.finish()
    }

    #[test]
    fn identical_input_yields_identical_digest() {
        let a = digest_of(&[Value::String("x".into()), Value::Integer(3)]);
        let b = digest_of(&[Value::String("x".into()), Value::Integer(3)]);
        assert_eq!(a, b);
    }

    #[test]
    fn field_boundaries_matter() {
        let mut a = Fingerprint::new();
        a.push_str("ab");
        a.push_str("c");
        let mut b = Fingerprint::new();
        b.push_str("a");
        b.push_str("bc");
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn value_types_are_discriminated() {
        let int = digest_of(&[Value::Integer(1)]);
        let text = digest_of(&[Value::String("1".into())]);
        assert_ne!(int, text);
    }
}
