//! Composite keys and their comparator.
//!
//! A key is an encoded byte string interpreted through a [`KeyDesc`]: an
//! ordered list of typed parts. Supported part encodings:
//! - `Int`: 4-byte little-endian `i32`, ordered numerically
//! - `VarString`: `u16` length followed by the bytes, ordered bytewise
//!
//! Parts compare left to right; the first unequal part decides.

use std::cmp::Ordering;

use crate::common::config::MAX_KEY_LEN;
use crate::common::{Error, Result};

/// Type of one key part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    VarString,
}

impl KeyType {
    /// Whether the index can order keys of this type.
    pub fn is_supported(self) -> bool {
        matches!(self, KeyType::Int | KeyType::VarString)
    }
}

/// One part of a key descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPart {
    pub key_type: KeyType,
    /// Fixed size for `Int`, maximum size for `VarString`.
    pub length: usize,
}

/// Ordered list of key parts defining the key layout of an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDesc {
    parts: Vec<KeyPart>,
}

impl KeyDesc {
    pub fn new(parts: Vec<KeyPart>) -> Self {
        Self { parts }
    }

    /// Single `Int` part.
    pub fn int() -> Self {
        Self::new(vec![KeyPart {
            key_type: KeyType::Int,
            length: 4,
        }])
    }

    /// Single `VarString` part of at most `max_len` bytes.
    pub fn varstring(max_len: usize) -> Self {
        Self::new(vec![KeyPart {
            key_type: KeyType::VarString,
            length: max_len,
        }])
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }

    /// # Errors
    /// `Error::UnsupportedKeyType` naming the first part whose type is not
    /// `Int` or `VarString`.
    pub fn validate(&self) -> Result<()> {
        match self.parts.iter().find(|p| !p.key_type.is_supported()) {
            Some(part) => Err(Error::UnsupportedKeyType(part.key_type)),
            None => Ok(()),
        }
    }

    /// Order two encoded keys.
    pub fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        let (mut rest_a, mut rest_b) = (a, b);
        for part in &self.parts {
            let (field_a, next_a) = split_field(part.key_type, rest_a);
            let (field_b, next_b) = split_field(part.key_type, rest_b);
            let ord = match part.key_type {
                KeyType::Int => int_of(field_a).cmp(&int_of(field_b)),
                _ => field_a.cmp(field_b),
            };
            if ord != Ordering::Equal {
                return ord;
            }
            rest_a = next_a;
            rest_b = next_b;
        }
        rest_a.cmp(rest_b)
    }
}

/// Split the field of type `key_type` off the front of `buf`, returning the
/// field body and the remainder. Short buffers yield a truncated field.
fn split_field(key_type: KeyType, buf: &[u8]) -> (&[u8], &[u8]) {
    match key_type {
        KeyType::Int => buf.split_at(4.min(buf.len())),
        KeyType::VarString if buf.len() >= 2 => {
            let len = u16::from_le_bytes([buf[0], buf[1]]) as usize;
            let end = (2 + len).min(buf.len());
            (&buf[2..end], &buf[end..])
        }
        _ => (buf, &[]),
    }
}

fn int_of(field: &[u8]) -> Option<i32> {
    let bytes: [u8; 4] = field.try_into().ok()?;
    Some(i32::from_le_bytes(bytes))
}

/// Decoded value of one key part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyField {
    Int(i32),
    VarString(Vec<u8>),
}

/// An encoded key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct KeyValue {
    bytes: Vec<u8>,
}

impl KeyValue {
    /// Encode `fields` in order.
    pub fn from_fields(fields: &[KeyField]) -> Self {
        let mut bytes = Vec::new();
        for field in fields {
            match field {
                KeyField::Int(v) => bytes.extend_from_slice(&v.to_le_bytes()),
                KeyField::VarString(s) => {
                    bytes.extend_from_slice(&(s.len() as u16).to_le_bytes());
                    bytes.extend_from_slice(s);
                }
            }
        }
        Self { bytes }
    }

    pub fn int(value: i32) -> Self {
        Self::from_fields(&[KeyField::Int(value)])
    }

    pub fn varstring(value: impl AsRef<[u8]>) -> Self {
        Self::from_fields(&[KeyField::VarString(value.as_ref().to_vec())])
    }

    /// Wrap already-encoded key bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Reject keys longer than [`MAX_KEY_LEN`].
    pub fn check_len(&self) -> Result<()> {
        if self.bytes.len() > MAX_KEY_LEN {
            return Err(Error::KeyTooLarge {
                len: self.bytes.len(),
                max: MAX_KEY_LEN,
            });
        }
        Ok(())
    }

    /// Decode into fields according to `desc`. Parts that run past the end
    /// of the key are omitted.
    pub fn fields(&self, desc: &KeyDesc) -> Vec<KeyField> {
        let mut rest = self.bytes.as_slice();
        let mut fields = Vec::with_capacity(desc.parts().len());
        for part in desc.parts() {
            if rest.is_empty() {
                break;
            }
            let (field, next) = split_field(part.key_type, rest);
            match part.key_type {
                KeyType::Int => match int_of(field) {
                    Some(v) => fields.push(KeyField::Int(v)),
                    None => break,
                },
                _ => fields.push(KeyField::VarString(field.to_vec())),
            }
            rest = next;
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composite() -> KeyDesc {
        KeyDesc::new(vec![
            KeyPart {
                key_type: KeyType::Int,
                length: 4,
            },
            KeyPart {
                key_type: KeyType::VarString,
                length: 32,
            },
        ])
    }

    #[test]
    fn test_validate() {
        assert!(KeyDesc::int().validate().is_ok());
        assert!(composite().validate().is_ok());

        let bad = KeyDesc::new(vec![KeyPart {
            key_type: KeyType::Double,
            length: 8,
        }]);
        assert!(matches!(
            bad.validate(),
            Err(Error::UnsupportedKeyType(KeyType::Double))
        ));
    }

    #[test]
    fn test_int_order_is_numeric() {
        let desc = KeyDesc::int();
        let cmp = |a: i32, b: i32| desc.compare(KeyValue::int(a).as_bytes(), KeyValue::int(b).as_bytes());
        assert_eq!(cmp(-1, 1), Ordering::Less);
        assert_eq!(cmp(256, 1), Ordering::Greater);
        assert_eq!(cmp(7, 7), Ordering::Equal);
    }

    #[test]
    fn test_varstring_order_is_bytewise() {
        let desc = KeyDesc::varstring(16);
        let cmp = |a: &str, b: &str| {
            desc.compare(KeyValue::varstring(a).as_bytes(), KeyValue::varstring(b).as_bytes())
        };
        assert_eq!(cmp("abc", "abd"), Ordering::Less);
        assert_eq!(cmp("ab", "abc"), Ordering::Less);
        assert_eq!(cmp("b", "abc"), Ordering::Greater);
    }

    #[test]
    fn test_composite_order() {
        let desc = composite();
        let key = |n: i32, s: &str| {
            KeyValue::from_fields(&[KeyField::Int(n), KeyField::VarString(s.as_bytes().to_vec())])
        };
        assert_eq!(desc.compare(key(1, "z").as_bytes(), key(2, "a").as_bytes()), Ordering::Less);
        assert_eq!(desc.compare(key(2, "b").as_bytes(), key(2, "a").as_bytes()), Ordering::Greater);
    }

    #[test]
    fn test_fields_roundtrip() {
        let desc = composite();
        let fields = vec![KeyField::Int(-5), KeyField::VarString(b"xy".to_vec())];
        assert_eq!(KeyValue::from_fields(&fields).fields(&desc), fields);
    }

    #[test]
    fn test_key_too_large() {
        let key = KeyValue::varstring(vec![0u8; MAX_KEY_LEN]);
        assert!(matches!(key.check_len(), Err(Error::KeyTooLarge { .. })));
        assert!(KeyValue::varstring(vec![0u8; MAX_KEY_LEN - 2]).check_len().is_ok());
    }
}
