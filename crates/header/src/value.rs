// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::fmt;

use itertools::Itertools;

use crate::Kind;

/// Decoded payload of a header entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Char(Vec<u8>),
    Int8(Vec<u8>),
    Int16(Vec<u16>),
    Int32(Vec<u32>),
    Int64(Vec<u64>),
    String(String),
    Bin(Vec<u8>),
    StringArray(Vec<String>),
    I18nString(Vec<String>),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Char(_) => Kind::Char,
            Value::Int8(_) => Kind::Int8,
            Value::Int16(_) => Kind::Int16,
            Value::Int32(_) => Kind::Int32,
            Value::Int64(_) => Kind::Int64,
            Value::String(_) => Kind::String,
            Value::Bin(_) => Kind::Bin,
            Value::StringArray(_) => Kind::StringArray,
            Value::I18nString(_) => Kind::I18nString,
        }
    }

    /// Element count as stored in the index record. For [`Kind::Bin`]
    /// this is the byte length.
    pub fn count(&self) -> usize {
        match self {
            Value::Null => 0,
            Value::Char(v) | Value::Int8(v) | Value::Bin(v) => v.len(),
            Value::Int16(v) => v.len(),
            Value::Int32(v) => v.len(),
            Value::Int64(v) => v.len(),
            Value::String(_) => 1,
            Value::StringArray(v) | Value::I18nString(v) => v.len(),
        }
    }

    /// Big endian wire bytes. Strings end at their first NUL.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Value::Null => vec![],
            Value::Char(v) | Value::Int8(v) | Value::Bin(v) => v.clone(),
            Value::Int16(v) => v.iter().flat_map(|i| i.to_be_bytes()).collect(),
            Value::Int32(v) => v.iter().flat_map(|i| i.to_be_bytes()).collect(),
            Value::Int64(v) => v.iter().flat_map(|i| i.to_be_bytes()).collect(),
            Value::String(s) => encode_strings([s]),
            Value::StringArray(v) | Value::I18nString(v) => encode_strings(v),
        }
    }

    /// Decode `count` elements of `kind` from validated wire bytes
    pub fn decode(kind: Kind, count: usize, bytes: &[u8]) -> Self {
        match kind {
            Kind::Null => Value::Null,
            Kind::Char => Value::Char(bytes[..count.min(bytes.len())].to_vec()),
            Kind::Int8 => Value::Int8(bytes[..count.min(bytes.len())].to_vec()),
            Kind::Bin => Value::Bin(bytes[..count.min(bytes.len())].to_vec()),
            Kind::Int16 => Value::Int16(
                bytes
                    .chunks_exact(2)
                    .take(count)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect(),
            ),
            Kind::Int32 => Value::Int32(
                bytes
                    .chunks_exact(4)
                    .take(count)
                    .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            Kind::Int64 => Value::Int64(
                bytes
                    .chunks_exact(8)
                    .take(count)
                    .map(|c| u64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                    .collect(),
            ),
            Kind::String => Value::String(decode_strings(bytes, 1).into_iter().next().unwrap_or_default()),
            Kind::StringArray => Value::StringArray(decode_strings(bytes, count)),
            Kind::I18nString => Value::I18nString(decode_strings(bytes, count)),
        }
    }

    /// Numeric elements widened to u64, `None` for non numeric kinds
    pub fn numbers(&self) -> Option<Vec<u64>> {
        Some(match self {
            Value::Char(v) | Value::Int8(v) => v.iter().map(|&i| u64::from(i)).collect(),
            Value::Int16(v) => v.iter().map(|&i| u64::from(i)).collect(),
            Value::Int32(v) => v.iter().map(|&i| u64::from(i)).collect(),
            Value::Int64(v) => v.clone(),
            _ => return None,
        })
    }

    /// String elements, `None` for non string kinds
    pub fn strings(&self) -> Option<&[String]> {
        match self {
            Value::String(s) => Some(std::slice::from_ref(s)),
            Value::StringArray(v) | Value::I18nString(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bin(v) => write!(f, "{}", hex::encode(v)),
            Value::String(s) => write!(f, "{s}"),
            Value::StringArray(v) | Value::I18nString(v) => write!(f, "{}", v.iter().join(", ")),
            _ => {
                let numbers = self.numbers().unwrap_or_default();
                write!(f, "{}", numbers.iter().join(", "))
            }
        }
    }
}

fn encode_strings<S: AsRef<str>>(strings: impl IntoIterator<Item = S>) -> Vec<u8> {
    let mut bytes = vec![];
    for s in strings {
        let s = s.as_ref().as_bytes();
        let end = s.iter().position(|&b| b == 0).unwrap_or(s.len());
        bytes.extend_from_slice(&s[..end]);
        bytes.push(0);
    }
    bytes
}

fn decode_strings(bytes: &[u8], count: usize) -> Vec<String> {
    bytes
        .split(|&b| b == 0)
        .take(count)
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}
