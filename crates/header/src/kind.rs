// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

/// Data type of a header entry, as stored in the `type` field of an
/// index record
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Kind {
    Null = 0,
    Char = 1,
    Int8 = 2,
    Int16 = 3,
    Int32 = 4,
    Int64 = 5,
    String = 6,
    Bin = 7,
    StringArray = 8,
    #[strum(serialize = "i18nstring")]
    I18nString = 9,
}

impl Kind {
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Kind::Null,
            1 => Kind::Char,
            2 => Kind::Int8,
            3 => Kind::Int16,
            4 => Kind::Int32,
            5 => Kind::Int64,
            6 => Kind::String,
            7 => Kind::Bin,
            8 => Kind::StringArray,
            9 => Kind::I18nString,
            _ => return None,
        })
    }

    /// Size in bytes of a single element, `None` for NUL terminated types
    pub fn size(self) -> Option<usize> {
        match self {
            Kind::Null => Some(0),
            Kind::Char | Kind::Int8 | Kind::Bin => Some(1),
            Kind::Int16 => Some(2),
            Kind::Int32 => Some(4),
            Kind::Int64 => Some(8),
            Kind::String | Kind::StringArray | Kind::I18nString => None,
        }
    }

    /// Required alignment of the entry data, relative to the start of
    /// the data section
    pub fn align(self) -> usize {
        match self {
            Kind::Int16 => 2,
            Kind::Int32 => 4,
            Kind::Int64 => 8,
            _ => 1,
        }
    }

    /// Number of zero bytes needed before `cursor` to satisfy [`Kind::align`]
    pub(crate) fn padding(self, cursor: usize) -> usize {
        let align = self.align();
        (align - cursor % align) % align
    }

    pub fn is_string(self) -> bool {
        matches!(self, Kind::String | Kind::StringArray | Kind::I18nString)
    }
}
