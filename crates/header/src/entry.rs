// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::{ops::Range, rc::Rc};

use crate::{Kind, Tag, Value};

/// Backing storage of an entry payload, always big endian wire bytes
#[derive(Debug, Clone)]
pub(crate) enum Data {
    Owned(Vec<u8>),
    /// A window into the data section a header was loaded from
    Shared { blob: Rc<[u8]>, range: Range<usize> },
}

impl Data {
    pub(crate) fn bytes(&self) -> &[u8] {
        match self {
            Data::Owned(bytes) => bytes,
            Data::Shared { blob, range } => &blob[range.clone()],
        }
    }
}

/// Where an entry came from, which decides how it is written back out
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Origin {
    /// Member of the loaded region, at this data offset
    Region(usize),
    /// Appended after the region index table, at this data offset
    Dribble(usize),
    Added,
}

/// A single tag value stored in a [`crate::Header`]
#[derive(Debug, Clone)]
pub struct Entry {
    pub(crate) tag: Tag,
    pub(crate) kind: Kind,
    pub(crate) count: usize,
    pub(crate) data: Data,
    pub(crate) origin: Origin,
}

impl Entry {
    pub(crate) fn new(tag: Tag, value: &Value) -> Self {
        Self {
            tag,
            kind: value.kind(),
            count: value.count(),
            data: Data::Owned(value.encode()),
            origin: Origin::Added,
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Raw big endian payload
    pub fn bytes(&self) -> &[u8] {
        self.data.bytes()
    }

    pub fn value(&self) -> Value {
        Value::decode(self.kind, self.count, self.bytes())
    }

    /// NUL separated elements of a string entry, undecoded
    pub(crate) fn raw_strings(&self) -> Vec<&[u8]> {
        self.bytes().split(|&b| b == 0).take(self.count).collect()
    }

    /// Entry still points into the region it was loaded with
    pub fn in_region(&self) -> bool {
        matches!(self.origin, Origin::Region(_))
    }

    pub(crate) fn replace(&mut self, value: &Value) {
        self.kind = value.kind();
        self.count = value.count();
        self.data = Data::Owned(value.encode());
        self.origin = Origin::Added;
    }

    pub(crate) fn set_raw_strings(&mut self, strings: Vec<Vec<u8>>) {
        self.count = strings.len();
        self.data = Data::Owned(
            strings
                .into_iter()
                .flat_map(|mut s| {
                    s.push(0);
                    s
                })
                .collect(),
        );
        self.origin = Origin::Added;
    }

    /// Caller guarantees `value` has the same kind
    pub(crate) fn extend(&mut self, value: &Value) {
        let mut bytes = self.bytes().to_vec();
        bytes.extend(value.encode());

        self.count += value.count();
        self.data = Data::Owned(bytes);
        self.origin = Origin::Added;
    }
}
