// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::{
    io::{self, Read, Write},
    iter,
    rc::Rc,
};

use crate::{Kind, ReadExt, Tag, WriteExt};

/// Encoded size of an index record
pub(crate) const RECORD_SIZE: usize = 16;

/// Raw `(tag, type, offset, count)` index record as stored on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Record {
    pub tag: u32,
    pub kind: u32,
    pub offset: u32,
    pub count: u32,
}

impl Record {
    pub fn root(tag: Tag, offset: u32) -> Self {
        Self {
            tag: tag.raw(),
            kind: Kind::Bin as u32,
            offset,
            count: RECORD_SIZE as u32,
        }
    }

    pub fn decode<R: Read>(mut reader: R) -> Result<Self, io::Error> {
        Ok(Self {
            tag: reader.read_u32()?,
            kind: reader.read_u32()?,
            offset: reader.read_u32()?,
            count: reader.read_u32()?,
        })
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<(), io::Error> {
        writer.write_u32(self.tag)?;
        writer.write_u32(self.kind)?;
        writer.write_u32(self.offset)?;
        writer.write_u32(self.count)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Layout {
    /// Root points at a trailer record at this data offset
    Sealed { trailer: usize },
    /// Root with a zero offset, the whole table belongs to the region
    Implicit,
    /// No root on disk, synthesized over the whole table
    Legacy,
}

/// An immutable, previously serialized section of a header.
///
/// The member records are kept verbatim, including entries later
/// replaced by dribbles, so the region is written back out byte for byte.
#[derive(Debug, Clone)]
pub(crate) struct Region {
    pub tag: Tag,
    pub layout: Layout,
    pub index: Vec<Record>,
    pub blob: Rc<[u8]>,
    /// Aligned data length spanned by the members
    pub length: usize,
}

impl Region {
    /// Index records and data of the region, root first
    pub fn image(&self) -> (Vec<Record>, Vec<u8>) {
        let members = self.index.iter().copied();

        match self.layout {
            Layout::Sealed { trailer } => {
                let records = iter::once(Record::root(self.tag, trailer as u32))
                    .chain(members)
                    .collect();
                (records, self.blob[..trailer + RECORD_SIZE].to_vec())
            }
            Layout::Implicit => {
                let records = iter::once(Record::root(self.tag, 0)).chain(members).collect();
                (records, self.blob.to_vec())
            }
            Layout::Legacy => self.trailed(),
        }
    }

    /// Image with a trailer appended after the data. Records written after
    /// it load back as dribbles rather than region members.
    pub fn trailed(&self) -> (Vec<Record>, Vec<u8>) {
        let offset = self.blob.len();
        let span = (self.index.len() + 1) * RECORD_SIZE;
        let records = iter::once(Record::root(self.tag, offset as u32))
            .chain(self.index.iter().copied())
            .collect();

        let mut data = self.blob.to_vec();
        data.extend(Record::root(self.tag, 0u32.wrapping_sub(span as u32)).to_bytes());

        (records, data)
    }

    /// Standalone `[il][dl][index][data]` blob of the region. Without the
    /// root the data stops where the members end.
    pub fn blob(&self, with_root: bool) -> Vec<u8> {
        let (mut records, mut data) = self.image();

        if !with_root {
            records.remove(0);
            data.truncate(self.length);
        }

        let mut blob = Vec::with_capacity(8 + records.len() * RECORD_SIZE + data.len());
        blob.extend((records.len() as u32).to_be_bytes());
        blob.extend((data.len() as u32).to_be_bytes());
        for record in &records {
            blob.extend(record.to_bytes());
        }
        blob.extend(data);
        blob
    }
}

impl Record {
    fn to_bytes(self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0u8; RECORD_SIZE];
        bytes[0..4].copy_from_slice(&self.tag.to_be_bytes());
        bytes[4..8].copy_from_slice(&self.kind.to_be_bytes());
        bytes[8..12].copy_from_slice(&self.offset.to_be_bytes());
        bytes[12..16].copy_from_slice(&self.count.to_be_bytes());
        bytes
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn record_roundtrip() {
        let record = Record {
            tag: 1000,
            kind: 6,
            offset: 12,
            count: 1,
        };

        let mut bytes = vec![];
        record.encode(&mut bytes).unwrap();
        assert_eq!(bytes, record.to_bytes());
        assert_eq!(Record::decode(bytes.as_slice()).unwrap(), record);
    }

    #[test]
    fn legacy_trailer() {
        let region = Region {
            tag: Tag::HEADER_IMAGE,
            layout: Layout::Legacy,
            index: vec![Record {
                tag: 1000,
                kind: 6,
                offset: 0,
                count: 1,
            }],
            blob: Rc::from(&b"foo\0"[..]),
            length: 4,
        };

        let (records, data) = region.image();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], Record::root(Tag::HEADER_IMAGE, 4));
        assert_eq!(data.len(), 4 + RECORD_SIZE);

        let trailer = Record::decode(&data[4..]).unwrap();
        assert_eq!(trailer.offset as i32, -32);

        let image = region.blob(false);
        assert_eq!(&image[..8], &[0, 0, 0, 1, 0, 0, 0, 4]);
    }
}
