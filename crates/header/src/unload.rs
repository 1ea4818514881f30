// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::io::Write;

use log::trace;

use crate::{
    entry::{Entry, Origin},
    region::{Layout, Record, RECORD_SIZE},
    Error, Header, Magic, Tag, WriteExt, MAGIC,
};

/// Order entries are written in: region members, then dribbles, both
/// by data offset, then freshly added entries by tag
pub(crate) fn storage_order(entry: &Entry) -> (u8, usize) {
    match entry.origin {
        Origin::Region(offset) => (0, offset),
        Origin::Dribble(offset) => (1, offset),
        Origin::Added => (2, entry.tag.raw() as usize),
    }
}

impl Header {
    /// Serialize to a blob without magic.
    ///
    /// An intact region is written back verbatim with every other entry
    /// following it, so `load(unload(h))` reproduces the region layout.
    pub fn unload(&self) -> Result<Vec<u8>, Error> {
        let mut loose = self
            .entries
            .iter()
            .filter(|entry| self.region.is_none() || !entry.in_region())
            .collect::<Vec<_>>();
        loose.sort_by_key(|entry| storage_order(entry));

        let (mut records, mut data) = match &self.region {
            // An implicit region claims every record, seal it so loose entries stay dribbles
            Some(region) if region.layout == Layout::Implicit && !loose.is_empty() => region.trailed(),
            Some(region) => region.image(),
            None => (vec![], vec![]),
        };

        for entry in loose {
            let bytes = entry.bytes();
            if bytes.is_empty() {
                continue;
            }

            data.resize(data.len() + entry.kind.padding(data.len()), 0);
            records.push(Record {
                tag: entry.tag.raw(),
                kind: entry.kind as u32,
                offset: data.len() as u32,
                count: entry.count as u32,
            });
            data.extend_from_slice(bytes);
        }

        if records.len() > 0xffff {
            return Err(Error::IndexLength(records.len() as u32));
        }
        if data.len() > 0x00ff_ffff {
            return Err(Error::DataLength(data.len() as u32));
        }
        let (il, dl) = (records.len() as u32, data.len() as u32);

        let mut blob = Vec::with_capacity(8 + records.len() * RECORD_SIZE + data.len());
        blob.write_u32(il)?;
        blob.write_u32(dl)?;
        for record in &records {
            record.encode(&mut blob)?;
        }
        blob.extend(data);

        trace!("Unloaded header: {il} entries, {dl} data bytes");

        Ok(blob)
    }

    /// Write the header, optionally preceded by the 8 byte magic
    pub fn write<W: Write>(&self, writer: &mut W, magic: Magic) -> Result<(), Error> {
        let blob = self.unload()?;

        if magic == Magic::Present {
            writer.write_array(MAGIC)?;
        }
        writer.write_all(&blob)?;

        Ok(())
    }

    /// Size in bytes of the serialized header
    pub fn size_of(&self, magic: Magic) -> Result<usize, Error> {
        let length = self.unload()?.len();

        Ok(match magic {
            Magic::Present => length + MAGIC.len(),
            Magic::Absent => length,
        })
    }

    /// Serialize and load back, sealing everything into a single region.
    /// Signature and immutable tags rename the resulting region root.
    pub fn reload(self, tag: Tag) -> Result<Self, Error> {
        let blob = self.unload()?;
        let mut header = Header::load(&blob)?;

        if tag == Tag::HEADER_SIGNATURES || tag == Tag::HEADER_IMMUTABLE {
            if let Some(region) = header.region.as_mut() {
                region.tag = tag;
            }
        }

        Ok(header)
    }
}
