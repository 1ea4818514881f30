// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::{io::Read, rc::Rc};

use log::{debug, trace};

use crate::{
    entry::{Data, Entry, Origin},
    region::{Layout, Record, Region, RECORD_SIZE},
    EntryError, Error, Header, Kind, Magic, ReadExt, Tag, MAGIC, MAX_BYTES,
};

/// Validates the intro `(il, dl)` pair
pub(crate) fn check_lengths(il: u32, dl: u32) -> Result<(usize, usize), Error> {
    if il == 0 || il & 0xffff_0000 != 0 {
        return Err(Error::IndexLength(il));
    }
    if dl & 0xff00_0000 != 0 {
        return Err(Error::DataLength(dl));
    }

    let (il, dl) = (il as usize, dl as usize);
    if 8 + il * RECORD_SIZE + dl > MAX_BYTES {
        return Err(Error::TooLarge);
    }

    Ok((il, dl))
}

impl Header {
    /// Load a header from an unloaded blob (no magic)
    pub fn load(bytes: &[u8]) -> Result<Self, Error> {
        let mut reader = bytes;

        let il = reader.read_u32()?;
        let dl = reader.read_u32()?;
        let (il, dl) = check_lengths(il, dl)?;

        let records = (0..il)
            .map(|_| Record::decode(&mut reader))
            .collect::<Result<Vec<_>, _>>()?;

        if reader.len() < dl {
            return Err(Error::NotEnoughBytes);
        }
        let blob: Rc<[u8]> = Rc::from(&reader[..dl]);

        let (region, mut entries) = if records[0].tag >= Tag::HEADER_I18NTABLE.raw() {
            legacy(records, blob)?
        } else {
            sealed(records, blob)?
        };

        entries.sort_by_key(|entry| entry.tag);

        trace!(
            "Loaded header: {} entries, {} data bytes, region {} ({:?})",
            entries.len(),
            dl,
            region.tag,
            region.layout
        );

        Ok(Self {
            entries,
            region: Some(region),
            sorted: true,
            instance: 0,
        })
    }

    /// Read a header from `reader`, optionally preceded by the 8 byte magic
    pub fn read<R: Read>(mut reader: R, magic: Magic) -> Result<Self, Error> {
        if magic == Magic::Present {
            let found = reader.read_array::<8>()?;
            if found[..4] != MAGIC[..4] {
                return Err(Error::InvalidMagic);
            }
        }

        let il = reader.read_u32()?;
        let dl = reader.read_u32()?;
        let (records, data) = check_lengths(il, dl)?;

        let mut bytes = Vec::with_capacity(8 + records * RECORD_SIZE + data);
        bytes.extend(il.to_be_bytes());
        bytes.extend(dl.to_be_bytes());
        bytes.extend(reader.read_vec(records * RECORD_SIZE + data)?);

        Self::load(&bytes)
    }
}

/// Whole table is one implicit region
fn legacy(records: Vec<Record>, blob: Rc<[u8]>) -> Result<(Region, Vec<Entry>), Error> {
    let (entries, length) = swab(&records, &blob, blob.len(), 0, Origin::Region)?;

    if length != blob.len() {
        return Err(Error::RegionLength {
            expected: blob.len(),
            found: length,
        });
    }
    if entries.iter().any(|entry| entry.tag.is_region()) {
        return Err(Error::Region("region tag inside legacy header"));
    }

    let region = Region {
        tag: Tag::HEADER_IMAGE,
        layout: Layout::Legacy,
        index: records,
        blob,
        length,
    };

    Ok((region, entries))
}

/// First record is a region root, trailing records past the region are dribbles
fn sealed(records: Vec<Record>, blob: Rc<[u8]>) -> Result<(Region, Vec<Entry>), Error> {
    let root = records[0];
    let tag = Tag::new(root.tag);

    if !tag.is_region() {
        return Err(Error::Region("first entry is not a region"));
    }
    if root.kind != Kind::Bin as u32 || root.count as usize != RECORD_SIZE {
        return Err(Error::Region("malformed region root"));
    }
    if root.offset & 0xff00_0000 != 0 {
        return Err(Error::Entry {
            index: 0,
            reason: EntryError::Offset,
        });
    }

    let offset = root.offset as usize;

    let (tag, layout, ril, limit) = if offset != 0 {
        let trailer = blob
            .get(offset..offset + RECORD_SIZE)
            .ok_or(Error::Region("trailer out of bounds"))?;
        let trailer = Record::decode(trailer)?;

        // Trailer offset holds the negated byte length of the region index
        let rdl = trailer.offset.wrapping_neg();
        let ril = rdl as usize / RECORD_SIZE;

        if rdl & 0xff00_0000 != 0 || ril == 0 || ril > records.len() {
            return Err(Error::Region("invalid region trailer"));
        }

        (tag, Layout::Sealed { trailer: offset }, ril, offset)
    } else {
        (Tag::HEADER_IMAGE, Layout::Implicit, records.len(), blob.len())
    };

    let members = &records[1..ril];
    let (mut entries, length) = swab(members, &blob, limit, 1, Origin::Region)?;
    let (dribbles, _) = swab(&records[ril..], &blob, blob.len(), ril, Origin::Dribble)?;

    if entries.iter().chain(&dribbles).any(|entry| entry.tag.is_region()) {
        return Err(Error::Region("nested region"));
    }

    for dribble in &dribbles {
        entries.retain(|entry| {
            let replaced =
                entry.tag == dribble.tag || (dribble.tag == Tag::BASENAMES && entry.tag == Tag::OLDFILENAMES);
            if replaced {
                debug!("Dribble replaces region entry {}", entry.tag);
            }
            !replaced
        });
    }
    entries.extend(dribbles);

    let region = Region {
        tag,
        layout,
        index: members.to_vec(),
        blob,
        length,
    };

    Ok((region, entries))
}

/// Validate `records` against the first `limit` bytes of `blob`, producing
/// entries viewing the blob and the aligned data length they span
fn swab(
    records: &[Record],
    blob: &Rc<[u8]>,
    limit: usize,
    first: usize,
    origin: fn(usize) -> Origin,
) -> Result<(Vec<Entry>, usize), Error> {
    let data = &blob[..limit];
    let mut entries = Vec::with_capacity(records.len());
    let mut dl = 0;

    for (index, record) in records.iter().enumerate() {
        let (kind, length) = validate(record, data).map_err(|reason| Error::Entry {
            index: first + index,
            reason,
        })?;

        let offset = record.offset as usize;
        entries.push(Entry {
            tag: Tag::new(record.tag),
            kind,
            count: record.count as usize,
            data: Data::Shared {
                blob: blob.clone(),
                range: offset..offset + length,
            },
            origin: origin(offset),
        });

        dl += kind.padding(dl) + length;
    }

    Ok((entries, dl))
}

fn validate(record: &Record, data: &[u8]) -> Result<(Kind, usize), EntryError> {
    let kind = Kind::from_raw(record.kind).ok_or(EntryError::UnknownType(record.kind))?;

    if record.count & 0xff00_0000 != 0 {
        return Err(EntryError::Count);
    }
    if record.offset & 0xff00_0000 != 0 {
        return Err(EntryError::Offset);
    }

    let offset = record.offset as usize;
    if offset % kind.align() != 0 {
        return Err(EntryError::Alignment);
    }
    if offset >= data.len() {
        return Err(EntryError::Bounds);
    }

    let length = data_length(kind, record.count as usize, &data[offset..])?;
    if length & 0xff00_0000 != 0 {
        return Err(EntryError::Bounds);
    }

    Ok((kind, length))
}

/// Length of `count` elements of `kind` at the start of `data`
fn data_length(kind: Kind, count: usize, data: &[u8]) -> Result<usize, EntryError> {
    if let Some(size) = kind.size() {
        let length = size * count;
        return if length > data.len() {
            Err(EntryError::Bounds)
        } else {
            Ok(length)
        };
    }

    if kind == Kind::String && count != 1 {
        return Err(EntryError::Count);
    }

    let mut length = 0;
    for _ in 0..count {
        let end = data[length..]
            .iter()
            .position(|&b| b == 0)
            .ok_or(EntryError::Unterminated)?;
        length += end + 1;
    }

    Ok(length)
}

#[cfg(test)]
mod test {
    use super::*;

    fn blob(records: &[(u32, u32, u32, u32)], data: &[u8]) -> Vec<u8> {
        let mut bytes = vec![];
        bytes.extend((records.len() as u32).to_be_bytes());
        bytes.extend((data.len() as u32).to_be_bytes());
        for &(tag, kind, offset, count) in records {
            Record {
                tag,
                kind,
                offset,
                count,
            }
            .encode(&mut bytes)
            .unwrap();
        }
        bytes.extend(data);
        bytes
    }

    #[test]
    fn intro_limits() {
        assert!(matches!(check_lengths(0, 0), Err(Error::IndexLength(0))));
        assert!(matches!(check_lengths(0x1_0000, 0), Err(Error::IndexLength(_))));
        assert!(matches!(check_lengths(1, 0x0100_0000), Err(Error::DataLength(_))));
        assert_eq!(check_lengths(2, 10).unwrap(), (2, 10));
    }

    #[test]
    fn truncated() {
        let bytes = blob(&[(1000, 6, 0, 1)], b"foo\0");
        assert!(matches!(Header::load(&bytes[..6]), Err(Error::NotEnoughBytes)));
        assert!(matches!(
            Header::load(&bytes[..bytes.len() - 1]),
            Err(Error::NotEnoughBytes)
        ));
    }

    #[test]
    fn legacy_header() {
        let bytes = blob(&[(1000, 6, 0, 1), (1001, 6, 4, 1)], b"foo\x001.0\0");
        let header = Header::load(&bytes).unwrap();

        let region = header.region.as_ref().unwrap();
        assert_eq!(region.layout, Layout::Legacy);
        assert_eq!(region.tag, Tag::HEADER_IMAGE);
        assert_eq!(header.get_string(Tag::NAME).as_deref(), Some("foo"));
        assert_eq!(header.get_string(Tag::VERSION).as_deref(), Some("1.0"));
        assert!(header.entries.iter().all(Entry::in_region));
    }

    #[test]
    fn legacy_length_mismatch() {
        // Trailing garbage past the last entry
        let bytes = blob(&[(1000, 6, 0, 1)], b"foo\0xx");
        assert!(matches!(Header::load(&bytes), Err(Error::RegionLength { .. })));
    }

    #[test]
    fn rejects_bad_entries() {
        let unknown = blob(&[(1000, 12, 0, 1)], b"foo\0");
        assert!(matches!(
            Header::load(&unknown),
            Err(Error::Entry {
                index: 0,
                reason: EntryError::UnknownType(12)
            })
        ));

        let misaligned = blob(&[(1000, 6, 0, 1), (1009, 4, 3, 1)], b"ab\0\0\0\0\0");
        assert!(matches!(
            Header::load(&misaligned),
            Err(Error::Entry {
                index: 1,
                reason: EntryError::Alignment
            })
        ));

        let overflow = blob(&[(1009, 4, 0, 2)], &[0, 0, 0, 1]);
        assert!(matches!(
            Header::load(&overflow),
            Err(Error::Entry {
                reason: EntryError::Bounds,
                ..
            })
        ));

        let unterminated = blob(&[(1000, 6, 0, 1)], b"foo");
        assert!(matches!(
            Header::load(&unterminated),
            Err(Error::Entry {
                reason: EntryError::Unterminated,
                ..
            })
        ));

        let outside = blob(&[(1000, 6, 8, 1)], b"foo\0");
        assert!(matches!(
            Header::load(&outside),
            Err(Error::Entry {
                reason: EntryError::Bounds,
                ..
            })
        ));
    }

    #[test]
    fn sealed_with_dribble() {
        let mut data = b"foo\0".to_vec();
        // Trailer covering root + one member
        Record::root(Tag::HEADER_IMMUTABLE, (-32i32) as u32)
            .encode(&mut data)
            .unwrap();
        data.extend(b"bar\0");

        let bytes = blob(&[(63, 7, 4, 16), (1000, 6, 0, 1), (1000, 6, 20, 1)], &data);
        let header = Header::load(&bytes).unwrap();

        let region = header.region.as_ref().unwrap();
        assert_eq!(region.tag, Tag::HEADER_IMMUTABLE);
        assert_eq!(region.layout, Layout::Sealed { trailer: 4 });
        assert_eq!(region.index.len(), 1);

        assert_eq!(header.entries.len(), 1);
        assert_eq!(header.entries[0].origin, Origin::Dribble(20));
        assert_eq!(header.get_string(Tag::NAME).as_deref(), Some("bar"));
    }

    #[test]
    fn implicit_region() {
        let bytes = blob(&[(63, 7, 0, 16), (1000, 6, 0, 1)], b"foo\0");
        let header = Header::load(&bytes).unwrap();

        let region = header.region.as_ref().unwrap();
        assert_eq!(region.layout, Layout::Implicit);
        assert_eq!(region.tag, Tag::HEADER_IMAGE);
        assert_eq!(header.get_string(Tag::NAME).as_deref(), Some("foo"));

        let unchanged = Header::load(&header.unload().unwrap()).unwrap();
        assert_eq!(unchanged.region.as_ref().unwrap().layout, Layout::Implicit);
    }

    #[test]
    fn implicit_region_keeps_changes() {
        let bytes = blob(&[(63, 7, 0, 16), (1000, 6, 0, 1)], b"foo\0");

        let mut header = Header::load(&bytes).unwrap();
        header.modify(Tag::NAME, crate::Value::String("bar".to_owned())).unwrap();
        header.put_string(Tag::VERSION, "1.0").unwrap();

        let reloaded = Header::load(&header.unload().unwrap()).unwrap();
        assert_eq!(reloaded.get_string(Tag::NAME).as_deref(), Some("bar"));
        assert_eq!(reloaded.get_string(Tag::VERSION).as_deref(), Some("1.0"));
        assert!(!reloaded.entry(Tag::NAME).unwrap().in_region());
        assert!(matches!(
            reloaded.region.as_ref().unwrap().layout,
            Layout::Sealed { trailer: 4 }
        ));
    }

    #[test]
    fn rejects_bad_regions() {
        let not_region = blob(&[(50, 7, 0, 16)], b"foo\0");
        assert!(matches!(Header::load(&not_region), Err(Error::Region(_))));

        let bad_trailer = blob(&[(63, 7, 2, 16)], b"foo\0");
        assert!(matches!(Header::load(&bad_trailer), Err(Error::Region(_))));
    }

    #[test]
    fn read_with_magic() {
        let bytes = blob(&[(1000, 6, 0, 1)], b"foo\0");

        let mut framed = MAGIC.to_vec();
        framed.extend(&bytes);
        let header = Header::read(framed.as_slice(), Magic::Present).unwrap();
        assert_eq!(header.get_string(Tag::NAME).as_deref(), Some("foo"));

        let header = Header::read(bytes.as_slice(), Magic::Absent).unwrap();
        assert!(header.is_entry(Tag::NAME));

        assert!(matches!(
            Header::read(bytes.as_slice(), Magic::Present),
            Err(Error::InvalidMagic)
        ));
    }
}
