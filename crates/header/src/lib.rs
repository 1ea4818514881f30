// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Tag indexed package metadata container and its binary codec.
//!
//! A [`Header`] holds `(tag, type, count, data)` entries. It is serialized
//! as a big endian blob of `[il][dl]`, `il` index records and `dl` bytes of
//! entry data. Headers that were previously serialized keep their layout in
//! a region which is written back out verbatim.

use std::io;

use log::debug;
use thiserror::Error;

pub use self::entry::Entry;
pub use self::i18n::Locale;
pub use self::kind::Kind;
pub use self::tag::{Class, Info, Tag};
pub use self::value::Value;

pub(crate) use self::ext::{ReadExt, WriteExt};

use self::entry::{Data, Origin};
use self::region::Region;

mod entry;
mod ext;
mod extension;
mod i18n;
mod kind;
mod load;
mod region;
mod tag;
mod unload;
mod value;

/// Leading bytes of a standalone header. Only the first 4 are checked,
/// the rest are reserved.
pub const MAGIC: [u8; 8] = [0x8e, 0xad, 0xe8, 0x01, 0, 0, 0, 0];

/// Upper bound of a serialized header
pub const MAX_BYTES: usize = 32 * 1024 * 1024;

/// Largest payload of a single entry
const MAX_ENTRY_BYTES: usize = 0x00ff_ffff;

/// Whether a header on disk is preceded by [`MAGIC`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Magic {
    Present,
    Absent,
}

#[derive(Debug, Clone)]
pub struct Header {
    entries: Vec<Entry>,
    region: Option<Region>,
    sorted: bool,
    instance: u32,
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

impl Header {
    pub fn new() -> Self {
        Self {
            entries: vec![],
            region: None,
            sorted: true,
            instance: 0,
        }
    }

    /// Database record number this header was read from, 0 if none
    pub fn instance(&self) -> u32 {
        self.instance
    }

    pub fn set_instance(&mut self, instance: u32) {
        self.instance = instance;
    }

    /// Tag of the region root, if the header holds a region
    pub fn region_tag(&self) -> Option<Tag> {
        self.region.as_ref().map(|region| region.tag)
    }

    pub fn is_entry(&self, tag: Tag) -> bool {
        self.region_tag() == Some(tag) || self.position(tag, None).is_some()
    }

    /// First stored entry for `tag`
    pub fn entry(&self, tag: Tag) -> Option<&Entry> {
        self.position(tag, None).map(|index| &self.entries[index])
    }

    /// Raw big endian payload of the first entry for `tag`, borrowed from
    /// the header
    pub fn entry_bytes(&self, tag: Tag) -> Option<&[u8]> {
        self.entry(tag).map(Entry::bytes)
    }

    /// Value of `tag` with derived tags computed and translations resolved
    /// against the process locale
    pub fn get(&self, tag: Tag) -> Option<Value> {
        self.get_with_locale(tag, &Locale::from_env())
    }

    pub fn get_with_locale(&self, tag: Tag, locale: &Locale) -> Option<Value> {
        if tag.info().is_some_and(|info| info.class == Class::Derived) {
            return extension::resolve(self, tag);
        }

        match self.entry(tag) {
            Some(entry) if entry.kind == Kind::I18nString => {
                let table = self
                    .position(Tag::HEADER_I18NTABLE, Some(Kind::StringArray))
                    .map(|index| &self.entries[index]);
                Some(Value::String(i18n::resolve(table, entry, locale)))
            }
            _ => self.get_raw(tag),
        }
    }

    /// Stored value of `tag`, all translations included. A region tag
    /// yields the region as a standalone blob.
    pub fn get_raw(&self, tag: Tag) -> Option<Value> {
        match &self.region {
            Some(region) if region.tag == tag => Some(Value::Bin(region.blob(tag != Tag::HEADER_IMAGE))),
            _ => self.entry(tag).map(Entry::value),
        }
    }

    /// A string, or a string array holding exactly one element
    pub fn get_string(&self, tag: Tag) -> Option<String> {
        single_string(self.get(tag)?)
    }

    pub(crate) fn raw_string(&self, tag: Tag) -> Option<String> {
        single_string(self.get_raw(tag)?)
    }

    /// First element of a numeric entry
    pub fn get_number(&self, tag: Tag) -> Option<u64> {
        self.get(tag)?.numbers()?.first().copied()
    }

    /// Format a single valued entry. Binary data is rendered as hex.
    pub fn get_as_string(&self, tag: Tag) -> Option<String> {
        let value = self.get(tag)?;

        match value {
            Value::String(_) | Value::Bin(_) => Some(value.to_string()),
            _ if value.count() == 1 => Some(value.to_string()),
            _ => None,
        }
    }

    /// All stored `(tag, value)` pairs in tag order. Region roots are not
    /// entries and never appear.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, Value)> + '_ {
        let mut entries = self.entries.iter().collect::<Vec<_>>();
        if !self.sorted {
            entries.sort_by_key(|entry| entry.tag);
        }
        entries.into_iter().map(|entry| (entry.tag, entry.value()))
    }

    /// Put a value, checked against the tag table. Array tags append to an
    /// existing entry of the same type.
    pub fn put(&mut self, tag: Tag, value: Value) -> Result<(), PutError> {
        if tag < Tag::HEADER_I18NTABLE {
            return Err(PutError::Reserved(tag));
        }

        let Some(info) = tag.info() else {
            return self.add(tag, value);
        };

        if info.class == Class::Derived {
            return Err(PutError::Extension(tag));
        }
        if info.kind != value.kind() {
            return Err(PutError::Kind {
                tag,
                expected: info.kind,
                found: value.kind(),
            });
        }

        let count = value.count();
        if count == 0 {
            return Err(PutError::Empty(tag));
        }
        if info.class == Class::Scalar && info.kind != Kind::Bin && count != 1 {
            return Err(PutError::Count { tag, count });
        }

        if info.class == Class::Array && self.position(tag, Some(info.kind)).is_some() {
            return self.append(tag, value);
        }

        self.add(tag, value)
    }

    pub fn put_string(&mut self, tag: Tag, value: &str) -> Result<(), PutError> {
        let value = match tag.info().map(|info| info.kind) {
            Some(Kind::StringArray) => Value::StringArray(vec![value.to_owned()]),
            Some(Kind::I18nString) => Value::I18nString(vec![value.to_owned()]),
            _ => Value::String(value.to_owned()),
        };
        self.put(tag, value)
    }

    pub fn put_string_array<S: AsRef<str>>(&mut self, tag: Tag, values: &[S]) -> Result<(), PutError> {
        let values = values.iter().map(|s| s.as_ref().to_owned()).collect();
        self.put(tag, Value::StringArray(values))
    }

    pub fn put_char(&mut self, tag: Tag, values: &[u8]) -> Result<(), PutError> {
        self.put(tag, Value::Char(values.to_vec()))
    }

    pub fn put_u8(&mut self, tag: Tag, values: &[u8]) -> Result<(), PutError> {
        self.put(tag, Value::Int8(values.to_vec()))
    }

    pub fn put_u16(&mut self, tag: Tag, values: &[u16]) -> Result<(), PutError> {
        self.put(tag, Value::Int16(values.to_vec()))
    }

    pub fn put_u32(&mut self, tag: Tag, values: &[u32]) -> Result<(), PutError> {
        self.put(tag, Value::Int32(values.to_vec()))
    }

    pub fn put_u64(&mut self, tag: Tag, values: &[u64]) -> Result<(), PutError> {
        self.put(tag, Value::Int64(values.to_vec()))
    }

    pub fn put_bin(&mut self, tag: Tag, bytes: &[u8]) -> Result<(), PutError> {
        self.put(tag, Value::Bin(bytes.to_vec()))
    }

    /// Add a new entry without consulting the tag table. Duplicates of an
    /// existing tag are kept, lookups return the first.
    pub fn add(&mut self, tag: Tag, value: Value) -> Result<(), PutError> {
        if tag < Tag::HEADER_I18NTABLE {
            return Err(PutError::Reserved(tag));
        }
        if value.count() == 0 {
            return Err(PutError::Empty(tag));
        }

        let entry = Entry::new(tag, &value);
        if entry.bytes().len() > MAX_ENTRY_BYTES {
            return Err(PutError::TooLarge(tag));
        }

        self.push(entry);
        Ok(())
    }

    /// Append elements to the existing entry of the same tag and type
    pub fn append(&mut self, tag: Tag, value: Value) -> Result<(), PutError> {
        let kind = value.kind();
        if matches!(kind, Kind::String | Kind::I18nString) {
            return Err(PutError::Append(kind));
        }
        if value.count() == 0 {
            return Err(PutError::Empty(tag));
        }

        let index = self.position(tag, Some(kind)).ok_or(PutError::Missing { tag, kind })?;
        let entry = &mut self.entries[index];

        if entry.bytes().len() + value.encode().len() > MAX_ENTRY_BYTES {
            return Err(PutError::TooLarge(tag));
        }

        entry.extend(&value);
        Ok(())
    }

    /// Replace the value of the first entry with the same tag and type
    pub fn modify(&mut self, tag: Tag, value: Value) -> Result<(), PutError> {
        let kind = value.kind();
        let index = self.position(tag, Some(kind)).ok_or(PutError::Missing { tag, kind })?;

        if value.count() == 0 {
            return Err(PutError::Empty(tag));
        }
        if value.encode().len() > MAX_ENTRY_BYTES {
            return Err(PutError::TooLarge(tag));
        }

        self.entries[index].replace(&value);
        Ok(())
    }

    /// Remove every entry for `tag`. Deleting the region tag discards the
    /// region, its members are then written out as plain entries.
    pub fn delete(&mut self, tag: Tag) -> bool {
        let mut found = false;

        if self.region_tag() == Some(tag) {
            self.region = None;
            found = true;
            debug!("Region {tag} removed, header unsealed");
        }

        let before = self.entries.len();
        self.entries.retain(|entry| entry.tag != tag);

        found || self.entries.len() != before
    }

    /// Add a translation of `tag` for `lang` (default `C`), creating or
    /// extending the I18N table. Languages without a translation read as
    /// empty strings.
    pub fn add_i18n_string(&mut self, tag: Tag, value: &str, lang: Option<&str>) -> Result<(), PutError> {
        let lang = lang.unwrap_or("C");
        let value = value.split('\0').next().unwrap_or_default();

        if tag < Tag::HEADER_I18NTABLE {
            return Err(PutError::Reserved(tag));
        }

        let table = self.position(Tag::HEADER_I18NTABLE, Some(Kind::StringArray));
        let target = self.position(tag, Some(Kind::I18nString));

        let languages = match table {
            Some(index) => self.entries[index].raw_strings(),
            None if target.is_some() => return Err(PutError::I18nTable),
            None => vec![b"C".as_slice()],
        };
        let known = languages.iter().position(|name| *name == lang.as_bytes());
        let lang_num = known.unwrap_or(languages.len());
        let table_bytes = languages.iter().map(|name| name.len() + 1).sum::<usize>() + lang.len() + 1;

        let mut strings = target
            .map(|index| {
                self.entries[index]
                    .raw_strings()
                    .into_iter()
                    .map(<[u8]>::to_vec)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        if lang_num >= strings.len() {
            strings.resize(lang_num + 1, vec![]);
        }
        strings[lang_num] = value.as_bytes().to_vec();

        // Nothing is touched until both entries are known to fit
        if known.is_none() && table_bytes > MAX_ENTRY_BYTES {
            return Err(PutError::TooLarge(Tag::HEADER_I18NTABLE));
        }
        if strings.iter().map(|s| s.len() + 1).sum::<usize>() > MAX_ENTRY_BYTES {
            return Err(PutError::TooLarge(tag));
        }

        match (table, known) {
            (None, _) => {
                let mut names = vec!["C".to_owned()];
                if lang != "C" {
                    names.push(lang.to_owned());
                }
                self.add(Tag::HEADER_I18NTABLE, Value::StringArray(names))?;
            }
            (Some(_), None) => self.append(Tag::HEADER_I18NTABLE, Value::StringArray(vec![lang.to_owned()]))?,
            (Some(_), Some(_)) => {}
        }

        match self.position(tag, Some(Kind::I18nString)) {
            Some(index) => {
                self.entries[index].set_raw_strings(strings);
                Ok(())
            }
            None => {
                let strings = strings
                    .iter()
                    .map(|s| String::from_utf8_lossy(s).into_owned())
                    .collect();
                self.add(tag, Value::I18nString(strings))
            }
        }
    }

    /// Order entries by tag
    pub fn sort(&mut self) {
        self.entries.sort_by_key(|entry| entry.tag);
        self.sorted = true;
    }

    /// Order entries as they are laid out in storage
    pub fn unsort(&mut self) {
        self.entries.sort_by_key(unload::storage_order);
        self.sorted = false;
    }

    /// Deep copy into a freshly sealed header. A header without entries
    /// copies to an empty, unsealed one since it has no loadable form.
    pub fn copy(&self) -> Result<Self, Error> {
        if self.entries.is_empty() {
            return Ok(Self::new());
        }

        let mut entries = self.entries.iter().map(detach).collect::<Vec<_>>();
        entries.sort_by_key(|entry| entry.tag);

        Self {
            entries,
            region: None,
            sorted: true,
            instance: 0,
        }
        .reload(Tag::HEADER_IMAGE)
    }

    /// Copy the first entry of each of `tags` from `from`, skipping tags
    /// already present here
    pub fn copy_tags_from(&mut self, from: &Header, tags: &[Tag]) {
        for &tag in tags {
            if self.is_entry(tag) {
                continue;
            }
            if let Some(entry) = from.entry(tag) {
                self.push(detach(entry));
            }
        }
    }

    fn push(&mut self, entry: Entry) {
        if self.entries.last().is_some_and(|last| entry.tag < last.tag) {
            self.sorted = false;
        }
        self.entries.push(entry);
    }

    /// Index of the first entry matching `tag` and optionally `kind`
    fn position(&self, tag: Tag, kind: Option<Kind>) -> Option<usize> {
        let matches = |entry: &Entry| entry.tag == tag && kind.map_or(true, |kind| entry.kind == kind);

        if self.sorted {
            let start = self.entries.partition_point(|entry| entry.tag < tag);
            self.entries[start..]
                .iter()
                .take_while(|entry| entry.tag == tag)
                .position(matches)
                .map(|index| start + index)
        } else {
            self.entries.iter().position(matches)
        }
    }
}

/// Owned copy of an entry, no longer tied to any region
fn detach(entry: &Entry) -> Entry {
    Entry {
        data: Data::Owned(entry.bytes().to_vec()),
        origin: Origin::Added,
        ..entry.clone()
    }
}

fn single_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::StringArray(mut strings) | Value::I18nString(mut strings) if strings.len() == 1 => strings.pop(),
        _ => None,
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not enough bytes")]
    NotEnoughBytes,
    #[error("Invalid magic")]
    InvalidMagic,
    #[error("Invalid index length: {0}")]
    IndexLength(u32),
    #[error("Invalid data length: {0}")]
    DataLength(u32),
    #[error("Header exceeds maximum size")]
    TooLarge,
    #[error("Invalid entry {index}: {reason}")]
    Entry { index: usize, reason: EntryError },
    #[error("Invalid region: {0}")]
    Region(&'static str),
    #[error("Region data spans {found} bytes, expected {expected}")]
    RegionLength { expected: usize, found: usize },
    #[error("io")]
    Io(io::Error),
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::UnexpectedEof => Error::NotEnoughBytes,
            _ => Error::Io(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("unknown type {0}")]
    UnknownType(u32),
    #[error("count out of range")]
    Count,
    #[error("offset out of range")]
    Offset,
    #[error("misaligned data")]
    Alignment,
    #[error("data out of bounds")]
    Bounds,
    #[error("unterminated string")]
    Unterminated,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PutError {
    #[error("Tag {0} is reserved")]
    Reserved(Tag),
    #[error("Tag {0} is derived and cannot be stored")]
    Extension(Tag),
    #[error("Tag {tag} holds {expected}, found {found}")]
    Kind { tag: Tag, expected: Kind, found: Kind },
    #[error("Tag {tag} holds a single value, found {count}")]
    Count { tag: Tag, count: usize },
    #[error("Empty value for tag {0}")]
    Empty(Tag),
    #[error("Cannot append to {0} entries")]
    Append(Kind),
    #[error("No {kind} entry for tag {tag}")]
    Missing { tag: Tag, kind: Kind },
    #[error("I18N table missing")]
    I18nTable,
    #[error("Value for tag {0} is too large")]
    TooLarge(Tag),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::region::{Layout, Record, RECORD_SIZE};

    fn package() -> Header {
        let mut header = Header::new();
        header.put_string(Tag::NAME, "foo").unwrap();
        header.put_string(Tag::VERSION, "1.0").unwrap();
        header.put_string(Tag::RELEASE, "1").unwrap();
        header
    }

    fn roundtrip(header: &Header) -> Header {
        Header::load(&header.unload().unwrap()).unwrap()
    }

    fn pairs(header: &Header) -> Vec<(Tag, Value)> {
        header.iter().collect()
    }

    #[test]
    fn name_roundtrip() {
        let header = roundtrip(&package());

        assert_eq!(header.get_string(Tag::NAME).as_deref(), Some("foo"));
        assert_eq!(header.get_string(Tag::VERSION).as_deref(), Some("1.0"));
        assert_eq!(header.get_string(Tag::RELEASE).as_deref(), Some("1"));
        assert_eq!(header.region_tag(), Some(Tag::HEADER_IMAGE));
    }

    #[test]
    fn insertion_order_is_irrelevant() {
        let mut forward = Header::new();
        forward.put_string(Tag::NAME, "foo").unwrap();
        forward.put_u32(Tag::SIZE, &[42]).unwrap();
        forward.put_string_array(Tag::BASENAMES, &["a", "b"]).unwrap();

        let mut backward = Header::new();
        backward.put_string_array(Tag::BASENAMES, &["a", "b"]).unwrap();
        backward.put_u32(Tag::SIZE, &[42]).unwrap();
        backward.put_string(Tag::NAME, "foo").unwrap();
        assert!(!backward.sorted);

        assert_eq!(pairs(&forward), pairs(&backward));
        assert_eq!(pairs(&roundtrip(&forward)), pairs(&roundtrip(&backward)));
        assert_eq!(pairs(&roundtrip(&forward)), pairs(&forward));
    }

    #[test]
    fn alignment() {
        let mut header = Header::new();
        header.put_string(Tag::NAME, "ab").unwrap();
        header.put_u64(Tag::LONGSIZE, &[0x0102_0304_0506_0708]).unwrap();
        header.put_string(Tag::URL, "x").unwrap();
        header.put_u16(Tag::FILEMODES, &[0o755, 0o644]).unwrap();
        header.put_string(Tag::LICENSE, "MIT").unwrap();
        header.put_u32(Tag::SIZE, &[7]).unwrap();

        let blob = header.unload().unwrap();
        let il = u32::from_be_bytes([blob[0], blob[1], blob[2], blob[3]]) as usize;

        for i in 0..il {
            let start = 8 + i * RECORD_SIZE;
            let record = Record::decode(&blob[start..start + RECORD_SIZE]).unwrap();
            let kind = Kind::from_raw(record.kind).unwrap();
            assert_eq!(record.offset as usize % kind.align(), 0, "{kind} at {}", record.offset);
        }

        let loaded = Header::load(&blob).unwrap();
        assert_eq!(loaded.get_number(Tag::LONGSIZE), Some(0x0102_0304_0506_0708));
        assert_eq!(loaded.get_raw(Tag::FILEMODES), Some(Value::Int16(vec![0o755, 0o644])));
        assert_eq!(loaded.get_number(Tag::SIZE), Some(7));
    }

    #[test]
    fn put_checks_table() {
        let mut header = Header::new();

        assert_eq!(
            header.put_u32(Tag::NAME, &[1]),
            Err(PutError::Kind {
                tag: Tag::NAME,
                expected: Kind::String,
                found: Kind::Int32
            })
        );
        assert_eq!(
            header.put_u32(Tag::SIZE, &[1, 2]),
            Err(PutError::Count {
                tag: Tag::SIZE,
                count: 2
            })
        );
        assert_eq!(header.put_u32(Tag::SIZE, &[]), Err(PutError::Empty(Tag::SIZE)));
        assert_eq!(
            header.put_bin(Tag::HEADER_IMMUTABLE, &[0; 16]),
            Err(PutError::Reserved(Tag::HEADER_IMMUTABLE))
        );
        assert_eq!(
            header.put_string(Tag::NEVRA, "foo"),
            Err(PutError::Extension(Tag::NEVRA))
        );
        assert!(header.iter().next().is_none());

        // Binary data counts bytes
        header.put_bin(Tag::SIGMD5, &[1, 2, 3, 4]).unwrap();
        // Unknown tags are stored as given
        header.put(Tag::new(4242), Value::Int32(vec![1, 2])).unwrap();
        assert_eq!(header.get_raw(Tag::new(4242)), Some(Value::Int32(vec![1, 2])));
    }

    #[test]
    fn arrays_append() {
        let mut header = Header::new();
        header.put_string_array(Tag::BASENAMES, &["a"]).unwrap();
        header.put_string_array(Tag::BASENAMES, &["b", "c"]).unwrap();
        header.put_u32(Tag::DIRINDEXES, &[0]).unwrap();
        header.append(Tag::DIRINDEXES, Value::Int32(vec![0, 0])).unwrap();

        assert_eq!(header.entries.len(), 2);
        assert_eq!(
            header.get(Tag::BASENAMES),
            Some(Value::StringArray(vec!["a".to_owned(), "b".to_owned(), "c".to_owned()]))
        );
        assert_eq!(header.entry(Tag::DIRINDEXES).unwrap().count(), 3);

        assert_eq!(
            header.append(Tag::NAME, Value::String("x".to_owned())),
            Err(PutError::Append(Kind::String))
        );
        assert_eq!(
            header.append(Tag::FILESIZES, Value::Int32(vec![1])),
            Err(PutError::Missing {
                tag: Tag::FILESIZES,
                kind: Kind::Int32
            })
        );
    }

    #[test]
    fn modify_and_delete() {
        let mut header = roundtrip(&package());

        header.modify(Tag::VERSION, Value::String("2.0".to_owned())).unwrap();
        assert_eq!(header.get_string(Tag::VERSION).as_deref(), Some("2.0"));
        assert!(header.modify(Tag::URL, Value::String("x".to_owned())).is_err());

        // A modified region member is written as a dribble and wins on load
        let header = roundtrip(&header);
        assert_eq!(header.get_string(Tag::VERSION).as_deref(), Some("2.0"));

        let mut header = Header::new();
        header.add(Tag::URL, Value::String("a".to_owned())).unwrap();
        header.add(Tag::URL, Value::String("b".to_owned())).unwrap();
        assert_eq!(header.get_string(Tag::URL).as_deref(), Some("a"));
        assert!(header.delete(Tag::URL));
        assert!(!header.is_entry(Tag::URL));
        assert!(!header.delete(Tag::URL));
    }

    #[test]
    fn unsorted_lookup() {
        let mut header = Header::new();
        header.put_string(Tag::VERSION, "1.0").unwrap();
        header.put_string(Tag::NAME, "foo").unwrap();
        assert!(!header.sorted);
        assert_eq!(header.get_string(Tag::NAME).as_deref(), Some("foo"));

        header.sort();
        assert!(header.sorted);
        assert_eq!(header.entries[0].tag, Tag::NAME);
        assert_eq!(header.get_string(Tag::VERSION).as_deref(), Some("1.0"));
    }

    #[test]
    fn region_survives_additions() {
        let sealed = package().reload(Tag::HEADER_IMMUTABLE).unwrap();
        assert_eq!(sealed.region_tag(), Some(Tag::HEADER_IMMUTABLE));

        let mut header = roundtrip(&sealed);
        let region = header.region.clone().unwrap();
        assert_eq!(region.tag, Tag::HEADER_IMMUTABLE);
        assert!(matches!(region.layout, Layout::Sealed { .. }));

        header.put_string(Tag::URL, "https://example.com").unwrap();
        let reloaded = roundtrip(&header);

        let again = reloaded.region.as_ref().unwrap();
        assert_eq!(again.index, region.index);
        assert_eq!(again.layout, region.layout);
        assert_eq!(
            reloaded.get_string(Tag::URL).as_deref(),
            Some("https://example.com")
        );
        assert!(!reloaded.entry(Tag::URL).unwrap().in_region());
        assert!(reloaded.entry(Tag::NAME).unwrap().in_region());

        // Region bytes are written back verbatim
        let first = sealed.unload().unwrap();
        let second = roundtrip(&sealed).unload().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn region_blob() {
        let sealed = roundtrip(&package().reload(Tag::HEADER_IMMUTABLE).unwrap());

        let Some(Value::Bin(blob)) = sealed.get(Tag::HEADER_IMMUTABLE) else {
            panic!("missing region blob");
        };
        let inner = Header::load(&blob).unwrap();
        assert_eq!(inner.get_string(Tag::NAME).as_deref(), Some("foo"));

        let legacy = roundtrip(&package());
        let Some(Value::Bin(blob)) = legacy.get(Tag::HEADER_IMAGE) else {
            panic!("missing image blob");
        };
        let inner = Header::load(&blob).unwrap();
        assert_eq!(inner.get_string(Tag::RELEASE).as_deref(), Some("1"));
    }

    #[test]
    fn delete_region_unseals() {
        let mut header = roundtrip(&package().reload(Tag::HEADER_IMMUTABLE).unwrap());
        assert!(header.delete(Tag::HEADER_IMMUTABLE));
        assert!(header.region_tag().is_none());

        let header = roundtrip(&header);
        assert_eq!(header.region.as_ref().unwrap().layout, Layout::Legacy);
        assert_eq!(header.get_string(Tag::NAME).as_deref(), Some("foo"));
    }

    #[test]
    fn translations() {
        let mut header = package();
        header.add_i18n_string(Tag::SUMMARY, "hello", None).unwrap();
        header.add_i18n_string(Tag::SUMMARY, "hallo", Some("de")).unwrap();
        header.add_i18n_string(Tag::DESCRIPTION, "beschreibung", Some("de")).unwrap();

        assert_eq!(
            header.get_raw(Tag::HEADER_I18NTABLE),
            Some(Value::StringArray(vec!["C".to_owned(), "de".to_owned()]))
        );
        assert_eq!(
            header.get_raw(Tag::DESCRIPTION),
            Some(Value::I18nString(vec![String::new(), "beschreibung".to_owned()]))
        );

        let header = roundtrip(&header);
        let get = |tag, locale: &str| header.get_with_locale(tag, &Locale::new(locale));

        assert_eq!(get(Tag::SUMMARY, "de_DE.UTF-8"), Some(Value::String("hallo".to_owned())));
        assert_eq!(get(Tag::SUMMARY, "C"), Some(Value::String("hello".to_owned())));
        assert_eq!(get(Tag::SUMMARY, "fr"), Some(Value::String("hello".to_owned())));
        assert_eq!(get(Tag::DESCRIPTION, "fr"), Some(Value::String(String::new())));
    }

    #[test]
    fn translation_needs_table() {
        let mut header = Header::new();
        header.add(Tag::SUMMARY, Value::I18nString(vec!["x".to_owned()])).unwrap();

        assert_eq!(
            header.add_i18n_string(Tag::SUMMARY, "y", Some("de")),
            Err(PutError::I18nTable)
        );
        assert!(!header.is_entry(Tag::HEADER_I18NTABLE));
    }

    #[test]
    fn failed_translation_leaves_table() {
        let mut header = Header::new();
        assert_eq!(
            header.add_i18n_string(Tag::new(50), "x", Some("de")),
            Err(PutError::Reserved(Tag::new(50)))
        );
        assert!(!header.is_entry(Tag::HEADER_I18NTABLE));

        header.add_i18n_string(Tag::SUMMARY, "hello", None).unwrap();
        assert_eq!(
            header.add_i18n_string(Tag::new(50), "hallo", Some("de")),
            Err(PutError::Reserved(Tag::new(50)))
        );
        assert_eq!(
            header.get_raw(Tag::HEADER_I18NTABLE),
            Some(Value::StringArray(vec!["C".to_owned()]))
        );
    }

    #[test]
    fn copies() {
        let sealed = roundtrip(&package().reload(Tag::HEADER_IMMUTABLE).unwrap());

        let copy = sealed.copy().unwrap();
        assert_eq!(copy.region_tag(), Some(Tag::HEADER_IMAGE));
        assert_eq!(pairs(&copy), pairs(&sealed));

        let mut target = Header::new();
        target.put_string(Tag::NAME, "bar").unwrap();
        target.copy_tags_from(&sealed, &[Tag::NAME, Tag::VERSION, Tag::URL]);

        assert_eq!(target.get_string(Tag::NAME).as_deref(), Some("bar"));
        assert_eq!(target.get_string(Tag::VERSION).as_deref(), Some("1.0"));
        assert!(!target.is_entry(Tag::URL));

        let empty = Header::new().copy().unwrap();
        assert!(empty.iter().next().is_none());
        assert!(empty.region_tag().is_none());
        assert!(matches!(Header::load(&Header::new().unload().unwrap()), Err(Error::IndexLength(0))));
    }

    #[test]
    fn framing() {
        let header = package();

        let mut bytes = vec![];
        header.write(&mut bytes, Magic::Present).unwrap();
        assert_eq!(&bytes[..8], &MAGIC);
        assert_eq!(bytes.len(), header.size_of(Magic::Present).unwrap());
        assert_eq!(bytes.len() - 8, header.size_of(Magic::Absent).unwrap());

        let read = Header::read(bytes.as_slice(), Magic::Present).unwrap();
        assert_eq!(pairs(&read), pairs(&header));
    }

    #[test]
    fn accessors() {
        let mut header = package();
        header.put_bin(Tag::SIGMD5, &[0xca, 0xfe]).unwrap();
        header.put_u32(Tag::FILESIZES, &[1, 2]).unwrap();
        header.put_u32(Tag::SIZE, &[10]).unwrap();

        assert_eq!(header.get_as_string(Tag::SIGMD5).as_deref(), Some("cafe"));
        assert_eq!(header.get_as_string(Tag::SIZE).as_deref(), Some("10"));
        assert_eq!(header.get_as_string(Tag::FILESIZES), None);
        assert_eq!(header.entry_bytes(Tag::SIZE), Some(&[0, 0, 0, 10][..]));
        assert_eq!(header.get_number(Tag::NAME), None);
        assert_eq!(header.get_string(Tag::FILESIZES), None);
    }

    #[test]
    fn unsort_orders_by_storage() {
        let mut header = roundtrip(&package());
        header.put_string(Tag::URL, "x").unwrap();
        header.put_string(Tag::BUILDHOST, "y").unwrap();
        header.unsort();

        let tags = header.entries.iter().map(|entry| entry.tag).collect::<Vec<_>>();
        assert_eq!(
            tags,
            vec![Tag::NAME, Tag::VERSION, Tag::RELEASE, Tag::BUILDHOST, Tag::URL]
        );
        assert_eq!(header.get_string(Tag::URL).as_deref(), Some("x"));
    }

    #[test]
    fn instance() {
        let mut header = Header::new();
        assert_eq!(header.instance(), 0);
        header.set_instance(7);
        assert_eq!(header.instance(), 7);
    }
}
