// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Derived tags, computed from stored entries on lookup

use crate::{Header, Tag, Value};

pub(crate) fn resolve(header: &Header, tag: Tag) -> Option<Value> {
    match tag {
        Tag::EVR => evr(header).map(Value::String),
        Tag::NVR => {
            let (name, version, release) = identity(header)?;
            Some(Value::String(format!("{name}-{version}-{release}")))
        }
        Tag::NEVR => nevr(header).map(Value::String),
        Tag::NEVRA => {
            let nevr = nevr(header)?;
            Some(Value::String(match header.raw_string(Tag::ARCH) {
                Some(arch) => format!("{nevr}.{arch}"),
                None => nevr,
            }))
        }
        Tag::EPOCHNUM => Some(Value::Int32(vec![epoch(header).unwrap_or(0)])),
        Tag::FILENAMES => filenames(header).map(Value::StringArray),
        _ => None,
    }
}

fn identity(header: &Header) -> Option<(String, String, String)> {
    Some((
        header.raw_string(Tag::NAME)?,
        header.raw_string(Tag::VERSION)?,
        header.raw_string(Tag::RELEASE)?,
    ))
}

fn epoch(header: &Header) -> Option<u32> {
    header
        .get_raw(Tag::EPOCH)?
        .numbers()?
        .first()
        .and_then(|&epoch| u32::try_from(epoch).ok())
}

/// `[E:]V-R`
fn evr(header: &Header) -> Option<String> {
    let version = header.raw_string(Tag::VERSION)?;
    let release = header.raw_string(Tag::RELEASE)?;

    Some(match epoch(header) {
        Some(epoch) => format!("{epoch}:{version}-{release}"),
        None => format!("{version}-{release}"),
    })
}

fn nevr(header: &Header) -> Option<String> {
    let name = header.raw_string(Tag::NAME)?;
    Some(format!("{name}-{}", evr(header)?))
}

/// Join the compressed file list, falling back to the legacy flat list
fn filenames(header: &Header) -> Option<Vec<String>> {
    let Some(Value::StringArray(basenames)) = header.get_raw(Tag::BASENAMES) else {
        return match header.get_raw(Tag::OLDFILENAMES) {
            Some(Value::StringArray(names)) => Some(names),
            _ => None,
        };
    };
    let Some(Value::StringArray(dirnames)) = header.get_raw(Tag::DIRNAMES) else {
        return None;
    };
    let Some(Value::Int32(indexes)) = header.get_raw(Tag::DIRINDEXES) else {
        return None;
    };

    basenames
        .iter()
        .zip(&indexes)
        .map(|(base, &index)| {
            let dir = dirnames.get(index as usize)?;
            Some(format!("{dir}{base}"))
        })
        .collect()
}
