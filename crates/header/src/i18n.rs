// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Locale selection for [`Kind::I18nString`](crate::Kind::I18nString) entries

use std::env;

use encoding_rs::{Encoding, UTF_8};

use crate::Entry;

/// Environment variables consulted for the message locale, in order
const VARIABLES: [&str; 4] = ["LANGUAGE", "LC_ALL", "LC_MESSAGES", "LANG"];

/// A colon separated list of locale names, ie. `de_DE.UTF-8:fr`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locale(Option<String>);

impl Locale {
    pub fn new(locale: impl ToString) -> Self {
        Self(Some(locale.to_string()))
    }

    /// No locale, lookups return the untranslated string
    pub fn none() -> Self {
        Self(None)
    }

    /// First of `LANGUAGE`, `LC_ALL`, `LC_MESSAGES`, `LANG` that is set
    pub fn from_env() -> Self {
        Self(
            VARIABLES
                .iter()
                .find_map(|name| env::var_os(name))
                .map(|value| value.to_string_lossy().into_owned()),
        )
    }

    fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0
            .as_deref()
            .unwrap_or_default()
            .split(':')
            .filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Match {
    Exact,
    Weak,
}

/// Pick the translation of `entry` best matching `locale`, using the
/// language names in `table`
pub(crate) fn resolve(table: Option<&Entry>, entry: &Entry, locale: &Locale) -> String {
    let strings = entry.raw_strings();
    let fallback = || strings.first().map(|s| lossy(s)).unwrap_or_default();

    let Some(table) = table else {
        return fallback();
    };
    let names = table.raw_strings();

    let mut weak = None;

    for token in locale.tokens() {
        let mut token_weak = None;

        for (name, data) in names.iter().zip(&strings) {
            match match_locale(name, token.as_bytes()) {
                Some(Match::Exact) => return convert(name, data),
                Some(Match::Weak) => token_weak = Some((name, data)),
                None => {}
            }
        }

        weak = weak.or(token_weak);
    }

    match weak {
        Some((name, data)) => convert(name, data),
        None => fallback(),
    }
}

/// Compare a table name against a single locale token, progressively
/// stripping the `@modifier`, `.codeset` and `_territory` of the token
fn match_locale(name: &[u8], locale: &[u8]) -> Option<Match> {
    if name == locale {
        return Some(Match::Exact);
    }

    let prefix = |end: usize| name.len() >= end && name[..end] == locale[..end];

    [(b'@', Match::Exact), (b'.', Match::Exact), (b'_', Match::Weak)]
        .into_iter()
        .find_map(|(separator, result)| {
            let end = locale.iter().position(|&b| b == separator)?;
            prefix(end).then_some(result)
        })
}

/// Decode `data` from the codeset named after the `.` in `name`
fn convert(name: &[u8], data: &[u8]) -> String {
    let encoding = name
        .iter()
        .position(|&b| b == b'.')
        .and_then(|dot| Encoding::for_label(&name[dot + 1..]));

    match encoding {
        Some(encoding) if encoding != UTF_8 => encoding
            .decode_without_bom_handling_and_without_replacement(data)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|| lossy(data)),
        _ => lossy(data),
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
