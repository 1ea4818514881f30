// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Version string ordering

use std::cmp::Ordering;

/// Compare two version strings segment by segment.
///
/// Runs of digits compare numerically and runs of letters compare
/// lexically, separators are skipped. A numeric segment is newer than an
/// alphabetic one and `~` sorts before everything, including the end of
/// the string, so `1.0~rc1` is older than `1.0`.
pub fn vercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let (a, b) = (a.as_bytes(), b.as_bytes());
    let (mut one, mut two) = (0, 0);

    loop {
        while one < a.len() && !is_segment(a[one]) {
            one += 1;
        }
        while two < b.len() && !is_segment(b[two]) {
            two += 1;
        }

        let (x, y) = (a.get(one).copied(), b.get(two).copied());

        match (x, y) {
            (Some(b'~'), Some(b'~')) => {
                one += 1;
                two += 1;
                continue;
            }
            (Some(b'~'), _) => return Ordering::Less,
            (_, Some(b'~')) => return Ordering::Greater,
            (Some(_), Some(_)) => {}
            _ => break,
        }

        let numeric = a[one].is_ascii_digit();
        let run = |s: &[u8], start: usize| {
            let len = s[start..]
                .iter()
                .take_while(|c| if numeric { c.is_ascii_digit() } else { c.is_ascii_alphabetic() })
                .count();
            start + len
        };
        let (end1, end2) = (run(a, one), run(b, two));

        // Differing segment kinds, numbers are newer
        if end2 == two {
            return if numeric { Ordering::Greater } else { Ordering::Less };
        }

        let (mut x, mut y) = (&a[one..end1], &b[two..end2]);
        if numeric {
            x = trim_zeroes(x);
            y = trim_zeroes(y);
            match x.len().cmp(&y.len()) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        match x.cmp(y) {
            Ordering::Equal => {}
            ord => return ord,
        }

        one = end1;
        two = end2;
    }

    match (one < a.len(), two < b.len()) {
        (false, false) => Ordering::Equal,
        (false, true) => Ordering::Less,
        _ => Ordering::Greater,
    }
}

fn is_segment(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'~'
}

fn trim_zeroes(s: &[u8]) -> &[u8] {
    let zeroes = s.iter().take_while(|&&c| c == b'0').count();
    &s[zeroes..]
}

/// An `[epoch:]version[-release]` string split into its parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evr<'a> {
    pub epoch: Option<&'a str>,
    pub version: &'a str,
    pub release: Option<&'a str>,
}

impl<'a> Evr<'a> {
    /// Split on a `:` directly after leading digits and the last `-`.
    /// An empty epoch before `:` reads as `0`.
    pub fn parse(evr: &'a str) -> Self {
        let digits = evr.bytes().take_while(u8::is_ascii_digit).count();

        let (epoch, body) = match evr[digits..].strip_prefix(':') {
            Some(body) if digits == 0 => (Some("0"), body),
            Some(body) => (Some(&evr[..digits]), body),
            None => (None, evr),
        };

        let (version, release) = match body.rfind('-') {
            Some(dash) => (&body[..dash], Some(&body[dash + 1..])),
            None => (body, None),
        };

        Self {
            epoch,
            version,
            release,
        }
    }

    /// Epoch is present and not zero
    pub(crate) fn has_positive_epoch(&self) -> bool {
        self.epoch
            .is_some_and(|epoch| epoch.bytes().take_while(u8::is_ascii_digit).any(|c| c != b'0'))
    }
}

/// Order two `[epoch:]version[-release]` strings. A missing epoch counts
/// as `0` and a missing release as empty.
pub fn compare_evr(a: &str, b: &str) -> Ordering {
    let (a, b) = (Evr::parse(a), Evr::parse(b));

    vercmp(a.epoch.unwrap_or("0"), b.epoch.unwrap_or("0"))
        .then_with(|| vercmp(a.version, b.version))
        .then_with(|| vercmp(a.release.unwrap_or_default(), b.release.unwrap_or_default()))
}
