// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use bitflags::bitflags;

bitflags! {
    /// Comparison sense and context bits of a dependency
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct SenseFlags: u32 {
        const ANY = 0;
        const LESS = 1 << 1;
        const GREATER = 1 << 2;
        const EQUAL = 1 << 3;
        const PROVIDES = 1 << 4;
        const CONFLICTS = 1 << 5;
        const PREREQ = 1 << 6;
        const OBSOLETES = 1 << 7;
        const INTERP = 1 << 8;
        const SCRIPT_PRE = 1 << 9;
        const SCRIPT_POST = 1 << 10;
        const SCRIPT_PREUN = 1 << 11;
        const SCRIPT_POSTUN = 1 << 12;
        const SCRIPT_VERIFY = 1 << 13;
        const FIND_REQUIRES = 1 << 14;
        const FIND_PROVIDES = 1 << 15;
        const TRIGGERIN = 1 << 16;
        const TRIGGERUN = 1 << 17;
        const TRIGGERPOSTUN = 1 << 18;
        const MISSINGOK = 1 << 19;
        const SCRIPT_PREP = 1 << 20;
        const SCRIPT_BUILD = 1 << 21;
        const SCRIPT_INSTALL = 1 << 22;
        const SCRIPT_CLEAN = 1 << 23;
        const RPMLIB = 1 << 24;
        const TRIGGERPREIN = 1 << 25;
        const KEYRING = 1 << 26;
        const STRONG = 1 << 27;
        const CONFIG = 1 << 28;

        /// Bits that carry the comparison operator
        const SENSEMASK = 0x0f;
        const TRIGGER = Self::TRIGGERPREIN.bits()
            | Self::TRIGGERIN.bits()
            | Self::TRIGGERUN.bits()
            | Self::TRIGGERPOSTUN.bits();
    }
}

impl SenseFlags {
    /// The dependency carries a version comparison
    pub fn is_versioned(self) -> bool {
        self.intersects(Self::SENSEMASK)
    }

    /// Comparison operator as written in a dependency, `<`, `>=` and so on.
    /// Empty when unversioned.
    pub fn operator(self) -> String {
        [(Self::LESS, '<'), (Self::GREATER, '>'), (Self::EQUAL, '=')]
            .into_iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, c)| c)
            .collect()
    }

    /// Parse a comparison operator. `==` is accepted as `=`.
    pub fn from_operator(operator: &str) -> Option<Self> {
        Some(match operator {
            "<" => Self::LESS,
            "<=" | "=<" => Self::LESS | Self::EQUAL,
            "=" | "==" => Self::EQUAL,
            ">=" | "=>" => Self::GREATER | Self::EQUAL,
            ">" => Self::GREATER,
            _ => return None,
        })
    }
}
