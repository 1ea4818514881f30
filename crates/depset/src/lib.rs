// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Package dependency sets and version comparison
//!
//! A [`DepSet`] is an ordered list of `(name, [E:]V-R, flags)` triples
//! loaded from a [`Header`], or built up by merging. Two dependencies
//! match when their version ranges overlap, see [`Dependency::overlaps`].

use header::Header;

pub use self::ds::{DepSet, Dependency, Family};
pub use self::evr::{compare_evr, vercmp, Evr};
pub use self::sense::SenseFlags;

mod ds;
mod evr;
pub mod rpmlib;
mod sense;

/// Newly created sets do not promote a lone epoch
pub const DEFAULT_NOPROMOTE: bool = true;

/// Whether the provide at `index` of `header` satisfies the dependency under
/// the cursor of `requirement`
pub fn matches_dep(header: &Header, index: usize, requirement: &DepSet, nopromote: bool) -> bool {
    let Some(provides) = DepSet::new(header, Family::Provides) else {
        return false;
    };
    let (Some(provide), Some(requirement)) = (provides.dependency(index), requirement.current_dependency()) else {
        return false;
    };

    provide.overlaps(&Dependency {
        nopromote,
        ..requirement
    })
}

/// Whether any provide of `header` satisfies the dependency under the cursor
/// of `requirement`
pub fn any_matches_dep(header: &Header, requirement: &DepSet, nopromote: bool) -> bool {
    let Some(provides) = DepSet::new(header, Family::Provides) else {
        return false;
    };
    let Some(requirement) = requirement.current_dependency() else {
        return false;
    };
    let requirement = Dependency {
        nopromote,
        ..requirement
    };

    let matched = provides.iter().any(|provide| provide.overlaps(&requirement));
    matched
}

/// Whether the package itself, as `name = [E:]V-R`, satisfies the dependency
/// under the cursor of `requirement`. A header without a name matches.
pub fn nvr_matches_dep(header: &Header, requirement: &DepSet, nopromote: bool) -> bool {
    let Some(this) = DepSet::this(header, Family::Provides, SenseFlags::EQUAL) else {
        return true;
    };
    let (Some(package), Some(requirement)) = (this.current_dependency(), requirement.current_dependency()) else {
        return true;
    };

    package.overlaps(&Dependency {
        nopromote,
        ..requirement
    })
}

#[cfg(test)]
mod test {
    use header::Tag;

    use super::*;

    fn package() -> Header {
        let mut header = Header::new();
        header.put_string(Tag::NAME, "bar").unwrap();
        header.put_string(Tag::VERSION, "1.0").unwrap();
        header.put_string(Tag::RELEASE, "1").unwrap();
        header.put_u32(Tag::EPOCH, &[2]).unwrap();
        header.put_string_array(Tag::PROVIDENAME, &["bar", "libbar.so.1"]).unwrap();
        header.put_string_array(Tag::PROVIDEVERSION, &["2:1.0-1", ""]).unwrap();
        header
            .put_u32(Tag::PROVIDEFLAGS, &[SenseFlags::EQUAL.bits(), 0])
            .unwrap();
        header
    }

    fn requires(name: &str, evr: &str, flags: SenseFlags) -> DepSet {
        DepSet::single(Family::Requires, name, evr, flags)
    }

    #[test]
    fn provides() {
        let header = package();
        let ge = SenseFlags::GREATER | SenseFlags::EQUAL;

        assert!(matches_dep(&header, 0, &requires("bar", "1.5-1", ge), true));
        assert!(!matches_dep(&header, 0, &requires("bar", "1.5-1", ge), false));
        assert!(!matches_dep(&header, 1, &requires("bar", "1.5-1", ge), true));
        assert!(!matches_dep(&header, 5, &requires("bar", "", SenseFlags::ANY), true));

        assert!(any_matches_dep(&header, &requires("libbar.so.1", "", SenseFlags::ANY), true));
        assert!(any_matches_dep(&header, &requires("bar", "3:0", SenseFlags::LESS), false));
        assert!(!any_matches_dep(&header, &requires("baz", "", SenseFlags::ANY), true));
    }

    #[test]
    fn package_itself() {
        let header = package();

        assert!(nvr_matches_dep(&header, &requires("bar", "2:1.0", SenseFlags::EQUAL), true));
        assert!(nvr_matches_dep(&header, &requires("bar", "1.5", SenseFlags::GREATER), true));
        assert!(!nvr_matches_dep(&header, &requires("bar", "1.5", SenseFlags::GREATER), false));
        assert!(!nvr_matches_dep(&header, &requires("foo", "", SenseFlags::ANY), true));
        assert!(nvr_matches_dep(&Header::new(), &requires("foo", "", SenseFlags::ANY), true));
    }
}
