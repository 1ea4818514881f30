// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Features this library implements, provided as `rpmlib(...)` capabilities

use crate::{DepSet, Family, SenseFlags};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feature {
    pub name: &'static str,
    pub evr: &'static str,
    pub flags: SenseFlags,
    pub description: &'static str,
}

const VERSIONED: SenseFlags = SenseFlags::RPMLIB.union(SenseFlags::EQUAL);

pub static FEATURES: &[Feature] = &[
    Feature {
        name: "rpmlib(VersionedDependencies)",
        evr: "3.0.3-1",
        flags: VERSIONED,
        description: "PreReq:, Provides:, and Obsoletes: dependencies support versions.",
    },
    Feature {
        name: "rpmlib(CompressedFileNames)",
        evr: "3.0.4-1",
        flags: VERSIONED,
        description: "file name(s) stored as (dirName,baseName,dirIndex) tuple, not as path.",
    },
    Feature {
        name: "rpmlib(PayloadFilesHavePrefix)",
        evr: "4.0-1",
        flags: VERSIONED,
        description: "package payload file(s) have \"./\" prefix.",
    },
    Feature {
        name: "rpmlib(ExplicitPackageProvide)",
        evr: "4.0-1",
        flags: VERSIONED,
        description: "package name-version-release is not implicitly provided.",
    },
    Feature {
        name: "rpmlib(HeaderLoadSortsTags)",
        evr: "4.0.1-1",
        flags: SenseFlags::EQUAL,
        description: "header tags are always sorted after being loaded.",
    },
    Feature {
        name: "rpmlib(ScriptletInterpreterArgs)",
        evr: "4.0.3-1",
        flags: SenseFlags::EQUAL,
        description: "the scriptlet interpreter can use arguments from header.",
    },
    Feature {
        name: "rpmlib(PartialHardlinkSets)",
        evr: "4.0.4-1",
        flags: SenseFlags::EQUAL,
        description: "a hardlink file set may be installed without being complete.",
    },
    Feature {
        name: "rpmlib(ConcurrentAccess)",
        evr: "4.1-1",
        flags: SenseFlags::EQUAL,
        description: "package scriptlets may access the rpm database while installing.",
    },
    Feature {
        name: "rpmlib(FileDigests)",
        evr: "4.6.0-1",
        flags: SenseFlags::EQUAL,
        description: "file digest algorithm is per package configurable",
    },
    Feature {
        name: "rpmlib(ScriptletExpansion)",
        evr: "4.9.0-1",
        flags: SenseFlags::EQUAL,
        description: "package scriptlets can be expanded at install time.",
    },
    Feature {
        name: "rpmlib(TildeInVersions)",
        evr: "4.10.0-1",
        flags: SenseFlags::EQUAL,
        description: "dependency comparison supports versions with tilde.",
    },
];

/// Merge every supported feature into `target` as a provide
pub fn provides(target: &mut Option<DepSet>) {
    for feature in FEATURES {
        DepSet::merge(
            target,
            &DepSet::single(Family::Provides, feature.name, feature.evr, feature.flags),
        );
    }
}
