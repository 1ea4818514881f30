// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use derive_more::{Display, From, Into};

use crate::Kind;

/// Numeric identifier of a header entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into, Display)]
pub struct Tag(u32);

/// How values of a tag are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Class {
    /// A single value (or a byte run for [`Kind::Bin`])
    Scalar,
    /// Any number of values, puts append
    Array,
    /// Computed from other tags on lookup, never stored
    Derived,
}

/// Static metadata for a known tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Info {
    pub tag: Tag,
    pub name: &'static str,
    pub kind: Kind,
    pub class: Class,
}

macro_rules! tags {
    ($($name:ident = $value:literal, $kind:ident, $class:ident;)*) => {
        impl Tag {
            $(pub const $name: Tag = Tag($value);)*
        }

        static TABLE: &[Info] = &[
            $(Info {
                tag: Tag($value),
                name: stringify!($name),
                kind: Kind::$kind,
                class: Class::$class,
            },)*
        ];
    };
}

tags! {
    HEADER_IMAGE = 61, Bin, Scalar;
    HEADER_SIGNATURES = 62, Bin, Scalar;
    HEADER_IMMUTABLE = 63, Bin, Scalar;
    HEADER_REGIONS = 64, Bin, Scalar;
    HEADER_I18NTABLE = 100, StringArray, Array;
    SIGSIZE = 257, Int32, Scalar;
    SIGPGP = 259, Bin, Scalar;
    SIGMD5 = 261, Bin, Scalar;
    SIGGPG = 262, Bin, Scalar;
    PUBKEYS = 266, StringArray, Array;
    DSAHEADER = 267, Bin, Scalar;
    RSAHEADER = 268, Bin, Scalar;
    SHA1HEADER = 269, String, Scalar;
    LONGSIGSIZE = 270, Int64, Scalar;
    LONGARCHIVESIZE = 271, Int64, Scalar;
    NAME = 1000, String, Scalar;
    VERSION = 1001, String, Scalar;
    RELEASE = 1002, String, Scalar;
    EPOCH = 1003, Int32, Scalar;
    SUMMARY = 1004, I18nString, Scalar;
    DESCRIPTION = 1005, I18nString, Scalar;
    BUILDTIME = 1006, Int32, Scalar;
    BUILDHOST = 1007, String, Scalar;
    INSTALLTIME = 1008, Int32, Scalar;
    SIZE = 1009, Int32, Scalar;
    DISTRIBUTION = 1010, String, Scalar;
    VENDOR = 1011, String, Scalar;
    LICENSE = 1014, String, Scalar;
    PACKAGER = 1015, String, Scalar;
    GROUP = 1016, I18nString, Scalar;
    SOURCE = 1018, StringArray, Array;
    PATCH = 1019, StringArray, Array;
    URL = 1020, String, Scalar;
    OS = 1021, String, Scalar;
    ARCH = 1022, String, Scalar;
    PREIN = 1023, String, Scalar;
    POSTIN = 1024, String, Scalar;
    PREUN = 1025, String, Scalar;
    POSTUN = 1026, String, Scalar;
    OLDFILENAMES = 1027, StringArray, Array;
    FILESIZES = 1028, Int32, Array;
    FILESTATES = 1029, Char, Array;
    FILEMODES = 1030, Int16, Array;
    FILERDEVS = 1033, Int16, Array;
    FILEMTIMES = 1034, Int32, Array;
    FILEDIGESTS = 1035, StringArray, Array;
    FILELINKTOS = 1036, StringArray, Array;
    FILEFLAGS = 1037, Int32, Array;
    FILEUSERNAME = 1039, StringArray, Array;
    FILEGROUPNAME = 1040, StringArray, Array;
    SOURCERPM = 1044, String, Scalar;
    FILEVERIFYFLAGS = 1045, Int32, Array;
    ARCHIVESIZE = 1046, Int32, Scalar;
    PROVIDENAME = 1047, StringArray, Array;
    REQUIREFLAGS = 1048, Int32, Array;
    REQUIRENAME = 1049, StringArray, Array;
    REQUIREVERSION = 1050, StringArray, Array;
    CONFLICTFLAGS = 1053, Int32, Array;
    CONFLICTNAME = 1054, StringArray, Array;
    CONFLICTVERSION = 1055, StringArray, Array;
    BUILDROOT = 1057, String, Scalar;
    EXCLUDEARCH = 1059, StringArray, Array;
    EXCLUDEOS = 1060, StringArray, Array;
    EXCLUSIVEARCH = 1061, StringArray, Array;
    EXCLUSIVEOS = 1062, StringArray, Array;
    RPMVERSION = 1064, String, Scalar;
    TRIGGERSCRIPTS = 1065, StringArray, Array;
    TRIGGERNAME = 1066, StringArray, Array;
    TRIGGERVERSION = 1067, StringArray, Array;
    TRIGGERFLAGS = 1068, Int32, Array;
    TRIGGERINDEX = 1069, Int32, Array;
    VERIFYSCRIPT = 1079, String, Scalar;
    CHANGELOGTIME = 1080, Int32, Array;
    CHANGELOGNAME = 1081, StringArray, Array;
    CHANGELOGTEXT = 1082, StringArray, Array;
    PREINPROG = 1085, String, Scalar;
    POSTINPROG = 1086, String, Scalar;
    PREUNPROG = 1087, String, Scalar;
    POSTUNPROG = 1088, String, Scalar;
    BUILDARCHS = 1089, StringArray, Array;
    OBSOLETENAME = 1090, StringArray, Array;
    VERIFYSCRIPTPROG = 1091, String, Scalar;
    TRIGGERSCRIPTPROG = 1092, StringArray, Array;
    COOKIE = 1094, String, Scalar;
    FILEDEVICES = 1095, Int32, Array;
    FILEINODES = 1096, Int32, Array;
    FILELANGS = 1097, StringArray, Array;
    PREFIXES = 1098, StringArray, Array;
    INSTPREFIXES = 1099, StringArray, Array;
    SOURCEPACKAGE = 1106, Int32, Scalar;
    PROVIDEFLAGS = 1112, Int32, Array;
    PROVIDEVERSION = 1113, StringArray, Array;
    OBSOLETEFLAGS = 1114, Int32, Array;
    OBSOLETEVERSION = 1115, StringArray, Array;
    DIRINDEXES = 1116, Int32, Array;
    BASENAMES = 1117, StringArray, Array;
    DIRNAMES = 1118, StringArray, Array;
    OPTFLAGS = 1122, String, Scalar;
    DISTURL = 1123, String, Scalar;
    PAYLOADFORMAT = 1124, String, Scalar;
    PAYLOADCOMPRESSOR = 1125, String, Scalar;
    PAYLOADFLAGS = 1126, String, Scalar;
    INSTALLCOLOR = 1127, Int32, Scalar;
    INSTALLTID = 1128, Int32, Scalar;
    REMOVETID = 1129, Int32, Scalar;
    PLATFORM = 1132, String, Scalar;
    FILECOLORS = 1140, Int32, Array;
    FILECLASS = 1141, Int32, Array;
    CLASSDICT = 1142, StringArray, Array;
    FILEDEPENDSX = 1143, Int32, Array;
    FILEDEPENDSN = 1144, Int32, Array;
    DEPENDSDICT = 1145, Int32, Array;
    SOURCEPKGID = 1146, Bin, Scalar;
    PRETRANS = 1151, String, Scalar;
    POSTTRANS = 1152, String, Scalar;
    PRETRANSPROG = 1153, String, Scalar;
    POSTTRANSPROG = 1154, String, Scalar;
    DISTTAG = 1155, String, Scalar;
    ENHANCESNAME = 1159, StringArray, Array;
    ENHANCESVERSION = 1160, StringArray, Array;
    ENHANCESFLAGS = 1161, Int32, Array;
    DBINSTANCE = 1195, Int32, Scalar;
    FILENAMES = 5000, StringArray, Derived;
    LONGFILESIZES = 5008, Int64, Array;
    LONGSIZE = 5009, Int64, Scalar;
    FILECAPS = 5010, StringArray, Array;
    FILEDIGESTALGO = 5011, Int32, Scalar;
    BUGURL = 5012, String, Scalar;
    EVR = 5013, String, Derived;
    NVR = 5014, String, Derived;
    NEVR = 5015, String, Derived;
    NEVRA = 5016, String, Derived;
    HEADERCOLOR = 5017, Int32, Scalar;
    EPOCHNUM = 5019, Int32, Derived;
    ORDERNAME = 5035, StringArray, Array;
    ORDERVERSION = 5036, StringArray, Array;
    ORDERFLAGS = 5037, Int32, Array;
}

impl Tag {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Region roots mark an immutable, previously serialized section
    pub fn is_region(self) -> bool {
        (Tag::HEADER_IMAGE.0..Tag::HEADER_REGIONS.0).contains(&self.0)
    }

    pub fn info(self) -> Option<&'static Info> {
        TABLE
            .binary_search_by_key(&self, |info| info.tag)
            .ok()
            .map(|index| &TABLE[index])
    }

    pub fn name(self) -> Option<&'static str> {
        self.info().map(|info| info.name)
    }

    /// Case insensitive lookup by table name, or a plain number
    pub fn from_name(name: &str) -> Option<Tag> {
        TABLE
            .iter()
            .find(|info| info.name.eq_ignore_ascii_case(name))
            .map(|info| info.tag)
            .or_else(|| name.parse().ok().map(Tag))
    }

    pub fn all() -> impl Iterator<Item = &'static Info> {
        TABLE.iter()
    }
}
