// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::cmp::Ordering;

use header::{Header, Tag, Value};
use log::trace;

use crate::{evr::vercmp, Evr, SenseFlags};

/// Kind of relation a dependency set describes, each stored under its own
/// `(name, version, flags)` tag triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Family {
    Provides,
    Requires,
    Conflicts,
    Obsoletes,
    Order,
    Trigger,
    Enhances,
}

impl Family {
    /// Name, version and flags tags
    pub fn tags(self) -> (Tag, Tag, Tag) {
        match self {
            Family::Provides => (Tag::PROVIDENAME, Tag::PROVIDEVERSION, Tag::PROVIDEFLAGS),
            Family::Requires => (Tag::REQUIRENAME, Tag::REQUIREVERSION, Tag::REQUIREFLAGS),
            Family::Conflicts => (Tag::CONFLICTNAME, Tag::CONFLICTVERSION, Tag::CONFLICTFLAGS),
            Family::Obsoletes => (Tag::OBSOLETENAME, Tag::OBSOLETEVERSION, Tag::OBSOLETEFLAGS),
            Family::Order => (Tag::ORDERNAME, Tag::ORDERVERSION, Tag::ORDERFLAGS),
            Family::Trigger => (Tag::TRIGGERNAME, Tag::TRIGGERVERSION, Tag::TRIGGERFLAGS),
            Family::Enhances => (Tag::ENHANCESNAME, Tag::ENHANCESVERSION, Tag::ENHANCESFLAGS),
        }
    }

    /// Family whose name tag is `tag`
    pub fn from_tag(tag: Tag) -> Option<Self> {
        use strum::IntoEnumIterator;

        Self::iter().find(|family| family.tags().0 == tag)
    }

    /// Single letter prefix used when formatting a dependency
    fn initial(self) -> char {
        match self {
            Family::Provides => 'P',
            Family::Requires => 'R',
            Family::Conflicts => 'C',
            Family::Obsoletes | Family::Order => 'O',
            Family::Trigger => 'T',
            Family::Enhances => 'E',
        }
    }
}

/// One dependency borrowed from a [`DepSet`].
///
/// `evr` and `flags` are `None` when the set carries no version or flags
/// data at all, which makes the dependency match any version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency<'a> {
    pub name: &'a str,
    pub evr: Option<&'a str>,
    pub flags: Option<SenseFlags>,
    /// Do not let a lone epoch on the other side of a comparison win
    pub nopromote: bool,
    /// Architecture class bits, `0` when uncolored
    pub color: u32,
}

impl Dependency<'_> {
    /// Whether the version ranges of `self` and `other` intersect.
    ///
    /// Differently named dependencies never overlap, while unversioned
    /// ones overlap with everything of the same name. When only `self`
    /// carries a non zero epoch it decides the comparison unless `other`
    /// has `nopromote` set.
    pub fn overlaps(&self, other: &Dependency<'_>) -> bool {
        if self.name != other.name {
            return false;
        }

        let (Some(a_evr), Some(a_flags), Some(b_evr), Some(b_flags)) = (self.evr, self.flags, other.evr, other.flags)
        else {
            return true;
        };
        if !(a_flags.is_versioned() && b_flags.is_versioned()) || a_evr.is_empty() || b_evr.is_empty() {
            return true;
        }

        let (a, b) = (Evr::parse(a_evr), Evr::parse(b_evr));

        let mut sense = match (a.epoch, b.epoch) {
            (Some(a_epoch), Some(b_epoch)) => vercmp(a_epoch, b_epoch),
            (Some(_), None) if a.has_positive_epoch() => {
                if other.nopromote {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            }
            (None, Some(_)) if b.has_positive_epoch() => Ordering::Less,
            _ => Ordering::Equal,
        };

        if sense == Ordering::Equal {
            sense = vercmp(a.version, b.version);

            if sense == Ordering::Equal {
                let a_release = a.release.filter(|r| !r.is_empty());
                let b_release = b.release.filter(|r| !r.is_empty());

                match (a_release, b_release) {
                    (Some(a_release), Some(b_release)) => sense = vercmp(a_release, b_release),
                    // A release on one side only is ignored by an equality
                    (Some(_), None) if b_flags.contains(SenseFlags::EQUAL) => return true,
                    (None, Some(_)) if a_flags.contains(SenseFlags::EQUAL) => return true,
                    _ => {}
                }
            }
        }

        match sense {
            Ordering::Less => a_flags.contains(SenseFlags::GREATER) || b_flags.contains(SenseFlags::LESS),
            Ordering::Greater => a_flags.contains(SenseFlags::LESS) || b_flags.contains(SenseFlags::GREATER),
            Ordering::Equal => [SenseFlags::EQUAL, SenseFlags::LESS, SenseFlags::GREATER]
                .into_iter()
                .any(|flag| a_flags.contains(flag) && b_flags.contains(flag)),
        }
    }
}

/// An ordered list of dependencies of one [`Family`] with a cursor.
///
/// Sets built by [`DepSet::merge`] are kept sorted by name, version and
/// flags, which [`DepSet::find`] and [`DepSet::search`] rely on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepSet {
    family: Family,
    names: Vec<String>,
    evrs: Option<Vec<String>>,
    flags: Option<Vec<SenseFlags>>,
    colors: Option<Vec<u32>>,
    cursor: Option<usize>,
    nopromote: bool,
    instance: u32,
}

impl DepSet {
    /// Dependencies of `family` stored in a header. `None` when the header
    /// has no names for it.
    pub fn new(header: &Header, family: Family) -> Option<Self> {
        let (name_tag, version_tag, flags_tag) = family.tags();

        let names = match header.get_raw(name_tag)? {
            Value::StringArray(names) if !names.is_empty() => names,
            _ => return None,
        };
        let evrs = match header.get_raw(version_tag) {
            Some(Value::StringArray(evrs)) => Some(evrs),
            _ => None,
        };
        let mut flags = match header.get_raw(flags_tag) {
            Some(Value::Int32(flags)) => Some(flags.into_iter().map(SenseFlags::from_bits_retain).collect::<Vec<_>>()),
            _ => None,
        };

        // Requirements on rpmlib features are flagged regardless of how
        // they were built
        if let (Family::Requires, Some(flags)) = (family, flags.as_mut()) {
            for (name, flags) in names.iter().zip(flags.iter_mut()) {
                if name.starts_with("rpmlib(") {
                    *flags |= SenseFlags::RPMLIB;
                }
            }
        }

        trace!("Loaded {} {family}", names.len());

        Some(Self {
            family,
            names,
            evrs,
            flags,
            colors: None,
            cursor: None,
            nopromote: crate::DEFAULT_NOPROMOTE,
            instance: header.instance(),
        })
    }

    /// A set holding a single dependency, with the cursor on it
    pub fn single(family: Family, name: &str, evr: &str, flags: SenseFlags) -> Self {
        Self {
            family,
            names: vec![name.to_owned()],
            evrs: Some(vec![evr.to_owned()]),
            flags: Some(vec![flags]),
            colors: None,
            cursor: Some(0),
            nopromote: crate::DEFAULT_NOPROMOTE,
            instance: 0,
        }
    }

    /// The package a header describes as a single dependency on its own
    /// name and `[E:]V-R`
    pub fn this(header: &Header, family: Family, flags: SenseFlags) -> Option<Self> {
        let name = header.get_string(Tag::NAME)?;
        let evr = header.get_as_string(Tag::EVR).unwrap_or_default();

        let mut ds = Self::single(family, &name, &evr, flags);
        ds.instance = header.instance();
        Some(ds)
    }

    /// The dependency under the cursor as a set of its own, color and
    /// instance included
    pub fn current(&self) -> Option<Self> {
        let dep = self.dependency(self.cursor?)?;

        let mut ds = Self::single(
            self.family,
            dep.name,
            dep.evr.unwrap_or_default(),
            dep.flags.unwrap_or(SenseFlags::ANY),
        );
        ds.instance = self.instance;
        ds.nopromote = self.nopromote;
        let color = self.color();
        if color != 0 {
            ds.set_color(color);
        }
        Some(ds)
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn count(&self) -> usize {
        self.names.len()
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    pub fn ix(&self) -> Option<usize> {
        self.cursor
    }

    /// Move the cursor, returning where it was
    pub fn set_ix(&mut self, ix: Option<usize>) -> Option<usize> {
        std::mem::replace(&mut self.cursor, ix)
    }

    /// Reset the cursor to before the first dependency
    pub fn init(&mut self) -> &mut Self {
        self.cursor = None;
        self
    }

    /// Advance the cursor. Past the end it resets and `None` is returned,
    /// so the next call starts over at the first dependency.
    pub fn next_index(&mut self) -> Option<usize> {
        let next = self.cursor.map_or(0, |i| i + 1);
        self.cursor = (next < self.count()).then_some(next);
        self.cursor
    }

    /// Dependency at `index`
    pub fn dependency(&self, index: usize) -> Option<Dependency<'_>> {
        Some(Dependency {
            name: self.names.get(index)?,
            evr: self.evrs.as_ref().map(|evrs| evrs.get(index).map_or("", String::as_str)),
            flags: self
                .flags
                .as_ref()
                .map(|flags| flags.get(index).copied().unwrap_or(SenseFlags::ANY)),
            nopromote: self.nopromote,
            color: self
                .colors
                .as_ref()
                .and_then(|colors| colors.get(index).copied())
                .unwrap_or(0),
        })
    }

    /// Dependency under the cursor
    pub fn current_dependency(&self) -> Option<Dependency<'_>> {
        self.dependency(self.cursor?)
    }

    pub fn iter(&self) -> impl Iterator<Item = Dependency<'_>> + '_ {
        (0..self.count()).filter_map(|index| self.dependency(index))
    }

    pub fn n(&self) -> Option<&str> {
        self.current_dependency().map(|dep| dep.name)
    }

    pub fn evr(&self) -> Option<&str> {
        self.current_dependency().and_then(|dep| dep.evr)
    }

    pub fn flags(&self) -> SenseFlags {
        self.current_dependency()
            .and_then(|dep| dep.flags)
            .unwrap_or(SenseFlags::ANY)
    }

    /// Color of the dependency under the cursor, `0` when uncolored
    pub fn color(&self) -> u32 {
        self.current_dependency().map_or(0, |dep| dep.color)
    }

    /// Color the dependency under the cursor, returning its previous color
    pub fn set_color(&mut self, color: u32) -> u32 {
        let Some(i) = self.cursor.filter(|&i| i < self.count()) else {
            return 0;
        };
        let count = self.count();
        let colors = self.colors.get_or_insert_with(|| vec![0; count]);
        colors.resize(count, 0);

        std::mem::replace(&mut colors[i], color)
    }

    pub fn nopromote(&self) -> bool {
        self.nopromote
    }

    /// Returns the previous setting
    pub fn set_nopromote(&mut self, nopromote: bool) -> bool {
        std::mem::replace(&mut self.nopromote, nopromote)
    }

    /// Dependency under the cursor formatted as `<initial> <name> [<op> <evr>]`,
    /// for example `R foo >= 1.0`
    pub fn dnevr(&self) -> Option<String> {
        let dep = self.current_dependency()?;
        let flags = dep.flags.unwrap_or(SenseFlags::ANY);

        let mut out = format!("{} {}", self.family.initial(), dep.name);
        if flags.is_versioned() {
            out.push(' ');
            out.push_str(&flags.operator());
        }
        if let Some(evr) = dep.evr.filter(|evr| !evr.is_empty()) {
            out.push(' ');
            out.push_str(evr);
        }
        Some(out)
    }

    /// Binary search a sorted set for `dep` by name, then version and
    /// flags where both sides have them. `Err` holds the insertion point.
    pub fn find(&self, dep: &Dependency<'_>) -> Result<usize, usize> {
        let (mut l, mut u) = (0, self.count());

        while l < u {
            let i = (l + u) / 2;
            let Some(other) = self.dependency(i) else {
                break;
            };

            let ordering = dep
                .name
                .cmp(other.name)
                .then_with(|| match (dep.evr, other.evr) {
                    (Some(a), Some(b)) => a.cmp(b),
                    _ => Ordering::Equal,
                })
                .then_with(|| match (dep.flags, other.flags) {
                    (Some(a), Some(b)) => a.bits().cmp(&b.bits()),
                    _ => Ordering::Equal,
                });

            match ordering {
                Ordering::Less => u = i,
                Ordering::Greater => l = i + 1,
                Ordering::Equal => return Ok(i),
            }
        }

        Err(l)
    }

    /// Merge every dependency of `other` missing from the sorted set in
    /// `target`, creating it from the first dependency of `other` when
    /// empty. Merging the same set twice changes nothing.
    pub fn merge(target: &mut Option<DepSet>, other: &DepSet) {
        let Some(first) = other.dependency(0) else {
            return;
        };
        let ds = target.get_or_insert_with(|| {
            let mut ds = DepSet::single(
                other.family,
                first.name,
                first.evr.unwrap_or_default(),
                first.flags.unwrap_or(SenseFlags::ANY),
            );
            ds.instance = other.instance;
            ds
        });

        for dep in other.iter() {
            if let Err(at) = ds.find(&dep) {
                ds.insert(at, &dep);
            }
        }

        ds.cursor = None;
    }

    fn insert(&mut self, at: usize, dep: &Dependency<'_>) {
        let count = self.count();

        self.names.insert(at, dep.name.to_owned());
        self.evrs
            .get_or_insert_with(|| vec![String::new(); count])
            .insert(at, dep.evr.unwrap_or_default().to_owned());
        self.flags
            .get_or_insert_with(|| vec![SenseFlags::ANY; count])
            .insert(at, dep.flags.unwrap_or(SenseFlags::ANY));
        if dep.color != 0 || self.colors.is_some() {
            self.colors
                .get_or_insert_with(|| vec![0; count])
                .insert(at, dep.color);
        }
    }

    /// Find a dependency of this sorted set overlapping the one under the
    /// cursor of `other`. On a hit the cursor moves to it, otherwise it is
    /// left alone.
    pub fn search(&mut self, other: &DepSet) -> Option<usize> {
        let dep = other.current_dependency()?;

        let l = self.names.partition_point(|name| name.as_str() < dep.name);
        let u = l + self.names[l..].iter().take_while(|name| *name == dep.name).count();

        let found = (l..u).find(|&i| self.dependency(i).is_some_and(|candidate| dep.overlaps(&candidate)))?;
        self.cursor = Some(found);
        Some(found)
    }

    /// Whether the dependencies under the cursors of both sets overlap
    pub fn compare(a: &DepSet, b: &DepSet) -> bool {
        match (a.current_dependency(), b.current_dependency()) {
            (Some(a), Some(b)) => a.overlaps(&b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn dep(name: &str, evr: &str, flags: SenseFlags) -> DepSet {
        DepSet::single(Family::Requires, name, evr, flags)
    }

    fn overlaps(a: &DepSet, b: &DepSet) -> bool {
        DepSet::compare(a, b)
    }

    const EQ: SenseFlags = SenseFlags::EQUAL;
    const GE: SenseFlags = SenseFlags::GREATER.union(SenseFlags::EQUAL);
    const LT: SenseFlags = SenseFlags::LESS;

    #[test]
    fn ranges() {
        assert!(overlaps(&dep("foo", "1.0", EQ), &dep("foo", "1.0", GE)));
        assert!(!overlaps(&dep("foo", "1.0", EQ), &dep("foo", "1.1", GE)));
        assert!(overlaps(&dep("foo", "1.0", LT), &dep("foo", "0.5", GE)));
        assert!(!overlaps(&dep("foo", "1.0", LT), &dep("foo", "1.0", GE)));
        assert!(!overlaps(&dep("foo", "1.0", EQ), &dep("bar", "1.0", EQ)));
    }

    #[test]
    fn unversioned() {
        assert!(overlaps(&dep("foo", "", SenseFlags::ANY), &dep("foo", "1.0", EQ)));
        assert!(overlaps(&dep("foo", "1.0", SenseFlags::ANY), &dep("foo", "2.0", EQ)));
        assert!(overlaps(&dep("foo", "", EQ), &dep("foo", "2.0", EQ)));
    }

    #[test]
    fn releases() {
        // Release on one side only is ignored when equality is allowed
        assert!(overlaps(&dep("foo", "1.0-1", EQ), &dep("foo", "1.0", EQ)));
        assert!(overlaps(&dep("foo", "1.0-1", EQ), &dep("foo", "1.0", GE)));
        assert!(!overlaps(&dep("foo", "1.0-1", EQ), &dep("foo", "1.0-2", EQ)));
        assert!(overlaps(&dep("foo", "1.0-1", EQ), &dep("foo", "1.0-0", SenseFlags::GREATER)));
    }

    #[test]
    fn epoch_promotion() {
        let provides = DepSet::single(Family::Provides, "bar", "2:1.0-1", EQ);
        let mut requires = dep("bar", "1.5-1", GE);

        assert!(requires.nopromote());
        assert!(overlaps(&provides, &requires));

        requires.set_nopromote(false);
        assert!(!overlaps(&provides, &requires));

        // Epoch only on the requirement side always counts
        assert!(!overlaps(&dep("bar", "1.5-1", EQ), &dep("bar", "1:1.0", GE)));
        // Zero epochs never promote
        assert!(!overlaps(&dep("bar", "0:1.0", EQ), &dep("bar", "1.5", GE)));
    }

    #[test]
    fn cursor() {
        let mut set = None;
        DepSet::merge(&mut set, &dep("b", "1", EQ));
        DepSet::merge(&mut set, &dep("a", "1", EQ));
        let mut set = set.unwrap();

        assert_eq!(set.ix(), None);
        assert_eq!(set.next_index(), Some(0));
        assert_eq!(set.n(), Some("a"));
        assert_eq!(set.next_index(), Some(1));
        assert_eq!(set.n(), Some("b"));
        assert_eq!(set.next_index(), None);
        assert_eq!(set.n(), None);
        assert_eq!(set.next_index(), Some(0));

        assert_eq!(set.set_ix(Some(1)), Some(0));
        assert_eq!(set.init().ix(), None);
    }

    #[test]
    fn formatting() {
        assert_eq!(dep("foo", "1.0", GE).dnevr().as_deref(), Some("R foo >= 1.0"));
        assert_eq!(dep("foo", "", SenseFlags::ANY).dnevr().as_deref(), Some("R foo"));
        assert_eq!(
            DepSet::single(Family::Conflicts, "foo", "2", LT).dnevr().as_deref(),
            Some("C foo < 2")
        );

        let mut set = dep("foo", "1", EQ);
        set.init();
        assert_eq!(set.dnevr(), None);
    }

    #[test]
    fn merge_sorts_and_dedups() {
        let mut set = None;
        for (name, evr) in [("c", "1"), ("a", "2"), ("b", "1"), ("a", "1"), ("c", "1")] {
            DepSet::merge(&mut set, &DepSet::single(Family::Provides, name, evr, EQ));
        }
        let set = set.unwrap();

        assert_eq!(set.family(), Family::Provides);
        assert_eq!(
            set.iter().map(|dep| (dep.name, dep.evr.unwrap())).collect::<Vec<_>>(),
            vec![("a", "1"), ("a", "2"), ("b", "1"), ("c", "1")]
        );

        let mut again = Some(set.clone());
        DepSet::merge(&mut again, &set);
        assert_eq!(again.as_ref(), Some(&set));

        let probe = DepSet::single(Family::Provides, "b", "1", EQ);
        assert_eq!(set.find(&probe.current_dependency().unwrap()), Ok(2));
        let probe = DepSet::single(Family::Provides, "bb", "1", EQ);
        assert_eq!(set.find(&probe.current_dependency().unwrap()), Err(3));
    }

    #[test]
    fn search() {
        let mut set = None;
        for evr in ["1.0", "2.0", "3.0"] {
            DepSet::merge(&mut set, &DepSet::single(Family::Provides, "foo", evr, EQ));
        }
        DepSet::merge(&mut set, &DepSet::single(Family::Provides, "bar", "1", EQ));
        let mut set = set.unwrap();
        set.set_ix(Some(0));

        assert_eq!(set.search(&dep("foo", "2.5", GE)), Some(3));
        assert_eq!(set.n(), Some("foo"));
        assert_eq!(set.evr(), Some("3.0"));

        assert_eq!(set.search(&dep("foo", "4", GE)), None);
        assert_eq!(set.ix(), Some(3));
        assert_eq!(set.search(&dep("baz", "", SenseFlags::ANY)), None);
    }

    #[test]
    fn colors() {
        let mut set = dep("foo", "1", EQ);
        assert_eq!(set.color(), 0);
        assert_eq!(set.set_color(2), 0);
        assert_eq!(set.set_color(1), 2);

        let current = set.current().unwrap();
        assert_eq!(current.color(), 1);
        assert_eq!(current.dnevr(), set.dnevr());
    }

    #[test]
    fn from_header() {
        let mut header = Header::new();
        header.put_string(Tag::NAME, "foo").unwrap();
        header.put_string(Tag::VERSION, "1.0").unwrap();
        header.put_string(Tag::RELEASE, "1").unwrap();
        header.put_u32(Tag::EPOCH, &[3]).unwrap();
        header
            .put_string_array(Tag::REQUIRENAME, &["rpmlib(FileDigests)", "bash"])
            .unwrap();
        header.put_string_array(Tag::REQUIREVERSION, &["4.6.0-1", ""]).unwrap();
        header.put_u32(Tag::REQUIREFLAGS, &[GE.bits(), 0]).unwrap();
        header.set_instance(7);

        let mut requires = DepSet::new(&header, Family::Requires).unwrap();
        assert_eq!(requires.count(), 2);
        assert_eq!(requires.instance(), 7);
        requires.next_index();
        assert_eq!(requires.flags(), GE | SenseFlags::RPMLIB);
        requires.next_index();
        assert_eq!(requires.flags(), SenseFlags::ANY);
        assert_eq!(requires.dnevr().as_deref(), Some("R bash"));

        assert!(DepSet::new(&header, Family::Conflicts).is_none());

        let this = DepSet::this(&header, Family::Provides, EQ).unwrap();
        assert_eq!(this.dnevr().as_deref(), Some("P foo = 3:1.0-1"));
        assert_eq!(this.instance(), 7);
    }

    #[test]
    fn families() {
        assert_eq!(Family::from_tag(Tag::OBSOLETENAME), Some(Family::Obsoletes));
        assert_eq!(Family::from_tag(Tag::NAME), None);
        assert_eq!("requires".parse::<Family>().ok(), Some(Family::Requires));
        assert_eq!(Family::Enhances.to_string(), "enhances");
    }
}
