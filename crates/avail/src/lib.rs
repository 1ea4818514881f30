// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Index of available packages
//!
//! Answers which packages in a pool provide a capability or own a file.
//! Directories, the files within them and provide names are all kept in
//! vectors sorted by length then bytes, so lookups are binary searches.

use std::{cmp::Ordering, ops::Range};

use depset::DepSet;
use itertools::Itertools;
use log::{debug, trace};

pub use self::fileset::{File, FileSet};

mod fileset;

/// A package satisfying a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'a, K> {
    /// Slot the package was added under
    pub pkg: usize,
    pub key: &'a K,
}

#[derive(Debug)]
struct Package<K> {
    key: K,
    provides: Option<DepSet>,
    files: Option<FileSet>,
    tscolor: u32,
}

#[derive(Debug)]
struct FileEntry {
    basename: String,
    pkg: usize,
    color: u32,
}

#[derive(Debug)]
struct Dir {
    name: String,
    files: Vec<FileEntry>,
}

#[derive(Debug)]
struct Provide {
    name: String,
    pkg: usize,
    /// Position in the package's provides
    ix: usize,
}

/// Available packages keyed by a caller supplied `K`
#[derive(Debug)]
pub struct Index<K> {
    packages: Vec<Option<Package<K>>>,
    dirs: Vec<Dir>,
    /// Built by [`Index::make_index`], dropped whenever a package is added
    provides: Option<Vec<Provide>>,
}

impl<K> Default for Index<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Index<K> {
    pub fn new() -> Self {
        Self {
            packages: vec![],
            dirs: vec![],
            provides: None,
        }
    }

    /// Number of package slots, deleted ones included
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Key of the package in slot `pkg`
    pub fn key(&self, pkg: usize) -> Option<&K> {
        self.packages.get(pkg)?.as_ref().map(|package| &package.key)
    }

    /// Add a package, replacing the one in slot `pkg` when given an
    /// existing slot. Returns the slot used.
    ///
    /// The provides index must be rebuilt with [`Index::make_index`]
    /// before provides of the new package can be found.
    pub fn add(
        &mut self,
        pkg: Option<usize>,
        key: K,
        provides: Option<DepSet>,
        files: Option<FileSet>,
        tscolor: u32,
    ) -> usize {
        let pkg = match pkg {
            Some(pkg) if pkg < self.packages.len() => {
                self.del(pkg);
                pkg
            }
            _ => {
                self.packages.push(None);
                self.packages.len() - 1
            }
        };

        if let Some(files) = &files {
            self.add_files(pkg, files);
        }

        self.packages[pkg] = Some(Package {
            key,
            provides,
            files,
            tscolor,
        });
        self.provides = None;

        pkg
    }

    fn add_files(&mut self, pkg: usize, files: &FileSet) {
        // Only directories present before this call are sorted
        let sorted = self.dirs.len();

        let mut mapping = Vec::with_capacity(files.dirs().len());
        for name in files.dirs() {
            let index = match self.dirs[..sorted].binary_search_by(|dir| by_length(&dir.name, name)) {
                Ok(index) => index,
                Err(_) => {
                    let added = self.dirs[sorted..].iter().position(|dir| dir.name == *name);
                    match added {
                        Some(offset) => sorted + offset,
                        None => {
                            self.dirs.push(Dir {
                                name: name.clone(),
                                files: vec![],
                            });
                            self.dirs.len() - 1
                        }
                    }
                }
            };
            mapping.push(index);
        }

        for file in files.files() {
            self.dirs[mapping[file.dir]].files.push(FileEntry {
                basename: file.basename.clone(),
                pkg,
                color: file.color,
            });
        }
        for index in mapping.iter().copied().unique() {
            self.dirs[index]
                .files
                .sort_by(|a, b| by_length(&a.basename, &b.basename));
        }

        if self.dirs.len() != sorted {
            trace!("Added {} directories", self.dirs.len() - sorted);
            self.dirs.sort_by(|a, b| by_length(&a.name, &b.name));
        }
    }

    /// Remove the package in slot `pkg`. The slot stays allocated and can
    /// be reused by [`Index::add`].
    pub fn del(&mut self, pkg: usize) {
        let Some(package) = self.packages.get_mut(pkg).and_then(Option::take) else {
            return;
        };

        if let Some(files) = &package.files {
            for name in files.dirs() {
                let Ok(index) = self.dirs.binary_search_by(|dir| by_length(&dir.name, name)) else {
                    continue;
                };

                let dir = &mut self.dirs[index];
                dir.files.retain(|file| file.pkg != pkg);
                if dir.files.is_empty() {
                    self.dirs.remove(index);
                }
            }
        }

        if let Some(provides) = self.provides.as_mut() {
            provides.retain(|provide| provide.pkg != pkg);
        }

        debug!("Removed package {pkg}");
    }

    /// Rebuild the provides index over every package. Colored provides
    /// sharing no bit with their package's transaction color are left out.
    pub fn make_index(&mut self) {
        let mut provides = vec![];

        for (pkg, package) in self.packages.iter().enumerate() {
            let Some(package) = package else {
                continue;
            };
            let Some(ds) = &package.provides else {
                continue;
            };

            for (ix, dep) in ds.iter().enumerate() {
                if !colors_match(package.tscolor, dep.color) {
                    continue;
                }
                provides.push(Provide {
                    name: dep.name.to_owned(),
                    pkg,
                    ix,
                });
            }
        }

        provides.sort_by(|a, b| by_length(&a.name, &b.name));
        debug!("Indexed {} provides", provides.len());

        self.provides = Some(provides);
    }

    /// Packages owning the absolute path named by the dependency under the
    /// cursor of `requirement`
    pub fn all_file_satisfies_depend(&self, requirement: &DepSet) -> Vec<Match<'_, K>> {
        let Some(path) = requirement.n().filter(|name| name.starts_with('/')) else {
            return vec![];
        };
        let (dirname, basename) = path.split_at(path.rfind('/').map_or(0, |i| i + 1));

        let dirs = range(&self.dirs, dirname, |dir| &dir.name);

        self.dirs[dirs]
            .iter()
            .flat_map(|dir| &dir.files[range(&dir.files, basename, |file| &file.basename)])
            .filter_map(|file| {
                let package = self.packages.get(file.pkg)?.as_ref()?;
                colors_match(package.tscolor, file.color).then_some(Match {
                    pkg: file.pkg,
                    key: &package.key,
                })
            })
            .collect()
    }

    /// Every package satisfying the dependency under the cursor of
    /// `requirement`. Paths are looked up among owned files first, then
    /// among provides.
    pub fn all_satisfies_depend(&self, requirement: &DepSet) -> Vec<Match<'_, K>> {
        let Some(dep) = requirement.current_dependency() else {
            return vec![];
        };

        if dep.name.starts_with('/') {
            let found = self.all_file_satisfies_depend(requirement);
            if !found.is_empty() {
                return found;
            }
        }

        let Some(provides) = &self.provides else {
            return vec![];
        };

        provides[range(provides, dep.name, |provide| &provide.name)]
            .iter()
            .filter_map(|provide| {
                let package = self.packages.get(provide.pkg)?.as_ref()?;
                let candidate = package.provides.as_ref()?.dependency(provide.ix)?;

                candidate.overlaps(&dep).then_some(Match {
                    pkg: provide.pkg,
                    key: &package.key,
                })
            })
            .collect()
    }

    /// First package satisfying the dependency under the cursor of
    /// `requirement`
    pub fn satisfies_depend(&self, requirement: &DepSet) -> Option<Match<'_, K>> {
        self.all_satisfies_depend(requirement).into_iter().next()
    }
}

fn colors_match(tscolor: u32, color: u32) -> bool {
    tscolor == 0 || color == 0 || tscolor & color != 0
}

/// Shorter names first, then bytewise
fn by_length(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Span of `items` whose name equals `needle`
fn range<T>(items: &[T], needle: &str, name: impl Fn(&T) -> &str) -> Range<usize> {
    let start = items.partition_point(|item| by_length(name(item), needle) == Ordering::Less);
    let len = items[start..].partition_point(|item| by_length(name(item), needle) == Ordering::Equal);
    start..start + len
}
