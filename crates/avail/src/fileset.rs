// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use header::{Header, Tag, Value};
use log::debug;

/// A single file of a [`FileSet`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub basename: String,
    /// Index into [`FileSet::dirs`]
    pub dir: usize,
    pub color: u32,
}

/// The file manifest of a package as directory and basename pairs.
/// Directory names keep their trailing `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    dirs: Vec<String>,
    files: Vec<File>,
}

impl FileSet {
    /// Manifest of the package described by `header`. `None` when it
    /// lists no files or the compressed file list is inconsistent.
    pub fn new(header: &Header) -> Option<Self> {
        let colors = match header.get_raw(Tag::FILECOLORS) {
            Some(Value::Int32(colors)) => colors,
            _ => vec![],
        };

        let Some(Value::StringArray(basenames)) = header.get_raw(Tag::BASENAMES) else {
            let Some(Value::StringArray(paths)) = header.get_raw(Tag::OLDFILENAMES) else {
                return None;
            };
            let mut set = Self::from_paths(&paths);
            for (file, color) in set.files.iter_mut().zip(colors) {
                file.color = color;
            }
            return (!set.is_empty()).then_some(set);
        };

        let Some(Value::StringArray(dirs)) = header.get_raw(Tag::DIRNAMES) else {
            return None;
        };
        let Some(Value::Int32(indexes)) = header.get_raw(Tag::DIRINDEXES) else {
            return None;
        };

        if indexes.len() != basenames.len() || indexes.iter().any(|&i| i as usize >= dirs.len()) {
            debug!("Inconsistent file list: {} basenames, {} dirs", basenames.len(), dirs.len());
            return None;
        }

        let files = basenames
            .into_iter()
            .zip(indexes)
            .enumerate()
            .map(|(i, (basename, dir))| File {
                basename,
                dir: dir as usize,
                color: colors.get(i).copied().unwrap_or(0),
            })
            .collect::<Vec<_>>();

        (!files.is_empty()).then_some(Self { dirs, files })
    }

    /// Split absolute paths at their last `/`, sharing directories
    pub fn from_paths<S: AsRef<str>>(paths: &[S]) -> Self {
        let mut set = Self::default();

        for path in paths {
            let path = path.as_ref();
            let split = path.rfind('/').map_or(0, |i| i + 1);
            let (dir, basename) = path.split_at(split);

            let dir = match set.dirs.iter().rposition(|d| d == dir) {
                Some(index) => index,
                None => {
                    set.dirs.push(dir.to_owned());
                    set.dirs.len() - 1
                }
            };
            set.files.push(File {
                basename: basename.to_owned(),
                dir,
                color: 0,
            });
        }

        set
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn dirs(&self) -> &[String] {
        &self.dirs
    }

    pub fn files(&self) -> &[File] {
        &self.files
    }

    /// Full paths in manifest order
    pub fn paths(&self) -> impl Iterator<Item = String> + '_ {
        self.files
            .iter()
            .map(|file| format!("{}{}", self.dirs[file.dir], file.basename))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn compressed() {
        let mut header = Header::new();
        header
            .put_string_array(Tag::DIRNAMES, &["/usr/bin/", "/etc/"])
            .unwrap();
        header
            .put_string_array(Tag::BASENAMES, &["foo", "foo.conf", "bar"])
            .unwrap();
        header.put_u32(Tag::DIRINDEXES, &[0, 1, 0]).unwrap();
        header.put_u32(Tag::FILECOLORS, &[2, 0, 1]).unwrap();

        let set = FileSet::new(&header).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(
            set.paths().collect::<Vec<_>>(),
            vec!["/usr/bin/foo", "/etc/foo.conf", "/usr/bin/bar"]
        );
        assert_eq!(set.files()[0].color, 2);
        assert_eq!(set.files()[2].color, 1);
    }

    #[test]
    fn legacy() {
        let mut header = Header::new();
        header
            .put_string_array(Tag::OLDFILENAMES, &["/usr/bin/foo", "/usr/bin/bar", "/etc/foo.conf"])
            .unwrap();

        let set = FileSet::new(&header).unwrap();
        assert_eq!(set.dirs(), ["/usr/bin/", "/etc/"]);
        assert_eq!(set.files()[1].basename, "bar");
        assert_eq!(set.files()[2].dir, 1);
    }

    #[test]
    fn inconsistent() {
        let mut header = Header::new();
        assert!(FileSet::new(&header).is_none());

        header.put_string_array(Tag::DIRNAMES, &["/usr/bin/"]).unwrap();
        header.put_string_array(Tag::BASENAMES, &["foo"]).unwrap();
        header.put_u32(Tag::DIRINDEXES, &[1]).unwrap();
        assert!(FileSet::new(&header).is_none());
    }
}
