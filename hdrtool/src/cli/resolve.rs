// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::PathBuf;

use avail::{FileSet, Index};
use clap::{arg, ArgMatches, Command};
use depset::{DepSet, Family, SenseFlags};
use log::debug;
use thiserror::Error;

use super::{describe, magic, paths, read_headers, ReadError};
use crate::settings::Settings;

pub fn command() -> Command {
    Command::new("resolve")
        .about("Find packages satisfying a dependency")
        .long_about("Index the given header files and list the packages which own or provide the dependency")
        .arg(arg!(-d --dep <DEP> "dependency as `name [op evr]`, ie. `bash >= 5.0`").required(true))
        .arg(arg!(<PATH> ... "files to search").value_parser(clap::value_parser!(PathBuf)))
}

pub fn handle(args: &ArgMatches, settings: &Settings) -> Result<(), Error> {
    for key in resolve(args, settings)? {
        println!("{key}");
    }

    Ok(())
}

/// Keys of the packages satisfying `--dep`, an error when there are none
fn resolve(args: &ArgMatches, settings: &Settings) -> Result<Vec<String>, Error> {
    let dep = args.get_one::<String>("dep").map(String::as_str).unwrap_or_default();
    let mut requirement = parse_dep(dep)?;
    requirement.set_nopromote(settings.nopromote());

    let mut index = Index::new();
    for path in paths(args) {
        for header in read_headers(&path, magic(args))? {
            let provides = DepSet::new(&header, Family::Provides);
            let files = FileSet::new(&header);

            index.add(None, describe(&header, &path), provides, files, settings.color());
        }
    }
    index.make_index();
    debug!("Indexed {} packages", index.len());

    let found = index.all_satisfies_depend(&requirement);
    if found.is_empty() {
        return Err(Error::Unsatisfied(requirement.dnevr().unwrap_or_default()));
    }

    Ok(found.into_iter().map(|found| found.key.clone()).collect())
}

/// Parse `name`, or `name op evr`
fn parse_dep(dep: &str) -> Result<DepSet, Error> {
    let parts = dep.split_whitespace().collect::<Vec<_>>();

    match parts.as_slice() {
        [name] => Ok(DepSet::single(Family::Requires, name, "", SenseFlags::ANY)),
        [name, op, evr] => {
            let flags = SenseFlags::from_operator(op).ok_or_else(|| Error::Operator((*op).to_owned()))?;
            Ok(DepSet::single(Family::Requires, name, evr, flags))
        }
        _ => Err(Error::Dependency(dep.to_owned())),
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("read headers")]
    Read(#[from] ReadError),
    #[error("malformed dependency {0:?}")]
    Dependency(String),
    #[error("unknown comparison operator {0:?}")]
    Operator(String),
    #[error("nothing provides {0}")]
    Unsatisfied(String),
}
