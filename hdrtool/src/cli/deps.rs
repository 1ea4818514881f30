// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::PathBuf;

use clap::{arg, ArgAction, ArgMatches, Command};
use depset::{rpmlib, DepSet, Family};
use header::Header;
use strum::IntoEnumIterator;
use thiserror::Error;

use super::{describe, magic, paths, read_headers, ReadError};
use crate::settings::Settings;

pub fn command() -> Command {
    Command::new("deps")
        .about("List dependencies of header files")
        .arg(arg!(--rpmlib "List the rpmlib() features provided by this tool").action(ArgAction::SetTrue))
        .arg(arg!([PATH] ... "files to list").value_parser(clap::value_parser!(PathBuf)))
}

pub fn handle(args: &ArgMatches, settings: &Settings) -> Result<(), Error> {
    if args.get_flag("rpmlib") {
        for feature in rpmlib::FEATURES {
            println!("{} {} {}", feature.name, feature.flags.operator(), feature.evr);
            println!("    {}", feature.description);
        }
    }

    for path in paths(args) {
        for header in read_headers(&path, magic(args))? {
            println!("{path:?} = {}", describe(&header, &path));

            for dnevr in dependencies(&header, settings) {
                println!("    {dnevr}");
            }
        }
    }

    Ok(())
}

/// DNEVR of every dependency of `header`, family by family
fn dependencies(header: &Header, settings: &Settings) -> Vec<String> {
    Family::iter()
        .filter_map(|family| DepSet::new(header, family))
        .flat_map(|mut ds| {
            ds.set_nopromote(settings.nopromote());

            let mut lines = vec![];
            while ds.next_index().is_some() {
                lines.extend(ds.dnevr());
            }
            lines
        })
        .collect()
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("read headers")]
    Read(#[from] ReadError),
}
