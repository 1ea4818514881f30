// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::{
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use clap::{Arg, ArgAction, ArgMatches, Command};
use fs_err::File;
use header::{Header, Magic, Tag};
use log::debug;
use thiserror::Error;

use crate::settings::Settings;

mod deps;
mod inspect;
mod resolve;
mod vercmp;
mod version;

/// Generate the CLI command structure
fn command() -> Command {
    Command::new("hdrtool")
        .about("Inspect package metadata headers")
        .arg(
            Arg::new("version")
                .short('V')
                .long("version")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .help("Log debug output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("magic")
                .long("magic")
                .global(true)
                .help("Headers are preceded by the 8 byte magic")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config-dir")
                .long("config-dir")
                .global(true)
                .help("Read settings from this directory only")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg_required_else_help(true)
        .subcommand(deps::command())
        .subcommand(inspect::command())
        .subcommand(resolve::command())
        .subcommand(vercmp::command())
        .subcommand(version::command())
}

/// Process all CLI arguments
pub fn process() -> Result<(), Error> {
    let matches = command().get_matches();

    let filter = if matches.get_flag("verbose") { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    if matches.get_flag("version") {
        version::print();
        return Ok(());
    }

    let settings = Settings::load(matches.get_one::<PathBuf>("config-dir").map(PathBuf::as_path));

    match matches.subcommand() {
        Some(("deps", args)) => deps::handle(args, &settings)?,
        Some(("inspect", args)) => inspect::handle(args, &settings)?,
        Some(("resolve", args)) => resolve::handle(args, &settings)?,
        Some(("vercmp", args)) => vercmp::handle(args),
        Some(("version", _)) => version::print(),
        _ => unreachable!(),
    }

    Ok(())
}

/// `PATH` arguments of a subcommand
fn paths(args: &ArgMatches) -> Vec<PathBuf> {
    args.get_many::<PathBuf>("PATH")
        .into_iter()
        .flatten()
        .cloned()
        .collect()
}

fn magic(args: &ArgMatches) -> Magic {
    if args.get_flag("magic") {
        Magic::Present
    } else {
        Magic::Absent
    }
}

/// Every header stored back to back in the file at `path`
fn read_headers(path: &Path, magic: Magic) -> Result<Vec<Header>, ReadError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut headers = vec![];

    while !reader.fill_buf()?.is_empty() {
        let header = Header::read(&mut reader, magic).map_err(|error| ReadError::Header(path.to_owned(), error))?;
        headers.push(header);
    }

    debug!("Read {} headers from {path:?}", headers.len());

    Ok(headers)
}

/// Name the header by `NEVRA`, falling back to its file
fn describe(header: &Header, path: &Path) -> String {
    header
        .get_string(Tag::NEVRA)
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("read file")]
    Io(#[from] io::Error),
    #[error("malformed header in {0:?}")]
    Header(PathBuf, #[source] header::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("deps")]
    Deps(#[from] deps::Error),
    #[error("inspect")]
    Inspect(#[from] inspect::Error),
    #[error("resolve")]
    Resolve(#[from] resolve::Error),
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// Package `name` providing itself and requiring `bash >= 5.0`
    pub(crate) fn package(name: &str, version: &str) -> Header {
        let mut header = Header::new();
        header.put_string(Tag::NAME, name).unwrap();
        header.put_string(Tag::VERSION, version).unwrap();
        header.put_string(Tag::RELEASE, "1").unwrap();
        header.put_string(Tag::ARCH, "x86_64").unwrap();

        header.put_string_array(Tag::PROVIDENAME, &[name]).unwrap();
        header
            .put_string_array(Tag::PROVIDEVERSION, &[format!("{version}-1")])
            .unwrap();
        header.put_u32(Tag::PROVIDEFLAGS, &[depset::SenseFlags::EQUAL.bits()]).unwrap();

        header.put_string_array(Tag::REQUIRENAME, &["bash"]).unwrap();
        header.put_string_array(Tag::REQUIREVERSION, &["5.0"]).unwrap();
        header
            .put_u32(
                Tag::REQUIREFLAGS,
                &[(depset::SenseFlags::GREATER | depset::SenseFlags::EQUAL).bits()],
            )
            .unwrap();

        header.put_string_array(Tag::BASENAMES, &[name]).unwrap();
        header.put_string_array(Tag::DIRNAMES, &["/usr/bin/"]).unwrap();
        header.put_u32(Tag::DIRINDEXES, &[0]).unwrap();

        header
    }

    /// Temporary file holding `headers` back to back
    pub(crate) fn scratch(name: &str, headers: &[Header], magic: bool) -> PathBuf {
        let magic = if magic { Magic::Present } else { Magic::Absent };
        let path = std::env::temp_dir().join(format!("hdrtool-{name}-{}.hdr", std::process::id()));

        let mut bytes = vec![];
        for header in headers {
            header.write(&mut bytes, magic).unwrap();
        }
        fs_err::write(&path, bytes).unwrap();

        path
    }

    #[test]
    fn reads_back_to_back() {
        let path = scratch("read", &[package("foo", "1.0"), package("bar", "2.0")], true);

        let headers = read_headers(&path, Magic::Present).unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(describe(&headers[0], &path), "foo-1.0-1.x86_64");
        assert_eq!(describe(&headers[1], &path), "bar-2.0-1.x86_64");

        assert!(matches!(
            read_headers(&path, Magic::Absent),
            Err(ReadError::Header(failed, _)) if failed == path
        ));

        // Truncated in the middle of the second header
        let bytes = fs_err::read(&path).unwrap();
        fs_err::write(&path, &bytes[..bytes.len() - 3]).unwrap();
        assert!(matches!(read_headers(&path, Magic::Present), Err(ReadError::Header(..))));

        fs_err::write(&path, b"").unwrap();
        assert!(read_headers(&path, Magic::Present).unwrap().is_empty());

        fs_err::remove_file(path).unwrap();
    }

    #[test]
    fn describes_by_file() {
        let mut header = Header::new();
        header.put_string(Tag::NAME, "foo").unwrap();

        assert_eq!(describe(&header, Path::new("/tmp/foo.hdr")), "/tmp/foo.hdr");
    }
}
