// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::PathBuf;

use clap::{arg, ArgAction, ArgMatches, Command};
use header::{Header, Locale, Tag, Value};
use thiserror::Error;

use super::{describe, magic, paths, read_headers, ReadError};
use crate::settings::Settings;

const COLUMN_WIDTH: usize = 20;

pub fn command() -> Command {
    Command::new("inspect")
        .about("Dump header files")
        .long_about("Show every tag of each header stored in the given files")
        .arg(arg!(--raw "Show all translations instead of resolving the locale").action(ArgAction::SetTrue))
        .arg(
            arg!(-t --tag <TAG> "Only show this tag, by name or number. Can be passed multiple times")
                .action(ArgAction::Append),
        )
        .arg(arg!(<PATH> ... "files to inspect").value_parser(clap::value_parser!(PathBuf)))
}

pub fn handle(args: &ArgMatches, settings: &Settings) -> Result<(), Error> {
    let tags = args
        .get_many::<String>("tag")
        .into_iter()
        .flatten()
        .map(|name| Tag::from_name(name).ok_or_else(|| Error::UnknownTag(name.clone())))
        .collect::<Result<Vec<_>, _>>()?;
    let raw = args.get_flag("raw");
    let locale = settings.locale();

    for path in paths(args) {
        for header in read_headers(&path, magic(args))? {
            println!("{path:?} = {}", describe(&header, &path));

            if let Some(region) = header.region_tag() {
                println!("{:width$} : {}", "region", name(region), width = COLUMN_WIDTH);
            }

            if tags.is_empty() {
                for (tag, value) in header.iter() {
                    let value = if raw {
                        value
                    } else {
                        resolved(&header, tag, &locale).unwrap_or(value)
                    };
                    print_value(tag, &value);
                }
            } else {
                for &tag in &tags {
                    let value = if raw { header.get_raw(tag) } else { resolved(&header, tag, &locale) };
                    if let Some(value) = value {
                        print_value(tag, &value);
                    }
                }
            }

            println!();
        }
    }

    Ok(())
}

fn resolved(header: &Header, tag: Tag, locale: &Locale) -> Option<Value> {
    header.get_with_locale(tag, locale)
}

fn name(tag: Tag) -> String {
    match tag.name() {
        Some(name) => name.to_owned(),
        None => format!("TAG_{tag}"),
    }
}

fn print_value(tag: Tag, value: &Value) {
    let label = format!("{} ({}[{}])", name(tag), value.kind(), value.count());

    match value {
        Value::StringArray(strings) | Value::I18nString(strings) if strings.len() > 1 => {
            println!("{label:COLUMN_WIDTH$} :");
            for string in strings {
                println!("    - {string}");
            }
        }
        _ => println!("{label:COLUMN_WIDTH$} : {value}"),
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("read headers")]
    Read(#[from] ReadError),
    #[error("unknown tag {0:?}")]
    UnknownTag(String),
}
