// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::cmp::Ordering;

use clap::{arg, ArgMatches, Command};

pub fn command() -> Command {
    Command::new("vercmp")
        .about("Compare two [epoch:]version[-release] strings")
        .arg(arg!(<A> "first version"))
        .arg(arg!(<B> "second version"))
}

pub fn handle(args: &ArgMatches) {
    let a = args.get_one::<String>("A").map(String::as_str).unwrap_or_default();
    let b = args.get_one::<String>("B").map(String::as_str).unwrap_or_default();

    println!("{a} {} {b}", operator(depset::compare_evr(a, b)));
}

fn operator(ordering: Ordering) -> &'static str {
    match ordering {
        Ordering::Less => "<",
        Ordering::Equal => "==",
        Ordering::Greater => ">",
    }
}
