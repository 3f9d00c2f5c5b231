// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![deny(clippy::all, clippy::pedantic)]

use clap::error::ErrorKind;
use clap::{arg, crate_version, value_parser, Command};
use std::ffi::OsString;

use crate::{Workload, MAX_QUBITS};

/// # Errors
/// Returns an error if the arguments are invalid or the workload fails.
/// # Panics
/// Panics if an argument with a default value is missing after parsing.
pub fn main<I, T>(args: Option<I>) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cmd = Command::new("qsim-runner").args(&[
        arg!(-w --workload <NAME> "The circuit to simulate")
            .value_parser(["ghz", "qft", "modadd"])
            .default_value("ghz"),
        arg!(-q --qubits <NUM> "The number of qubits the circuit acts on")
            .value_parser(value_parser!(u32).range(1..=i64::from(MAX_QUBITS)))
            .default_value("3"),
        arg!(-s --shots <NUM> "The number of times to repeat the simulation of the chosen circuit")
            .value_parser(value_parser!(u32))
            .default_value("1"),
        arg!(-r --rngseed <NUM> "The value to use when seeding the random number generator used for quantum simulation")
            .value_parser(value_parser!(u64)),
        arg!(--fusion "Combine consecutive gates into larger matrices before applying them"),
        ]).version(crate_version!());
    let matches = match args {
        Some(args) => cmd.try_get_matches_from(args),
        None => cmd.try_get_matches(),
    };
    match matches {
        Err(e) => {
            let msg = e.to_string();
            match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    eprint!("{msg}");
                    Ok(())
                }
                _ => Err(msg),
            }
        }
        Ok(matches) => crate::run_workload(
            matches
                .get_one::<String>("workload")
                .expect("Workload should have a default value")
                .parse::<Workload>()?,
            *matches
                .get_one::<u32>("qubits")
                .expect("Qubits should have a default value"),
            *matches
                .get_one::<u32>("shots")
                .expect("Shots is required or should have a default value"),
            matches
                .try_get_one::<u64>("rngseed")
                .map_or(None, Option::<&u64>::copied),
            matches.get_flag("fusion"),
            &mut std::io::stdout(),
        ),
    }
}
