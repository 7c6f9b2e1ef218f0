//! Main `ReleaseWorks` binary command line arguments options.
//!
//! This module declares a function to build `clap` command line arguments
//! parser, so that it can be used from other places than the main binary,
//! such as from bash completion file generator.

use clap::{value_parser, Arg, ArgAction, Command};
use clap_complete::Shell;

const NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");
const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

fn arg_debug() -> Arg {
    Arg::new("debug")
        .short('d')
        .long("debug")
        .action(ArgAction::SetTrue)
        .help("Activate debug mode")
}

fn arg_verbose() -> Arg {
    Arg::new("verbose")
        .short('v')
        .long("verbose")
        .action(ArgAction::SetTrue)
        .help("Activate verbose mode")
}

fn arg_ecslog() -> Arg {
    Arg::new("ecslog")
        .short('e')
        .long("ecslog")
        .action(ArgAction::SetTrue)
        .help("Output logs in ECS format")
}

fn arg_input() -> Arg {
    Arg::new("input")
        .short('i')
        .long("input")
        .action(ArgAction::Set)
        .required(true)
        .help("Input release directory, or release saved in JSON")
}

fn arg_output(help: &str) -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .action(ArgAction::Set)
        .help(help.to_string())
}

fn arg_no_native() -> Arg {
    Arg::new("no-native")
        .long("no-native")
        .action(ArgAction::SetTrue)
        .help("Do not analyze native libraries embedded in containers")
}

fn arg_sequential() -> Arg {
    Arg::new("sequential")
        .long("sequential")
        .action(ArgAction::SetTrue)
        .help("Decode release files one at a time")
}

#[must_use]
pub fn relworks() -> Command {
    Command::new(NAME)
        .version(VERSION)
        .author(AUTHORS)
        .about(DESCRIPTION)
        .subcommand(tree())
        .subcommand(deps())
        .subcommand(diff())
        .subcommand(
            Command::new("gen-completions")
                .about("Generates completions file")
                .arg(
                    Arg::new("shell")
                        .short('s')
                        .long("shell")
                        .action(ArgAction::Set)
                        .value_parser(value_parser!(Shell))
                        .required(true)
                        .help("Shell type for completion generation"),
                ),
        )
}

#[must_use]
pub fn tree() -> Command {
    Command::new("tree")
        .bin_name("rw-tree")
        .version(VERSION)
        .author(AUTHORS)
        .about("Builds the artifacts tree of a release")
        .arg(arg_debug())
        .arg(arg_verbose())
        .arg(arg_ecslog())
        .arg(arg_input())
        .arg(arg_output("Output JSON file"))
        .arg(arg_no_native())
        .arg(arg_sequential())
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .action(ArgAction::SetTrue)
                .help("List every artifact"),
        )
}

#[must_use]
pub fn deps() -> Command {
    Command::new("deps")
        .bin_name("rw-deps")
        .version(VERSION)
        .author(AUTHORS)
        .about("Resolves transitive dependencies of release artifacts")
        .arg(arg_debug())
        .arg(arg_verbose())
        .arg(arg_ecslog())
        .arg(arg_input())
        .arg(arg_output("Output dot file, or directory when several artifacts are given"))
        .arg(arg_no_native())
        .arg(
            Arg::new("artifact")
                .short('a')
                .long("artifact")
                .action(ArgAction::Append)
                .required(true)
                .help("Artifact path, relative to the release root"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Write graphs in JSON instead of dot"),
        )
        .arg(
            Arg::new("system")
                .long("system")
                .action(ArgAction::Set)
                .default_value("SYSTEM")
                .help("Folder of the system partition"),
        )
        .arg(
            Arg::new("vendor")
                .long("vendor")
                .action(ArgAction::Set)
                .default_value("VENDOR")
                .help("Folder of the vendor partition"),
        )
}

#[must_use]
pub fn diff() -> Command {
    Command::new("diff")
        .bin_name("rw-diff")
        .version(VERSION)
        .author(AUTHORS)
        .about("Prints artifacts added, removed or changed between two releases")
        .arg(arg_debug())
        .arg(arg_verbose())
        .arg(arg_ecslog())
        .arg(arg_input())
        .arg(
            Arg::new("new")
                .short('n')
                .long("new")
                .action(ArgAction::Set)
                .required(true)
                .help("New release directory, or release saved in JSON"),
        )
        .arg(arg_no_native())
        .arg(
            Arg::new("code")
                .long("code")
                .action(ArgAction::SetTrue)
                .help("Only report changes of code identity"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_consistent() {
        relworks().debug_assert();
    }

    #[test]
    fn deps_arguments() {
        let args = deps()
            .try_get_matches_from(["rw-deps", "-i", "out", "-a", "a", "-a", "b"])
            .unwrap();
        let artifacts: Vec<&String> = args.get_many::<String>("artifact").unwrap().collect();
        assert_eq!(artifacts, ["a", "b"]);
        assert_eq!(args.get_one::<String>("system").unwrap(), "SYSTEM");
    }
}
