use clap::ArgMatches;
use clap_complete::{generate, Shell};
use relworks::prelude::*;
use relworks::{cli, rw_deps, rw_diff, rw_tree};
use std::io;

fn main() -> RwResult<()> {
    let args = cli::relworks().get_matches();

    match &args.subcommand() {
        Some(("tree", cmd_args)) => rw_tree::run(cmd_args),
        Some(("deps", cmd_args)) => rw_deps::run(cmd_args),
        Some(("diff", cmd_args)) => rw_diff::run(cmd_args),
        Some(("gen-completions", sub_args)) => subcommand_gen_completions(sub_args),
        Some((subcommand, _)) => Err(RwError::BadArguments(format!(
            "unknown subcommand '{subcommand}'"
        ))),
        None => Err(RwError::BadArguments("missing subcommand".to_string())),
    }
}

fn subcommand_gen_completions(sub_args: &ArgMatches) -> RwResult<()> {
    let generator = *sub_args
        .get_one::<Shell>("shell")
        .ok_or_else(|| RwError::BadArguments("--shell needed".to_string()))?;
    let mut cmd = cli::relworks();
    let cmd_name = cmd.get_name().to_string();
    generate(generator, &mut cmd, cmd_name, &mut io::stdout());
    Ok(())
}
