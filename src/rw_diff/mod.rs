use crate::prelude::*;
use clap::ArgMatches;
use nu_ansi_term::Color;

pub fn run(args: &ArgMatches) -> RwResult<()> {
    init_logger(args);

    let old = args
        .get_one::<String>("input")
        .ok_or_else(|| RwError::BadArguments("--input needed".to_string()))?;
    let new = args
        .get_one::<String>("new")
        .ok_or_else(|| RwError::BadArguments("--new needed".to_string()))?;

    let mut options = BuildOptions::default();
    if args.get_flag("no-native") {
        options = options.dont_analyze_native();
    }
    let old = open_release(old, &options)?;
    let new = open_release(new, &options)?;
    let code_only = args.get_flag("code");

    let diff = rw_release::diff(&old, &new);
    println!("{} -> {}", old.full_name, new.full_name);
    for path in &diff.removed {
        println!("{}", Color::Green.paint(&format!("- {path}")));
    }
    for path in &diff.added {
        println!("{}", Color::Red.paint(&format!("+ {path}")));
    }
    for change in &diff.changed {
        if change.same_code {
            if !code_only {
                println!("~ {} [{}] (same code)", change.path, change.kind);
            }
        } else {
            println!(
                "{}",
                Color::Yellow.paint(&format!("~ {} [{}]", change.path, change.kind))
            );
        }
    }
    Ok(())
}
