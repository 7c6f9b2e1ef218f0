use crate::prelude::*;
use clap::ArgMatches;
use std::fs::File;
use std::io::BufWriter;

pub fn run(args: &ArgMatches) -> RwResult<()> {
    init_logger(args);

    let input = args
        .get_one::<String>("input")
        .ok_or_else(|| RwError::BadArguments("--input needed".to_string()))?;
    let mut options = BuildOptions::default();
    if args.get_flag("no-native") {
        options = options.dont_analyze_native();
    }
    if args.get_flag("sequential") {
        options = options.sequential();
    }
    let release = open_release(input, &options)?;

    if let Some(output) = args.get_one::<String>("output") {
        let writer = BufWriter::new(File::create(output)?);
        serde_json::to_writer_pretty(writer, &release)?;
        log::info!("release written in {:?}", output);
        return Ok(());
    }

    println!("{release}");
    if args.get_flag("list") {
        for artifact in release.iter_artifacts() {
            println!("   {artifact}");
        }
    }
    Ok(())
}
