use crate::prelude::*;
use clap::ArgMatches;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub fn run(args: &ArgMatches) -> RwResult<()> {
    init_logger(args);

    let input = args
        .get_one::<String>("input")
        .ok_or_else(|| RwError::BadArguments("--input needed".to_string()))?;
    let artifacts: Vec<&str> = args
        .get_many::<String>("artifact")
        .ok_or_else(|| RwError::BadArguments("--artifact needed".to_string()))?
        .map(String::as_str)
        .collect();

    let mut options = BuildOptions::default();
    if args.get_flag("no-native") {
        options = options.dont_analyze_native();
    }
    let release = open_release(input, &options)?;

    let mut config = ResolverConfig::default();
    if let Some(system) = args.get_one::<String>("system") {
        config.system = system.clone();
    }
    if let Some(vendor) = args.get_one::<String>("vendor") {
        config.vendor = vendor.clone();
    }
    let resolver = DependencyResolver::with_config(&release, config);
    let json = args.get_flag("json");
    let output = args.get_one::<String>("output");

    let single = artifacts.len() == 1;
    if !single {
        if let Some(dir) = output {
            fs::create_dir_all(dir)?;
        }
    }

    for (artifact, graph) in artifacts.iter().zip(resolver.resolve_all(&artifacts)) {
        let graph = graph?;
        log::info!(
            "{artifact}: {} artifacts, {} dependencies, {} unresolved",
            graph.nb_nodes(),
            graph.nb_edges(),
            graph.unresolved().len()
        );
        let content = if json {
            serde_json::to_string_pretty(&graph.to_record())?
        } else {
            graph.to_dot()
        };
        match output {
            Some(output) if single => write_graph(Path::new(output), &content)?,
            Some(dir) => {
                let path = graph_path(dir, artifact, json);
                write_graph(&path, &content)?;
            }
            None => println!("{content}"),
        }
    }
    Ok(())
}

fn graph_path(dir: &str, artifact: &str, json: bool) -> PathBuf {
    let name = artifact.replace('/', "_");
    let ext = if json { "json" } else { "dot" };
    Path::new(dir).join(format!("{name}.{ext}"))
}

fn write_graph(path: &Path, content: &str) -> RwResult<()> {
    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(content.as_bytes())?;
    log::info!("graph written in {:?}", path);
    Ok(())
}
