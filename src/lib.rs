//! # `ReleaseWorks`
//!
//! `relworks` is the main crate of the `ReleaseWorks` project, which models
//! built Android releases (device builds, test suites, application bundles)
//! and the load-time dependencies between their artifacts. The project is
//! subdivided into multiple crates, `relworks` acts as entry point by
//! reexporting important structs and functions from those sub-crates. Most of
//! the reexport are done within the `relworks::prelude` namespace.
//!
//! ## Library basics
//!
//! A release is a directory tree. Building it yields a flat map of artifacts,
//! keyed by their path relative to the release root:
//!
//! ```no_run
//! use relworks::prelude::*;
//!
//! let release = rw_release::build("out/sargo")?;
//! println!("{release}");
//! for artifact in release.iter_artifacts().filter(|a| !a.valid) {
//!     println!("invalid: {artifact}");
//! }
//! # Ok::<(), RwError>(())
//! ```
//!
//! Dependencies of an artifact are then resolved against the release:
//!
//! ```no_run
//! use relworks::prelude::*;
//!
//! let release = rw_release::build("out/sargo")?;
//! let graph = DependencyResolver::new(&release).resolve("SYSTEM/bin/app_process64")?;
//! println!("{} libraries loaded", graph.nb_nodes() - 1);
//! # Ok::<(), RwError>(())
//! ```
//!
//! ## Sub-crates
//!
//!  - [`rw_images`] decodes the headers of compiled runtime images (ART, OAT,
//!    VDEX),
//!  - [`rw_native`] analyzes ELF binaries: architecture, linked libraries and
//!    libraries loaded by name at runtime,
//!  - [`rw_package`] walks zip containers (applications, jars),
//!  - [`rw_release`] builds the release model and resolves dependencies,
//!  - [`rw_utils`] contain the small functions all the other crates can benefit.

mod errors;

pub mod cli;
pub mod rw_deps;
pub mod rw_diff;
pub mod rw_tree;

pub use rw_images as images;
pub use rw_native as native;
pub use rw_package as package;
pub use rw_release as release;
pub use rw_utils as utils;

/// Reexport module of commonly used structures and functions from `ReleaseWorks`
/// project sub-crates:
///
/// ```rust
/// use relworks::prelude::*;
/// ```
pub mod prelude {
    pub use crate::errors::{RwError, RwResult};

    pub use rw_package::{Options as PackageOptions, TextManifestDecoder};

    pub use rw_release::{
        Artifact, ArtifactKind, BuildOptions, DependencyGraph, DependencyResolver, EdgeKind,
        ReleaseContent, ReleaseKind, ResolverConfig,
    };

    use clap::ArgMatches;
    use std::fs::File;
    use std::io::BufReader;
    use std::path::Path;

    pub fn init_logger(args: &ArgMatches) {
        let env = env_logger::Env::new()
            .filter_or("RW_LOG", "info")
            .write_style("RW_LOG_STYLE");

        let mut builder = env_logger::Builder::from_env(env);
        if args.get_flag("verbose") {
            builder.filter_level(log::LevelFilter::Trace);
        } else if args.get_flag("debug") {
            builder.filter_level(log::LevelFilter::Debug);
        }
        if args.get_flag("ecslog") {
            builder.format(ecs_logger::format);
        }
        builder.init();
    }

    /// Opens a release: a directory is built with `options`, a file is
    /// expected to hold a release saved in JSON.
    pub fn open_release<P: AsRef<Path>>(path: P, options: &BuildOptions) -> RwResult<ReleaseContent> {
        let path = path.as_ref();
        if path.is_file() {
            log::debug!("loading saved release {}", path.display());
            let release = serde_json::from_reader(BufReader::new(File::open(path)?))?;
            Ok(release)
        } else {
            Ok(options.build(path)?)
        }
    }
}
