//! `ReleaseWorks` sub-crate that models a whole release: every file and
//! folder as an artifact with its identities and raw dependencies, and the
//! dependency graphs between them.
//!
//! ```no_run
//! use rw_release::DependencyResolver;
//!
//! let release = rw_release::build("out/sargo")?;
//! let graph = DependencyResolver::new(&release).resolve("SYSTEM/bin/app_process64")?;
//! println!("{}", graph.to_dot());
//! # Ok::<(), rw_release::errors::ReleaseError>(())
//! ```

mod artifact;
mod builder;
mod decode;
mod diff;
mod initrc;
mod release;
mod resolver;

pub mod errors;
pub mod sniffer;

pub use crate::artifact::{Artifact, ArtifactKind, Payload};
pub use crate::builder::{build, BuildOptions};
pub use crate::decode::TEST_SUITE_INFO;
pub use crate::diff::{diff, ChangedArtifact, ReleaseDiff};
pub use crate::errors::{ReleaseError, ReleaseResult};
pub use crate::initrc::{InitScript, InitService};
pub use crate::release::{ReleaseContent, ReleaseInfo, ReleaseKind};
pub use crate::resolver::{
    DependencyGraph, DependencyResolver, Edge, EdgeKind, GraphRecord, Link, Node, ResolverConfig,
    Unresolved,
};
