use relworks::prelude::RwResult;
use relworks::{cli, rw_deps};

fn main() -> RwResult<()> {
    let args = cli::deps().get_matches();
    rw_deps::run(&args)
}
