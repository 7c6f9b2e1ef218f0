use relworks::prelude::RwResult;
use relworks::{cli, rw_diff};

fn main() -> RwResult<()> {
    let args = cli::diff().get_matches();
    rw_diff::run(&args)
}
