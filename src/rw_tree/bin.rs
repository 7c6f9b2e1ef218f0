use relworks::prelude::RwResult;
use relworks::{cli, rw_tree};

fn main() -> RwResult<()> {
    let args = cli::tree().get_matches();
    rw_tree::run(&args)
}
