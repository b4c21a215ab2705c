use std::env;
use std::io;
use std::process;

use saplingdb::btree::BTree;
use saplingdb::repl;

fn main() {
    let mut args = env::args();
    let _program = args.next();
    let Some(path) = args.next() else {
        eprintln!("Must supply a database filename.");
        process::exit(1);
    };

    let table = match BTree::open(&path) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    if let Err(e) = repl::run(stdin.lock(), stdout.lock(), table) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
