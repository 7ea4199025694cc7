use std::{env::args_os, io};

use sct_parser::Sct;
use tracing::info;

fn main() {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let path = args_os().nth(1).expect("missing argument: path to .sct file");
    let sct = Sct::parse(&fs_err::read(path).unwrap()).expect("unsuccessful parse");

    for error in sct.errors.iter() {
        info!("{error}");
    }

    println!("{}", serde_json::to_string(&sct).unwrap());
}
