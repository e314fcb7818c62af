use clap::Parser;
use gtdd::cli::{Cli, dispatch};

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
