//! `booking`: command-line client for the bus booking API.

mod cli;
mod output;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
