// Tue Jan 20 2026 - Alex

use colored::Colorize;

fn main() {
    if let Err(e) = schema_pack::cli::run() {
        eprintln!("{} {:#}", "[!]".red(), e);
        std::process::exit(1);
    }
}
