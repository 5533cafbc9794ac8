// Educational UTXO ledger - CLI

use clap::Parser;
use utxo_ledger::{Cli, CliHandler};

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let handler = CliHandler::new(cli.data_dir, cli.wallet);

    if let Err(e) = handler.handle(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
