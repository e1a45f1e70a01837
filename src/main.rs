// UTXO ledger - CLI

use clap::Parser;
use utxo_ledger::{Cli, CliHandler};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    let mut handler = CliHandler::new(config)?;
    handler.handle(cli.command)
}
