// CLI commands

use crate::config::LedgerConfig;
use crate::core::{Account, Amount, Block, TxKind};
use crate::ledger::Ledger;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ledger")]
#[command(about = "Educational UTXO ledger with proof-of-work", long_about = None)]
pub struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Chain file (overrides the config)
    #[arg(long, global = true)]
    pub chain: Option<PathBuf>,

    /// Leading zero hex characters required per block (overrides the config)
    #[arg(long, global = true)]
    pub difficulty: Option<usize>,

    /// Coinbase reward per mined block (overrides the config)
    #[arg(long, global = true)]
    pub reward: Option<Amount>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive shell (default)
    Shell,

    /// Print the confirmed balance of an account
    Balance {
        #[arg(value_parser = parse_account)]
        account: Account,
    },

    /// Mine one block and save the chain
    Mine {
        /// Account receiving the reward
        #[arg(value_parser = parse_account)]
        miner: Account,
    },

    /// Print the chain as JSON
    ShowChain,

    /// Check chain linkage and proof-of-work
    Validate,
}

impl Cli {
    /// Config file (or defaults) with command-line overrides applied
    pub fn resolve_config(&self) -> Result<LedgerConfig> {
        let mut config = match &self.config {
            Some(path) => LedgerConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => LedgerConfig::default(),
        };
        if let Some(chain) = &self.chain {
            config.chain_file = chain.clone();
        }
        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty;
        }
        if let Some(reward) = self.reward {
            config.mining_reward = reward;
        }
        config.validate()?;
        Ok(config)
    }
}

/// One line of the interactive shell
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_help_subcommand = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug, PartialEq)]
enum ShellCommand {
    /// Submit a spend to the mempool
    Send {
        #[arg(value_parser = parse_account)]
        sender: Account,
        #[arg(value_parser = parse_account)]
        receiver: Account,
        amount: Amount,
    },
    /// Mine a block with the pending transactions
    Mine {
        #[arg(value_parser = parse_account)]
        miner: Account,
    },
    /// Confirmed balance of an account
    Balance {
        #[arg(value_parser = parse_account)]
        account: Account,
    },
    /// Print the chain as JSON
    ShowChain,
    /// Check chain linkage and proof-of-work
    Validate,
    /// List commands
    Help,
    /// Save the chain and quit
    Exit,
}

/// Account names are part of transaction id preimages, where '|' and ':'
/// are delimiters
fn parse_account(name: &str) -> std::result::Result<Account, String> {
    if name.is_empty() || name.contains(['|', ':']) {
        return Err(format!("invalid account name '{}': must be non-empty without '|' or ':'", name));
    }
    Ok(Account::new(name))
}

/// Whether the shell keeps reading after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellFlow {
    Continue,
    Exit,
}

const SHELL_HELP: &str = "\
Commands:
  send <sender> <receiver> <amount>   submit a spend
  mine <miner>                        mine pending transactions
  balance <account>                   confirmed balance
  show-chain                          print the chain as JSON
  validate                            check the chain
  help                                this list
  exit                                save and quit";

/// CLI handler
pub struct CliHandler {
    ledger: Ledger,
}

impl CliHandler {
    /// Open the ledger described by `config`, loading its chain file if present
    pub fn new(config: LedgerConfig) -> Result<Self> {
        let path = config.chain_file.clone();
        let ledger =
            Ledger::open(config).with_context(|| format!("opening chain {}", path.display()))?;
        Ok(Self { ledger })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Handle CLI command
    pub fn handle(&mut self, command: Option<Commands>) -> Result<()> {
        match command.unwrap_or(Commands::Shell) {
            Commands::Shell => {
                let stdin = io::stdin();
                self.run_shell(stdin.lock())
            }
            Commands::Balance { account } => {
                self.print_balance(&account);
                Ok(())
            }
            Commands::Mine { miner } => {
                self.mine(&miner)?;
                self.ledger.save()?;
                Ok(())
            }
            Commands::ShowChain => {
                println!("{}", self.ledger.dump_chain()?);
                Ok(())
            }
            Commands::Validate => {
                self.validate();
                Ok(())
            }
        }
    }

    /// Read commands until `exit` or end of input, then save the chain
    pub fn run_shell<R: BufRead>(&mut self, input: R) -> Result<()> {
        println!("UTXO ledger shell. Type 'help' for commands.");
        prompt();

        for line in input.lines() {
            let line = line?;
            match self.execute_line(&line) {
                Ok(ShellFlow::Exit) => break,
                Ok(ShellFlow::Continue) => {}
                Err(e) => println!("Error: {:#}", e),
            }
            prompt();
        }

        self.ledger.save()?;
        println!("Blockchain saved to {}", self.ledger.config().chain_file.display());
        Ok(())
    }

    /// Run a single shell line
    pub fn execute_line(&mut self, line: &str) -> Result<ShellFlow> {
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            return Ok(ShellFlow::Continue);
        }

        let parsed = match ShellLine::try_parse_from(words) {
            Ok(parsed) => parsed,
            Err(e) => {
                println!("{}", e);
                return Ok(ShellFlow::Continue);
            }
        };

        match parsed.command {
            ShellCommand::Send {
                sender,
                receiver,
                amount,
            } => {
                let receipt = self.ledger.submit_spend(&sender, &receiver, amount)?;
                match receipt.rejection {
                    None => println!("Transaction {} added to mempool", receipt.txid),
                    Some(reason) => println!("Transaction {} rejected: {}", receipt.txid, reason),
                }
            }
            ShellCommand::Mine { miner } => self.mine(&miner)?,
            ShellCommand::Balance { account } => self.print_balance(&account),
            ShellCommand::ShowChain => println!("{}", self.ledger.dump_chain()?),
            ShellCommand::Validate => self.validate(),
            ShellCommand::Help => println!("{}", SHELL_HELP),
            ShellCommand::Exit => return Ok(ShellFlow::Exit),
        }
        Ok(ShellFlow::Continue)
    }

    fn mine(&mut self, miner: &Account) -> Result<()> {
        let pending = self.ledger.mempool().len();
        println!("Mining block with {} pending transactions...", pending);
        let block = self.ledger.mine(miner)?;
        print_block(block);
        Ok(())
    }

    fn print_balance(&self, account: &Account) {
        println!("Balance for {}: {}", account, self.ledger.balance(account));
    }

    fn validate(&self) {
        match self.ledger.verify() {
            Ok(()) => println!("Chain is valid ({} blocks)", self.ledger.chain().len()),
            Err(e) => println!("Chain is INVALID: {}", e),
        }
    }
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

/// Print block information
fn print_block(block: &Block) {
    println!("Block:");
    println!("  Index: {}", block.index);
    println!("  Hash: {}", block.hash);
    println!("  Previous: {}", block.previous_hash);
    println!("  Timestamp: {}", block.timestamp);
    println!("  Nonce: {}", block.nonce);
    println!("  Transactions: {}", block.transactions.len());

    for (i, tx) in block.transactions.iter().enumerate() {
        let kind = match tx.kind() {
            TxKind::Coinbase { .. } => "coinbase",
            TxKind::Regular { .. } => "regular",
        };
        println!("    [{}] {} ({})", i, tx.id(), kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler(dir: &tempfile::TempDir) -> CliHandler {
        let config = LedgerConfig {
            difficulty: 1,
            chain_file: dir.path().join("chain.json"),
            ..Default::default()
        };
        CliHandler::new(config).unwrap()
    }

    #[test]
    fn test_shell_line_parsing() {
        let line = ShellLine::try_parse_from(["send", "genesis", "alice", "12.5"]).unwrap();
        assert_eq!(
            line.command,
            ShellCommand::Send {
                sender: Account::from("genesis"),
                receiver: Account::from("alice"),
                amount: Amount::from_units(1_250_000_000),
            }
        );
        assert_eq!(
            ShellLine::try_parse_from(["show-chain"]).unwrap().command,
            ShellCommand::ShowChain
        );
        assert!(ShellLine::try_parse_from(["send", "genesis", "alice", "lots"]).is_err());
        assert!(ShellLine::try_parse_from(["frobnicate"]).is_err());
    }

    #[test]
    fn test_delimiters_in_account_names_rejected() {
        assert!(ShellLine::try_parse_from(["mine", "height:1|bob"]).is_err());
        assert!(ShellLine::try_parse_from(["send", "genesis", "a|b", "1"]).is_err());
        assert!(ShellLine::try_parse_from(["balance", "x:y"]).is_err());
        assert!(Cli::try_parse_from(["ledger", "mine", "height:1|bob"]).is_err());
        assert!(Cli::try_parse_from(["ledger", "balance", "alice"]).is_ok());
    }

    #[test]
    fn test_colliding_name_is_refused_by_shell() {
        let dir = tempfile::tempdir().unwrap();
        let mut handler = handler(&dir);
        assert_eq!(handler.execute_line("mine height:1|bob").unwrap(), ShellFlow::Continue);
        assert_eq!(handler.ledger().chain().len(), 1);
    }

    #[test]
    fn test_resolve_config_applies_overrides() {
        let cli = Cli::try_parse_from([
            "ledger",
            "--difficulty",
            "2",
            "--reward",
            "25",
            "--chain",
            "other.json",
            "validate",
        ])
        .unwrap();
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.difficulty, 2);
        assert_eq!(config.mining_reward, Amount::from_whole(25));
        assert_eq!(config.chain_file, PathBuf::from("other.json"));
        assert!(matches!(cli.command, Some(Commands::Validate)));
    }

    #[test]
    fn test_resolve_config_rejects_out_of_range() {
        let cli = Cli::try_parse_from(["ledger", "--difficulty", "65"]).unwrap();
        assert!(cli.resolve_config().is_err());
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_execute_send_and_mine() {
        let dir = tempfile::tempdir().unwrap();
        let mut handler = handler(&dir);

        assert_eq!(handler.execute_line("send genesis alice 300").unwrap(), ShellFlow::Continue);
        assert_eq!(handler.ledger().mempool().len(), 1);

        handler.execute_line("mine bob").unwrap();
        assert_eq!(handler.ledger().balance(&Account::from("alice")), Amount::from_whole(300));
        assert_eq!(handler.ledger().balance(&Account::from("bob")), Amount::from_whole(10));
    }

    #[test]
    fn test_insufficient_funds_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut handler = handler(&dir);
        assert!(handler.execute_line("send alice bob 5").is_err());
        assert!(handler.ledger().mempool().is_empty());
    }

    #[test]
    fn test_bad_lines_keep_shell_running() {
        let dir = tempfile::tempdir().unwrap();
        let mut handler = handler(&dir);
        assert_eq!(handler.execute_line("").unwrap(), ShellFlow::Continue);
        assert_eq!(handler.execute_line("bogus").unwrap(), ShellFlow::Continue);
        assert_eq!(handler.execute_line("exit").unwrap(), ShellFlow::Exit);
    }

    #[test]
    fn test_shell_saves_on_exit() {
        let dir = tempfile::tempdir().unwrap();
        let mut handler = handler(&dir);
        let script = "send genesis alice 300\nmine bob\nexit\nmine never\n";
        handler.run_shell(script.as_bytes()).unwrap();

        let config = handler.ledger().config().clone();
        let reopened = Ledger::open(config).unwrap();
        assert_eq!(reopened.chain().len(), 2);
        assert_eq!(reopened.balance(&Account::from("alice")), Amount::from_whole(300));
    }
}
