use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use base64::{engine::general_purpose, Engine as _};
use clap::{Args, Parser, Subcommand};
use rand::rngs::OsRng;
use serde::Serialize;
use tracing::info;

use token_ledger::config::Config;
use token_ledger::store::StateFile;
use token_ledger::{
    logging, Address, AddressError, Amount, KeyError, LedgerError, Signer, StoreError, Token,
};

#[derive(Parser)]
#[command(name = "token", version, about = "Fungible token ledger host")]
struct Cli {
    /// JSON config file; built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a fresh ed25519 key pair.
    Keygen,
    /// List the dev signers derived from the configured seed.
    Signers,
    /// Deploy a token and write its initial state.
    Deploy {
        #[command(flatten)]
        state: StateArg,
        /// Dev signer index acting as deployer.
        #[arg(long, default_value_t = 0)]
        deployer: usize,
        /// Replace an existing state file.
        #[arg(long)]
        force: bool,
    },
    /// Print the owner address.
    Owner {
        #[command(flatten)]
        state: StateArg,
    },
    /// Print the total supply.
    TotalSupply {
        #[command(flatten)]
        state: StateArg,
    },
    /// Print the balance of an account.
    Balance {
        #[command(flatten)]
        state: StateArg,
        /// `0x`-prefixed address or dev signer index.
        account: AccountArg,
    },
    /// Transfer tokens from a signer to an account.
    Transfer {
        #[command(flatten)]
        state: StateArg,
        /// Dev signer index sending the tokens.
        #[arg(long, conflicts_with = "sk_hex")]
        from: Option<usize>,
        /// Secret key (64 hex chars) sending the tokens.
        #[arg(long)]
        sk_hex: Option<String>,
        #[arg(long)]
        to: AccountArg,
        #[arg(long)]
        amount: Amount,
    },
    /// Verify and print the stored snapshot.
    Inspect {
        #[command(flatten)]
        state: StateArg,
    },
}

#[derive(Args)]
struct StateArg {
    /// Ledger state file.
    #[arg(long = "state", value_name = "FILE")]
    path: PathBuf,
}

impl StateArg {
    fn file(&self) -> StateFile {
        StateFile::new(&self.path)
    }
}

/// Account given either as an address or as a dev signer index.
#[derive(Clone, Debug)]
enum AccountArg {
    Address(Address),
    Index(usize),
}

impl FromStr for AccountArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("0x") || s.starts_with("0X") {
            return s
                .parse()
                .map(AccountArg::Address)
                .map_err(|e: AddressError| e.to_string());
        }
        s.parse()
            .map(AccountArg::Index)
            .map_err(|_| format!("expected 0x-address or signer index, got {s:?}"))
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error("transfer reverted: {}", .0.reason())]
    Reverted(LedgerError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("one of --from or --sk-hex is required")]
    MissingSender,
    #[error("signer index {index} out of range ({count} dev signers)")]
    UnknownSigner { index: usize, count: usize },
    #[error("encoding output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    /// 2 for bad invocations, 1 for everything that failed at run time.
    fn exit_code(&self) -> u8 {
        match self {
            CliError::UnknownSigner { .. } | CliError::MissingSender | CliError::Key(_) => 2,
            _ => 1,
        }
    }
}

struct Host {
    config: Config,
    signers: Vec<Signer>,
}

impl Host {
    fn new(config: Config) -> Self {
        let signers = config.accounts.signers();
        Self { config, signers }
    }

    fn signer(&self, index: usize) -> Result<&Signer, CliError> {
        self.signers.get(index).ok_or(CliError::UnknownSigner {
            index,
            count: self.signers.len(),
        })
    }

    fn resolve(&self, account: &AccountArg) -> Result<Address, CliError> {
        match account {
            AccountArg::Address(addr) => Ok(*addr),
            AccountArg::Index(idx) => self.signer(*idx).map(Signer::address),
        }
    }
}

#[derive(Serialize)]
struct KeygenOutput {
    address: Address,
    public_key_hex: String,
    secret_key_hex: String,
    secret_key_b64: String,
}

#[derive(Serialize)]
struct SignerEntry {
    index: usize,
    address: Address,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli, host: Host) -> Result<(), CliError> {
    match cli.command {
        Command::Keygen => {
            let signer = Signer::generate(&mut OsRng);
            print_json(&KeygenOutput {
                address: signer.address(),
                public_key_hex: signer.public_key_hex(),
                secret_key_hex: signer.secret_key_hex(),
                secret_key_b64: general_purpose::STANDARD.encode(signer.secret_key_bytes()),
            })
        }
        Command::Signers => {
            let entries: Vec<_> = host
                .signers
                .iter()
                .enumerate()
                .map(|(index, signer)| SignerEntry {
                    index,
                    address: signer.address(),
                })
                .collect();
            print_json(&entries)
        }
        Command::Deploy {
            state,
            deployer,
            force,
        } => {
            let deployer = host.signer(deployer)?;
            let token = Token::deploy(deployer, &host.config.token)?;
            let file = state.file();
            let snapshot = token.snapshot();
            let _lock = file.lock()?;
            if force {
                file.save(&snapshot)?;
            } else {
                file.create(&snapshot)?;
            }
            info!(path = %file.path().display(), owner = %snapshot.owner, "deployment written");
            println!("{}", snapshot.owner);
            Ok(())
        }
        Command::Owner { state } => {
            println!("{}", state.file().load()?.owner());
            Ok(())
        }
        Command::TotalSupply { state } => {
            println!("{}", state.file().load()?.total_supply());
            Ok(())
        }
        Command::Balance { state, account } => {
            let account = host.resolve(&account)?;
            println!("{}", state.file().load()?.balance_of(&account));
            Ok(())
        }
        Command::Transfer {
            state,
            from,
            sk_hex,
            to,
            amount,
        } => {
            let sender = match (from, sk_hex) {
                (_, Some(sk_hex)) => Signer::from_secret_hex(&sk_hex)?,
                (Some(index), None) => host.signer(index)?.clone(),
                (None, None) => return Err(CliError::MissingSender),
            };
            let to = host.resolve(&to)?;
            state.file().transact(|ledger| {
                ledger
                    .transfer(&sender.address(), &to, amount)
                    .map_err(|err| match err {
                        LedgerError::InsufficientBalance { .. } => CliError::Reverted(err),
                        other => CliError::Ledger(other),
                    })
            })?;
            info!(from = %sender.address(), %to, amount, "transfer committed");
            Ok(())
        }
        Command::Inspect { state } => {
            let ledger = state.file().load()?;
            print_json(&ledger.snapshot())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path),
        None => Ok(Config::default()),
    };
    let mut config = match config {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };
    config.logging.json |= cli.json_logs;
    logging::init(&config.logging);

    match run(cli, Host::new(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
