//! Command-line interface definition for the `umbra` binary.

use std::path::PathBuf;

use clap::Parser;

/// Default pending-operation store location: `$XDG_DATA_HOME/umbra/pending`
/// (or the platform equivalent), falling back to the system temp directory
/// if no data directory can be resolved.
fn default_pending_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(std::env::temp_dir).join("umbra").join("pending")
}

/// Command-line interface definition.
#[derive(Debug, Parser)]
#[command(name = "umbra")]
#[command(about = "Shielded-pool demonstration CLI: scan, balance, and settle private operations")]
pub struct Cli {
    /// CLI subcommands.
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands.
#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Configuration utilities.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Key derivation utilities.
    Key {
        /// Key subcommand.
        #[command(subcommand)]
        command: KeyCommands,
    },
    /// Scan a fixture file for notes owned by a viewing key.
    Scan(ScanArgs),
    /// Sum unspent balance for one token mint.
    Balance(BalanceArgs),
    /// Demonstrate a private transfer.
    Transfer(TransferArgs),
    /// Demonstrate a constant-product swap.
    Swap(SwapArgs),
    /// Demonstrate depositing liquidity into a pool.
    AddLiquidity(AddLiquidityArgs),
    /// Demonstrate withdrawing liquidity from a pool.
    RemoveLiquidity(RemoveLiquidityArgs),
    /// Inspect or resume an in-flight settlement operation.
    Pending {
        /// Pending-operation subcommand.
        #[command(subcommand)]
        command: PendingCommands,
    },
}

/// `config` subcommands.
#[derive(Debug, clap::Subcommand)]
pub enum ConfigCommands {
    /// Print the engine configuration's JSON schema.
    Schema,
}

/// `key` subcommands.
#[derive(Debug, clap::Subcommand)]
pub enum KeyCommands {
    /// Derive a spending key, public key, and nullifier key from a hex seed.
    Derive {
        /// 32-byte hex seed. The same value is used as both viewing and
        /// spending key, per this engine's key-unification design.
        #[arg(long, env = "UMBRA_SEED")]
        seed: String,
    },
}

/// `pending` subcommands.
#[derive(Debug, clap::Subcommand)]
pub enum PendingCommands {
    /// Resume a crashed operation from its locally persisted record.
    Resume {
        /// 32-byte hex operation id.
        #[arg(long)]
        operation_id: String,
        /// Directory holding the local pending-operation store.
        #[arg(long, env = "UMBRA_PENDING_DIR", default_value_os_t = default_pending_dir())]
        pending_dir: PathBuf,
    },
}

/// Shared scan inputs: which fixture to read notes from, and which key to
/// scan with.
#[derive(Debug, Clone, clap::Args)]
pub struct ScanArgs {
    /// Path to a JSON fixture file of indexed accounts.
    #[arg(long, env = "UMBRA_FIXTURE")]
    pub fixture: PathBuf,
    /// 32-byte hex seed used as both viewing and spending key.
    #[arg(long, env = "UMBRA_SEED")]
    pub seed: String,
    /// Settlement program id the fixture's accounts are owned by.
    #[arg(long, default_value = "umbra-program")]
    pub program_id: String,
    /// Cache namespace for this viewing key.
    #[arg(long, default_value = "default")]
    pub view_key_id: String,
    /// 32-byte hex pool id to scan.
    #[arg(long)]
    pub pool_id: String,
}

/// `balance` arguments.
#[derive(Debug, clap::Args)]
pub struct BalanceArgs {
    /// Shared scan inputs.
    #[command(flatten)]
    pub scan: ScanArgs,
    /// Token mint to sum, as a `u64` reduced into the scalar field.
    #[arg(long)]
    pub token_mint: u64,
}

/// `transfer` arguments.
#[derive(Debug, clap::Args)]
pub struct TransferArgs {
    /// Shared scan inputs.
    #[command(flatten)]
    pub scan: ScanArgs,
    /// Token mint to transfer.
    #[arg(long)]
    pub token_mint: u64,
    /// Amount to transfer.
    #[arg(long)]
    pub amount: u64,
    /// 32-byte hex seed identifying the recipient's key.
    #[arg(long)]
    pub recipient_seed: String,
    /// Phase-2/3 dispatch fan-out.
    #[arg(long, default_value_t = umbra_sdk::DEFAULT_FANOUT)]
    pub fanout: usize,
    /// Directory holding the local pending-operation store.
    #[arg(long, env = "UMBRA_PENDING_DIR", default_value_os_t = default_pending_dir())]
    pub pending_dir: PathBuf,
}

/// `swap` arguments.
#[derive(Debug, clap::Args)]
pub struct SwapArgs {
    /// Shared scan inputs.
    #[command(flatten)]
    pub scan: ScanArgs,
    /// Mint being sold.
    #[arg(long)]
    pub token_in: u64,
    /// Mint being bought.
    #[arg(long)]
    pub token_out: u64,
    /// Amount being sold.
    #[arg(long)]
    pub amount_in: u64,
    /// Pool's current reserve of `token_in`.
    #[arg(long)]
    pub reserve_in: u64,
    /// Pool's current reserve of `token_out`.
    #[arg(long)]
    pub reserve_out: u64,
    /// Swap fee, in basis points.
    #[arg(long, default_value_t = 30)]
    pub fee_bps: u16,
    /// Maximum acceptable slippage, in basis points.
    #[arg(long, default_value_t = 100)]
    pub slippage_bps: u16,
    /// Directory holding the local pending-operation store.
    #[arg(long, env = "UMBRA_PENDING_DIR", default_value_os_t = default_pending_dir())]
    pub pending_dir: PathBuf,
}

/// `add-liquidity` arguments.
#[derive(Debug, clap::Args)]
pub struct AddLiquidityArgs {
    /// Shared scan inputs.
    #[command(flatten)]
    pub scan: ScanArgs,
    /// First pool mint.
    #[arg(long)]
    pub token_a: u64,
    /// Second pool mint.
    #[arg(long)]
    pub token_b: u64,
    /// Deposit amount of `token_a`.
    #[arg(long)]
    pub deposit_a: u64,
    /// Deposit amount of `token_b`.
    #[arg(long)]
    pub deposit_b: u64,
    /// Pool's current reserve of `token_a`.
    #[arg(long)]
    pub reserve_a: u64,
    /// Pool's current reserve of `token_b`.
    #[arg(long)]
    pub reserve_b: u64,
    /// Pool's current total LP supply.
    #[arg(long)]
    pub lp_supply: u64,
    /// Directory holding the local pending-operation store.
    #[arg(long, env = "UMBRA_PENDING_DIR", default_value_os_t = default_pending_dir())]
    pub pending_dir: PathBuf,
}

/// `remove-liquidity` arguments.
#[derive(Debug, clap::Args)]
pub struct RemoveLiquidityArgs {
    /// Shared scan inputs.
    #[command(flatten)]
    pub scan: ScanArgs,
    /// First pool mint.
    #[arg(long)]
    pub token_a: u64,
    /// Second pool mint.
    #[arg(long)]
    pub token_b: u64,
    /// LP amount to burn.
    #[arg(long)]
    pub lp_amount: u64,
    /// Pool's current reserve of `token_a`.
    #[arg(long)]
    pub reserve_a: u64,
    /// Pool's current reserve of `token_b`.
    #[arg(long)]
    pub reserve_b: u64,
    /// Pool's current total LP supply.
    #[arg(long)]
    pub lp_supply: u64,
    /// Directory holding the local pending-operation store.
    #[arg(long, env = "UMBRA_PENDING_DIR", default_value_os_t = default_pending_dir())]
    pub pending_dir: PathBuf,
}
