use std::{env, str::FromStr, time::Duration};

use crate::{
    error::{AppError, Result},
    types::{Address, Color, WEI_PER_ETH, Wei},
};

pub mod networks;

pub use networks::{KNOWN_NETWORKS, NetworkInfo, find_network};

pub const DEFAULT_GRID_SIZE: u32 = 1000;
pub const DEFAULT_CHAIN_ID: u64 = 84531;
pub const MOCK_WALLET_ACCOUNT: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";

#[derive(Debug, Clone)]
pub struct Config {
    pub ledger: LedgerConfig,
    pub network: NetworkConfig,
    pub canvas: CanvasConfig,
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub contract_address: String,
    pub simulated: bool,
    pub default_grid_size: u32,
    pub fallback_price_wei: Wei,
    pub read_fallback: ReadFallback,
    pub read_timeout: Duration,
    pub transaction_timeout: Duration,
    pub simulated_confirmation: Duration,
}

/// What a failed ledger read is replaced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFallback {
    /// Owner unknown, default colour.
    Unknown,
    /// Deterministic fabricated owner and colour, for offline development.
    Synthetic,
}

impl FromStr for ReadFallback {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "unknown" => Ok(Self::Unknown),
            "synthetic" => Ok(Self::Synthetic),
            other => Err(AppError::InvalidParams(format!(
                "Unknown read fallback '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub default_chain_id: u64,
    pub chain: ChainParams,
}

/// Parameters handed to the wallet when the default network must be added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainParams {
    pub chain_id: u64,
    pub chain_name: String,
    pub currency_name: String,
    pub currency_symbol: String,
    pub decimals: u8,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

impl ChainParams {
    pub fn chain_id_hex(&self) -> String {
        format!("0x{:x}", self.chain_id)
    }
}

#[derive(Debug, Clone)]
pub struct CanvasConfig {
    pub block_size: u32,
    pub viewport_blocks: u32,
    pub prefetch_blocks: u32,
    pub default_color: Color,
    pub prefetch_concurrency: usize,
}

#[derive(Debug, Clone)]
pub struct WalletConfig {
    pub mock_account: Address,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig {
                contract_address: Address::zero().to_string(),
                simulated: true,
                default_grid_size: DEFAULT_GRID_SIZE,
                fallback_price_wei: WEI_PER_ETH / 100, // 0.01 ETH
                read_fallback: ReadFallback::Unknown,
                read_timeout: Duration::from_secs(10),
                transaction_timeout: Duration::from_secs(120),
                simulated_confirmation: Duration::from_millis(1000),
            },
            network: NetworkConfig {
                default_chain_id: DEFAULT_CHAIN_ID,
                chain: ChainParams {
                    chain_id: DEFAULT_CHAIN_ID,
                    chain_name: "Base Goerli Testnet".into(),
                    currency_name: "ETH".into(),
                    currency_symbol: "ETH".into(),
                    decimals: 18,
                    rpc_urls: vec!["https://goerli.base.org".into()],
                    block_explorer_urls: vec!["https://goerli.basescan.org".into()],
                },
            },
            canvas: CanvasConfig {
                block_size: 10,
                viewport_blocks: 100,
                prefetch_blocks: 20,
                default_color: Color::WHITE,
                prefetch_concurrency: 16,
            },
            wallet: WalletConfig {
                mock_account: Address::parse(MOCK_WALLET_ACCOUNT)
                    .unwrap_or_else(|_| Address::zero()),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let default_chain_id = env_or_parse("DEFAULT_CHAIN_ID", defaults.network.default_chain_id)?;

        Ok(Self {
            ledger: LedgerConfig {
                contract_address: env_or_default(
                    "CONTRACT_ADDRESS",
                    &defaults.ledger.contract_address,
                ),
                simulated: env_or_parse("LEDGER_SIMULATED", defaults.ledger.simulated)?,
                default_grid_size: env_or_parse("GRID_SIZE", defaults.ledger.default_grid_size)?,
                fallback_price_wei: env_or_parse(
                    "LEDGER_FALLBACK_PRICE_WEI",
                    defaults.ledger.fallback_price_wei,
                )?,
                read_fallback: env_or_parse(
                    "LEDGER_READ_FALLBACK",
                    defaults.ledger.read_fallback,
                )?,
                read_timeout: Duration::from_millis(env_or_parse("LEDGER_READ_TIMEOUT_MS", 10_000)?),
                transaction_timeout: Duration::from_secs(env_or_parse(
                    "LEDGER_TX_TIMEOUT_SECS",
                    120,
                )?),
                simulated_confirmation: Duration::from_millis(env_or_parse(
                    "LEDGER_SIMULATED_CONFIRMATION_MS",
                    1000,
                )?),
            },
            network: NetworkConfig {
                default_chain_id,
                chain: ChainParams {
                    chain_id: default_chain_id,
                    chain_name: env_or_default("CHAIN_NAME", &defaults.network.chain.chain_name),
                    currency_name: env_or_default(
                        "CHAIN_CURRENCY_NAME",
                        &defaults.network.chain.currency_name,
                    ),
                    currency_symbol: env_or_default(
                        "CHAIN_CURRENCY_SYMBOL",
                        &defaults.network.chain.currency_symbol,
                    ),
                    decimals: env_or_parse("CHAIN_CURRENCY_DECIMALS", 18)?,
                    rpc_urls: env_list("CHAIN_RPC_URLS", defaults.network.chain.rpc_urls),
                    block_explorer_urls: env_list(
                        "CHAIN_EXPLORER_URLS",
                        defaults.network.chain.block_explorer_urls,
                    ),
                },
            },
            canvas: CanvasConfig {
                block_size: env_or_parse("CANVAS_BLOCK_SIZE", defaults.canvas.block_size)?,
                viewport_blocks: env_or_parse(
                    "CANVAS_VIEWPORT_BLOCKS",
                    defaults.canvas.viewport_blocks,
                )?,
                prefetch_blocks: env_or_parse(
                    "CANVAS_PREFETCH_BLOCKS",
                    defaults.canvas.prefetch_blocks,
                )?,
                default_color: env_or_parse("CANVAS_DEFAULT_COLOR", defaults.canvas.default_color)?,
                prefetch_concurrency: env_or_parse(
                    "CANVAS_PREFETCH_CONCURRENCY",
                    defaults.canvas.prefetch_concurrency,
                )?,
            },
            wallet: WalletConfig {
                mock_account: env_or_parse("WALLET_MOCK_ACCOUNT", defaults.wallet.mock_account)?,
            },
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.ledger.default_grid_size == 0 {
            return Err(AppError::InvalidParams("GRID_SIZE must be positive".into()));
        }

        if Address::parse(&self.ledger.contract_address).is_err() {
            return Err(AppError::InvalidParams(
                "CONTRACT_ADDRESS must be a hex address".into(),
            ));
        }

        if self.ledger.read_timeout.is_zero() || self.ledger.transaction_timeout.is_zero() {
            return Err(AppError::InvalidParams(
                "Ledger timeouts must be positive".into(),
            ));
        }

        if self.canvas.block_size == 0 || self.canvas.viewport_blocks == 0 {
            return Err(AppError::InvalidParams(
                "Canvas dimensions must be positive".into(),
            ));
        }

        if self.canvas.prefetch_blocks > self.ledger.default_grid_size {
            return Err(AppError::InvalidParams(
                "CANVAS_PREFETCH_BLOCKS cannot exceed GRID_SIZE".into(),
            ));
        }

        if self.canvas.prefetch_concurrency == 0 {
            return Err(AppError::InvalidParams(
                "CANVAS_PREFETCH_CONCURRENCY must be positive".into(),
            ));
        }

        if self.network.chain.rpc_urls.is_empty() {
            return Err(AppError::InvalidParams(
                "At least one chain RPC URL is required".into(),
            ));
        }

        Ok(())
    }
}

fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(val) => val
            .parse()
            .map_err(|_| AppError::InvalidParams(format!("Invalid value for {key}"))),
        Err(_) => Ok(default),
    }
}

fn env_list(key: &str, default: Vec<String>) -> Vec<String> {
    env::var(key)
        .map(|val| {
            val.split(',')
                .map(|str_val| str_val.trim().to_string())
                .filter(|str_val| !str_val.is_empty())
                .collect()
        })
        .unwrap_or(default)
}
