#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkInfo {
    pub chain_id: u64,
    pub name: &'static str,
    pub currency: &'static str,
    pub block_explorer: &'static str,
    pub rpc_url: Option<&'static str>,
}

pub const KNOWN_NETWORKS: &[NetworkInfo] = &[
    NetworkInfo {
        chain_id: 1,
        name: "Ethereum Mainnet",
        currency: "ETH",
        block_explorer: "https://etherscan.io",
        rpc_url: None,
    },
    NetworkInfo {
        chain_id: 5,
        name: "Goerli Testnet",
        currency: "ETH",
        block_explorer: "https://goerli.etherscan.io",
        rpc_url: None,
    },
    NetworkInfo {
        chain_id: 11155111,
        name: "Sepolia Testnet",
        currency: "ETH",
        block_explorer: "https://sepolia.etherscan.io",
        rpc_url: None,
    },
    NetworkInfo {
        chain_id: 8453,
        name: "Base Mainnet",
        currency: "ETH",
        block_explorer: "https://basescan.org",
        rpc_url: Some("https://mainnet.base.org"),
    },
    NetworkInfo {
        chain_id: 84531,
        name: "Base Goerli Testnet",
        currency: "ETH",
        block_explorer: "https://goerli.basescan.org",
        rpc_url: Some("https://goerli.base.org"),
    },
    NetworkInfo {
        chain_id: 137,
        name: "Polygon Mainnet",
        currency: "MATIC",
        block_explorer: "https://polygonscan.com",
        rpc_url: None,
    },
    NetworkInfo {
        chain_id: 80001,
        name: "Mumbai Testnet",
        currency: "MATIC",
        block_explorer: "https://mumbai.polygonscan.com",
        rpc_url: None,
    },
];

pub fn find_network(chain_id: u64) -> Option<&'static NetworkInfo> {
    KNOWN_NETWORKS
        .iter()
        .find(|network| network.chain_id == chain_id)
}
