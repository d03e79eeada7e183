pub mod address;
pub mod color;
pub mod owner;

pub use address::Address;
pub use color::Color;
pub use owner::Owner;

/// Native-currency amount in the smallest unit (wei).
pub type Wei = u128;

pub const WEI_PER_ETH: Wei = 1_000_000_000_000_000_000;
