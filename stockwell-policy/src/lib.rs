pub mod config;
pub mod departments;
pub mod error;
pub mod thresholds;
pub mod tiers;
pub mod wallets;

pub use departments::StapleRegistry;
pub use error::{PolicyError, PolicyResult};
pub use tiers::{TierKeyframe, TierProfile, TierTable};
pub use wallets::{CapitalWeights, Wallet, WalletBook, GENERAL_WALLET};
