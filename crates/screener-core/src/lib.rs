pub mod config;
pub mod error;
pub mod market;
pub mod metrics;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::*;
pub use market::MarketSegment;
pub use traits::*;
pub use types::*;
