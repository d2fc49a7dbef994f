pub mod feed;
pub mod market;
pub mod options;

pub use feed::{ChainData, ChainPayload, ExpiryGroup, OptionQuote, StrikeEntry, UnderlyingQuote};
pub use market::MarketSnapshot;
pub use options::{ExpiryGamma, OptionContract, OptionLeg, OptionType, StrikeGamma, StrikeRecord};
