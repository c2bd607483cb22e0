// 9.0 venue.rs: shared failure type for every external collaborator, plus the
// vault asset pricer. collaborators are synchronous: a call either fully applies
// or returns a VenueError. engines commit each call that lands, or reverse it,
// so their state matches the venue after any failure.

use crate::types::Price;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VenueError {
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u128, available: u128 },

    #[error("Output {actual} below minimum {min_output}")]
    SlippageExceeded { min_output: u128, actual: u128 },

    #[error("Insufficient liquidity in range order")]
    InsufficientLiquidity,

    #[error("Venue rejected call: {0}")]
    Rejected(String),
}

// market value of one unit of the vault asset, in quote terms
pub trait AssetPricer {
    fn asset_price(&self) -> Result<Price, VenueError>;
}

#[derive(Debug, Clone, Copy)]
pub struct FixedAssetPrice(pub Price);

impl AssetPricer for FixedAssetPrice {
    fn asset_price(&self) -> Result<Price, VenueError> {
        Ok(self.0)
    }
}
