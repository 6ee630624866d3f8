//! Command implementations.

pub mod cart;
pub mod whoami;

use bazaar_client::api::UserProfile;
use bazaar_client::{ApiError, CartError, ClientConfig, HttpMarketplaceApi, MarketplaceApi};
use thiserror::Error;

/// Errors that stop a command before it can act.
///
/// Failures of the action itself are reported as notices instead.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The API client could not be built or the profile could not be fetched.
    #[error("Could not reach the marketplace: {0}")]
    Api(#[from] ApiError),

    /// The session may not use the cart.
    #[error("{}", .0.user_message())]
    Cart(#[from] CartError),
}

/// Build the API client and resolve the signed-in user.
pub async fn connect(config: &ClientConfig) -> Result<(HttpMarketplaceApi, UserProfile), CommandError> {
    let api = HttpMarketplaceApi::new(config)?;
    let profile = api.profile().await?;
    tracing::debug!(user_id = %profile.id, role = %profile.role, "Resolved session");
    Ok((api, profile))
}
