//! `bazaar cart ...`
//!
//! Every command opens the signed-in buyer's cart, loads it, performs one
//! action, then prints the resulting notices followed by the cart.

use std::process::ExitCode;

use bazaar_client::{
    CartController, CartError, ClientConfig, FileStore, HttpMarketplaceApi, MarketplaceApi,
    Notice,
};
use bazaar_core::ProductId;

use super::{CommandError, connect};
use crate::render;

type Controller = CartController<HttpMarketplaceApi, FileStore>;

/// An opened cart plus the notices gathered while working on it.
struct Session {
    controller: Controller,
    notices: Vec<Notice>,
    failed: bool,
}

impl Session {
    async fn open(config: &ClientConfig) -> Result<Self, CommandError> {
        let (api, profile) = connect(config).await?;
        let store = FileStore::new(&config.state_dir);
        let controller = CartController::new(api, store, &profile)?;

        let mut session = Self {
            controller,
            notices: Vec::new(),
            failed: false,
        };
        session.load().await;
        Ok(session)
    }

    async fn load(&mut self) {
        match self.controller.load().await {
            Ok(outcome) => self.notices.extend(outcome.notice()),
            Err(e) => self.fail(&e),
        }
    }

    fn fail(&mut self, err: &CartError) {
        tracing::warn!(error = %err, "Cart action failed");
        self.notices.push(Notice::from(err));
        self.failed = true;
    }

    fn finish(self) -> ExitCode {
        render::print_notices(&self.notices);
        render::print_cart(self.controller.cart());
        if self.failed {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }
}

pub async fn show(config: &ClientConfig) -> Result<ExitCode, CommandError> {
    Ok(Session::open(config).await?.finish())
}

pub async fn add(
    config: &ClientConfig,
    product_id: &str,
    quantity: u32,
) -> Result<ExitCode, CommandError> {
    let mut session = Session::open(config).await?;
    let product_id = ProductId::new(product_id);

    match session.controller.api().product(&product_id).await {
        Ok(product) => match session.controller.add_to_cart(&product, quantity).await {
            Ok(message) => {
                session.notices.push(Notice::success(message));
                session.load().await;
            }
            Err(e) => session.fail(&e),
        },
        Err(e) => session.fail(&CartError::Api(e)),
    }

    Ok(session.finish())
}

pub async fn adjust(
    config: &ClientConfig,
    item_id: &str,
    delta: i64,
) -> Result<ExitCode, CommandError> {
    let mut session = Session::open(config).await?;

    match session.controller.update_quantity(item_id, delta).await {
        Ok(quantity) => session
            .notices
            .push(Notice::success(format!("Quantity updated to {quantity}"))),
        Err(e) => session.fail(&e),
    }

    Ok(session.finish())
}

pub async fn remove(config: &ClientConfig, item_id: &str) -> Result<ExitCode, CommandError> {
    let mut session = Session::open(config).await?;

    match session.controller.remove_item(item_id).await {
        Ok(()) => session.notices.push(Notice::success("Item removed")),
        Err(e) => session.fail(&e),
    }

    Ok(session.finish())
}

pub async fn checkout(config: &ClientConfig) -> Result<ExitCode, CommandError> {
    let mut session = Session::open(config).await?;

    match session.controller.checkout().await {
        Ok(redirect) => {
            session.notices.push(Notice::success("Redirecting to checkout"));
            render::print_notices(&session.notices);
            render::print_checkout(&redirect);
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => session.fail(&e),
    }

    Ok(session.finish())
}
