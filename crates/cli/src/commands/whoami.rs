//! `bazaar whoami`

use std::process::ExitCode;

use bazaar_client::ClientConfig;

use super::{CommandError, connect};
use crate::render;

pub async fn run(config: &ClientConfig) -> Result<ExitCode, CommandError> {
    let (_, profile) = connect(config).await?;
    render::print_profile(&profile);
    Ok(ExitCode::SUCCESS)
}
