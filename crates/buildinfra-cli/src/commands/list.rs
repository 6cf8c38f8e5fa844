use anyhow::{Context, Result};
use buildinfra::service::client::ClientConfig;
use buildinfra::service::ProfileService;
use cliclack::spinner;

use super::connect;
use crate::render::print_profiles;

pub async fn handle_list(config: ClientConfig) -> Result<()> {
    let client = connect(config)?;

    let spin = spinner();
    spin.start("fetching profiles");
    let result = client.list_profiles().await;
    spin.stop("");

    let list = result.context("Failed to list profiles")?;
    print_profiles(&list);
    Ok(())
}
