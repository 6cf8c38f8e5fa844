use anyhow::{Context, Result};
use buildinfra::service::client::ClientConfig;
use buildinfra::service::ProfileService;
use console::style;

use super::connect;

pub async fn handle_delete(config: ClientConfig, name: &str, yes: bool) -> Result<()> {
    if !yes
        && !cliclack::confirm(format!("Delete profile {}?", name))
            .initial_value(false)
            .interact()?
    {
        let _ = cliclack::log::info("Nothing deleted");
        return Ok(());
    }

    let client = connect(config)?;
    client
        .delete_profile(name)
        .await
        .with_context(|| format!("Failed to delete profile {}", name))?;
    println!("{} {}", style("Deleted").green(), name);
    Ok(())
}
