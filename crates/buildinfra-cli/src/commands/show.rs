use anyhow::{Context, Result};
use buildinfra::payload::form_from_response;
use buildinfra::service::client::ClientConfig;
use buildinfra::service::ProfileService;

use super::connect;
use crate::render::{print_yaml, profile_yaml};

pub async fn handle_show(config: ClientConfig, name: &str) -> Result<()> {
    let client = connect(config)?;
    let response = client
        .get_profile(Some(name))
        .await
        .with_context(|| format!("Failed to fetch profile {}", name))?;
    let (input, _) = form_from_response(&response)?;

    print_yaml(&profile_yaml(&input)?)
}
