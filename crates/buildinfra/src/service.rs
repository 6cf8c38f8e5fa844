pub mod client;
pub mod memory;

use async_trait::async_trait;

use crate::errors::InfraResult;
use crate::payload::{ProfileListResponse, ProfilePayload, ProfileResponse};

pub const PROFILE_PATH: &str = "orchestrator/infra-config/profile";

/// The orchestrator's infra-config endpoints.
#[async_trait]
pub trait ProfileService: Send + Sync {
    /// Fetches a profile together with the defaults it inherits from. `None` fetches
    /// the default profile.
    async fn get_profile(&self, name: Option<&str>) -> InfraResult<ProfileResponse>;

    async fn create_profile(&self, payload: &ProfilePayload) -> InfraResult<()>;

    /// Updates the profile currently stored under `name`; the payload may rename it.
    async fn update_profile(&self, name: &str, payload: &ProfilePayload) -> InfraResult<()>;

    async fn list_profiles(&self) -> InfraResult<ProfileListResponse>;

    async fn delete_profile(&self, name: &str) -> InfraResult<()>;
}
