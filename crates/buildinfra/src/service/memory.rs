//! An in-process orchestrator backing the stub server and the tests.
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::ProfileService;
use crate::errors::{InfraError, InfraResult};
use crate::models::configuration::ConfigKey;
use crate::models::profile::{ProfileType, DEFAULT_PLATFORM, DEFAULT_PROFILE_NAME};
use crate::models::units::{Unit, UnitCatalog};
use crate::payload::{
    ConfigurationDto, ProfileDto, ProfileListResponse, ProfilePayload, ProfileResponse,
};
use crate::validation::validate_profile_name;

/// A call received by [`InMemoryProfileService`].
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCall {
    GetProfile(Option<String>),
    CreateProfile(ProfilePayload),
    UpdateProfile(String, ProfilePayload),
    ListProfiles,
    DeleteProfile(String),
}

#[derive(Debug)]
struct Store {
    defaults: BTreeMap<String, Vec<ConfigurationDto>>,
    units: BTreeMap<String, Vec<Unit>>,
    profiles: BTreeMap<String, ProfileDto>,
    next_id: i64,
    calls: Vec<ServiceCall>,
    failure: Option<(u16, String)>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn assign_ids(&mut self, configurations: &mut BTreeMap<String, Vec<ConfigurationDto>>) {
        for dtos in configurations.values_mut() {
            for dto in dtos.iter_mut() {
                dto.profile_name = None;
                if dto.id.is_none() {
                    dto.id = Some(self.next_id());
                }
            }
        }
    }

    fn default_profile(&self) -> ProfileDto {
        ProfileDto {
            id: Some(1),
            name: DEFAULT_PROFILE_NAME.to_string(),
            description: "Default configuration applied to every build".to_string(),
            profile_type: ProfileType::Default,
            app_count: Some(0),
            configurations: self.defaults.clone(),
        }
    }

    fn take_failure(&mut self) -> InfraResult<()> {
        match self.failure.take() {
            Some((status, message)) => Err(InfraError::Api { status, message }),
            None => Ok(()),
        }
    }

    /// Merges the active entries of `payload` into the defaults.
    fn update_defaults(&mut self, payload: &ProfilePayload) {
        for (platform, dtos) in &payload.configurations {
            let mut merged: Vec<ConfigurationDto> =
                self.defaults.get(platform).cloned().unwrap_or_default();
            for dto in dtos.iter().filter(|dto| dto.active) {
                match merged.iter_mut().find(|existing| existing.key == dto.key) {
                    Some(existing) => {
                        existing.value = dto.value.clone();
                        existing.unit = dto.unit.clone();
                    }
                    None => {
                        let mut dto = dto.clone();
                        dto.id = Some(self.next_id());
                        dto.profile_name = Some(DEFAULT_PROFILE_NAME.to_string());
                        merged.push(dto);
                    }
                }
            }
            self.defaults.insert(platform.clone(), merged);
        }
    }
}

fn default_entry(id: i64, key: ConfigKey, value: serde_json::Value, unit: Option<&str>) -> ConfigurationDto {
    ConfigurationDto {
        id: Some(id),
        key: key.to_string(),
        value,
        unit: unit.map(str::to_string),
        active: true,
        profile_name: Some(DEFAULT_PROFILE_NAME.to_string()),
    }
}

fn conflict(name: &str) -> InfraError {
    InfraError::Api {
        status: 409,
        message: format!("Profile {} already exists", name),
    }
}

fn bad_request<S: Into<String>>(message: S) -> InfraError {
    InfraError::Api {
        status: 400,
        message: message.into(),
    }
}

fn check_name(name: &str) -> InfraResult<()> {
    if let Some(message) = validate_profile_name(name).into_message() {
        return Err(bad_request(message));
    }
    if name == DEFAULT_PROFILE_NAME {
        return Err(bad_request(format!("{} is a reserved profile name", name)));
    }
    Ok(())
}

pub struct InMemoryProfileService {
    store: Mutex<Store>,
}

impl Default for InMemoryProfileService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProfileService {
    /// A store holding only the default profile.
    pub fn new() -> Self {
        let defaults = vec![
            default_entry(1, ConfigKey::CpuRequest, json!(500), Some("m")),
            default_entry(2, ConfigKey::CpuLimit, json!(1), Some("Core")),
            default_entry(3, ConfigKey::MemoryRequest, json!(1), Some("Gi")),
            default_entry(4, ConfigKey::MemoryLimit, json!(2), Some("Gi")),
            default_entry(5, ConfigKey::Timeout, json!(3600), Some("Seconds")),
            default_entry(6, ConfigKey::NodeSelector, json!([]), None),
            default_entry(7, ConfigKey::Toleration, json!([]), None),
        ];
        let units = UnitCatalog::builtin()
            .iter()
            .map(|(key, units)| (key.to_string(), units.to_vec()))
            .collect();

        let mut platforms = BTreeMap::new();
        platforms.insert(DEFAULT_PLATFORM.to_string(), defaults);

        Self {
            store: Mutex::new(Store {
                defaults: platforms,
                units,
                profiles: BTreeMap::new(),
                next_id: 100,
                calls: Vec::new(),
                failure: None,
            }),
        }
    }

    /// Adds defaults for another target platform.
    pub async fn with_platform_defaults(self, platform: &str, defaults: Vec<ConfigurationDto>) -> Self {
        self.store
            .lock()
            .await
            .defaults
            .insert(platform.to_string(), defaults);
        self
    }

    /// Stores `payload` as if it had been created.
    pub async fn seed(&self, payload: ProfilePayload) -> InfraResult<()> {
        self.create(payload).await
    }

    /// Makes the next call fail with `status` and `message`.
    pub async fn fail_next(&self, status: u16, message: &str) {
        self.store.lock().await.failure = Some((status, message.to_string()));
    }

    pub async fn calls(&self) -> Vec<ServiceCall> {
        self.store.lock().await.calls.clone()
    }

    pub async fn profile(&self, name: &str) -> Option<ProfileDto> {
        self.store.lock().await.profiles.get(name).cloned()
    }

    async fn create(&self, payload: ProfilePayload) -> InfraResult<()> {
        check_name(&payload.name)?;
        let mut store = self.store.lock().await;
        if store.profiles.contains_key(&payload.name) {
            return Err(conflict(&payload.name));
        }

        let mut configurations = payload.configurations;
        store.assign_ids(&mut configurations);
        let id = store.next_id();
        info!(name = %payload.name, id, "created profile");
        store.profiles.insert(
            payload.name.clone(),
            ProfileDto {
                id: Some(id),
                name: payload.name,
                description: payload.description,
                profile_type: ProfileType::Normal,
                app_count: Some(0),
                configurations,
            },
        );
        Ok(())
    }
}

#[async_trait]
impl ProfileService for InMemoryProfileService {
    async fn get_profile(&self, name: Option<&str>) -> InfraResult<ProfileResponse> {
        let mut store = self.store.lock().await;
        store.calls.push(ServiceCall::GetProfile(name.map(str::to_string)));
        store.take_failure()?;

        let name = name.unwrap_or(DEFAULT_PROFILE_NAME);
        let profile = if name == DEFAULT_PROFILE_NAME {
            store.default_profile()
        } else {
            store
                .profiles
                .get(name)
                .cloned()
                .ok_or_else(|| InfraError::NotFound(name.to_string()))?
        };
        debug!(name, "serving profile");

        Ok(ProfileResponse {
            default_configurations: store.defaults.clone(),
            configuration_units: store.units.clone(),
            profile: Some(profile),
        })
    }

    async fn create_profile(&self, payload: &ProfilePayload) -> InfraResult<()> {
        {
            let mut store = self.store.lock().await;
            store.calls.push(ServiceCall::CreateProfile(payload.clone()));
            store.take_failure()?;
        }
        self.create(payload.clone()).await
    }

    async fn update_profile(&self, name: &str, payload: &ProfilePayload) -> InfraResult<()> {
        let mut store = self.store.lock().await;
        store
            .calls
            .push(ServiceCall::UpdateProfile(name.to_string(), payload.clone()));
        store.take_failure()?;

        if name == DEFAULT_PROFILE_NAME {
            store.update_defaults(payload);
            info!("updated default profile");
            return Ok(());
        }

        let Some(existing) = store.profiles.remove(name) else {
            return Err(InfraError::NotFound(name.to_string()));
        };
        if payload.name != name {
            let taken = store.profiles.contains_key(&payload.name);
            if let Err(error) = check_name(&payload.name).and_then(|_| {
                if taken {
                    Err(conflict(&payload.name))
                } else {
                    Ok(())
                }
            }) {
                store.profiles.insert(name.to_string(), existing);
                return Err(error);
            }
        }

        let mut configurations = payload.configurations.clone();
        store.assign_ids(&mut configurations);
        info!(from = name, to = %payload.name, "updated profile");
        store.profiles.insert(
            payload.name.clone(),
            ProfileDto {
                name: payload.name.clone(),
                description: payload.description.clone(),
                configurations,
                ..existing
            },
        );
        Ok(())
    }

    async fn list_profiles(&self) -> InfraResult<ProfileListResponse> {
        let mut store = self.store.lock().await;
        store.calls.push(ServiceCall::ListProfiles);
        store.take_failure()?;

        Ok(ProfileListResponse {
            default_profile: Some(store.default_profile()),
            profiles: store.profiles.values().cloned().collect(),
            configuration_units: store.units.clone(),
        })
    }

    async fn delete_profile(&self, name: &str) -> InfraResult<()> {
        let mut store = self.store.lock().await;
        store.calls.push(ServiceCall::DeleteProfile(name.to_string()));
        store.take_failure()?;

        if name == DEFAULT_PROFILE_NAME {
            return Err(bad_request("The default profile cannot be deleted"));
        }
        store
            .profiles
            .remove(name)
            .map(|_| info!(name, "deleted profile"))
            .ok_or_else(|| InfraError::NotFound(name.to_string()))
    }
}
