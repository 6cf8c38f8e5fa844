use tracing::debug;

use super::{validate_platform, ProfileContext, ProfileFormState, RenameSnapshot};
use crate::errors::ProfileActionError;
use crate::models::configuration::ConfigurationEntry;
use crate::models::profile::{PlatformConfiguration, DEFAULT_PLATFORM};

pub(super) fn add_target_platform(
    next: &mut ProfileFormState,
    context: &ProfileContext,
    platform: &str,
) -> Result<(), ProfileActionError> {
    let platform = platform.trim();
    if platform.is_empty() {
        return Err(ProfileActionError::EmptyPlatformName);
    }
    if next.input.configurations.contains_key(platform) {
        return Err(ProfileActionError::PlatformExists(platform.to_string()));
    }

    let configuration: PlatformConfiguration = context
        .fallback_for(platform)
        .into_iter()
        .flat_map(|defaults| defaults.values())
        .cloned()
        .map(ConfigurationEntry::overriding_default)
        .collect();

    next.errors.configurations.insert(
        platform.to_string(),
        validate_platform(&configuration, &context.units),
    );
    next.rename_cache.remove(platform);
    next.input
        .configurations
        .insert(platform.to_string(), configuration);
    Ok(())
}

pub(super) fn remove_target_platform(
    next: &mut ProfileFormState,
    platform: &str,
) -> Result<(), ProfileActionError> {
    if platform == DEFAULT_PLATFORM {
        return Err(ProfileActionError::DefaultPlatformRequired);
    }
    if next.input.configurations.remove(platform).is_none() {
        return Err(ProfileActionError::PlatformNotFound(platform.to_string()));
    }
    next.errors.configurations.remove(platform);
    next.rename_cache
        .retain(|_, snapshot| snapshot.renamed_to != platform);
    Ok(())
}

/// Moves `from` to `to`. Renaming straight back to the previous name restores the
/// snapshot cached by that rename instead of re-keying. A snapshot is used at most once.
pub(super) fn rename_target_platform(
    next: &mut ProfileFormState,
    context: &ProfileContext,
    from: &str,
    to: &str,
) -> Result<(), ProfileActionError> {
    let to = to.trim();
    if from == to {
        return Ok(());
    }
    if to.is_empty() {
        return Err(ProfileActionError::EmptyPlatformName);
    }
    if from == DEFAULT_PLATFORM {
        return Err(ProfileActionError::DefaultPlatformRequired);
    }
    if next.input.configurations.contains_key(to) {
        return Err(ProfileActionError::PlatformExists(to.to_string()));
    }
    let Some(configuration) = next.input.configurations.remove(from) else {
        return Err(ProfileActionError::PlatformNotFound(from.to_string()));
    };

    let cached = next
        .rename_cache
        .remove(to)
        .filter(|snapshot| snapshot.renamed_to == from);
    next.rename_cache.insert(
        from.to_string(),
        RenameSnapshot {
            renamed_to: to.to_string(),
            configuration: configuration.clone(),
        },
    );

    let renamed = match cached {
        Some(snapshot) => {
            debug!(from, to, "restoring cached target platform");
            snapshot.configuration
        }
        None => rekey(configuration, context, to),
    };

    next.errors.configurations.remove(from);
    next.errors.configurations.insert(
        to.to_string(),
        validate_platform(&renamed, &context.units),
    );
    next.input.configurations.insert(to.to_string(), renamed);
    Ok(())
}

/// Points inherited entries at the defaults of `platform`.
fn rekey(
    mut configuration: PlatformConfiguration,
    context: &ProfileContext,
    platform: &str,
) -> PlatformConfiguration {
    let Some(defaults) = context.fallback_for(platform) else {
        return configuration;
    };
    for entry in configuration.iter_mut().filter(|entry| !entry.active) {
        if let Some(default_value) = defaults.get(&entry.key) {
            entry.default_value = default_value.clone();
            entry.reset_to_default();
        }
    }
    configuration
}
