//! Loading, editing and saving a single profile.
use tracing::{debug, info, warn};

use crate::errors::{InfraError, InfraResult};
use crate::models::profile::ProfileInput;
use crate::notify::{show_error, Notifier, Toast};
use crate::payload::{form_from_response, ProfilePayload};
use crate::reducer::{ProfileAction, ProfileContext, ProfileFormState};
use crate::service::ProfileService;

pub const RESOLVE_ERRORS_MESSAGE: &str = "Please resolve the errors before saving";
pub const UPDATED_MESSAGE: &str = "Profile updated successfully";
pub const CREATED_MESSAGE: &str = "Profile created successfully";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorMode {
    Create,
    /// Editing the profile currently stored under this name.
    Edit(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A save is already running; nothing was sent.
    InFlight,
    /// The form has validation errors; nothing was sent.
    Blocked,
    Saved { name: String, redirected: bool },
    Failed,
}

pub struct ProfileEditor<S: ProfileService, N: Notifier> {
    service: S,
    notifier: N,
    mode: EditorMode,
    context: ProfileContext,
    state: Option<ProfileFormState>,
    loading: bool,
}

impl<S: ProfileService, N: Notifier> ProfileEditor<S, N> {
    pub fn new(service: S, notifier: N, mode: EditorMode) -> Self {
        Self {
            service,
            notifier,
            mode,
            context: ProfileContext::default(),
            state: None,
            loading: false,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn mode(&self) -> &EditorMode {
        &self.mode
    }

    pub fn context(&self) -> &ProfileContext {
        &self.context
    }

    pub fn state(&self) -> Option<&ProfileFormState> {
        self.state.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Fetches the profile being edited, or the defaults when creating, and rebuilds
    /// the form from it.
    pub async fn load(&mut self) -> InfraResult<()> {
        let fetched = match &self.mode {
            EditorMode::Create => self.service.get_profile(None).await.map(|mut response| {
                response.profile = None;
                response
            }),
            EditorMode::Edit(name) => self.service.get_profile(Some(name)).await,
        };

        let form = fetched.and_then(|response| form_from_response(&response));
        match form {
            Ok((input, context)) => {
                debug!(mode = ?self.mode, "loaded profile form");
                self.state = Some(ProfileFormState::new(input, &context));
                self.context = context;
                Ok(())
            }
            Err(err) => {
                show_error(&self.notifier, &err);
                Err(err)
            }
        }
    }

    /// Applies `action` to the form. Rejected actions are reported to the user and
    /// leave the form unchanged.
    pub fn dispatch(&mut self, action: ProfileAction) -> bool {
        let Some(state) = &self.state else {
            warn!("ignoring action before the profile is loaded");
            return false;
        };
        match state.apply(&self.context, action) {
            Ok(next) => {
                self.state = Some(next);
                true
            }
            Err(err) => {
                self.notifier.notify(Toast::error(err.to_string()));
                false
            }
        }
    }

    /// Saves the form. On success `redirect` receives the saved name; without one the
    /// profile is fetched again.
    pub async fn submit<F: FnOnce(&str)>(&mut self, redirect: Option<F>) -> SubmitOutcome {
        if self.loading {
            debug!("save already in flight");
            return SubmitOutcome::InFlight;
        }
        let input = match &self.state {
            None => {
                show_error(&self.notifier, &InfraError::NotLoaded);
                return SubmitOutcome::Failed;
            }
            Some(state) if state.errors.has_errors() => {
                debug!(errors = ?state.errors.messages(), "save blocked by validation errors");
                self.notifier.notify(Toast::error(RESOLVE_ERRORS_MESSAGE));
                return SubmitOutcome::Blocked;
            }
            Some(state) => state.input.clone(),
        };

        self.loading = true;
        let result = self.save(&input).await;
        self.loading = false;

        match result {
            Ok(name) => {
                let message = match self.mode {
                    EditorMode::Create => CREATED_MESSAGE,
                    EditorMode::Edit(_) => UPDATED_MESSAGE,
                };
                info!(name = %name, "{}", message);
                self.notifier.notify(Toast::success(message));
                self.mode = EditorMode::Edit(name.clone());

                let redirected = match redirect {
                    Some(redirect) => {
                        redirect(&name);
                        true
                    }
                    None => {
                        // Failures are already reported by load.
                        let _ = self.load().await;
                        false
                    }
                };
                SubmitOutcome::Saved { name, redirected }
            }
            Err(err) => {
                show_error(&self.notifier, &err);
                SubmitOutcome::Failed
            }
        }
    }

    /// Saves and then refetches the profile.
    pub async fn submit_and_reload(&mut self) -> SubmitOutcome {
        self.submit(None::<fn(&str)>).await
    }

    async fn save(&self, input: &ProfileInput) -> InfraResult<String> {
        let payload = ProfilePayload::from_input(input)?;
        match &self.mode {
            EditorMode::Create => self.service.create_profile(&payload).await?,
            EditorMode::Edit(name) => self.service.update_profile(name, &payload).await?,
        }
        Ok(payload.name)
    }
}
