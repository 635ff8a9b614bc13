use serde::Serialize;
use zenmark_core::config::RemoteConfig;
use zenmark_core::util::normalize_text_option;

use crate::cli::ConfigCommands;
use crate::commands::common::{generate_device_id, load_session_config, CliContext};
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, context: &CliContext) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            user_id,
            device_id,
            remote_url,
            api_key,
            sync_interval,
            no_activate,
        } => run_config_init(
            profile.as_deref().or(context.profile.as_deref()),
            ProfileInput {
                user_id,
                device_id,
                remote_url,
                api_key,
                sync_interval,
            },
            no_activate,
        ),
        ConfigCommands::Show => run_config_show(context),
    }
}

/// Values passed to `config init`; `None` keeps what the profile has.
#[derive(Debug, Default)]
pub struct ProfileInput {
    pub user_id: Option<String>,
    pub device_id: Option<String>,
    pub remote_url: Option<String>,
    pub api_key: Option<String>,
    pub sync_interval: Option<u64>,
}

pub fn run_config_init(
    profile_name: Option<&str>,
    input: ProfileInput,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = apply_profile_input(&mut config, profile_name, input, no_activate)?;

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let has_remote = config
        .profile(&profile_name)
        .is_some_and(|profile| profile.remote_url.is_some());
    if !has_remote {
        println!(
            "Profile '{profile_name}' is local only. Add --remote-url and --api-key to enable sync."
        );
    }
    Ok(())
}

/// Merge `input` into the named profile and return the resolved name.
pub fn apply_profile_input(
    config: &mut CliProfilesConfig,
    profile_name: Option<&str>,
    input: ProfileInput,
    no_activate: bool,
) -> Result<String, CliError> {
    let profile_name = config.resolve_profile_name(profile_name);
    let existing = config.profile(&profile_name).cloned().unwrap_or_default();

    let remote_url = normalize_text_option(input.remote_url).or(existing.remote_url);
    let api_key = normalize_text_option(input.api_key).or(existing.api_key);
    RemoteConfig::resolve(remote_url.clone(), api_key.clone(), None)
        .map_err(|error| CliError::Config(error.to_string()))?;

    if input.sync_interval == Some(0) {
        return Err(CliError::Config(
            "sync interval must be at least one second".to_string(),
        ));
    }

    let profile = config.profile_mut_or_default(&profile_name);
    profile.user_id = normalize_text_option(input.user_id).or(existing.user_id);
    profile.device_id = normalize_text_option(input.device_id)
        .or(existing.device_id)
        .or_else(|| Some(generate_device_id()));
    profile.remote_url = remote_url;
    profile.api_key = api_key;
    profile.sync_interval_secs = input.sync_interval.or(existing.sync_interval_secs);

    if !no_activate || config.active_profile.is_none() {
        config.active_profile = Some(profile_name.clone());
    }
    Ok(profile_name)
}

#[derive(Debug, Serialize)]
struct ResolvedConfigView {
    profile: String,
    db_path: String,
    user_id: String,
    device_id: String,
    remote_url: Option<String>,
    api_key_set: bool,
    access_token_set: bool,
    sync_interval_secs: u64,
    request_timeout_secs: u64,
}

pub fn run_config_show(context: &CliContext) -> Result<(), CliError> {
    let profiles = CliProfilesConfig::load().map_err(CliError::Config)?;
    let session_config = load_session_config(context)?;
    let remote = session_config.remote.as_ref();

    let view = ResolvedConfigView {
        profile: profiles.resolve_profile_name(context.profile.as_deref()),
        db_path: context.db_path.display().to_string(),
        user_id: session_config.user_id.clone(),
        device_id: session_config.device_id.clone(),
        remote_url: remote.map(|remote| remote.url.clone()),
        api_key_set: remote.is_some(),
        access_token_set: remote.is_some_and(|remote| remote.access_token.is_some()),
        sync_interval_secs: session_config.reconcile.interval_secs,
        request_timeout_secs: session_config.reconcile.request_timeout_secs,
    };
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}
