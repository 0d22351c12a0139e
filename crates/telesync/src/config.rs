//! CLI-side profile resolution: config file + global flag overrides.

use clap::ValueEnum;
use telesync_config::{Config, Defaults, Profile, ResolvedProfile};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Fill `--output` / `--color` from the config file's `[defaults]` when
/// neither the flag nor its env var was given.
pub fn apply_display_defaults(global: &mut GlobalOpts, defaults: &Defaults) {
    if global.output.is_none() {
        global.output = parse_default("output", &defaults.output);
    }
    if global.color.is_none() {
        global.color = parse_default("color", &defaults.color);
    }
}

fn parse_default<T: ValueEnum>(key: &str, value: &str) -> Option<T> {
    match T::from_str(value, true) {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(key, value, "ignoring unknown value in config defaults");
            None
        }
    }
}

/// Build the effective settings from the config file, profile and flags.
///
/// Flags win over the profile. Without a matching profile, `--server`
/// alone is enough to run with default settings.
pub fn resolve(global: &GlobalOpts) -> Result<ResolvedProfile, CliError> {
    let cfg = telesync_config::load_config()?;
    let name = active_profile_name(global, &cfg);

    let mut profile = match (cfg.profiles.get(&name), global.server.as_deref()) {
        (Some(profile), _) => profile.clone(),
        (None, Some(server)) => Profile::new(server),
        (None, None) if global.profile.is_some() => {
            let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
            available.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        (None, None) => {
            return Err(CliError::NoConfig {
                path: telesync_config::config_path().display().to_string(),
            });
        }
    };

    if let Some(ref server) = global.server {
        profile.server.clone_from(server);
    }
    if let Some(ref push_url) = global.push_url {
        profile.push_url = Some(push_url.clone());
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }

    let resolved = telesync_config::resolve_profile(&profile, &name, &cfg.defaults)?;
    tracing::debug!(
        profile = %resolved.name,
        server = %resolved.server,
        push_url = %resolved.push_url,
        "resolved profile"
    );
    Ok(resolved)
}
