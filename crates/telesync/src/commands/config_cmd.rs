//! Config subcommand handlers.

use telesync_config::{self as config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, ConfigInitArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init(init) => handle_init(init, global),

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let toml_text = toml::to_string_pretty(&cfg)?;
            let rendered = output::render_single(
                global.output_format(),
                &cfg,
                |_| toml_text.trim_end().to_owned(),
                |_| toml_text.trim_end().to_owned(),
            )?;
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
    }
}

fn handle_init(init: ConfigInitArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let server: url::Url = init.url.parse().map_err(|_| CliError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {}", init.url),
    })?;
    // Fail before writing anything the resolver would later reject.
    config::derive_push_url(&server)?;

    // A file that fails to parse is reported, never replaced.
    let mut cfg = config::load_config()?;
    if cfg.profiles.contains_key(&init.name) && !init.force {
        return Err(CliError::Validation {
            field: "name".into(),
            reason: format!("profile '{}' already exists (use --force to replace it)", init.name),
        });
    }

    if cfg.profiles.is_empty() {
        cfg.default_profile = Some(init.name.clone());
    }
    cfg.profiles.insert(init.name.clone(), Profile::new(init.url));

    let path = config::save_config(&cfg)?;
    if !global.quiet {
        eprintln!("Saved profile '{}' to {}", init.name, path.display());
    }
    Ok(())
}
