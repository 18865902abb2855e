use crate::{
    api::{AuthConfig, IconPolicy},
    cli::{
        actions::{server::Args, Action},
        commands::auth::{ARG_COOKIE_NAME, ARG_PASSWORD, ARG_SESSION_DAYS, ARG_SESSION_SECRET},
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// # Errors
/// Returns an error if a required argument is missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let mut auth = AuthConfig::new();
    if let Some(password) = matches.get_one::<String>(ARG_PASSWORD) {
        auth = auth.with_password(SecretString::from(password.clone()));
    }
    if let Some(secret) = matches.get_one::<String>(ARG_SESSION_SECRET) {
        auth = auth.with_session_secret(SecretString::from(secret.clone()));
    }
    if let Some(days) = matches.get_one::<u32>(ARG_SESSION_DAYS) {
        auth = auth.with_session_days(*days);
    }
    if let Some(name) = matches.get_one::<String>(ARG_COOKIE_NAME) {
        auth = auth.with_cookie_name(name.clone());
    }

    let icons = IconPolicy::from_flag(
        matches
            .get_one::<bool>("favicon-service")
            .copied()
            .unwrap_or(false),
    );

    Ok(Action::Server(Args {
        port,
        dsn,
        auth,
        icons,
        assets_dir: matches.get_one::<String>("assets-dir").cloned(),
    }))
}
