use clap::{Arg, Command};

pub const ARG_PASSWORD: &str = "password";
pub const ARG_SESSION_SECRET: &str = "session-secret";
pub const ARG_SESSION_DAYS: &str = "session-days";
pub const ARG_COOKIE_NAME: &str = "cookie-name";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PASSWORD)
                .long(ARG_PASSWORD)
                .help("Admin password; without it every admin route answers 503")
                .env("CLOUDNAV_PASSWORD")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_SESSION_SECRET)
                .long(ARG_SESSION_SECRET)
                .help("Session signing secret (default: derived from the password)")
                .env("CLOUDNAV_SESSION_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_SESSION_DAYS)
                .long(ARG_SESSION_DAYS)
                .help("Session lifetime in days")
                .default_value("7")
                .env("CLOUDNAV_SESSION_DAYS")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_COOKIE_NAME)
                .long(ARG_COOKIE_NAME)
                .help("Session cookie name")
                .default_value("cloudnav_session")
                .env("CLOUDNAV_COOKIE_NAME"),
        )
}
