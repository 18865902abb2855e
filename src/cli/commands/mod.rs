pub mod auth;
pub mod logging;

use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        BoolishValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

pub const DEFAULT_DSN: &str = "sqlite://cloudnav.db?mode=rwc";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!(
            "{} - {}",
            env!("CARGO_PKG_VERSION"),
            crate::api::GIT_COMMIT_HASH
        )
        .into_boxed_str(),
    );

    let command = Command::new("cloudnav")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("CLOUDNAV_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Document store, a sqlite URL or memory:// for a volatile store")
                .default_value(DEFAULT_DSN)
                .env("CLOUDNAV_DSN"),
        )
        .arg(
            Arg::new("assets-dir")
                .long("assets-dir")
                .help("Directory with the static app shell served for non-API paths")
                .env("CLOUDNAV_ASSETS_DIR"),
        )
        .arg(
            Arg::new("favicon-service")
                .long("favicon-service")
                .help("Derive link icons from a favicon service instead of <origin>/favicon.ico")
                .env("CLOUDNAV_USE_FAVICON_SERVICE")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        );

    let command = auth::with_args(command);
    logging::with_args(command)
}
