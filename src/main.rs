use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use gazette::build::{build_site, Target};
use gazette::config::Config;
use std::path::Path;
use tracing::error;

fn main() {
    let matches = App::new("gazette")
        .about("Regenerates a newsletter's archive page, RSS feed, and sitemap")
        .version(env!("CARGO_PKG_VERSION"))
        .setting(AppSettings::VersionlessSubcommands)
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .takes_value(true)
                .global(true)
                .help("Path to the project file (default: search for gazette.yaml)"),
        )
        .arg(
            Arg::with_name("date")
                .long("date")
                .value_name("YYYY-MM-DD")
                .takes_value(true)
                .global(true)
                .help("Build date used for undated sitemap entries (default: today)"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .global(true)
                .help("Log every extracted issue"),
        )
        .subcommand(SubCommand::with_name("build").about("Build the archive page, feed, and sitemap"))
        .subcommand(SubCommand::with_name("archive").about("Build the archive page only"))
        .subcommand(SubCommand::with_name("feed").about("Build the RSS feed only"))
        .subcommand(SubCommand::with_name("sitemap").about("Build the sitemap only"))
        .get_matches();

    init_logging(matches.is_present("verbose"));

    if let Err(e) = run(&matches) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<()> {
    let targets: &[Target] = match matches.subcommand_name() {
        Some("archive") => &[Target::Archive],
        Some("feed") => &[Target::Feed],
        Some("sitemap") => &[Target::Sitemap],
        _ => &Target::ALL,
    };

    // Global args are propagated to the subcommand's matches.
    let matches = match matches.subcommand() {
        (_, Some(sub)) => sub,
        _ => matches,
    };

    let config = match matches.value_of("config") {
        Some(path) => Config::from_project_file(Path::new(path))?,
        None => Config::from_directory(&std::env::current_dir()?)?,
    };

    let today = match matches.value_of("date") {
        Some(date) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| anyhow::anyhow!("Invalid --date `{}`: {}", date, e))?,
        None => Utc::now().date_naive(),
    };

    build_site(&config, targets, today)?;
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = match verbose {
        true => "debug",
        false => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_target(false)
        .init();
}
