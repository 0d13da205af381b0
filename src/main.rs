use clap::Parser;
use colored::Colorize;
use ipam_core::cli::{self, Cli};
use ipam_core::{Config, Ipam, IpamError};
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::error::Error;
use std::path::Path;

const LOG4RS_FILE: &str = "log4rs.yml";

/// log4rs.yml when present, otherwise console logging at the configured level.
fn init_logging(config: &Config) -> Result<(), Box<dyn Error>> {
    if Path::new(LOG4RS_FILE).exists() {
        log4rs::init_file(LOG4RS_FILE, Default::default())?;
        return Ok(());
    }
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {h({l})} {t} - {m}{n}",
        )))
        .build();
    let root = Root::builder()
        .appender("stderr")
        .build(config.level_filter());
    let log_config = log4rs::config::Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(root)?;
    log4rs::init_config(log_config)?;
    Ok(())
}

fn report(e: &IpamError) {
    eprintln!("{} {e}", "Error:".red());
    if let IpamError::CsvRows(rows) = e {
        for row in rows {
            eprintln!("  {row}");
        }
    }
    if let Some(source) = e.source() {
        log::error!("caused by: {source}");
    }
}

fn main() {
    // Do as little as possible in main.rs as it can't contain any tests
    dotenv::dotenv().ok();
    let args = Cli::parse();

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            report(&e);
            std::process::exit(2);
        }
    };
    init_logging(&config).expect("Error initializing log4rs");
    log::info!("#Start main()");

    let ipam = match Ipam::open(config) {
        Ok(ipam) => ipam,
        Err(e) => {
            report(&e);
            std::process::exit(1);
        }
    };
    match cli::run(&ipam, args.command) {
        Ok(out) => print!("{out}"),
        Err(e) => {
            report(&e);
            std::process::exit(1);
        }
    }
}
