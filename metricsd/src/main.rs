use clap::{Arg, ArgAction, Command};
use metricsd_core::{
    config::{Config, CONFIG_ENV},
    logging, Agent, HttpForwarder, SystemSampler,
};
use std::{path::PathBuf, process};

fn main() {
    match run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn cli() -> Command {
    Command::new("metricsd")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Samples host counters and forwards them to a time-series database")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to the JSON configuration file")
                .env(CONFIG_ENV)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("once")
                .long("once")
                .help("Run a single tick and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("check-config")
                .long("check-config")
                .help("Load and validate the configuration, then exit")
                .action(ArgAction::SetTrue)
                .conflicts_with("once"),
        )
}

fn run() -> anyhow::Result<i32> {
    let matches = cli().get_matches();

    // Config errors are fatal and happen before logging exists
    let config_path = matches.get_one::<PathBuf>("config");
    let config = Config::load(config_path.map(PathBuf::as_path))?;

    if matches.get_flag("check-config") {
        print_summary(&config);
        return Ok(0);
    }

    logging::init_logging(&config.logging)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        endpoint = %config.database.url,
        "metricsd starting"
    );

    let sampler = SystemSampler::new()?;
    let forwarder = HttpForwarder::new(&config.database);
    let mut agent = Agent::new(&config, sampler, forwarder);

    if matches.get_flag("once") {
        let ok = agent.run_once();
        return Ok(if ok { 0 } else { 1 });
    }

    agent.run()
}

fn print_summary(config: &Config) {
    let enabled: Vec<&str> = config.metrics.enabled().map(|kind| kind.as_str()).collect();

    println!("interval:    {}s", config.collection_interval);
    println!(
        "metrics:     {}",
        if enabled.is_empty() {
            "(none)".to_string()
        } else {
            enabled.join(", ")
        }
    );
    println!("endpoint:    {}", config.database.url);
    println!(
        "auth:        {}",
        config
            .database
            .auth
            .as_ref()
            .map_or("none", |auth| auth.username.as_str())
    );
    println!(
        "log file:    {}",
        config
            .logging
            .log_file
            .as_ref()
            .map_or_else(|| "stderr".to_string(), |p| p.display().to_string())
    );
    println!("log level:   {}", config.logging.log_level);
}
