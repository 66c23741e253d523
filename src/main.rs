use aiops::cli::commands::{CliArgs, Commands};
use aiops::cli::handlers::{handle_ask, handle_config, handle_plan, handle_tools};
use aiops::util::logging::{config_from_env, init_logging, parse_level};
use aiops::{NAME, VERSION};

use clap::Parser;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    // A missing .env file is fine; real environment variables still apply
    let dotenv = dotenvy::dotenv();

    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("{} v{} starting", NAME, VERSION);
    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) => debug!("No .env file loaded: {}", e),
    }
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Ask(ask_args) => handle_ask(ask_args, args.quiet).await,
        Commands::Plan(plan_args) => handle_plan(plan_args).await,
        Commands::Tools(tools_args) => handle_tools(tools_args),
        Commands::Config(config_args) => handle_config(config_args),
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let mut config = config_from_env();
    if let Some(level_str) = &args.log_level {
        config.level = parse_level(level_str);
    } else if args.verbose {
        config.level = Level::DEBUG;
    } else if args.quiet {
        config.level = Level::ERROR;
    }
    init_logging(config);
}
