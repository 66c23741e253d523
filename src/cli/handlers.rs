//! Subcommand handlers
//!
//! Each handler returns the process exit code: 0 on success, 1 on error and
//! 2 when no plan could be built for the request.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::commands::{query_text, AskArgs, ConfigArgs, LlmArgs, PlanArgs, ToolsArgs};
use super::output::{OutputFormat, OutputFormatter};
use crate::config::{default_model_for, AiopsConfig};
use crate::llm::select_llm_client;
use crate::pipeline::{AssistantError, Planner};
use crate::progress::LoggingHandler;
use crate::tools::ToolRegistry;
use crate::Assistant;

pub const EXIT_OK: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_PLANNING_FAILED: i32 = 2;

pub fn exit_code_for(err: &AssistantError) -> i32 {
    match err {
        AssistantError::Planning(_) => EXIT_PLANNING_FAILED,
        _ => EXIT_ERROR,
    }
}

/// Environment configuration with command-line overrides applied
pub fn build_config(llm: &LlmArgs) -> Result<AiopsConfig> {
    let defaults = AiopsConfig::default();

    let model = match (&llm.model, llm.provider) {
        (Some(model), _) => model.clone(),
        (None, Some(provider)) if std::env::var("AIOPS_MODEL").is_err() => {
            default_model_for(provider).to_string()
        }
        _ => defaults.model.clone(),
    };

    let config = AiopsConfig {
        provider: llm.provider.unwrap_or(defaults.provider),
        model,
        request_timeout_secs: llm.timeout.unwrap_or(defaults.request_timeout_secs),
        ..defaults
    };
    if llm.provider.is_some() {
        debug!("Provider explicitly set to: {:?}", config.provider);
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Cancels the token on Ctrl-C
fn cancel_on_interrupt() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling request");
            child.cancel();
        }
    });
    token
}

fn print_output(formatted: Result<String>) -> i32 {
    match formatted {
        Ok(output) => {
            println!("{}", output.trim_end());
            EXIT_OK
        }
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            EXIT_ERROR
        }
    }
}

pub async fn handle_ask(args: &AskArgs, quiet: bool) -> i32 {
    let query = query_text(&args.query);

    let mut config = match build_config(&args.llm) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            eprintln!("\nPlease check your environment variables and command-line arguments.");
            return EXIT_ERROR;
        }
    };
    if args.fallback {
        config.verifier_fallback = true;
    }

    let assistant = match Assistant::from_config(&config) {
        Ok(assistant) => assistant,
        Err(e) => {
            let err = AssistantError::Planning(e.into());
            eprintln!("{}", err.help_message());
            return EXIT_ERROR;
        }
    };
    let assistant = if quiet {
        assistant
    } else {
        assistant.with_progress(Arc::new(LoggingHandler))
    };

    let token = cancel_on_interrupt();
    let report = match assistant.run_query(&query, &token).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{}", e.help_message());
            return exit_code_for(&e);
        }
    };

    info!(
        complete = report.answer.complete,
        retry_cycles = report.retry_cycles,
        "Answer ready"
    );

    let formatter = OutputFormatter::new(args.format.into());
    print_output(formatter.format_report(&report, args.show_plan))
}

pub async fn handle_plan(args: &PlanArgs) -> i32 {
    let query = query_text(&args.query);

    let config = match build_config(&args.llm) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return EXIT_ERROR;
        }
    };

    let selected = match select_llm_client(&config) {
        Ok(selected) => selected,
        Err(e) => {
            eprintln!("{}", AssistantError::Planning(e.into()).help_message());
            return EXIT_ERROR;
        }
    };
    let registry = Arc::new(ToolRegistry::with_defaults(&config));
    let planner = Planner::new(selected.client, registry);

    match planner.plan(&query).await {
        Ok(plan) => {
            let formatter = OutputFormatter::new(args.format.into());
            print_output(formatter.format_plan(&plan))
        }
        Err(e) => {
            let err = AssistantError::from(e);
            eprintln!("{}", err.help_message());
            exit_code_for(&err)
        }
    }
}

pub fn handle_tools(args: &ToolsArgs) -> i32 {
    let config = AiopsConfig::default();
    let registry = ToolRegistry::with_defaults(&config);
    let formatter = OutputFormatter::new(args.format.into());
    print_output(formatter.format_tools(&registry.specs()))
}

pub fn handle_config(args: &ConfigArgs) -> i32 {
    let config = AiopsConfig::default();
    if let Err(e) = config.validate() {
        warn!("Configuration is invalid: {}", e);
    }
    let format: OutputFormat = args.format.into();
    print_output(OutputFormatter::new(format).format_config(&config))
}
