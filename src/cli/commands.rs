use clap::{Parser, Subcommand, ValueEnum};
use genai::adapter::AdapterKind;

/// AI operations assistant: answers weather, news and joke requests
#[derive(Parser, Debug)]
#[command(
    name = "aiops",
    about = "AI operations assistant: plans, executes and verifies multi-tool queries",
    version,
    long_about = "aiops turns a natural-language request into a plan of tool calls \
                  (weather, news, jokes), executes it with retries and lets an LLM \
                  verify and format the results. Supports multiple LLM providers \
                  (Groq, OpenAI, Anthropic, Gemini, xAI, Ollama)."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only errors are logged"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Answer a request",
        long_about = "Plans the request, runs the tools and prints a verified answer.\n\n\
                      Examples:\n  \
                      aiops ask \"What's the weather in Noida?\"\n  \
                      aiops ask tell me a joke about dreams --format json\n  \
                      aiops ask \"top tech headlines\" --provider openai --show-plan"
    )]
    Ask(AskArgs),

    #[command(
        about = "Show the plan for a request without running it",
        long_about = "Asks the planner for a plan and prints it. No tool is called.\n\n\
                      Examples:\n  \
                      aiops plan \"weather in Paris and London\""
    )]
    Plan(PlanArgs),

    #[command(about = "List the available tools and their parameters")]
    Tools(ToolsArgs),

    #[command(about = "Show the effective configuration (secrets masked)")]
    Config(ConfigArgs),
}

/// LLM selection shared by `ask` and `plan`
#[derive(Parser, Debug, Clone)]
pub struct LlmArgs {
    #[arg(
        short = 'p',
        long,
        value_parser = parse_adapter_kind,
        help = "LLM provider (overrides AIOPS_PROVIDER)"
    )]
    pub provider: Option<AdapterKind>,

    #[arg(
        short = 'm',
        long,
        value_name = "MODEL",
        help = "Model name (overrides AIOPS_MODEL)"
    )]
    pub model: Option<String>,

    #[arg(
        long,
        value_name = "SECONDS",
        help = "LLM request timeout in seconds (overrides AIOPS_REQUEST_TIMEOUT)"
    )]
    pub timeout: Option<u64>,
}

#[derive(Parser, Debug, Clone)]
pub struct AskArgs {
    #[arg(value_name = "QUERY", required = true, num_args = 1.., help = "The request")]
    pub query: Vec<String>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[command(flatten)]
    pub llm: LlmArgs,

    #[arg(long, help = "Also print the plan and per-step results")]
    pub show_plan: bool,

    #[arg(
        long,
        help = "Format results without the LLM if verification fails (overrides AIOPS_VERIFIER_FALLBACK)"
    )]
    pub fallback: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct PlanArgs {
    #[arg(value_name = "QUERY", required = true, num_args = 1.., help = "The request")]
    pub query: Vec<String>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[command(flatten)]
    pub llm: LlmArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct ToolsArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

/// Joins the words of a multi-word query argument
pub fn query_text(words: &[String]) -> String {
    words.join(" ").trim().to_string()
}

fn parse_adapter_kind(s: &str) -> Result<AdapterKind, String> {
    AdapterKind::from_lower_str(&s.to_lowercase()).ok_or_else(|| {
        format!(
            "Invalid provider: {}. Valid options: groq, openai, anthropic, gemini, xai, ollama",
            s
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_default_ask_args() {
        let args = CliArgs::parse_from(["aiops", "ask", "tell", "me", "a", "joke"]);
        match args.command {
            Commands::Ask(ask) => {
                assert_eq!(query_text(&ask.query), "tell me a joke");
                assert_eq!(ask.format, OutputFormatArg::Human);
                assert!(ask.llm.provider.is_none());
                assert!(ask.llm.model.is_none());
                assert!(ask.llm.timeout.is_none());
                assert!(!ask.show_plan);
                assert!(!ask.fallback);
            }
            _ => panic!("Expected Ask command"),
        }
    }

    #[test]
    fn test_ask_with_options() {
        let args = CliArgs::parse_from([
            "aiops",
            "ask",
            "weather in Noida",
            "--format",
            "json",
            "--provider",
            "openai",
            "--model",
            "gpt-4o",
            "--timeout",
            "45",
            "--show-plan",
        ]);

        match args.command {
            Commands::Ask(ask) => {
                assert_eq!(ask.query, vec!["weather in Noida"]);
                assert_eq!(ask.format, OutputFormatArg::Json);
                assert_eq!(ask.llm.provider, Some(AdapterKind::OpenAI));
                assert_eq!(ask.llm.model, Some("gpt-4o".to_string()));
                assert_eq!(ask.llm.timeout, Some(45));
                assert!(ask.show_plan);
            }
            _ => panic!("Expected Ask command"),
        }
    }

    #[test]
    fn test_ask_requires_query() {
        assert!(CliArgs::try_parse_from(["aiops", "ask"]).is_err());
    }

    #[test]
    fn test_plan_command() {
        let args = CliArgs::parse_from(["aiops", "plan", "news", "--format", "yaml"]);
        match args.command {
            Commands::Plan(plan) => {
                assert_eq!(plan.query, vec!["news"]);
                assert_eq!(plan.format, OutputFormatArg::Yaml);
            }
            _ => panic!("Expected Plan command"),
        }
    }

    #[test]
    fn test_tools_and_config_commands() {
        let args = CliArgs::parse_from(["aiops", "tools"]);
        assert!(matches!(args.command, Commands::Tools(_)));

        let args = CliArgs::parse_from(["aiops", "config", "-f", "json"]);
        match args.command {
            Commands::Config(config) => assert_eq!(config.format, OutputFormatArg::Json),
            _ => panic!("Expected Config command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from(["aiops", "-v", "tools"]);
        assert!(args.verbose);

        let args = CliArgs::parse_from(["aiops", "tools", "--quiet"]);
        assert!(args.quiet);

        let args = CliArgs::parse_from(["aiops", "--log-level", "debug", "tools"]);
        assert_eq!(args.log_level, Some("debug".to_string()));

        assert!(CliArgs::try_parse_from(["aiops", "-v", "-q", "tools"]).is_err());
    }

    #[test]
    fn test_adapter_kind_parsing() {
        assert_eq!(parse_adapter_kind("groq"), Ok(AdapterKind::Groq));
        assert_eq!(parse_adapter_kind("OpenAI"), Ok(AdapterKind::OpenAI));
        assert!(parse_adapter_kind("anthropic").is_ok());
        assert!(parse_adapter_kind("ollama").is_ok());
        assert!(parse_adapter_kind("invalid").is_err());
    }
}
