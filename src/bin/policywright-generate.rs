//! Generate a Conjur policy from a natural-language request.
//!
//! The request is taken from the free arguments, or from stdin when there are none.  The report
//! is printed as JSON or as annotated YAML followed by its explanation.

use std::io::Read;
use std::sync::Arc;

use arrrg::CommandLine;
use policywright::{
    AnthropicModel, GeneratorOptions, HttpTemplateSource, ModelConfig, PolicyCatalog,
    PolicyGenerator, PolicyRequest, TemplateCache, TemplateFetcher, DEFAULT_TEMPLATE_BASE_URL,
    GENERAL_POLICY_TYPE,
};

#[derive(Clone, Default, Debug, Eq, PartialEq, arrrg_derive::CommandLine)]
struct Args {
    #[arrrg(optional, "Policy type hint, e.g. ci/github (default: general)")]
    policy_type: Option<String>,
    #[arrrg(optional, "Where the policy will be stored in the repository")]
    target_path: Option<String>,
    #[arrrg(optional, "Path to a policy_structure.json catalog")]
    catalog: Option<String>,
    #[arrrg(optional, "Base URL example templates are read from")]
    base_url: Option<String>,
    #[arrrg(optional, "How many relevant examples to select")]
    max_examples: Option<usize>,
    #[arrrg(optional, "Upper bound on tokens per model call")]
    max_tokens: Option<u32>,
    #[arrrg(optional, "Output format (json, text)")]
    format: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let (args, free) =
        Args::from_command_line_relaxed("USAGE: policywright-generate [OPTIONS] [request...]");

    let prompt = if free.is_empty() {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf.trim().to_string()
    } else {
        free.join(" ")
    };
    if prompt.is_empty() {
        eprintln!("Expected a request on the command line or stdin");
        std::process::exit(1);
    }

    let catalog = match args.catalog.as_deref() {
        Some(path) => PolicyCatalog::load(path),
        None => PolicyCatalog::bundled(),
    };
    let source = HttpTemplateSource::new(
        args.base_url
            .unwrap_or_else(|| DEFAULT_TEMPLATE_BASE_URL.to_string()),
    )?;
    let fetcher = TemplateFetcher::new(Arc::new(catalog), source, Arc::new(TemplateCache::new()));
    let mut config = ModelConfig::default();
    if let Some(max_tokens) = args.max_tokens {
        config.max_tokens = max_tokens;
    }
    let mut options = GeneratorOptions::default();
    if let Some(max_examples) = args.max_examples {
        options.max_examples = max_examples;
    }
    let generator =
        PolicyGenerator::new(AnthropicModel::from_env(config)?, fetcher).with_options(options);

    let request = PolicyRequest {
        prompt,
        policy_type: args
            .policy_type
            .unwrap_or_else(|| GENERAL_POLICY_TYPE.to_string()),
        target_path: args.target_path.unwrap_or_default(),
    };
    let report = generator.respond(&request).await?;
    match args.format.as_deref().unwrap_or("text") {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print!("{report}"),
    }
    Ok(())
}
