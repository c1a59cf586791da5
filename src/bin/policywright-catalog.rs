//! List the policy types and template examples of a catalog.

use arrrg::CommandLine;
use policywright::PolicyCatalog;

#[derive(Clone, Default, Debug, Eq, PartialEq, arrrg_derive::CommandLine)]
struct Args {
    #[arrrg(optional, "Path to a policy_structure.json catalog")]
    catalog: Option<String>,
    #[arrrg(flag, "List every template instead of a sample per category")]
    all: bool,
    #[arrrg(optional, "Output format (json, text)")]
    format: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let (args, free) = Args::from_command_line_relaxed("USAGE: policywright-catalog [OPTIONS]");
    if !free.is_empty() {
        eprintln!("Unexpected arguments: {}", free.join(" "));
        std::process::exit(1);
    }

    let catalog = match args.catalog.as_deref() {
        Some(path) => PolicyCatalog::from_path(path)?,
        None => PolicyCatalog::bundled(),
    };
    let examples = if args.all {
        let mut examples: Vec<(String, Vec<String>)> = vec![];
        for entry in catalog.entries() {
            let top = entry
                .category
                .split('/')
                .next()
                .unwrap_or(&entry.category)
                .to_string();
            let name = match entry.category.split_once('/') {
                Some((_, sub)) => format!("{sub}/{}", entry.template_name),
                None => entry.template_name.clone(),
            };
            match examples.last_mut() {
                Some((category, names)) if *category == top => names.push(name),
                _ => examples.push((top, vec![name])),
            }
        }
        examples
    } else {
        catalog.template_examples()
    };

    match args.format.as_deref().unwrap_or("text") {
        "json" => {
            let examples = examples
                .into_iter()
                .map(|(category, names)| (category, serde_json::Value::from(names)))
                .collect::<serde_json::Map<_, _>>();
            let output = serde_json::json!({
                "policy_types": catalog.policy_types(),
                "template_examples": examples,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            for (category, names) in examples {
                println!("{category}:");
                for name in names {
                    println!("  {name}");
                }
            }
        }
    }
    Ok(())
}
