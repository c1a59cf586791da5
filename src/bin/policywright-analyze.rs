//! Count the resources in a policy and run the structural check.
//!
//! Reads the policy from the named file, or stdin when none is given.

use std::io::Read;

use arrrg::CommandLine;
use policywright::{validate_policy, PolicyDocument};

#[derive(Clone, Default, Debug, Eq, PartialEq, arrrg_derive::CommandLine)]
struct Args {
    #[arrrg(
        flag,
        "Strip code fences as if the policy came straight from a model"
    )]
    normalize: bool,
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
    let (args, free) =
        Args::from_command_line_relaxed("USAGE: policywright-analyze [OPTIONS] [policy.yml]");

    let text = match free.as_slice() {
        [] => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
        [path] => std::fs::read_to_string(path)?,
        _ => {
            eprintln!("Expected at most one policy file");
            std::process::exit(1);
        }
    };
    let policy = if args.normalize {
        PolicyDocument::from_model_output(&text)
    } else {
        PolicyDocument::from(text)
    };
    let resources = policy.resources();
    let check = validate_policy(policy.as_str());

    match args.format.as_deref().unwrap_or("text") {
        "json" => {
            let output = match &check {
                Ok(summary) => serde_json::json!({
                    "resources": resources,
                    "valid": true,
                    "top_level": summary.top_level,
                    "opaque_tags": summary.opaque_tags,
                }),
                Err(err) => serde_json::json!({
                    "resources": resources,
                    "valid": false,
                    "error": err.to_string(),
                }),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            for (kind, count) in resources.iter() {
                println!("{kind:<12} {count}");
            }
            match &check {
                Ok(summary) => {
                    println!("valid: {} top-level statements", summary.top_level);
                    if !summary.opaque_tags.is_empty() {
                        println!("unrecognized tags: {}", summary.opaque_tags.join(", "));
                    }
                }
                Err(err) => println!("invalid: {err}"),
            }
        }
    }
    if check.is_err() {
        std::process::exit(2);
    }
    Ok(())
}
