//! Validate pull-request inputs for a policy and print the derived plan as JSON.

use arrrg::CommandLine;
use policywright::{PullRequestPlan, PullRequestRequest};

#[derive(Clone, Default, Debug, Eq, PartialEq, arrrg_derive::CommandLine)]
struct Args {
    #[arrrg(optional, "owner/repo or https://github.com/owner/repo")]
    repository: Option<String>,
    #[arrrg(
        optional,
        "Destination path in the repository, e.g. policies/app.yml"
    )]
    file_path: Option<String>,
    #[arrrg(
        optional,
        "Branch to create (default: policy-update-<name>-<timestamp>)"
    )]
    branch: Option<String>,
    #[arrrg(optional, "Commit message")]
    commit_message: Option<String>,
    #[arrrg(optional, "Pull request title")]
    title: Option<String>,
    #[arrrg(optional, "Pull request description")]
    description: Option<String>,
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
        Args::from_command_line_relaxed("USAGE: policywright-pr-plan [OPTIONS] <policy.yml>");

    let content = match free.as_slice() {
        [path] => std::fs::read_to_string(path)?,
        [] => String::new(),
        _ => {
            eprintln!("Expected one policy file");
            std::process::exit(1);
        }
    };
    let request = PullRequestRequest {
        repository: args.repository.unwrap_or_default(),
        file_path: args.file_path.unwrap_or_default(),
        content,
        branch: args.branch.unwrap_or_default(),
        commit_message: args.commit_message.unwrap_or_default(),
        title: args.title.unwrap_or_default(),
        description: args.description.unwrap_or_default(),
    };
    let plan = PullRequestPlan::new(&request)?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
