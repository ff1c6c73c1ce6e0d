use clap::{Arg, ArgAction, Command};

pub fn root_command() -> Command {
    Command::new("prwatch")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Watch pull request views and get desktop notifications")
        .long_about("prwatch polls pull requests through the GitHub CLI, diffs each batch against the previous one and raises a desktop notification for new pull requests and new conversation activity. Followed pull requests are tracked in the background between refreshes.")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
}
