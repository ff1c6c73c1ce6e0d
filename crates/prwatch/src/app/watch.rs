use clap::{Arg, ArgAction, Command, value_parser};

pub fn watch_command() -> Command {
    Command::new("watch")
        .about("Refresh pull request views until interrupted")
        .arg(
            Arg::new("repo")
                .long("repo")
                .short('r')
                .help("Repository to watch as owner/name (repeatable)")
                .action(ArgAction::Append)
                .required(true),
        )
        .arg(
            Arg::new("search")
                .long("search")
                .help("GitHub search qualifiers applied to every repository view"),
        )
        .arg(
            Arg::new("follow")
                .long("follow")
                .short('f')
                .help("Pull request to track in the background as owner/name#N (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("interval")
                .long("interval")
                .help("Seconds between refreshes (overrides polling.interval_seconds)")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("mark-seen")
                .long("mark-seen")
                .help("Mark every fetched pull request as seen after each refresh")
                .action(ArgAction::SetTrue),
        )
}
