use clap::{Arg, ArgAction, Command};

pub fn config_command() -> Command {
    Command::new("config")
        .about("Show the effective configuration after merging user and project files")
        .arg(
            Arg::new("json")
                .long("json")
                .help("Output in JSON format")
                .action(ArgAction::SetTrue),
        )
}
