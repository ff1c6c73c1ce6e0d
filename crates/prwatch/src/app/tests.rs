use super::*;

#[test]
fn test_cli_build() {
    let app = build_cli();
    assert_eq!(app.get_name(), "prwatch");
}

#[test]
fn test_cli_watch_command() {
    let app = build_cli();
    let matches = app.try_get_matches_from(vec![
        "prwatch",
        "watch",
        "--repo",
        "acme/widgets",
        "-r",
        "acme/gears",
        "--follow",
        "acme/widgets#7",
        "--interval",
        "120",
    ]);
    assert!(matches.is_ok());

    let matches = matches.unwrap();
    let watch_matches = matches.subcommand_matches("watch").unwrap();
    let repos: Vec<&String> = watch_matches.get_many::<String>("repo").unwrap().collect();
    assert_eq!(repos, vec!["acme/widgets", "acme/gears"]);
    assert_eq!(
        watch_matches.get_one::<String>("follow").unwrap(),
        "acme/widgets#7"
    );
    assert_eq!(*watch_matches.get_one::<u64>("interval").unwrap(), 120);
    assert!(!watch_matches.get_flag("mark-seen"));
}

#[test]
fn test_cli_watch_requires_repo() {
    let app = build_cli();
    let matches = app.try_get_matches_from(vec!["prwatch", "watch"]);
    assert!(matches.is_err());
}

#[test]
fn test_cli_watch_rejects_non_numeric_interval() {
    let app = build_cli();
    let matches = app.try_get_matches_from(vec![
        "prwatch",
        "watch",
        "--repo",
        "acme/widgets",
        "--interval",
        "soon",
    ]);
    assert!(matches.is_err());
}

#[test]
fn test_cli_config_json_flag() {
    let app = build_cli();
    let matches = app.try_get_matches_from(vec!["prwatch", "config", "--json"]);
    assert!(matches.is_ok());

    let matches = matches.unwrap();
    let config_matches = matches.subcommand_matches("config").unwrap();
    assert!(config_matches.get_flag("json"));
}

#[test]
fn test_cli_verbose_is_global() {
    let app = build_cli();
    let matches = app.try_get_matches_from(vec!["prwatch", "config", "-v"]);
    assert!(matches.is_ok());
    assert!(matches.unwrap().get_flag("verbose"));
}

#[test]
fn test_cli_requires_subcommand() {
    let app = build_cli();
    let matches = app.try_get_matches_from(vec!["prwatch"]);
    assert!(matches.is_err());
}
