use super::*;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).unwrap()
}

#[test]
fn cli_parse_origin_only() {
    let cli = parse(&["noms", "http://localhost:8787/dnc.json"]);
    assert_eq!(cli.origin, "http://localhost:8787/dnc.json");
    assert!(cli.args.is_empty());
    assert!(!cli.debug);
    assert!(!cli.no_prompt);
    assert!(cli.user.is_none());
}

#[test]
fn cli_parse_document_args_keep_hyphens() {
    let cli = parse(&["noms", "--debug", "dnc.json", "list", "--all", "-v"]);
    assert!(cli.debug);
    assert_eq!(cli.args, vec!["list", "--all", "-v"]);
    assert_eq!(cli.argv(), vec!["dnc.json", "list", "--all", "-v"]);
}

#[test]
fn cli_parse_credentials() {
    let cli = parse(&[
        "noms",
        "--user",
        "testuser",
        "--password",
        "testpass",
        "--no-prompt",
        "http://localhost/auth/ok",
    ]);
    assert_eq!(cli.user.as_deref(), Some("testuser"));
    assert_eq!(cli.password.as_deref(), Some("testpass"));
    assert!(cli.no_prompt);
}

#[test]
fn cli_user_requires_password() {
    assert!(Cli::try_parse_from(["noms", "--user", "u", "http://x/"]).is_err());
}

#[test]
fn cli_origin_is_required() {
    assert!(Cli::try_parse_from(["noms"]).is_err());
}

#[test]
fn cli_verify_definition() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
}
