//! Unit tests for CLI parsing

use crate::cli::{Cli, Commands};
use clap::Parser;

#[test]
fn test_serve_command_with_flags() {
    let cli = Cli::try_parse_from([
        "tablegate",
        "serve",
        "--database",
        "chinook.db",
        "--addr",
        "127.0.0.1:9000",
        "--base-path",
        "/api",
        "--page-size",
        "5",
        "--watch",
    ])
    .unwrap();

    match cli.command {
        Commands::Serve {
            database,
            addr,
            base_path,
            page_size,
            watch,
            config,
        } => {
            assert_eq!(database.unwrap().to_string_lossy(), "chinook.db");
            assert_eq!(addr.as_deref(), Some("127.0.0.1:9000"));
            assert_eq!(base_path.as_deref(), Some("/api"));
            assert_eq!(page_size, Some(5));
            assert!(watch);
            assert!(config.is_none());
        }
        other => panic!("Expected Serve command, got {other:?}"),
    }
}

#[test]
fn test_serve_defaults_leave_config_in_charge() {
    let cli = Cli::try_parse_from(["tablegate", "serve", "--config", "tablegate.yaml"]).unwrap();
    match cli.command {
        Commands::Serve {
            addr,
            page_size,
            watch,
            ..
        } => {
            assert!(addr.is_none());
            assert!(page_size.is_none());
            assert!(!watch);
        }
        other => panic!("Expected Serve command, got {other:?}"),
    }
}

#[test]
fn test_all_commands_parse() {
    let commands = vec![
        vec!["tablegate", "serve", "--database", "x.db"],
        vec!["tablegate", "inspect", "--database", "x.db"],
        vec!["tablegate", "inspect", "-d", "x.db", "--base-path", "/v1"],
    ];

    for args in commands {
        let cli = Cli::try_parse_from(&args);
        assert!(cli.is_ok(), "Failed to parse command: {:?}", args);
    }
}

#[test]
fn test_inspect_requires_database() {
    assert!(Cli::try_parse_from(["tablegate", "inspect"]).is_err());
}
