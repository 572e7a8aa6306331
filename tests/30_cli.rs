use bonzobyte_api::auth::validate_jwt;
use bonzobyte_api::cli::commands::archives::ArchivesCommands;
use bonzobyte_api::cli::commands::token::TokenCommands;
use bonzobyte_api::cli::{Cli, Commands, OutputFormat};
use clap::Parser;

#[test]
fn parses_archive_subcommands() {
    let cli = Cli::try_parse_from(["bonzobyte", "--json", "--server", "http://api:5000", "archives", "daily", "20250601"])
        .unwrap();

    assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
    assert_eq!(cli.server, "http://api:5000");
    match cli.command {
        Commands::Archives {
            cmd: ArchivesCommands::Daily { date },
        } => assert_eq!(date, "20250601"),
        _ => panic!("expected archives daily"),
    }
}

#[test]
fn token_issue_requires_a_uuid() {
    let bad = Cli::try_parse_from(["bonzobyte", "token", "issue", "not-a-uuid", "--secret", "0123456789abcdef"]);
    assert!(bad.is_err());

    let id = uuid::Uuid::new_v4().to_string();
    let cli = Cli::try_parse_from(["bonzobyte", "token", "issue", &id, "--secret", "0123456789abcdef", "--hours", "2"])
        .unwrap();
    match cli.command {
        Commands::Token {
            cmd: TokenCommands::Issue { user_id, hours, .. },
        } => {
            assert_eq!(user_id.to_string(), id);
            assert_eq!(hours, 2);
        }
        _ => panic!("expected token issue"),
    }
}

#[test]
fn issued_tokens_validate_against_the_same_secret() {
    let id = uuid::Uuid::new_v4();
    let claims = bonzobyte_api::auth::Claims::new(id, chrono::Utc::now(), 2);
    let token = bonzobyte_api::auth::generate_jwt("0123456789abcdef", &claims).unwrap();

    let decoded = validate_jwt("0123456789abcdef", &token).unwrap();
    assert_eq!(decoded.id, id);
    assert_eq!(decoded.exp - decoded.iat, 2 * 3600);
}

#[test]
fn manifest_entity_is_checked_at_parse_time() {
    let cli = Cli::try_parse_from(["bonzobyte", "archives", "manifest", "Tournaments"]).unwrap();
    match cli.command {
        Commands::Archives {
            cmd: ArchivesCommands::Manifest { entity },
        } => assert_eq!(entity, bonzobyte_api::archives::IndexEntity::Tournaments),
        _ => panic!("expected archives manifest"),
    }

    assert!(Cli::try_parse_from(["bonzobyte", "archives", "manifest", "coaches"]).is_err());
}
