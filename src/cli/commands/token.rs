use anyhow::Context;
use chrono::{TimeZone, Utc};
use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Issue a bearer token for an existing user id")]
    Issue {
        #[arg(help = "User id (UUID)")]
        user_id: Uuid,

        #[arg(long, env = "JWT_SECRET", hide_env_values = true, help = "HS256 signing secret")]
        secret: String,

        #[arg(long, env = "JWT_EXPIRES_HOURS", default_value_t = 24, help = "Token lifetime in hours")]
        hours: u64,
    },
}

pub fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Issue { user_id, secret, hours } => {
            let claims = Claims::new(user_id, Utc::now(), hours);
            let token = generate_jwt(&secret, &claims).context("failed to sign token")?;

            let expires_at = Utc
                .timestamp_opt(claims.exp, 0)
                .single()
                .map(|t| t.to_rfc3339());

            match output_format {
                OutputFormat::Text => println!("{}", token),
                OutputFormat::Json => output_success(
                    output_format,
                    "Token issued",
                    Some(json!({
                        "token": token,
                        "userId": user_id,
                        "expiresAt": expires_at,
                    })),
                )?,
            }
            Ok(())
        }
    }
}
