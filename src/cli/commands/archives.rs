use clap::Subcommand;
use serde_json::Value;

use crate::archives::IndexEntity;
use crate::cli::client::{ArchiveClient, ArchiveReply};
use crate::cli::utils::{output_error, output_value, plain};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ArchivesCommands {
    #[command(about = "List dates that have a daily archive")]
    Dates,

    #[command(about = "Show one day's matches")]
    Daily {
        #[arg(help = "Date as YYYYMMDD")]
        date: String,
    },

    #[command(about = "Fetch full details of a match")]
    Match {
        #[arg(help = "Match id")]
        id: String,
        #[arg(long, env = "BONZOBYTE_TOKEN", hide_env_values = true, help = "Bearer token")]
        token: Option<String>,
    },

    #[command(about = "Show the name-index manifest")]
    Manifest {
        #[arg(help = "players or tournaments")]
        entity: IndexEntity,
    },

    #[command(about = "Show a player's rating history")]
    Ts {
        #[arg(help = "Player TP id")]
        player_tp_id: String,
    },

    #[command(about = "Show archive backend status")]
    Status,
}

pub async fn handle(cmd: ArchivesCommands, client: &ArchiveClient, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ArchivesCommands::Dates => {
            let value = expect_ok(client.get("available-dates", None).await?)?;
            output_value(output_format, &value, |dates| {
                let dates = dates.as_array().map(Vec::as_slice).unwrap_or_default();
                for date in dates {
                    println!("{}", plain(date));
                }
                println!("{} dates", dates.len());
            })
        }
        ArchivesCommands::Daily { date } => {
            let value = expect_ok(client.get(&format!("daily/{}", date), None).await?)?;
            output_value(output_format, &value, print_daily)
        }
        ArchivesCommands::Match { id, token } => {
            match client.get(&format!("match-details/{}", id), token.as_deref()).await? {
                ArchiveReply::Ok(value) => output_value(output_format, &value, |doc| {
                    println!("{}", serde_json::to_string_pretty(doc).unwrap_or_default());
                }),
                ArchiveReply::Locked(body) => match output_format {
                    OutputFormat::Json => output_value(output_format, &body, |_| {}),
                    OutputFormat::Text => {
                        let message = body.get("message").map(plain).unwrap_or_default();
                        output_error(output_format, &message, Some("DETAILS_LOCKED"))
                    }
                },
            }
        }
        ArchivesCommands::Manifest { entity } => {
            let value = expect_ok(client.get(&format!("{}/manifest", entity), None).await?)?;
            output_value(output_format, &value, |manifest| {
                println!("Range: {} .. {}", field(manifest, "minDate"), field(manifest, "maxDate"));
                if let Some(index) = manifest.get(entity.as_str()) {
                    println!("Index: {} ({})", field(index, "url"), field(index, "version"));
                }
            })
        }
        ArchivesCommands::Ts { player_tp_id } => {
            let value = expect_ok(client.get(&format!("ts/{}", player_tp_id), None).await?)?;
            output_value(output_format, &value, |series| {
                let points = series.get("data").and_then(Value::as_array).map_or(0, Vec::len);
                println!("Player {}: {} points", field(series, "playerTPId"), points);
            })
        }
        ArchivesCommands::Status => {
            let value = expect_ok(client.get("status", None).await?)?;
            output_value(output_format, &value, |status| {
                println!("Source: {}", field(status, "source"));
                println!("Now:    {}", field(status, "nowUtc"));
                if let Some(range) = status.pointer("/daily/range") {
                    println!("Daily:  {} .. {}", field(range, "minDate"), field(range, "maxDate"));
                }
            })
        }
    }
}

fn expect_ok(reply: ArchiveReply) -> anyhow::Result<Value> {
    match reply {
        ArchiveReply::Ok(value) => Ok(value),
        ArchiveReply::Locked(_) => anyhow::bail!("unexpected lock response"),
    }
}

fn field(value: &Value, key: &str) -> String {
    value.get(key).map(plain).unwrap_or_else(|| "-".to_string())
}

fn print_daily(day: &Value) {
    println!("{} ({} matches)", field(day, "date"), field(day, "count"));
    let matches = day.get("matches").and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
    for m in matches {
        println!(
            "  {:<40} {} vs {}  {}",
            field(m, "tournamentTitle"),
            field(m, "player1Label"),
            field(m, "player2Label"),
            field(m, "resultText"),
        );
    }
}
