//! `abacus`: command-line client for the Abacus calculator API.
//!
//! # Usage
//!
//! ```
//! abacus register --username alice --email alice@example.com --password secret
//! export ABACUS_TOKEN=$(abacus login --email alice@example.com --password secret)
//! abacus calc create 10 5 add
//! abacus calc list
//! ```

mod client;

use std::path::PathBuf;

use abacus_core::{calculation::CalculationRequest, operation::OperationKind};
use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "abacus", about = "Client for the Abacus calculator API")]
struct Args {
  /// Path to a TOML config file (url, token).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the abacus server (default: http://localhost:8000).
  #[arg(long, env = "ABACUS_URL")]
  url: Option<String>,

  /// Bearer token printed by `abacus login`.
  #[arg(long, env = "ABACUS_TOKEN")]
  token: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create an account.
  Register {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email:    String,
    #[arg(long)]
    password: String,
  },
  /// Log in and print an access token.
  Login {
    #[arg(long)]
    email:    String,
    #[arg(long)]
    password: String,
  },
  /// Show the account the token belongs to.
  Whoami,
  /// Manage calculations.
  #[command(subcommand)]
  Calc(CalcCommand),
}

/// Operands and operation shared by `create` and `update`.
#[derive(ClapArgs, Debug)]
struct Operands {
  a:    f64,
  b:    f64,
  /// One of add, subtract, multiply, divide.
  kind: OperationKind,
}

impl Operands {
  fn request(&self) -> CalculationRequest { CalculationRequest::new(self.a, self.b, self.kind) }
}

#[derive(Subcommand, Debug)]
enum CalcCommand {
  /// List your calculations.
  List {
    #[arg(long)]
    skip:  Option<usize>,
    #[arg(long)]
    limit: Option<usize>,
  },
  /// Create a calculation.
  #[command(allow_negative_numbers = true)]
  Create(Operands),
  /// Show one calculation.
  Get { id: Uuid },
  /// Replace a calculation's operands and operation.
  #[command(allow_negative_numbers = true)]
  Update {
    id: Uuid,
    #[command(flatten)]
    operands: Operands,
  },
  /// Delete a calculation.
  Delete { id: Uuid },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:   String,
  #[serde(default)]
  token: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| "http://localhost:8000".to_string()),
    token:    args
      .token
      .or_else(|| (!file_cfg.token.is_empty()).then(|| file_cfg.token.clone())),
  };

  let client = ApiClient::new(api_config)?;
  run(&client, args.command).await
}

async fn run(client: &ApiClient, command: Command) -> Result<()> {
  match command {
    Command::Register { username, email, password } => {
      print_json(&client.register(&username, &email, &password).await?)
    }
    Command::Login { email, password } => {
      println!("{}", client.login(&email, &password).await?);
      Ok(())
    }
    Command::Whoami => print_json(&client.me().await?),
    Command::Calc(calc) => match calc {
      CalcCommand::List { skip, limit } => print_json(&client.list(skip, limit).await?),
      CalcCommand::Create(operands) => {
        print_json(&client.create(&operands.request()).await?)
      }
      CalcCommand::Get { id } => print_json(&client.get(id).await?),
      CalcCommand::Update { id, operands } => {
        print_json(&client.update(id, &operands.request()).await?)
      }
      CalcCommand::Delete { id } => {
        client.delete(id).await?;
        println!("deleted {id}");
        Ok(())
      }
    },
  }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value).context("serialising output")?);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_create_with_negative_operands() {
    let args = Args::try_parse_from(["abacus", "calc", "create", "-5", "2.5", "multiply"]).unwrap();
    let Command::Calc(CalcCommand::Create(ops)) = args.command else {
      panic!("expected calc create");
    };
    assert_eq!(ops.request(), CalculationRequest::new(-5.0, 2.5, OperationKind::Multiply));
  }

  #[test]
  fn rejects_unknown_operation() {
    assert!(Args::try_parse_from(["abacus", "calc", "create", "1", "1", "power"]).is_err());
  }

  #[test]
  fn parses_update() {
    let id = Uuid::new_v4();
    let args = Args::try_parse_from([
      "abacus", "calc", "update", &id.to_string(), "10", "2", "divide",
    ])
    .unwrap();
    let Command::Calc(CalcCommand::Update { id: parsed, operands }) = args.command else {
      panic!("expected calc update");
    };
    assert_eq!(parsed, id);
    assert_eq!(operands.kind, OperationKind::Divide);
  }
}
