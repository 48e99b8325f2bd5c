//! Analytica CLI
//!
//! Command-line interface for Analytica:
//! - Compile a request to SQL offline
//! - Run a request against a server
//! - Generate a config file

use analytica::query::{compile_count, AnalyticsRequest, QueryCompiler, DEFAULT_TIME_COLUMN};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "analytica")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile and run declarative analytics requests")]
#[command(long_about = "Analytica turns JSON analytics requests into parameterized SQL.\nCompile requests locally or send them to a running server.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:8080", global = true)]
    pub api_url: String,

    /// Output format (table, json, csv)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a request file to SQL without running it
    Compile {
        /// Request JSON file, or - for stdin
        input: String,
        /// Column a time range filters on when there is no time dimension
        #[arg(long, default_value = DEFAULT_TIME_COLUMN)]
        time_column: String,
    },

    /// Send a request to the server and print the rows
    Query {
        /// Request JSON file, or - for stdin
        input: String,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compile { input, time_column } => {
            let request = read_request(&input)?;
            let compiled = QueryCompiler::new(time_column)
                .compile(&request)
                .context("request rejected")?;
            let count = compile_count(&compiled);

            if cli.format == "json" {
                let body = serde_json::json!({
                    "sql": compiled.sql,
                    "params": compiled.params,
                    "countSql": count.sql,
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!("SQL:       {}", compiled.sql);
                println!("Count SQL: {}", count.sql);
                println!("Params:    {}", compiled.params);
            }
        }

        Commands::Query { input } => {
            let mut request = read_request(&input)?;
            if cli.format == "csv" {
                request.format = Some("csv".to_string());
            }

            let client = reqwest::Client::new();
            let response = client
                .post(format!("{}/api/v1/analytics", cli.api_url))
                .json(&request)
                .send()
                .await
                .with_context(|| format!("cannot connect to Analytica API at {}", cli.api_url))?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                bail!("query failed ({}): {}", status, text);
            }

            match cli.format.as_str() {
                "csv" => print!("{}", response.text().await?),
                "json" => {
                    let data: serde_json::Value = response.json().await?;
                    println!("{}", serde_json::to_string_pretty(&data)?);
                }
                _ => {
                    let data: serde_json::Value = response.json().await?;
                    print_table(&data);
                }
            }
        }

        Commands::Config { output } => {
            let config = analytica::config::generate_default_config();

            match output {
                Some(path) => {
                    // Create parent directory if needed
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

fn read_request(input: &str) -> anyhow::Result<AnalyticsRequest> {
    let text = if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input).with_context(|| format!("cannot read {}", input))?
    };

    serde_json::from_str(&text).context("invalid analytics request JSON")
}

fn print_table(data: &serde_json::Value) {
    let rows = match data["data"].as_array() {
        Some(r) if !r.is_empty() => r,
        _ => {
            println!("No data");
            return;
        }
    };

    let columns: Vec<&String> = match rows[0].as_object() {
        Some(first) => first.keys().collect(),
        None => return,
    };

    // Header
    let header: Vec<String> = columns.iter().map(|c| format!("{:<16}", c)).collect();
    println!("{}", header.join(" | "));
    println!("{}", "-".repeat(columns.len() * 19));

    // Data rows
    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| {
                let cell = match &row[c.as_str()] {
                    serde_json::Value::Null => "-".to_string(),
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Number(n) => match n.as_f64() {
                        Some(v) if n.is_f64() => format!("{:.2}", v),
                        _ => n.to_string(),
                    },
                    other => other.to_string(),
                };
                format!("{:<16}", cell)
            })
            .collect();
        println!("{}", cells.join(" | "));
    }

    println!();
    println!(
        "{} row(s), {} total, query {}",
        rows.len(),
        data["metadata"]["totalRecords"],
        data["metadata"]["queryId"].as_str().unwrap_or("-")
    );
}
