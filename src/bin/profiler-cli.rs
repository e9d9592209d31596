use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "profiler-cli")]
#[command(about = "Inspect profiling sessions of a running miniprofiler-http server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(long, default_value = "/mini-profiler-resources")]
    resource_path: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the timing tree of a session
    Results {
        /// Session id, as found in the x-miniprofiler-ids header
        id: String,
    },
    /// Request a path and print the session ids it produced
    Profile {
        /// Path on the server, e.g. /http/send-get
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Results { id } => {
            let res = client
                .post(format!("{}{}/results/", base, cli.resource_path.trim_end_matches('/')))
                .form(&[("id", id.as_str()), ("popup", "1")])
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Profile { path } => {
            let res = client.get(format!("{}{}", base, path)).send().await?;
            let ids = res
                .headers()
                .get("x-miniprofiler-ids")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            println!("Status: {}", res.status());
            match ids {
                Some(ids) => println!("Session ids: {}", ids),
                None => println!("Request was not profiled"),
            }
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: results endpoint returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
