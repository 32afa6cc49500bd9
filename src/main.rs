use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "unitcheck",
    about = "CI unit-test result pipeline: fetch, run, classify, publish",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full check pipeline for one build configuration
    Run {
        /// Check name used as the commit-status context
        check_name: String,

        /// Build-matrix index of the configuration under test
        build_number: usize,

        /// Test image to run
        #[arg(long, default_value = "ci/unit-test")]
        image: String,

        /// Artifact name of the prebuilt test binary
        #[arg(long, default_value = "unit_tests")]
        binary_name: String,
    },

    /// Classify an existing result log and print the verdict
    Classify {
        /// Path to the result log
        log: String,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            check_name,
            build_number,
            image,
            binary_name,
        } => {
            tracing::info!(%check_name, build_number, "Starting unit-test check");
            let opts = unitcheck::CheckOptions {
                check_name,
                build_number,
                image,
                binary_name,
            };
            let (verdict, uploaded) = unitcheck::run_check(&opts).await?;
            println!("Report url: {}", uploaded.report_url);
            println!(
                "Status: {} ({})",
                verdict.status.as_state(),
                verdict.description
            );
        }
        Commands::Classify { log, json } => {
            let verdict = unitcheck::classify::classify(std::path::Path::new(&log))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&verdict)?);
            } else {
                println!("\nUnit-test verdict");
                println!("Status:      {}", verdict.status.as_state());
                println!("Description: {}", verdict.description);
                if !verdict.summary.is_empty() {
                    println!();
                    println!("{:<50} | Result", "Test");
                    println!("{:-<50}-|-------", "");
                    for (name, outcome) in &verdict.summary {
                        println!("{:<50} | {}", name, outcome);
                    }
                }
            }
        }
    }

    Ok(())
}
