//! static-site CLI
//!
//! Synthesizes, deploys and destroys the stacks of a static website.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use static_site::config::{load_context, DEFAULT_CONFIG_FILE};
use static_site::context::DEFAULT_CACHE_FILE;
use static_site::{assets, deploy, hosted_zone, synthesize, Assembly, Result, SiteConfig};

#[derive(Parser)]
#[command(name = "static-site")]
#[command(version)]
#[command(about = "Static website on S3 and CloudFront, deployed with CloudFormation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Path to a .env file with context values
    #[arg(long, global = true, default_value = ".env")]
    env_file: PathBuf,

    /// Context value as key=value, may be repeated. Wins over the config and .env files
    #[arg(short = 'c', long = "context", global = true)]
    context: Vec<String>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the CloudFormation templates without deploying them
    Synth {
        /// Output directory, defaults to the output_dir context value
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Deploy every stack and publish the site content
    Deploy {
        /// Only deploy the infrastructure
        #[arg(long)]
        skip_content: bool,
    },

    /// Empty the bucket and delete every stack
    Destroy,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn build(cli: &Cli) -> Result<(SiteConfig, Assembly)> {
    let ctx = load_context(&cli.config, &cli.env_file, &cli.context)?;
    let conf = SiteConfig::from_context(&ctx)?;
    let zone = hosted_zone::resolve_hosted_zone(&conf, Path::new(DEFAULT_CACHE_FILE)).await?;
    let assembly = synthesize(&conf, &zone)?;
    Ok((conf, assembly))
}

async fn run(cli: Cli) -> Result<()> {
    let (conf, assembly) = build(&cli).await?;
    match cli.command {
        Commands::Synth { output } => {
            let dir = output.unwrap_or_else(|| conf.output_dir.clone());
            for path in assembly.write_to(&dir)? {
                println!("{}", path.display());
            }
        }

        Commands::Deploy { skip_content } => {
            let deployed = deploy::deploy_assembly(&assembly).await?;
            let site_outputs = deployed.get(&conf.stack_name).cloned().unwrap_or_default();
            if skip_content {
                info!("skipping site content");
            } else {
                assets::publish(&conf, &site_outputs).await?;
            }
            for (stack, outputs) in deployed.iter() {
                for (key, val) in outputs.iter() {
                    println!("{stack}.{key} = {val}");
                }
            }
        }

        Commands::Destroy => {
            deploy::destroy_assembly(&assembly, &conf).await?;
            info!("destroyed {}", conf.site_url());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if let Err(e) = run(cli).await {
        error!("{}", e);
        // logging may be turned off, the reason for exiting 1 must still show
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
