use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "newscheck-server")]
#[command(author, version, about = "NewsCheck fake-news classification service", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml", env = "NEWSCHECK_CONFIG")]
    pub config: String,

    /// Directory holding the exported model artifacts
    #[arg(short, long, env = "NEWSCHECK_ARTIFACTS_DIR")]
    pub artifacts: Option<PathBuf>,

    /// Prediction log file (JSON lines)
    #[arg(long, env = "NEWSCHECK_PREDICTION_LOG")]
    pub prediction_log: Option<PathBuf>,

    /// Encoder device: cpu, cuda[:N], mps
    #[arg(short, long, env = "NEWSCHECK_DEVICE")]
    pub device: Option<String>,

    /// Load both model stacks before accepting requests
    #[arg(long)]
    pub preload: bool,

    /// Listen address
    #[arg(short = 'l', long, default_value = "0.0.0.0", env = "NEWSCHECK_LISTEN")]
    pub listen: String,

    /// Listen port
    #[arg(short = 'P', long, default_value = "8000", env = "NEWSCHECK_PORT")]
    pub port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
