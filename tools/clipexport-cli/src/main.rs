//! clipexport CLI: drive exports through the synthetic backend and inspect
//! render geometry.
//!
//! Usage:
//!   clipexport export [OPTIONS]     Run a synthetic export
//!   clipexport geometry [OPTIONS]   Show the aspect-fit geometry for a source
//!   clipexport config               Print the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "clipexport",
    about = "Export media clips with aspect-fit framing and per-frame hooks",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a generated test asset
    Export {
        /// Output file path (defaults to the configured output directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Source asset duration (seconds)
        #[arg(long, default_value = "2.0")]
        duration: f64,

        /// Start of the exported range (seconds)
        #[arg(long, default_value = "0.0")]
        start: f64,

        /// Length of the exported range (seconds, defaults to the rest of the asset)
        #[arg(long)]
        length: Option<f64>,

        /// Output width (defaults to the configured width)
        #[arg(long)]
        width: Option<u32>,

        /// Output height (defaults to the configured height)
        #[arg(long)]
        height: Option<u32>,

        /// Source frame width
        #[arg(long, default_value = "640")]
        source_width: u32,

        /// Source frame height
        #[arg(long, default_value = "360")]
        source_height: u32,

        /// Source frame rate
        #[arg(long, default_value = "30")]
        fps: f64,

        /// Source orientation in degrees: 0, 90, 180 or 270
        #[arg(long, default_value = "0")]
        rotate: u32,

        /// Leave out the audio track
        #[arg(long)]
        no_audio: bool,

        /// Leave out the video track
        #[arg(long)]
        no_video: bool,

        /// Invert colours through a per-frame hook
        #[arg(long)]
        invert: bool,
    },

    /// Show the render size and transform for a source
    Geometry {
        /// Source frame width
        #[arg(long)]
        source_width: u32,

        /// Source frame height
        #[arg(long)]
        source_height: u32,

        /// Source orientation in degrees: 0, 90, 180 or 270
        #[arg(long, default_value = "0")]
        rotate: u32,

        /// Target width
        #[arg(long)]
        width: u32,

        /// Target height
        #[arg(long)]
        height: u32,
    },

    /// Print the effective configuration
    Config {
        /// Write the effective configuration to the standard location
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = clipexport_common::AppConfig::load();

    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    clipexport_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Export {
            output,
            duration,
            start,
            length,
            width,
            height,
            source_width,
            source_height,
            fps,
            rotate,
            no_audio,
            no_video,
            invert,
        } => {
            let args = commands::export::ExportArgs {
                output,
                duration,
                start,
                length,
                width,
                height,
                source_width,
                source_height,
                fps,
                rotate,
                audio: !no_audio,
                video: !no_video,
                invert,
            };
            commands::export::run(&config, args).await
        }
        Commands::Geometry {
            source_width,
            source_height,
            rotate,
            width,
            height,
        } => commands::geometry::run(source_width, source_height, rotate, width, height),
        Commands::Config { save } => commands::config::run(&config, save),
    }
}
