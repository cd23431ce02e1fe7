use audio2score::{validate_input, Audio2Score, Config};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Audio2Score Conversion Pipeline
#[derive(Parser)]
#[command(name = "audio2score")]
#[command(about = "Convert audio recordings into engraved scores")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an audio file to MIDI/MusicXML (and optionally PDF/PNG)
    Convert {
        /// Input audio file (WAV/MP3)
        input: PathBuf,

        /// Output base path; extensions are appended per format
        #[arg(short, long, default_value = "./output/score")]
        output: PathBuf,

        /// Instrument voice: Piano, Violin or Cello
        #[arg(short, long, default_value = "Piano")]
        instrument: String,

        /// Score title
        #[arg(long)]
        title: Option<String>,

        /// Score composer
        #[arg(long)]
        composer: Option<String>,

        /// Custom configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Skip the PDF rendering step
        #[arg(long)]
        no_pdf: bool,

        /// Skip the PNG rendering step
        #[arg(long)]
        no_png: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Quiet output
        #[arg(short, long)]
        quiet: bool,
    },
    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config: PathBuf,
    },
    /// Show default configuration
    ShowConfig,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            output,
            instrument,
            title,
            composer,
            config,
            no_pdf,
            no_png,
            verbose,
            quiet,
        } => {
            if verbose && quiet {
                anyhow::bail!("Cannot specify both --verbose and --quiet");
            }

            let filter = if verbose {
                "debug"
            } else if quiet {
                "error"
            } else {
                "info"
            };
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
                .init();

            // Load configuration
            let mut config = if let Some(config_path) = config {
                audio2score::config::load_config(config_path)?
            } else {
                Config::default()
            };

            if let Some(title) = title {
                config.score.title = title;
            }
            if let Some(composer) = composer {
                config.score.composer = composer;
            }
            if no_pdf {
                config.export.write_pdf = false;
            }
            if no_png {
                config.export.write_png = false;
            }

            validate_input(&input, &config)?;

            // Instrument selection is rejected before anything is written
            let processor = Audio2Score::with_instrument(config, &instrument)?;

            if !quiet {
                println!("Processing {}...", input.display());
            }

            let summary = processor.process(&input, &output)?;

            if !quiet {
                println!("Transcription strategy: {}", summary.strategy);
                println!("MIDI: {}", summary.midi_path.display());
                println!("MusicXML: {}", summary.musicxml_path.display());
                if let Some(pdf) = &summary.pdf_path {
                    println!("PDF: {}", pdf.display());
                }
                if let Some(png) = &summary.png_path {
                    println!("PNG: {}", png.display());
                }
            }
            if verbose {
                println!("\n{}", summary.report.to_text());
            }
        }
        Commands::ValidateConfig { config } => {
            let config = audio2score::config::load_config(config)?;
            println!("Configuration is valid");
            if let Ok(json) = serde_json::to_string_pretty(&config) {
                println!("{}", json);
            }
        }
        Commands::ShowConfig => {
            let config = Config::default();
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
    }

    Ok(())
}
