//! Command line front end: quantifies an AB7300 export and writes the
//! result in one of the export formats.

use clap::{Parser, Subcommand};
use qpcr::prelude::*;
use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "qpcr",
    version,
    about = "Relative quantification (ddCt) of AB7300 real-time PCR exports"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lists the samples of an export, flagging mock candidates
    Samples {
        /// Path to the AB7300 SDS v1.4 text export
        input: PathBuf,
    },

    /// Quantifies an export against a mock sample
    Compute {
        /// Path to the AB7300 SDS v1.4 text export
        input: PathBuf,

        /// Reference sample. Defaults to the sample called "mock"
        #[arg(long)]
        mock: Option<String>,

        /// json, csv, xml, ods, xlsx or the matching content type
        #[arg(long, default_value = "json")]
        format: ExportFormat,

        /// Output file, stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Samples { input } => {
            let content = fs::read_to_string(&input)?;
            for (sample, is_mock) in Ab7300Builder::new().suggest_mocks(&content)? {
                if is_mock {
                    println!("{}\tmock", sample);
                } else {
                    println!("{}", sample);
                }
            }
        }
        Command::Compute {
            input,
            mock,
            format,
            output,
        } => {
            log::info!("Reading instrument export {:?}", input);
            let content = fs::read_to_string(&input)?;
            let mock = match mock {
                Some(mock) => mock,
                None => Ab7300Builder::new().suggested_mock(&content)?,
            };
            log::info!("Quantifying against mock '{}'", mock);

            let experiment = qpcr::compute(&content, &mock)?;
            let exported = export(&experiment, format)?;
            log::info!(
                "Exported {} detectors as {}",
                experiment.detectors.len(),
                exported.content_type
            );

            match output {
                Some(path) => fs::write(&path, &exported.payload)?,
                None => io::stdout().write_all(&exported.payload)?,
            }
        }
    }
    Ok(())
}
