//! Headless compositor: reads a session file, places its objects and writes
//! the exported composite.

mod session;

use clap::{Parser, ValueEnum};
use photostrip_render::ExportFormat;
use session::{AppError, SessionFile};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "photostrip", version, about = "Compose a photo strip from a session file")]
struct Cli {
    /// Session file (JSON)
    #[arg(value_name = "SESSION")]
    session: PathBuf,

    /// Output image path
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Output format; defaults to the session file, then the output extension
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// JPEG quality (1-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum FormatArg {
    Png,
    Jpeg,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Png => ExportFormat::Png,
            FormatArg::Jpeg => ExportFormat::Jpeg,
        }
    }
}

fn run(cli: &Cli) -> Result<(), AppError> {
    let file = SessionFile::load(&cli.session)?;
    let base = cli.session.parent().unwrap_or(Path::new("."));
    let request = file.export_request(cli.format.map(Into::into), cli.quality, &cli.output)?;

    let editor = file.build_editor(base)?;
    let bytes = editor.export(request)?;
    std::fs::write(&cli.output, &bytes).map_err(|source| AppError::Write {
        path: cli.output.clone(),
        source,
    })?;
    log::info!("Wrote {}", cli.output.display());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    log::info!("Starting PhotoStrip");

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            eprintln!("photostrip: {err}");
            ExitCode::FAILURE
        }
    }
}
