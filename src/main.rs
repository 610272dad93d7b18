use clap::{Parser, ValueEnum};
use pagesmith::{ConversionOptions, FileId, FileStatus, Format, MimeKind, Session};
use std::path::PathBuf;

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Pdf,
    Docx,
}

impl From<FormatArg> for Format {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Pdf => Format::Pdf,
            FormatArg::Docx => Format::Docx,
        }
    }
}

#[derive(Parser)]
#[command(name = "pagesmith", about = "Convert HTML and text files to PDF or DOCX")]
struct Args {
    /// Input .html/.htm or .txt files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Output format
    #[arg(short, long, value_enum, default_value = "pdf")]
    format: FormatArg,
    /// Directory for converted files (defaults to each input's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    /// Lay out HTML as plain paragraphs in PDF output
    #[arg(long)]
    no_styles: bool,
    /// Leave images out of PDF output
    #[arg(long)]
    no_images: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    let format = Format::from(args.format);

    let options = ConversionOptions::new(format)
        .with_preserve_styles(!args.no_styles)
        .with_include_images(!args.no_images);
    let mut session = Session::new().with_options(options);
    let mut queued: Vec<(FileId, PathBuf)> = Vec::new();
    let mut failed = false;

    for input in &args.inputs {
        if !input.is_file() {
            eprintln!("Error: not a file: {}", input.display());
            failed = true;
            continue;
        }
        let bytes = match std::fs::read(input) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("Error: cannot read {}: {e}", input.display());
                failed = true;
                continue;
            }
        };
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.display().to_string());
        match session.add(&name, MimeKind::mime_for_path(input), &bytes) {
            Ok(id) => queued.push((id, input.clone())),
            Err(e) => {
                eprintln!("Error: {e}");
                failed = true;
            }
        }
    }

    session.convert_all(format);

    for (id, input) in &queued {
        let Some(entry) = session.get(*id) else { continue };
        match entry.status() {
            FileStatus::Completed { output } => {
                let Some(file_name) = session.download_name(*id) else { continue };
                let dir = args
                    .output_dir
                    .clone()
                    .or_else(|| input.parent().map(PathBuf::from))
                    .unwrap_or_default();
                let target = dir.join(file_name);
                if let Err(e) = std::fs::write(&target, &output.bytes) {
                    eprintln!("Error: cannot write {}: {e}", target.display());
                    failed = true;
                } else {
                    println!("{} -> {}", input.display(), target.display());
                }
            }
            FileStatus::Error { message, .. } => {
                eprintln!("Error: {}: {message}", input.display());
                failed = true;
            }
            FileStatus::Pending | FileStatus::Converting { .. } => {}
        }
    }

    if failed {
        std::process::exit(1);
    }
}
