//! Argument definitions

use clap::{Parser, Subcommand};
use pdfstudio_core::remote::ImageFormat;
use pdfstudio_core::Annotation;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pdfstudio")]
#[command(version, about = "Page-level PDF tools: organize, annotate, merge, split and more")]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Processing server URL, overrides `remote.base_url`
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Directory the result is written to
    #[arg(short, long, global = true, default_value = ".")]
    pub out_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show page count, version and metadata
    Info { file: PathBuf },

    /// Combine PDFs in the order given
    Merge {
        #[arg(num_args = 2.., required = true)]
        files: Vec<PathBuf>,
    },

    /// Keep one page ("3") or an inclusive range ("2-5")
    Extract {
        file: PathBuf,
        #[arg(short, long)]
        range: String,
    },

    /// Remove a single page
    Delete {
        file: PathBuf,
        #[arg(short, long)]
        page: String,
    },

    /// Rotate every page
    Rotate {
        file: PathBuf,
        #[arg(short, long, default_value_t = 90, allow_hyphen_values = true)]
        degrees: i64,
    },

    /// Stamp diagonal text across every page
    Watermark {
        file: PathBuf,
        #[arg(short, long)]
        text: String,
    },

    /// Add "Page i of n" footers
    Number { file: PathBuf },

    /// Set title and author
    Metadata {
        file: PathBuf,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
    },

    /// Insert an A4 blank page after the given page (0 puts it first)
    Insert {
        file: PathBuf,
        #[arg(short, long)]
        after: usize,
    },

    /// Wrap a JPEG or PNG into a one-page PDF
    Image { file: PathBuf },

    /// Reorder pages by drag-and-drop moves, applied in order
    Organize {
        file: PathBuf,
        /// DRAGGED:TARGET, 1-based original page numbers
        #[arg(long = "drop", value_parser = parse_drop)]
        drops: Vec<(usize, usize)>,
    },

    /// Burn text annotations into pages
    Edit {
        file: PathBuf,
        /// PAGE:LEFT:TOP:TEXT in overlay pixels
        #[arg(long = "annotate", value_parser = parse_annotation)]
        annotations: Vec<Annotation>,
    },

    /// Remove a password (processing server)
    Unlock {
        file: PathBuf,
        #[arg(short, long)]
        password: String,
    },

    /// Add a password (processing server)
    Protect {
        file: PathBuf,
        #[arg(short, long)]
        password: String,
    },

    /// Shrink a PDF (processing server)
    Compress { file: PathBuf },

    /// Extract text from scanned pages (processing server)
    Ocr { file: PathBuf },

    /// Render pages to images (processing server)
    ToImage {
        file: PathBuf,
        #[arg(short, long, default_value = "jpeg")]
        format: ImageFormat,
    },

    /// Convert to a Word document (processing server)
    ToWord { file: PathBuf },
}

/// "DRAGGED:TARGET" with 1-based page numbers, returned zero-based
pub fn parse_drop(value: &str) -> Result<(usize, usize), String> {
    let (dragged, target) = value
        .split_once(':')
        .ok_or_else(|| format!("expected DRAGGED:TARGET, got \"{}\"", value))?;
    Ok((page_number(dragged)? - 1, page_number(target)? - 1))
}

/// "PAGE:LEFT:TOP:TEXT"; the text may itself contain colons
pub fn parse_annotation(value: &str) -> Result<Annotation, String> {
    let mut parts = value.splitn(4, ':');
    let (Some(page), Some(left), Some(top), Some(text)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected PAGE:LEFT:TOP:TEXT, got \"{}\"", value));
    };

    let coordinate = |raw: &str| {
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("invalid coordinate \"{}\"", raw))
    };
    Ok(Annotation::new(
        page_number(page)?,
        text,
        coordinate(left)?,
        coordinate(top)?,
    ))
}

fn page_number(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(format!("invalid page number \"{}\"", raw)),
    }
}
