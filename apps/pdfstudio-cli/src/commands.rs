//! Subcommand handlers

use crate::cli::{Cli, Command};
use crate::remote_client::RemoteClient;
use anyhow::{bail, Context, Result};
use pdfstudio_core::config::EditorConfig;
use pdfstudio_core::remote::{RemoteOutput, RemoteRequest};
use pdfstudio_core::{
    check_upload_size, tools, validate_image, validate_pdf, Annotation, CommitOutput, Direction, EditSession,
    PdfStudioError, RemoteTool, StudioConfig,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Load configuration, falling back to defaults when no file is given
pub fn load_config(path: Option<&Path>, server: Option<String>) -> Result<StudioConfig> {
    let mut config = match path {
        Some(path) => StudioConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => StudioConfig::default(),
    };
    if let Some(server) = server {
        config.remote.base_url = server;
        config.validate()?;
    }
    Ok(config)
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_pdf(path: &Path, config: &StudioConfig) -> Result<Vec<u8>> {
    let bytes = read_input(path)?;
    validate_pdf(&bytes, config.upload.max_size_mb)
        .with_context(|| format!("{} is not a usable PDF", path.display()))?;
    Ok(bytes)
}

/// Read a password-protected PDF. It may not parse locally, so only its size is checked.
fn read_locked_pdf(path: &Path, max_mb: u64) -> Result<Vec<u8>> {
    let bytes = read_input(path)?;
    check_upload_size(&bytes, max_mb)
        .with_context(|| format!("{} cannot be uploaded", path.display()))?;
    Ok(bytes)
}

/// Write `bytes` under `out_dir`, creating the directory if needed
pub fn write_output(out_dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let path = out_dir.join(file_name);
    fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Apply drag-and-drop moves (zero-based original indices) and commit
pub fn organize(
    bytes: Vec<u8>,
    drops: &[(usize, usize)],
    editor: &EditorConfig,
) -> Result<CommitOutput, PdfStudioError> {
    let mut session = EditSession::new(editor);
    session.load(bytes)?;
    for &(dragged, target) in drops {
        session.drop_page(dragged, target)?;
    }
    session.commit_reorder()
}

/// Walk the document page by page, leaving each page's annotations in the
/// overlay before moving on, then commit from the last page
pub fn edit(
    bytes: Vec<u8>,
    annotations: &[Annotation],
    editor: &EditorConfig,
) -> Result<CommitOutput, PdfStudioError> {
    let mut session = EditSession::new(editor);
    let page_count = session.load(bytes)?;

    let mut by_page: BTreeMap<usize, Vec<Annotation>> = BTreeMap::new();
    for annotation in annotations {
        if annotation.page_number > page_count {
            return Err(PdfStudioError::InvalidPage(format!(
                "Page {} does not exist (document has {} pages)",
                annotation.page_number, page_count
            )));
        }
        by_page
            .entry(annotation.page_number)
            .or_default()
            .push(annotation.clone());
    }

    let overlay = |page: usize| by_page.get(&page).map(Vec::as_slice).unwrap_or(&[]);
    for page in 1..page_count {
        session.navigate(Direction::Next, overlay(page));
    }
    session.commit_edits(overlay(page_count))
}

async fn run_remote(
    config: &StudioConfig,
    path: &Path,
    request: Result<RemoteRequest, PdfStudioError>,
) -> Result<RemoteOutput> {
    let request = request?;
    let client = RemoteClient::new(config.remote.base_url.clone());
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string());
    let output = client.send(request, &file_name).await?;

    if let RemoteOutput::Compressed {
        stats: Some(stats), ..
    } = &output
    {
        tracing::info!(
            original = stats.original_size,
            compressed = stats.compressed_size,
            "Reduced by {:.1}%",
            stats.percent_saved()
        );
    }
    Ok(output)
}

/// Execute the parsed command line and return the written file, if any
pub async fn run(cli: Cli) -> Result<Option<PathBuf>> {
    let config = load_config(cli.config.as_deref(), cli.server)?;
    let max_mb = config.upload.max_size_mb;

    let (file_name, bytes) = match cli.command {
        Command::Info { file } => {
            let bytes = read_input(&file)?;
            let info = validate_pdf(&bytes, max_mb)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            return Ok(None);
        }
        Command::Merge { files } => {
            let inputs = files
                .iter()
                .map(|path| read_pdf(path, &config))
                .collect::<Result<Vec<_>>>()?;
            into_parts(tools::merge(&inputs)?)
        }
        Command::Extract { file, range } => {
            into_parts(tools::extract(&read_pdf(&file, &config)?, &range)?)
        }
        Command::Delete { file, page } => {
            into_parts(tools::delete_page(&read_pdf(&file, &config)?, &page)?)
        }
        Command::Rotate { file, degrees } => {
            into_parts(tools::rotate(&read_pdf(&file, &config)?, degrees)?)
        }
        Command::Watermark { file, text } => into_parts(tools::watermark(
            &read_pdf(&file, &config)?,
            &text,
            &config.watermark,
        )?),
        Command::Number { file } => into_parts(tools::page_numbers(&read_pdf(&file, &config)?)?),
        Command::Metadata {
            file,
            title,
            author,
        } => {
            if title.is_none() && author.is_none() {
                bail!("Provide --title, --author or both");
            }
            into_parts(tools::set_metadata(
                &read_pdf(&file, &config)?,
                title.as_deref(),
                author.as_deref(),
            )?)
        }
        Command::Insert { file, after } => {
            into_parts(tools::insert_blank_page(&read_pdf(&file, &config)?, after)?)
        }
        Command::Image { file } => {
            let bytes = read_input(&file)?;
            validate_image(&bytes, max_mb)?;
            into_parts(tools::image_to_pdf(&bytes)?)
        }
        Command::Organize { file, drops } => {
            let output = organize(read_pdf(&file, &config)?, &drops, &config.editor)?;
            (output.file_name, output.bytes)
        }
        Command::Edit { file, annotations } => {
            let output = edit(read_pdf(&file, &config)?, &annotations, &config.editor)?;
            (output.file_name, output.bytes)
        }
        Command::Unlock { file, password } => {
            let bytes = read_locked_pdf(&file, max_mb)?;
            let request = RemoteRequest::new(RemoteTool::Unlock, bytes, Some(password), None);
            remote_parts(run_remote(&config, &file, request).await?)
        }
        Command::Protect { file, password } => {
            let request = RemoteRequest::new(
                RemoteTool::Protect,
                read_pdf(&file, &config)?,
                Some(password),
                None,
            );
            remote_parts(run_remote(&config, &file, request).await?)
        }
        Command::Compress { file } => {
            let request =
                RemoteRequest::new(RemoteTool::Compress, read_pdf(&file, &config)?, None, None);
            remote_parts(run_remote(&config, &file, request).await?)
        }
        Command::Ocr { file } => {
            let request = RemoteRequest::new(RemoteTool::Ocr, read_pdf(&file, &config)?, None, None);
            remote_parts(run_remote(&config, &file, request).await?)
        }
        Command::ToImage { file, format } => {
            let request = RemoteRequest::new(
                RemoteTool::PdfToImage,
                read_pdf(&file, &config)?,
                None,
                Some(format),
            );
            remote_parts(run_remote(&config, &file, request).await?)
        }
        Command::ToWord { file } => {
            let request =
                RemoteRequest::new(RemoteTool::PdfToWord, read_pdf(&file, &config)?, None, None);
            remote_parts(run_remote(&config, &file, request).await?)
        }
    };

    let path = write_output(&cli.out_dir, &file_name, &bytes)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "Wrote result");
    Ok(Some(path))
}

fn into_parts(output: tools::ToolOutput) -> (String, Vec<u8>) {
    (output.file_name, output.bytes)
}

fn remote_parts(output: RemoteOutput) -> (String, Vec<u8>) {
    (output.download_name(), output.bytes().to_vec())
}
