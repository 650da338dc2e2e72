use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use bermuda_formats::{ScriptListing, disassemble};
use clap::Parser;
use serde::Serialize;
use walkdir::WalkDir;

/// Disassemble compiled object scripts (.script dumps).
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// A `.script` file, or a directory searched recursively for them
    path: PathBuf,

    /// Emit JSON instead of the text listing
    #[arg(long)]
    json: bool,

    /// Write the output here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Serialize)]
struct DumpEntry {
    path: String,
    listing: ScriptListing,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let files = collect_scripts(&args.path)?;
    if files.is_empty() {
        bail!("no .script files found under {}", args.path.display());
    }

    let mut entries = Vec::with_capacity(files.len());
    for path in files {
        let bytes = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        let listing =
            disassemble(&bytes).with_context(|| format!("disassembling {}", path.display()))?;
        entries.push(DumpEntry {
            path: path.display().to_string(),
            listing,
        });
    }

    let output = if args.json {
        serde_json::to_string_pretty(&entries)?
    } else {
        let mut text = String::new();
        for entry in &entries {
            text.push_str(&format!(
                "== {} ({} bytes, {} statements)\n",
                entry.path,
                entry.listing.size,
                entry.listing.statements.len()
            ));
            text.push_str(&entry.listing.to_text());
        }
        text
    };

    match args.out {
        Some(path) => {
            fs::write(&path, output).with_context(|| format!("writing {}", path.display()))?
        }
        None => print!("{output}"),
    }
    Ok(())
}

fn collect_scripts(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_script = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("script"))
            .unwrap_or(false);
        if is_script {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}
