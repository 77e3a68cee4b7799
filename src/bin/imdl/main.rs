//! imdl CLI - inspect, repack and extract imdl tiles.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use imdl::document::{Document, Primitives};
use imdl::texture::CodecRegistry;
use imdl::DecodeLimits;

#[derive(Parser)]
#[command(name = "imdl")]
#[command(about = "imdl scene-tile toolkit")]
#[command(version)]
struct Cli {
    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Maximum number of external buffers
    #[arg(long, global = true)]
    max_buffers: Option<usize>,

    /// Maximum declared allocation in bytes
    #[arg(long, global = true)]
    max_memory: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show document summary and primitive counts
    #[command(visible_alias = "i")]
    Info {
        file: PathBuf,

        /// List every buffer view
        #[arg(long)]
        views: bool,
    },

    /// Decode and re-encode a document
    #[command(visible_alias = "r")]
    Repack {
        input: PathBuf,
        output: PathBuf,

        /// Write plain JSON plus an external .bin instead of a binary container
        #[arg(long)]
        json: bool,

        /// Decode textures to pixels and encode them again
        #[arg(long)]
        textures: bool,
    },

    /// Write the bytes of one buffer view to a file
    #[command(visible_alias = "x")]
    Extract {
        file: PathBuf,

        /// Buffer view name
        view: String,

        /// Output file (default: <view>.bin)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn limits(cli: &Cli) -> DecodeLimits {
    let mut limits = DecodeLimits::default();
    if let Some(n) = cli.max_buffers {
        limits = limits.with_max_external_buffers(n);
    }
    if let Some(n) = cli.max_memory {
        limits = limits.with_max_memory_allocation(n);
    }
    limits
}

#[cfg(feature = "image")]
fn codecs() -> Result<Arc<CodecRegistry>> {
    Ok(Arc::new(CodecRegistry::with_image_codecs()))
}

#[cfg(not(feature = "image"))]
fn codecs() -> Result<Arc<CodecRegistry>> {
    bail!("texture codecs not available. Rebuild with: cargo build --features image")
}

fn open(path: &Path, limits: DecodeLimits, codecs: Option<Arc<CodecRegistry>>) -> Result<Document> {
    info!("Opening {}", path.display());
    imdl::open_with(path, limits, codecs).with_context(|| format!("failed to open {}", path.display()))
}

#[derive(Default)]
struct Counts {
    meshes: usize,
    polylines: usize,
    point_strings: usize,
    area_patterns: usize,
    vertices: u64,
    indices: u64,
}

fn count_primitives(doc: &Document) -> Counts {
    let mut c = Counts::default();
    for mesh in doc.meshes.values() {
        match &mesh.primitives {
            Some(Primitives::Meshes(prims)) => {
                c.meshes += prims.len();
                for p in prims {
                    c.vertices += p.data.as_ref().map_or(0, |d| d.vertices.len() as u64);
                    c.indices += p.data.as_ref().map_or(0, |d| d.indices.len() as u64);
                }
            }
            Some(Primitives::Polylines(prims)) => {
                c.polylines += prims.len();
                for p in prims {
                    c.vertices += p.data.as_ref().map_or(0, |d| d.vertices.len() as u64);
                    c.indices += p.data.as_ref().map_or(0, |d| d.indices.len() as u64);
                }
            }
            Some(Primitives::PointStrings(prims)) => {
                c.point_strings += prims.len();
                for p in prims {
                    c.vertices += p.data.as_ref().map_or(0, |d| d.vertices.len() as u64);
                    c.indices += p.data.as_ref().map_or(0, |d| d.indices.len() as u64);
                }
            }
            Some(Primitives::AreaPatterns(prims)) => c.area_patterns += prims.len(),
            None => {}
        }
    }
    c
}

fn cmd_info(cli: &Cli, path: &Path, views: bool) -> Result<()> {
    let doc = open(path, limits(cli), None)?;
    let counts = count_primitives(&doc);
    let blob_bytes: u64 = doc.buffers.values().map(|b| b.byte_length).sum();

    println!("Document: {}", path.display());
    if let Some(scene) = &doc.scene {
        println!("Scene: {}", scene);
    }
    println!("Buffers: {} ({} bytes)", doc.buffers.len(), blob_bytes);
    println!("Buffer views: {}", doc.buffer_views.len());
    println!();
    println!("Primitives:");
    println!("  Meshes:        {}", counts.meshes);
    println!("  Polylines:     {}", counts.polylines);
    println!("  Point strings: {}", counts.point_strings);
    if counts.area_patterns > 0 {
        println!("  Area patterns: {}", counts.area_patterns);
    }
    println!("  ({} vertices, {} indices)", counts.vertices, counts.indices);
    println!();
    println!("Materials: {}", doc.materials.len() + doc.render_materials.len());
    println!("Textures:  {}", doc.named_textures.len());
    for (name, tex) in &doc.named_textures {
        println!("  {} {}x{} {}", name, tex.width, tex.height, tex.format);
    }

    if views {
        println!();
        println!("Views:");
        for (name, view) in &doc.buffer_views {
            println!(
                "  {:<24} {:>10} +{:<10} {}",
                name, view.byte_offset, view.byte_length, view.buffer
            );
        }
    }
    Ok(())
}

fn cmd_repack(cli: &Cli, input: &Path, output: &Path, json: bool, textures: bool) -> Result<()> {
    let codecs = if textures { Some(codecs()?) } else { None };
    let mut doc = open(input, limits(cli), codecs.clone())?;
    debug!("{} primitives, {} chunks", doc.primitive_count(), doc.chunks().len());

    let written = imdl::save_with(&mut doc, output, !json, codecs)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!("Wrote {} ({} bytes)", output.display(), written);
    Ok(())
}

fn cmd_extract(cli: &Cli, path: &Path, view: &str, output: Option<&Path>) -> Result<()> {
    let doc = open(path, limits(cli), None)?;
    let Some(bytes) = doc.find_buffer(view) else {
        bail!("no buffer view '{}' in {}", view, path.display());
    };
    let output = output.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(format!("{}.bin", view)));
    fs::write(&output, bytes).with_context(|| format!("failed to write {}", output.display()))?;
    info!("Extracted '{}' ({} bytes) to {}", view, bytes.len(), output.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match &cli.command {
        Commands::Info { file, views } => cmd_info(&cli, file, *views),
        Commands::Repack { input, output, json, textures } => cmd_repack(&cli, input, output, *json, *textures),
        Commands::Extract { file, view, output } => cmd_extract(&cli, file, view, output.as_deref()),
    }
}
