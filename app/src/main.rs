use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use photo_metadata::ExifMetadataProvider;
use photogeo::config::{AppSettings, FileViewMode};
use photogeo::file_browser::{default_home_folder, FileBrowserPane, ListingFilter, LoadOutcome, SortColumn};
use photogeo::logging;
use photogeo::map::{MapPane, MapUpdate};
use photogeo::preview::{PreviewPane, PreviewUpdate};
use photogeo::workspace::WorkspaceState;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thumbnail_cache::{DiskThumbnailCache, ListItem, ThumbnailEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

#[derive(Parser)]
#[command(name = "photogeo")]
#[command(about = "Browse photo folders, build thumbnails and place photos on a map")]
struct Cli {
    /// Settings file (defaults to the per-user settings.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the rolling log file
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List a folder and generate thumbnails for its images
    Browse {
        /// Folder to open (defaults to the last browsed folder, then the pictures folder)
        folder: Option<PathBuf>,

        /// Listing layout
        #[arg(long, value_enum)]
        view: Option<FileViewMode>,

        /// Column to sort by
        #[arg(long, value_enum, default_value_t = SortColumn::Name)]
        sort: SortColumn,

        /// Sort descending
        #[arg(long)]
        descending: bool,

        /// List every file, not only images
        #[arg(long)]
        all_files: bool,

        /// Only list files whose name contains this text
        #[arg(short, long)]
        search: Option<String>,

        /// Maximum concurrent thumbnail generations
        #[arg(long)]
        concurrency: Option<usize>,

        /// Thumbnail cache directory
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },

    /// Read EXIF locations and show where the photos would land on the map
    Locate {
        /// Photos to locate
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Zoom level used for a single photo
        #[arg(short, long)]
        zoom: Option<u8>,
    },

    /// Summarize one photo and the zoom that fits it into a viewport
    Preview {
        /// Photo to show
        file: PathBuf,

        /// Viewport width in pixels
        #[arg(long, default_value_t = 1280.0)]
        width: f64,

        /// Viewport height in pixels
        #[arg(long, default_value_t = 800.0)]
        height: f64,
    },

    /// Export settings to a file or import them from one
    Settings {
        /// Write the current settings to this file
        #[arg(long, conflicts_with = "import")]
        export: Option<PathBuf>,

        /// Replace the current settings with this file's
        #[arg(long)]
        import: Option<PathBuf>,
    },

    /// Show or clear the thumbnail cache
    Cache {
        /// Delete every cached thumbnail
        #[arg(long)]
        clear: bool,

        /// Thumbnail cache directory
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_dir = match cli.log_dir {
        Some(dir) => dir,
        None => logging::default_log_dir()?,
    };
    let _guard = logging::init(&log_dir)?;

    let settings_path = match cli.config {
        Some(path) => path,
        None => AppSettings::settings_path()?,
    };
    let settings = AppSettings::load_from(&settings_path);

    match cli.command {
        Commands::Browse { folder, view, sort, descending, all_files, search, concurrency, cache_dir } => {
            let mut session = settings.clone();
            if let Some(concurrency) = concurrency {
                session.thumbnails.concurrency = concurrency;
            }
            let folder = match folder.or_else(|| settings.restore_folder()).or_else(default_home_folder) {
                Some(folder) => folder,
                None => bail!("No folder given and no previous or pictures folder to open"),
            };
            let filter = ListingFilter {
                images_only: session.show_images_only && !all_files,
                search_text: search,
            };
            let view = view.unwrap_or(session.file_view_mode);

            let opened = browse(&folder, &session, filter, view, sort, descending, cache_dir).await?;
            if let Some(opened) = opened {
                // Only the remembered folder changes; per-run overrides are not persisted
                let mut settings = settings;
                settings.last_folder_path = Some(opened);
                if let Err(e) = settings.save_to(&settings_path) {
                    warn!("Failed to remember the last folder: {:#}", e);
                }
            }
            Ok(())
        }
        Commands::Locate { files, zoom } => {
            locate(files, zoom.unwrap_or(settings.map_default_zoom_level)).await
        }
        Commands::Preview { file, width, height } => preview(file, width, height).await,
        Commands::Settings { export, import } => manage_settings(settings, &settings_path, export, import),
        Commands::Cache { clear, cache_dir } => manage_cache(&settings, clear, cache_dir),
    }
}

fn open_cache(settings: &AppSettings, cache_dir: Option<PathBuf>) -> Result<DiskThumbnailCache> {
    match cache_dir {
        Some(dir) => DiskThumbnailCache::with_dir(dir, &settings.thumbnails),
        None => DiskThumbnailCache::new(&settings.thumbnails),
    }
}

/// Returns the folder that was listed, if the listing completed
async fn browse(
    folder: &Path,
    settings: &AppSettings,
    filter: ListingFilter,
    view: FileViewMode,
    sort: SortColumn,
    descending: bool,
    cache_dir: Option<PathBuf>,
) -> Result<Option<PathBuf>> {
    println!("🔍 Opening: {}", folder.display());

    let cache = Arc::new(open_cache(settings, cache_dir)?);
    let workspace = Arc::new(WorkspaceState::new());
    let pane = FileBrowserPane::new(cache, &settings.thumbnails, workspace, filter);

    if pane.sort_state().column != sort {
        pane.toggle_sort(sort);
    }
    if descending {
        pane.toggle_sort(sort);
    }

    let mut events = pane.subscribe_thumbnails();
    let item_count = match pane.load_folder(folder, true).await? {
        LoadOutcome::Loaded { item_count } => item_count,
        LoadOutcome::Superseded => return Ok(None),
    };
    let opened = pane.current_folder();

    if item_count == 0 {
        println!("⚠️  Nothing to show in {}", folder.display());
        return Ok(opened);
    }

    if pane.scheduler().is_running() {
        println!("🖼️  Generating thumbnails ({} at a time)...", pane.scheduler().concurrency());
        loop {
            match events.recv().await {
                Ok(ThumbnailEvent::RoundFinished { applied, failed, .. }) => {
                    println!("\r✅ {} thumbnails ready, {} failed", applied, failed);
                    break;
                }
                Ok(ThumbnailEvent::RoundCancelled { .. }) => {
                    println!("\r❌ Thumbnail generation was cancelled");
                    break;
                }
                Ok(ThumbnailEvent::Applied { .. }) => {
                    if let Some(progress) = pane.scheduler().progress() {
                        print!("\r   {:>5.1}%", progress.completion_percentage());
                        let _ = std::io::Write::flush(&mut std::io::stdout());
                    }
                }
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    }

    print_listing(&pane.items(), view);
    Ok(opened)
}

fn print_listing(items: &[Arc<ListItem>], view: FileViewMode) {
    println!("\n📂 LISTING");
    println!("==========");

    match view {
        FileViewMode::Details => print_details(items),
        FileViewMode::List => {
            for item in items {
                let marker = if item.is_folder() { "📁" } else { "📄" };
                println!("  {} {}", marker, item.name());
            }
        }
        FileViewMode::Icon => {
            for row in items.chunks(4) {
                let cells: Vec<String> = row
                    .iter()
                    .map(|item| {
                        let marker = match (item.is_folder(), item.thumbnail().is_some()) {
                            (true, _) => "📁",
                            (false, true) => "🖼️ ",
                            (false, false) => "📄",
                        };
                        format!("{} {:<22}", marker, item.name())
                    })
                    .collect();
                println!("  {}", cells.join(" "));
            }
        }
    }
}

fn print_details(items: &[Arc<ListItem>]) {
    for item in items {
        if item.is_folder() {
            println!("  📁 {}", item.name());
            continue;
        }

        let resolution = item
            .pixel_size()
            .map(|(w, h)| format!("{}x{}", w, h))
            .unwrap_or_else(|| "-".to_string());
        let marker = if item.thumbnail().is_some() { "🖼️ " } else { "📄" };
        println!(
            "  {} {:<40} {:>10}  {:>11}  {}",
            marker,
            item.name(),
            format_size(item.size_bytes()),
            resolution,
            item.last_modified().format("%Y-%m-%d %H:%M"),
        );
    }
}

async fn locate(files: Vec<PathBuf>, zoom_level: u8) -> Result<()> {
    let items = files.into_iter().map(file_item).collect::<Result<Vec<_>>>()?;

    println!("📍 Reading locations for {} photos...", items.len());
    let pane = MapPane::new(Arc::new(ExifMetadataProvider::new()), zoom_level);

    match pane.show_selection(&items).await {
        None | Some(MapUpdate::NoSelection) => println!("⚠️  No photos selected"),
        Some(MapUpdate::NoLocation) => println!("❌ None of the photos carries a location"),
        Some(update @ MapUpdate::Single { .. }) | Some(update @ MapUpdate::Fit { .. }) => {
            for marker in update.markers() {
                println!(
                    "  📌 {} at {:.6}, {:.6} ({} pin){}{}",
                    marker.item.name(),
                    marker.coordinate.latitude,
                    marker.coordinate.longitude,
                    marker.pin.color_name(),
                    marker
                        .metadata
                        .taken_at
                        .map(|t| format!(", taken {}", t.format("%Y-%m-%d %H:%M")))
                        .unwrap_or_default(),
                    marker
                        .metadata
                        .camera_name()
                        .map(|camera| format!(" with {}", camera))
                        .unwrap_or_default(),
                );
            }
            match update {
                MapUpdate::Single { marker, zoom_level } => println!(
                    "\n🗺️  Center on ({:.1}, {:.1}) at zoom {}",
                    marker.position.x, marker.position.y, zoom_level
                ),
                MapUpdate::Fit { bounds, .. } => println!(
                    "\n🗺️  Fit view to ({:.1}, {:.1}) - ({:.1}, {:.1})",
                    bounds.min.x, bounds.min.y, bounds.max.x, bounds.max.y
                ),
                _ => {}
            }
        }
    }

    Ok(())
}

fn file_item(path: PathBuf) -> Result<Arc<ListItem>> {
    let meta = std::fs::metadata(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let modified = meta
        .modified()
        .with_context(|| format!("No modification time for {}", path.display()))?;
    Ok(Arc::new(ListItem::file(path, modified.into(), meta.len(), None)))
}

async fn preview(file: PathBuf, width: f64, height: f64) -> Result<()> {
    let item = file_item(file)?;
    let pane = PreviewPane::new(Arc::new(ExifMetadataProvider::new()));
    pane.update_zoom(|zoom| zoom.viewport_resized(width, height));

    match pane.show_selection(&[item]).await {
        PreviewUpdate::Shown { path, summary } => {
            println!("🖼️  {}", path.display());
            println!("  {}", summary.as_deref().unwrap_or("No metadata"));
            let zoom = pane.zoom_state();
            match zoom.image_size() {
                Some((w, h)) => println!(
                    "  Fits {}x{} into {}x{} at {:.0}%",
                    w,
                    h,
                    width,
                    height,
                    zoom.zoom() * 100.0
                ),
                None => println!("  Pixel size unknown, shown at {:.0}%", zoom.zoom() * 100.0),
            }
        }
        PreviewUpdate::Cleared | PreviewUpdate::Unchanged | PreviewUpdate::Superseded => {
            println!("⚠️  Nothing to preview");
        }
    }
    Ok(())
}

fn manage_settings(
    settings: AppSettings,
    settings_path: &Path,
    export: Option<PathBuf>,
    import: Option<PathBuf>,
) -> Result<()> {
    if let Some(target) = export {
        settings.export_to(&target)?;
        println!("📤 Exported settings to {}", target.display());
        return Ok(());
    }

    if let Some(source) = import {
        let Some(imported) = AppSettings::import_from(&source) else {
            bail!("Could not import settings from {}", source.display());
        };
        imported.save_to(settings_path)?;
        println!("📥 Imported settings from {}", source.display());
        return Ok(());
    }

    println!("⚙️  Settings: {}", settings_path.display());
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

fn manage_cache(settings: &AppSettings, clear: bool, cache_dir: Option<PathBuf>) -> Result<()> {
    let cache = open_cache(settings, cache_dir)?;

    if clear {
        cache.clear_all()?;
        println!("🧹 Cleared thumbnail cache at {}", cache.cache_dir().display());
        return Ok(());
    }

    let stats = cache.stats()?;
    println!("💾 Thumbnail cache: {}", cache.cache_dir().display());
    println!("  Items: {}", stats.items);
    println!("  Size:  {}", format_size(stats.total_bytes));
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
