//! `clockin` - CLI for clock-in/clock-out photo attendance
//!
//! This binary stamps photos for clock-in and clock-out and manages the
//! passcode-protected gallery they are kept in.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;

use clap::Parser;

use clockin::cli::{Cli, Command, ConfigCommand, GalleryArgs, GalleryCommand, PunchCommand};
use clockin::{init_logging, ClockService, Config, FileCamera, ImageId, Passcode, Variant};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> CliResult {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Validation reports its own load errors
    if let Command::Config(ConfigCommand::Validate { file }) = &cli.command {
        handle_validate(file.clone().or(cli.config.clone()));
        return Ok(());
    }

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::In(cmd) => handle_punch(&config, &cmd, Variant::ClockIn).await,
        Command::Out(cmd) => handle_punch(&config, &cmd, Variant::ClockOut).await,
        Command::Gallery(args) => handle_gallery(&config, args),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

async fn handle_punch(config: &Config, cmd: &PunchCommand, variant: Variant) -> CliResult {
    let service = ClockService::from_config(config)?;
    let camera = FileCamera::new(&cmd.photo);
    let punch = service.punch(&camera, variant).await?;

    if cmd.json {
        let out = serde_json::json!({
            "id": punch.id,
            "record": punch.record,
            "exported": punch.exported,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!(
            "{} at {} ({})",
            punch.record.primary_label, punch.record.timestamp_label, punch.id
        );
        if config.library.export_directory.is_some() && !punch.exported {
            println!("Warning: the photo was saved but could not be exported.");
        }
    }
    Ok(())
}

fn handle_gallery(config: &Config, args: GalleryArgs) -> CliResult {
    Passcode::new(config.gallery.passcode.as_str()).verify(&args.passcode)?;

    let service = ClockService::from_config(config)?;
    let store = service.store();

    match args.command {
        GalleryCommand::List { json } => {
            let listing = store.list()?;
            if json {
                let entries: Vec<_> = listing
                    .iter()
                    .enumerate()
                    .map(|(index, img)| {
                        serde_json::json!({
                            "index": index,
                            "id": img.id,
                            "path": img.path,
                            "created_at": img.created_at,
                            "width": img.image.width(),
                            "height": img.image.height(),
                            "size_bytes": img.size_bytes,
                            "record": img.record,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if listing.is_empty() {
                println!("No photos.");
            } else {
                for (index, img) in listing.iter().enumerate() {
                    let label = img
                        .record
                        .as_ref()
                        .map_or_else(String::new, |r| {
                            format!("  {} {}", r.primary_label, r.timestamp_label)
                        });
                    println!(
                        "{index:>4}  {}  {}x{}  {}{label}",
                        img.created_at.format("%Y-%m-%d %H:%M:%S"),
                        img.image.width(),
                        img.image.height(),
                        img.id,
                    );
                }
            }
        }
        GalleryCommand::Delete { index, id } => {
            let removed = match (index, id) {
                (_, Some(id)) => {
                    let id = ImageId::from(id);
                    store.delete_by_id(&id)?;
                    id
                }
                (Some(index), None) => store.delete(index)?,
                (None, None) => return Err("either an index or --id is required".into()),
            };
            println!("Deleted {removed}.");
        }
        GalleryCommand::Clear { yes } => {
            if yes {
                let removed = store.delete_all()?;
                println!("Deleted {removed} photos.");
            } else {
                println!("This will delete every stored photo.");
                println!("Use --yes to confirm.");
            }
        }
        GalleryCommand::Stats { json } => {
            let stats = store.stats()?;
            if json {
                let out = serde_json::json!({
                    "directory": store.dir(),
                    "total_images": stats.total_images,
                    "oldest": stats.oldest,
                    "newest": stats.newest,
                    "total_bytes": stats.total_bytes,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("clockin gallery");
                println!("---------------");
                println!("Directory:     {}", store.dir().display());
                println!("Photos:        {}", stats.total_images);
                println!("Size:          {} bytes", stats.total_bytes);
                if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
                    println!("Oldest:        {}", oldest.format("%Y-%m-%d %H:%M:%S"));
                    println!("Newest:        {}", newest.format("%Y-%m-%d %H:%M:%S"));
                }
            }
        }
        GalleryCommand::Export { index, file } => {
            let listing = store.list()?;
            let count = listing.len();
            let img = listing
                .get(index)
                .ok_or(clockin::Error::InvalidIndex { index, count })?;
            save_copy(&img.image, &file)?;
            println!("Exported {} to {}", img.id, file.display());
        }
    }
    Ok(())
}

fn save_copy(image: &image::DynamicImage, file: &Path) -> CliResult {
    // JPEG has no alpha channel
    let is_jpeg = file
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));
    if is_jpeg {
        image::DynamicImage::ImageRgb8(image.to_rgb8()).save(file)?;
    } else {
        image.save(file)?;
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> CliResult {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Store]");
                println!("  Directory:          {}", config.image_directory().display());
                println!("  JPEG quality:       {}", config.store.jpeg_quality);
                println!("  Capture records:    {}", config.store.write_records);
                println!(
                    "  Max images:         {}",
                    config
                        .max_images()
                        .map_or_else(|| "unlimited".to_string(), |n| n.to_string())
                );
                println!();
                println!("[Stamp]");
                println!(
                    "  Bounding box:       {}x{}",
                    config.stamp.max_width, config.stamp.max_height
                );
                println!("  Label scale:        {}", config.stamp.label_scale);
                println!("  Timestamp scale:    {}", config.stamp.timestamp_scale);
                println!("  Timestamp format:   {}", config.stamp.timestamp_format);
                println!();
                println!("[Library]");
                match &config.library.export_directory {
                    Some(dir) => println!("  Export directory:   {}", dir.display()),
                    None => println!("  Export directory:   (disabled)"),
                }
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            handle_validate(file);
        }
    }
    Ok(())
}

fn handle_validate(file: Option<std::path::PathBuf>) {
    let path = file.unwrap_or_else(Config::default_config_path);
    println!("Validating configuration: {}", path.display());
    match Config::load_from(Some(path)) {
        Ok(_) => println!("Configuration is valid."),
        Err(e) => println!("Configuration error: {e}"),
    }
}
