// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! SnapSphere: geotagged photo enrichment and photo-spot recommendations
//!
//! Command-line front end over the same operations the HTTP API exposes.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use snapsphere::config::AppConfig;
use snapsphere::db::PhotoStore;
use snapsphere::geo::GeoPoint;
use snapsphere::ollama::OllamaClient;
use snapsphere::recommend::Conditions;
use snapsphere::service::{PhotoService, PlaceDetailsRequest, SubmitRequest, DEFAULT_RADIUS_KM};
use snapsphere::Result;

/// SnapSphere CLI
#[derive(Parser, Debug)]
#[command(name = "snapsphere")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version = "0.4.0")]
#[command(about = "Enrich geotagged photos and recommend nearby photo spots", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Photo database path (overrides config)
    #[arg(long, global = true)]
    database: Option<String>,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Enrich and store a photo
    Submit {
        /// Photo URL
        url: String,

        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Capture time (RFC 3339 or ISO 8601)
        #[arg(long)]
        timestamp: Option<String>,
    },

    /// List stored photos near a point
    Nearby {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Search radius in kilometres
        #[arg(short, long, default_value_t = DEFAULT_RADIUS_KM)]
        radius: f64,

        /// Only photos carrying this vibe
        #[arg(long)]
        vibe: Option<String>,
    },

    /// Recommend photo spots for the current conditions
    Recommend {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Weather, e.g. clear or sunny
        #[arg(long)]
        weather: Option<String>,

        /// Time of day, e.g. daylight or golden_hour
        #[arg(long)]
        time_of_day: Option<String>,
    },

    /// Import street-level imagery around a point
    Fetch {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Search radius in kilometres
        #[arg(short, long, default_value_t = DEFAULT_RADIUS_KM)]
        radius: f64,
    },

    /// Classify the vibes of an image
    Classify {
        /// Image URL or data URL
        image_url: String,

        /// Show the full vibe analysis instead of the top tags
        #[arg(long)]
        analyze: bool,
    },

    /// Generate a social caption for an image
    Caption {
        /// Image URL or data URL
        image_url: String,

        /// casual, professional or creative
        #[arg(long)]
        style: Option<String>,

        #[arg(long)]
        mood: Option<String>,
    },

    /// Show (or compute) the place details for a photo
    Details {
        /// Photo URL
        url: String,

        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },

    /// Give every unrated photo a rating
    BackfillRatings,

    /// Show model server and database status
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if !cli.quiet {
        info!("SnapSphere v0.4.0");
    }

    let mut config = AppConfig::load(&cli.config)?;
    if let Some(database) = cli.database.clone() {
        config.database.path = database;
    }

    let json = cli.format == "json";

    match cli.command {
        Some(Commands::Config { action }) => run_config_command(config, action, &cli.config),
        Some(Commands::Status) | None => run_status(config).await,
        Some(command) => {
            let service = PhotoService::from_config(&config)?;
            run_photo_command(&service, command, json).await
        }
    }
}

fn emit<T: Serialize>(value: &T, json: bool, text: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text(value);
    }
    Ok(())
}

async fn run_photo_command(service: &PhotoService, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Submit { url, lat, lon, timestamp } => {
            let request = SubmitRequest {
                photo_url: Some(url),
                latitude: Some(lat),
                longitude: Some(lon),
                timestamp,
            };
            let submitted = service.submit_photo(request).await?;
            emit(&submitted, json, |s| {
                println!("{}", s.details.place_name);
                println!("  Address: {}", s.details.full_address);
                println!("  Vibes: {:?}", s.tags);
                println!("  Best time: {}", s.details.best_time);
                println!("  Crowd: {}", s.details.crowd_level);
                println!("  Rating: {:.1}", s.details.rating);
                println!("  {}", s.details.description);
            })
        }
        Commands::Nearby { lat, lon, radius, vibe } => {
            let photos = service.photos_nearby(GeoPoint::new(lat, lon)?, Some(radius), vibe.as_deref())?;
            emit(&photos, json, |photos| {
                for p in photos.iter() {
                    println!("{:>6.2} km  {}  {:?}", p.distance_km, p.photo_url, p.vibes);
                }
                println!("\n{} photos within {} km", photos.len(), radius);
            })
        }
        Commands::Recommend { lat, lon, weather, time_of_day } => {
            let conditions = Conditions::from_optional(weather.as_deref(), time_of_day.as_deref());
            let recs = service.recommend(GeoPoint::new(lat, lon)?, &conditions)?;
            emit(&recs, json, |recs| {
                for (i, r) in recs.iter().enumerate() {
                    println!("{}. {} ({:.1} km, {:?}, rating {:.1})", i + 1, r.place_name, r.distance_km, r.priority, r.rating);
                    println!("   {}", r.photo_url);
                }
            })
        }
        Commands::Fetch { lat, lon, radius } => {
            let report = service.fetch_bulk(GeoPoint::new(lat, lon)?, Some(radius)).await?;
            emit(&report, json, |report| {
                for p in &report.new_photos {
                    println!("  + {} ({})", p.details.place_name, p.photo_url);
                }
                println!("Added {} photos", report.count);
            })
        }
        Commands::Classify { image_url, analyze } => {
            if analyze {
                let analysis = service.analyze_vibe(&image_url).await?;
                emit(&analysis, json, |a| {
                    println!("Primary: {} ({:.0}%)", a.primary_vibe, a.confidence_score * 100.0);
                    println!("Secondary: {:?}", a.secondary_vibes);
                    println!("Mood score: {:.2}", a.mood_score);
                    println!("Style: {:?}", a.style_tags);
                })
            } else {
                let tags = service.classify(&image_url).await?;
                emit(&tags, json, |tags| {
                    let names: Vec<_> = tags.iter().map(|t| t.as_str()).collect();
                    println!("{}", names.join(", "));
                })
            }
        }
        Commands::Caption { image_url, style, mood } => {
            let caption = service.generate_caption(&image_url, style.as_deref(), mood.as_deref()).await?;
            emit(&caption, json, |c| {
                println!("{}", c.caption);
                println!("{}", c.hashtags.join(" "));
            })
        }
        Commands::Details { url, lat, lon } => {
            let request = PlaceDetailsRequest {
                latitude: Some(lat),
                longitude: Some(lon),
                photo_url: Some(url),
            };
            let details = service.place_details(request).await?;
            emit(&details, json, |d| {
                println!("{}{}", d.place_name.as_deref().unwrap_or("-"), if d.cached { " (cached)" } else { "" });
                println!("  Address: {}", d.full_address.as_deref().unwrap_or("-"));
                println!("  Vibes: {:?}", d.vibes);
                println!("  {}", d.description.as_deref().unwrap_or_default());
            })
        }
        Commands::BackfillRatings => {
            let updated = service.backfill_ratings()?;
            println!("Updated {} photos with ratings", updated);
            Ok(())
        }
        Commands::Status | Commands::Config { .. } => Ok(()),
    }
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Geocoder: {}", config.geocoder.url);
            println!("  Vision model: {}", config.ai_engine.models.vision);
            println!("  Imagery feed: {}", config.imagery.url);
            println!("  Database: {}", config.database.path);
        }
    }

    Ok(())
}

/// Run status check
async fn run_status(config: AppConfig) -> Result<()> {
    println!("SnapSphere v0.4.0 Status");
    println!("========================");

    match OllamaClient::new(&config.ai_engine) {
        Ok(client) => {
            match client.health_check().await {
                Ok(()) => println!("Model server: Running ({})", config.ai_engine.url),
                Err(e) => println!("Model server: Error - {}", e),
            }
            match client.list_models().await {
                Ok(models) => {
                    let vision = config.ai_engine.models.vision.as_str();
                    let available = models.iter().any(|m| m.starts_with(vision));
                    println!("Vision model '{}': {}", vision, if available { "available" } else { "missing" });
                }
                Err(e) => println!("  Error listing models: {}", e),
            }
        }
        Err(e) => println!("Model server: Error - {}", e),
    }

    match PhotoStore::open(&config.database.path) {
        Ok(store) => {
            println!("\nDatabase ({}):", config.database.path);
            println!("  Photos: {}", store.count()?);
        }
        Err(e) => println!("\nDatabase: Error - {}", e),
    }

    println!("\nImagery feed: {}", config.imagery.url);
    if config.imagery.access_token.trim().is_empty() {
        println!("  Access token: not configured");
    }

    Ok(())
}
