// AndroMPD profile CLI binary

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use andrompd_profiles::constants::DEFAULT_PORT;
use andrompd_profiles::db::{migrations, StoreProvider};
use andrompd_profiles::{FileStore, ProfileRecord, ProfileRepository, StoreConfig};

#[derive(Parser)]
#[command(name = "andrompd-profiles")]
#[command(about = "Manage stored MPD server profiles", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding the profile database (defaults to ANDROMPD_DATA_DIR or the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all profiles
    List {
        /// Print profiles as JSON (includes passwords)
        #[arg(long)]
        json: bool,
    },

    /// Show the auto-connect profile
    ShowAuto,

    /// Add a new profile
    Add {
        /// Profile name
        name: String,
        /// Server hostname or IP address
        #[arg(long, default_value = "")]
        host: String,
        /// Server port
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Server password
        #[arg(long, default_value = "")]
        password: String,
        /// Use this profile for automatic connection
        #[arg(long)]
        auto_connect: bool,
        /// HTTP stream URL (enables streaming)
        #[arg(long)]
        streaming_url: Option<String>,
        /// HTTP cover URL template using %f (file) and %d (directory)
        #[arg(long)]
        cover_template: Option<String>,
    },

    /// Delete a profile by creation date
    Delete {
        /// Creation date (ms since epoch) as shown by `list`
        creation_date: i64,
    },

    /// Make a profile the auto-connect profile
    Promote {
        /// Creation date (ms since epoch) as shown by `list`
        creation_date: i64,
    },

    /// Show schema version and columns
    Schema,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let config = StoreConfig::resolve(cli.data_dir.as_deref())?;
    log::debug!("Profile store at {}", config.database_path().display());

    match cli.command {
        Commands::List { json } => cmd_list(&config, json),
        Commands::ShowAuto => cmd_show_auto(&config),
        Commands::Add {
            name,
            host,
            port,
            password,
            auto_connect,
            streaming_url,
            cover_template,
        } => {
            let profile = ProfileRecord::new(name, auto_connect)
                .with_hostname(host)
                .with_port(port)
                .with_password(password)
                .with_streaming(streaming_url.is_some(), streaming_url.unwrap_or_default())
                .with_http_cover(cover_template.is_some(), cover_template.unwrap_or_default());
            cmd_add(&config, profile)
        }
        Commands::Delete { creation_date } => cmd_delete(&config, creation_date),
        Commands::Promote { creation_date } => cmd_promote(&config, creation_date),
        Commands::Schema => cmd_schema(&config),
    }
}

fn cmd_list(config: &StoreConfig, json: bool) -> Result<()> {
    let repo = ProfileRepository::open(config);
    let profiles = repo.list()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profiles)?);
        return Ok(());
    }

    if profiles.is_empty() {
        println!("No profiles found. Use 'andrompd-profiles add <name>' to create one.");
        return Ok(());
    }

    println!("{:>15}  {:>4}  {:>6}  {:<24}  {}", "Created", "Auto", "Port", "Host", "Name");
    println!("{}", "-".repeat(70));

    for profile in profiles {
        let host = if profile.hostname().len() > 24 {
            format!("{}...", profile.hostname().chars().take(21).collect::<String>())
        } else {
            profile.hostname().to_string()
        };

        println!(
            "{:>15}  {:>4}  {:>6}  {:<24}  {}",
            profile.creation_date(),
            if profile.auto_connect() { "yes" } else { "" },
            profile.port(),
            host,
            profile.name()
        );
    }

    Ok(())
}

fn cmd_show_auto(config: &StoreConfig) -> Result<()> {
    let repo = ProfileRepository::open(config);

    let Some(profile) = repo.auto_connect()? else {
        println!("No auto-connect profile set.");
        return Ok(());
    };

    println!("Profile:     {}", profile.name());
    println!("Created:     {}", profile.creation_date());
    println!("Host:        {}:{}", profile.hostname(), profile.port());
    println!("Password:    {}", if profile.password().is_empty() { "(none)" } else { "(set)" });

    if profile.streaming_enabled() {
        println!("Streaming:   {}", profile.streaming_url());
    }

    if profile.http_cover_active() {
        println!("Covers:      {}", profile.http_cover_regex());
    }

    Ok(())
}

fn cmd_add(config: &StoreConfig, profile: ProfileRecord) -> Result<()> {
    let repo = ProfileRepository::open(config);
    repo.add(&profile)?;

    println!("Added profile '{}' (created {})", profile.name(), profile.creation_date());
    if profile.auto_connect() {
        println!("  Now the auto-connect profile");
    }

    Ok(())
}

fn cmd_delete(config: &StoreConfig, creation_date: i64) -> Result<()> {
    let repo = ProfileRepository::open(config);

    if repo.delete_by_date(creation_date)? {
        println!("Deleted profile {}", creation_date);
    } else {
        println!("No profile with creation date {}", creation_date);
    }

    Ok(())
}

fn cmd_promote(config: &StoreConfig, creation_date: i64) -> Result<()> {
    let repo = ProfileRepository::open(config);

    let profile = repo
        .get(creation_date)?
        .ok_or_else(|| anyhow::anyhow!("Profile {} not found", creation_date))?;

    let promoted = repo.make_auto_connect(&profile)?;
    println!("'{}' is now the auto-connect profile", promoted.name());

    Ok(())
}

fn cmd_schema(config: &StoreConfig) -> Result<()> {
    let store = FileStore::from_config(config);
    let conn = store.open()?;

    println!("Database:  {}", store.path().display());
    println!("Version:   {}", migrations::schema_version(&conn)?);
    println!("Columns:   {}", migrations::column_names(&conn)?.join(", "));

    Ok(())
}
