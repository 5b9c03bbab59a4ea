//! CLI module for the SampleShare command-line client.
//!
//! Provides subcommands for working with a SampleShare server:
//! - `login` / `register` / `logout` / `whoami` - account and session
//! - `samples list|show|create|update|delete` - the sample catalog
//! - `comments add|edit|delete` - per-sample comment threads

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::api::models::{Sample, SampleFields};
use crate::api::Gateway;
use crate::config::Config;
use crate::controller::{ActionResult, SampleDetailPage, SamplesPage};
use crate::session::SessionStore;
use crate::store::LoadState;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "sampleshare")]
#[command(author, version, about = "Command-line client for the SampleShare service", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "sampleshare.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// API URL to connect to (overrides the config file)
    #[arg(long, env = "SAMPLESHARE_API_URL")]
    pub api_url: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the session
    Login {
        /// Account email
        email: String,
        /// Account password (can also be set via SAMPLESHARE_PASSWORD)
        #[arg(long, env = "SAMPLESHARE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create a new account
    Register {
        /// Desired username
        username: String,
        /// Account email
        email: String,
        /// Account password, at least 6 characters
        #[arg(long, env = "SAMPLESHARE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Drop the stored session
    Logout,

    /// Show who the stored session belongs to
    Whoami,

    /// Sample catalog commands
    #[command(subcommand)]
    Samples(SamplesCommands),

    /// Comment thread commands
    #[command(subcommand)]
    Comments(CommentsCommands),
}

/// Samples subcommands
#[derive(Subcommand, Debug)]
pub enum SamplesCommands {
    /// List all samples
    List {
        /// Filter by title, genre, key or BPM
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show one sample with its comment thread
    Show {
        /// Sample ID
        id: String,
    },
    /// Upload a new sample
    Create {
        /// Sample title
        title: String,
        /// Audio file to upload
        #[arg(long)]
        audio: PathBuf,
        #[arg(long)]
        bpm: Option<f64>,
        /// Musical key (e.g. Am)
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        genre: Option<String>,
        /// Reference URL
        #[arg(long)]
        url: Option<String>,
    },
    /// Update fields of an existing sample
    Update {
        /// Sample ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        bpm: Option<f64>,
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        genre: Option<String>,
        #[arg(long)]
        url: Option<String>,
    },
    /// Delete a sample
    Delete {
        /// Sample ID
        id: String,
    },
}

/// Comments subcommands
#[derive(Subcommand, Debug)]
pub enum CommentsCommands {
    /// Post a comment on a sample
    Add {
        /// Sample ID
        sample: String,
        /// Comment text
        text: String,
    },
    /// Edit a comment you own (or any, as admin)
    Edit {
        /// Sample ID
        sample: String,
        /// Comment ID
        comment: String,
        /// New comment text
        text: String,
    },
    /// Delete a comment you own (or any, as admin)
    Delete {
        /// Sample ID
        sample: String,
        /// Comment ID
        comment: String,
    },
}

/// Build the gateway from config + stored session.
fn create_gateway(cli: &Cli, config: &Config) -> Result<Gateway> {
    let session = SessionStore::load(&config.session.data_dir)?;
    let base_url = cli.api_url.as_deref().unwrap_or(&config.api.base_url);
    Gateway::new(
        base_url,
        Duration::from_secs(config.api.timeout_secs),
        session,
    )
}

/// Run a CLI command
pub async fn run_command(cli: &Cli, config: &Config) -> Result<()> {
    let gateway = create_gateway(cli, config)?;
    let base_url = cli
        .api_url
        .clone()
        .unwrap_or_else(|| config.api.base_url.clone());

    match &cli.command {
        Commands::Login { email, password } => cmd_login(gateway, email, password).await,
        Commands::Register {
            username,
            email,
            password,
        } => cmd_register(gateway, username, email, password).await,
        Commands::Logout => cmd_logout(gateway),
        Commands::Whoami => cmd_whoami(gateway),
        Commands::Samples(SamplesCommands::List { search }) => {
            cmd_samples_list(gateway, search.as_deref()).await
        }
        Commands::Samples(SamplesCommands::Show { id }) => {
            cmd_samples_show(gateway, &base_url, id).await
        }
        Commands::Samples(SamplesCommands::Create {
            title,
            audio,
            bpm,
            key,
            genre,
            url,
        }) => {
            let fields = SampleFields {
                title: Some(title.clone()),
                bpm: *bpm,
                key: key.clone(),
                genre: genre.clone(),
                url: url.clone(),
            };
            cmd_samples_create(gateway, &fields, audio).await
        }
        Commands::Samples(SamplesCommands::Update {
            id,
            title,
            bpm,
            key,
            genre,
            url,
        }) => {
            let fields = SampleFields {
                title: title.clone(),
                bpm: *bpm,
                key: key.clone(),
                genre: genre.clone(),
                url: url.clone(),
            };
            cmd_samples_update(gateway, id, &fields).await
        }
        Commands::Samples(SamplesCommands::Delete { id }) => {
            cmd_samples_delete(gateway, id).await
        }
        Commands::Comments(CommentsCommands::Add { sample, text }) => {
            cmd_comments_add(gateway, sample, text).await
        }
        Commands::Comments(CommentsCommands::Edit {
            sample,
            comment,
            text,
        }) => cmd_comments_edit(gateway, sample, comment, text).await,
        Commands::Comments(CommentsCommands::Delete { sample, comment }) => {
            cmd_comments_delete(gateway, sample, comment).await
        }
    }
}

// ============================================================================
// Account commands
// ============================================================================

async fn cmd_login(mut gateway: Gateway, email: &str, password: &str) -> Result<()> {
    if password.trim().len() < 6 {
        anyhow::bail!("Password must be at least 6 characters");
    }

    let login = gateway.login(email, password).await?;

    println!();
    println!("[OK] Logged in as {}", email);
    if let Some(role) = &login.role {
        println!("Role: {}", role);
    }
    println!();
    Ok(())
}

async fn cmd_register(
    mut gateway: Gateway,
    username: &str,
    email: &str,
    password: &str,
) -> Result<()> {
    if username.trim().is_empty() {
        anyhow::bail!("Username must not be empty");
    }
    if email.trim().is_empty() {
        anyhow::bail!("Email must not be empty");
    }
    if password.trim().len() < 6 {
        anyhow::bail!("Password must be at least 6 characters");
    }

    gateway.register(username, email, password).await?;

    println!();
    println!("[OK] Account created for {}", email);
    println!("Use 'sampleshare login {}' to sign in.", email);
    println!();
    Ok(())
}

fn cmd_logout(mut gateway: Gateway) -> Result<()> {
    if !gateway.session().is_authenticated() {
        println!("No stored session.");
        return Ok(());
    }
    gateway.logout()?;
    println!("[OK] Logged out.");
    Ok(())
}

fn cmd_whoami(gateway: Gateway) -> Result<()> {
    use crate::api::SampleService;

    let viewer = gateway.viewer();
    match (&viewer.id, &viewer.role) {
        (None, None) => println!("Not logged in."),
        _ => {
            println!();
            println!("User ID: {}", viewer.id.as_deref().unwrap_or("-"));
            println!("Role:    {}", viewer.role.as_deref().unwrap_or("-"));
            println!();
        }
    }
    Ok(())
}

// ============================================================================
// Sample commands
// ============================================================================

async fn cmd_samples_list(gateway: Gateway, search: Option<&str>) -> Result<()> {
    let viewer_id = {
        use crate::api::SampleService;
        gateway.viewer().id
    };

    let mut page = SamplesPage::new(gateway);
    page.load().await;

    if let LoadState::Failed(message) = page.state() {
        anyhow::bail!("{}", message);
    }

    let visible = page.visible(search.unwrap_or(""));
    if visible.is_empty() {
        match search {
            Some(q) => println!("No results for \"{}\".", q),
            None => println!("No samples found."),
        }
        return Ok(());
    }

    // Print header
    println!();
    println!(
        "{:<26}  {:<28}  {:<6}  {:<6}  {:<14}  {:<5}",
        "ID", "TITLE", "BPM", "KEY", "GENRE", "OWNER"
    );
    println!("{}", "-".repeat(94));

    for sample in &visible {
        let bpm = sample
            .bpm
            .map(|b| b.to_string())
            .unwrap_or_else(|| "-".to_string());
        let mine = if viewer_id.is_some() && sample.owner == viewer_id {
            " (me)"
        } else {
            ""
        };
        println!(
            "{:<26}  {:<28}  {:<6}  {:<6}  {:<14}  {}{}",
            sample.id,
            truncate(&sample.title, 28),
            bpm,
            sample.key.as_deref().unwrap_or("-"),
            truncate(sample.genre.as_deref().unwrap_or("-"), 14),
            truncate(sample.owner.as_deref().unwrap_or("-"), 10),
            mine,
        );
    }

    println!();
    if let Some(q) = search {
        println!("{} result(s) for \"{}\"", visible.len(), q);
    } else {
        println!("{} sample(s)", visible.len());
    }
    println!();
    Ok(())
}

async fn cmd_samples_show(gateway: Gateway, base_url: &str, id: &str) -> Result<()> {
    let mut page = SampleDetailPage::new(gateway);
    page.load(id).await;

    if let LoadState::Failed(message) = page.state() {
        anyhow::bail!("{}", message);
    }
    let Some(sample) = page.sample() else {
        anyhow::bail!("Sample not found: {}", id);
    };

    print_sample(sample, base_url);

    println!("Comments ({}):", page.comments().len());
    if page.comments().is_empty() {
        println!("  (none yet)");
    }
    for comment in page.comments() {
        let author = comment
            .user
            .as_ref()
            .map(|u| u.display_name())
            .unwrap_or("Unknown");
        let when = comment
            .created_at
            .as_deref()
            .and_then(format_timestamp)
            .unwrap_or_default();
        println!("  [{}] {} {}", comment.id, author, when);
        println!("      {}", comment.text);
    }
    println!();

    if page.can_modify_sample() {
        println!("You can edit this sample: 'sampleshare samples update {}'", id);
        println!();
    }
    Ok(())
}

fn print_sample(sample: &Sample, base_url: &str) {
    println!();
    println!("=== Sample: {} ===", sample.title);
    println!();
    println!("ID:      {}", sample.id);
    if let Some(bpm) = sample.bpm {
        println!("BPM:     {}", bpm);
    }
    if let Some(key) = &sample.key {
        println!("Key:     {}", key);
    }
    if let Some(genre) = &sample.genre {
        println!("Genre:   {}", genre);
    }
    if let Some(artist) = &sample.artist {
        println!("Artist:  {}", artist);
    }
    if let Some(owner) = &sample.owner {
        println!("Owner:   {}", owner);
    }
    if !sample.tags.is_empty() {
        println!("Tags:    {}", sample.tags.join(", "));
    }
    if let Some(url) = &sample.url {
        println!("URL:     {}", url);
    }
    if sample.audio.is_some() {
        println!("Audio:   {}/download/{}", base_url, sample.id);
    }
    if let Some(description) = &sample.description {
        println!();
        println!("{}", description);
    }
    if let Some(created) = sample.created_at.as_deref().and_then(format_timestamp) {
        println!("Created: {}", created);
    }
    println!();
}

async fn cmd_samples_create(gateway: Gateway, fields: &SampleFields, audio: &PathBuf) -> Result<()> {
    if !audio.exists() {
        anyhow::bail!("Audio file not found: {}", audio.display());
    }

    let mut page = SamplesPage::new(gateway);
    let result = page.create(fields, audio).await;
    report(result, || {
        println!();
        println!("[OK] Sample created!");
        if let Some(sample) = page.samples().last() {
            println!();
            println!("ID:    {}", sample.id);
            println!("Title: {}", sample.title);
        }
        println!();
    })
}

async fn cmd_samples_update(gateway: Gateway, id: &str, fields: &SampleFields) -> Result<()> {
    let mut page = SampleDetailPage::new(gateway);
    page.load(id).await;
    if let LoadState::Failed(message) = page.state() {
        anyhow::bail!("{}", message);
    }

    let result = page.edit_sample(fields).await;
    report(result, || {
        match page.sample() {
            Some(sample) => println!("[OK] Sample updated: {}", sample.title),
            None => println!("[OK] Sample updated: {}", id),
        }
    })
}

async fn cmd_samples_delete(gateway: Gateway, id: &str) -> Result<()> {
    let mut page = SamplesPage::new(gateway);
    page.load().await;
    if let LoadState::Failed(message) = page.state() {
        anyhow::bail!("{}", message);
    }

    let result = page.delete(id).await;
    report(result, || println!("[OK] Sample deleted: {}", id))
}

// ============================================================================
// Comment commands
// ============================================================================

async fn cmd_comments_add(gateway: Gateway, sample_id: &str, text: &str) -> Result<()> {
    let mut page = SampleDetailPage::new(gateway);
    page.load(sample_id).await;
    if let LoadState::Failed(message) = page.state() {
        anyhow::bail!("{}", message);
    }

    let result = page.post_comment(text).await;
    report(result, || {
        println!("[OK] Comment posted.");
        if let Some(comment) = page.comments().last() {
            println!("Comment ID: {}", comment.id);
        }
    })
}

async fn cmd_comments_edit(
    gateway: Gateway,
    sample_id: &str,
    comment_id: &str,
    text: &str,
) -> Result<()> {
    let mut page = SampleDetailPage::new(gateway);
    page.load(sample_id).await;
    if let LoadState::Failed(message) = page.state() {
        anyhow::bail!("{}", message);
    }

    let result = page.edit_comment(comment_id, text).await;
    report(result, || println!("[OK] Comment updated: {}", comment_id))
}

async fn cmd_comments_delete(gateway: Gateway, sample_id: &str, comment_id: &str) -> Result<()> {
    let mut page = SampleDetailPage::new(gateway);
    page.load(sample_id).await;
    if let LoadState::Failed(message) = page.state() {
        anyhow::bail!("{}", message);
    }

    let result = page.delete_comment(comment_id).await;
    report(result, || println!("[OK] Comment deleted: {}", comment_id))
}

// ============================================================================
// Helpers
// ============================================================================

/// Print the success block, or turn the action result into a CLI error.
fn report(result: ActionResult, on_success: impl FnOnce()) -> Result<()> {
    match result {
        ActionResult::Completed => {
            on_success();
            Ok(())
        }
        ActionResult::RedirectToLogin => anyhow::bail!(
            "Session expired or not logged in. Run 'sampleshare login <email>' first."
        ),
        ActionResult::Failed(message) => anyhow::bail!("{}", message),
    }
}

/// Truncate a string to max length with ellipsis. Counts characters, not
/// bytes, so multibyte titles never split mid-character.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Render an RFC3339 timestamp for display; unparseable input is hidden.
fn format_timestamp(ts: &str) -> Option<String> {
    chrono::DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
}
