//! linkloom command-line page editor.
//!
//! Edits a page stored as one JSON file, through the same session engine a
//! hosted UI would use: every command opens a session, applies its edit, and
//! publishes.
//!
//! Usage:
//!   linkloom init --name "Ada Lovelace"
//!   linkloom show
//!   linkloom add-link "Blog" https://blog.example
//!   linkloom move lnk_0002 lnk_0001
//!   linkloom toggle lnk_0001
//!   linkloom remove lnk_0001
//!   linkloom set-title "Ada" --bio "links below"
//!   linkloom set-theme midnight

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use linkloom_editor::drag::DropTarget;
use linkloom_editor::reconcile::SaveReport;
use linkloom_editor::session::EditorSession;
use linkloom_types::{
    BlockId, BlockKind, BlockPatch, LinkPatch, PageId, PalettePatch, ProfilePatch,
    palette_for_theme,
};

mod store;
use store::JsonStore;

#[derive(Parser, Debug)]
#[command(name = "linkloom")]
#[command(about = "Link-in-bio page editor")]
struct Cli {
    /// Page file to edit
    #[arg(long, default_value = "page.json", global = true)]
    file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new page file
    Init {
        /// Display name for the page header
        #[arg(long)]
        name: String,
    },
    /// Print the page: profile, theme, and links in order
    Show,
    /// Append a link block
    AddLink { label: String, url: String },
    /// Move a link before the position of another
    Move { id: String, target: String },
    /// Flip a link's visibility
    Toggle { id: String },
    /// Remove a link
    Remove { id: String },
    /// Update the profile header
    SetTitle {
        name: String,
        #[arg(long)]
        bio: Option<String>,
    },
    /// Switch to a named theme (classic, midnight, paper, forest)
    SetTheme { theme: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Init { name } => {
            let page_id = PageId::new(format!("page_{}", uuid::Uuid::now_v7().as_simple()));
            JsonStore::create(&cli.file, page_id, &name)?;
            println!("created {}", cli.file.display());
            Ok(())
        }
        Command::Show => show(&cli.file).await,
        command => edit(&cli.file, command).await,
    }
}

async fn open_session(file: &PathBuf) -> Result<(Arc<JsonStore>, EditorSession)> {
    let store = Arc::new(JsonStore::open(file)?);
    let page_id = store.page_id().clone();
    let (session, _events) = EditorSession::open(store.clone(), page_id)
        .await
        .context("loading page")?;
    // CLI commands publish explicitly; no background timer wanted.
    session.set_autosave_enabled(false);
    Ok((store, session))
}

async fn show(file: &PathBuf) -> Result<()> {
    let (_store, session) = open_session(file).await?;
    let page = session.current();

    println!("{}", page.profile.display_name);
    if !page.profile.bio.is_empty() {
        println!("{}", page.profile.bio);
    }
    println!("theme: {}", page.resolved_theme());
    println!();
    for block in &page.blocks {
        let marker = if block.visible { " " } else { "x" };
        match &block.data {
            linkloom_types::BlockData::Link(link) => {
                println!("[{marker}] {}  {}  {}", block.id, link.label, link.url);
            }
            other => {
                println!("[{marker}] {}  ({})", block.id, other.kind());
            }
        }
    }
    Ok(())
}

async fn edit(file: &PathBuf, command: Command) -> Result<()> {
    let (store, session) = open_session(file).await?;

    match command {
        Command::AddLink { label, url } => {
            let id = session.add_block(BlockKind::Link);
            session.update_block(
                &id,
                &BlockPatch::Link(LinkPatch {
                    label: Some(label),
                    url: Some(url),
                    ..Default::default()
                }),
            )?;
        }
        Command::Move { id, target } => {
            session.begin_block_drag(BlockId::permanent(id));
            if session
                .drop_on(DropTarget::Block(BlockId::permanent(target)))
                .is_none()
            {
                bail!("move had no effect (unknown id, or already there)");
            }
        }
        Command::Toggle { id } => {
            let id = BlockId::permanent(id);
            let visible = session
                .current()
                .block(&id)
                .map(|b| b.visible)
                .with_context(|| format!("no block {id}"))?;
            session.set_block_visible(&id, !visible)?;
        }
        Command::Remove { id } => {
            session.remove_block(&BlockId::permanent(id))?;
        }
        Command::SetTitle { name, bio } => {
            session.update_profile(&ProfilePatch {
                display_name: Some(name),
                bio,
                ..Default::default()
            });
        }
        Command::SetTheme { theme } => {
            let Some(palette) = palette_for_theme(&theme) else {
                bail!("unknown theme {theme:?} (classic, midnight, paper, forest)");
            };
            session.update_palette(&PalettePatch {
                background: Some(palette.background),
                text: Some(palette.text),
                accent: Some(palette.accent),
                card_background: Some(palette.card_background),
            });
        }
        Command::Init { .. } | Command::Show => unreachable!("handled in main"),
    }

    let report = session.publish().await;
    if !report.is_clean() {
        for failure in &report.failures {
            eprintln!("error: {failure}");
        }
        bail!("publish failed ({} errors)", report.failures.len());
    }
    store.persist()?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &SaveReport) {
    let mut parts = Vec::new();
    if report.created > 0 {
        parts.push(format!("{} created", report.created));
    }
    if report.updated > 0 {
        parts.push(format!("{} updated", report.updated));
    }
    if report.deleted > 0 {
        parts.push(format!("{} deleted", report.deleted));
    }
    if parts.is_empty() {
        println!("saved");
    } else {
        println!("saved ({})", parts.join(", "));
    }
}
