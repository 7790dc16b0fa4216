//! Command-line interface for marinelib.
//!
//! Thin adapter over [`CatalogEngine`]: every command opens the configured
//! SQLite catalog and blob directory, runs one engine operation and prints
//! the result.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::config;
use crate::core::CatalogEngine;
use crate::domain::{CategoryDraft, CategoryNode, FilePayload, ItemDraft, ItemType, LibraryItem};

/// marinelib - Category hierarchy and content catalog for marine monitoring
#[derive(Parser, Debug)]
#[command(name = "marinelib")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Identity recorded in audit fields
    #[arg(long, global = true, env = "MARINELIB_ACTOR", default_value = "cli")]
    pub actor: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage categories
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },

    /// Manage library items
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },

    /// Show category statistics
    Stats,

    /// Show resolved configuration (debug)
    Config,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommands {
    /// Create a category
    Add {
        name: String,

        /// Parent category (id or name)
        #[arg(short, long)]
        parent: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// Display order (next free slot if not specified)
        #[arg(short, long)]
        order: Option<i64>,

        /// Tags to apply (comma-separated)
        #[arg(short, long)]
        tags: Option<String>,
    },

    /// List categories
    List {
        /// Only active categories
        #[arg(long)]
        active: bool,
    },

    /// Print the category tree
    Tree {
        /// Start from this category (id or name)
        #[arg(short, long)]
        root: Option<String>,
    },

    /// Delete a category without subcategories or items
    Delete {
        /// Category id or name
        category: String,
    },

    /// Show the path from the root to a category
    Path {
        /// Category id or name
        category: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ItemCommands {
    /// Create a library item
    Add {
        title: String,

        /// Item type (pdf, article, video, image-gallery, infographic, guide, research-paper, faq)
        #[arg(long = "type", default_value = "pdf")]
        item_type: ItemType,

        /// Category (id or name)
        #[arg(short, long)]
        category: Option<String>,

        /// File to upload
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Inline text content
        #[arg(long)]
        content: Option<String>,

        /// Tags to apply (comma-separated)
        #[arg(short, long)]
        tags: Option<String>,

        #[arg(short, long)]
        author: Option<String>,

        /// Difficulty from 1 to 3
        #[arg(long)]
        difficulty: Option<u8>,
    },

    /// List library items
    List {
        /// Only published items
        #[arg(long)]
        published: bool,

        /// Only items in this category (id or name)
        #[arg(short, long)]
        category: Option<String>,

        /// Maximum number of items to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Publish an item
    Publish { id: Uuid },

    /// Unpublish an item
    Unpublish { id: Uuid },

    /// Keyword search
    Search { keyword: String },

    /// Show engagement counters of an item
    Stats { id: Uuid },
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        if let Commands::Config = self.command {
            return show_config();
        }

        let cfg = config::config()?;
        let engine = CatalogEngine::open(cfg)
            .await
            .context("Failed to open catalog")?;
        let actor = self.actor.as_str();

        match self.command {
            Commands::Category { command } => execute_category(&engine, command, actor).await,
            Commands::Item { command } => execute_item(&engine, command, actor).await,
            Commands::Stats => show_stats(&engine).await,
            Commands::Config => Ok(()),
        }
    }
}

async fn execute_category(engine: &CatalogEngine, command: CategoryCommands, actor: &str) -> Result<()> {
    match command {
        CategoryCommands::Add {
            name,
            parent,
            description,
            order,
            tags,
        } => {
            let mut draft = CategoryDraft::new(name).with_tags(parse_tags(tags));
            if let Some(parent) = parent {
                draft = draft.with_parent(resolve_category(engine, &parent).await?);
            }
            if let Some(description) = description {
                draft = draft.with_description(description);
            }
            if let Some(order) = order {
                draft = draft.with_display_order(order);
            }

            let category = engine.create_category(draft, actor).await?;
            println!("Created category {} ({})", category.name, category.id);
            Ok(())
        }
        CategoryCommands::List { active } => {
            let categories = if active {
                engine.active_categories().await?
            } else {
                engine.list_categories().await?
            };

            if categories.is_empty() {
                println!("No categories. Use 'marinelib category add <name>' to create one.");
                return Ok(());
            }

            println!("{:<38} {:<6} {:<8} {:<30}", "ID", "ORDER", "ACTIVE", "NAME");
            println!("{}", "-".repeat(84));
            for c in &categories {
                println!(
                    "{:<38} {:<6} {:<8} {:<30}",
                    c.id,
                    c.display_order,
                    if c.is_active { "yes" } else { "no" },
                    c.name
                );
            }
            println!("\nTotal: {} categories", categories.len());
            Ok(())
        }
        CategoryCommands::Tree { root } => {
            let root = match root {
                Some(r) => Some(resolve_category(engine, &r).await?),
                None => None,
            };
            for node in engine.category_tree(root).await? {
                print_node(&node, 0);
            }
            Ok(())
        }
        CategoryCommands::Delete { category } => {
            let id = resolve_category(engine, &category).await?;
            engine.delete_category(id, actor).await?;
            println!("Deleted category {}", id);
            Ok(())
        }
        CategoryCommands::Path { category } => {
            let id = resolve_category(engine, &category).await?;
            let names: Vec<_> = engine
                .hierarchy_path(id)
                .await?
                .into_iter()
                .map(|c| c.name)
                .collect();
            println!("{}", names.join(" > "));
            Ok(())
        }
    }
}

async fn execute_item(engine: &CatalogEngine, command: ItemCommands, actor: &str) -> Result<()> {
    match command {
        ItemCommands::Add {
            title,
            item_type,
            category,
            file,
            content,
            tags,
            author,
            difficulty,
        } => {
            let mut draft = ItemDraft::new(title, item_type).with_tags(parse_tags(tags));
            if let Some(category) = category {
                draft = draft.in_category(resolve_category(engine, &category).await?);
            }
            if let Some(content) = content {
                draft = draft.with_content(content);
            }
            if let Some(author) = author {
                draft = draft.with_author(author);
            }
            if let Some(difficulty) = difficulty {
                draft = draft.with_difficulty(difficulty);
            }

            let payload = match file {
                Some(path) => Some(read_payload(&path).await?),
                None => None,
            };

            let item = engine.create_item(draft, payload, actor).await?;
            println!("Created item {} ({})", item.title, item.id);
            Ok(())
        }
        ItemCommands::List {
            published,
            category,
            limit,
        } => {
            let items = match (category, published) {
                (Some(c), _) => {
                    let id = resolve_category(engine, &c).await?;
                    let all = engine.filter_by_category(id).await?;
                    if published {
                        all.into_iter().filter(|i| i.is_published).collect()
                    } else {
                        all
                    }
                }
                (None, true) => engine.published_items().await?,
                (None, false) => engine.all_items().await?,
            };
            print_items(&items, limit);
            Ok(())
        }
        ItemCommands::Publish { id } => {
            let item = engine.publish(id, actor).await?;
            println!("Published {} ({})", item.title, item.id);
            Ok(())
        }
        ItemCommands::Unpublish { id } => {
            let item = engine.unpublish(id, actor).await?;
            println!("Unpublished {} ({})", item.title, item.id);
            Ok(())
        }
        ItemCommands::Search { keyword } => {
            let results = engine.search(&keyword).await?;
            if results.is_empty() {
                println!("No results found for: {}", keyword);
                return Ok(());
            }
            print_items(&results, results.len());
            Ok(())
        }
        ItemCommands::Stats { id } => {
            let stats = engine.item_statistics(id).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
    }
}

async fn show_stats(engine: &CatalogEngine) -> Result<()> {
    let stats = engine.category_statistics().await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("marinelib configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:     {}", cfg.home.display());
    println!("  Database: {}", cfg.database.display());
    println!("  Blobs:    {}", cfg.blobs.display());
    println!();
    println!("Uploads:");
    println!("  Max file size: {} bytes", cfg.uploads.max_file_bytes);
    println!("  Denylist:      {}", cfg.uploads.denylist_patterns.join(", "));
    println!();
    println!("Query limits:");
    println!("  Popular: {}", cfg.queries.popular_limit);
    println!("  Recent:  {}", cfg.queries.recent_limit);
    println!("  Related: {}", cfg.queries.related_limit);

    Ok(())
}

/// Accept either a category id or its name
async fn resolve_category(engine: &CatalogEngine, reference: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(reference) {
        return Ok(id);
    }
    engine
        .find_category_by_name(reference)
        .await?
        .map(|c| c.id)
        .with_context(|| format!("No category named '{}'", reference))
}

async fn read_payload(path: &Path) -> Result<FilePayload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid file name: {}", path.display()))?;
    Ok(FilePayload::new(name, bytes))
}

fn parse_tags(tags: Option<String>) -> Vec<String> {
    tags.map(|t| {
        t.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

fn print_node(node: &CategoryNode, depth: usize) {
    println!(
        "{}{} ({} items)",
        "  ".repeat(depth),
        node.category.name,
        node.item_count
    );
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

fn print_items(items: &[LibraryItem], limit: usize) {
    if items.is_empty() {
        println!("No items found.");
        return;
    }

    println!("{:<38} {:<15} {:<5} {:<40}", "ID", "TYPE", "PUB", "TITLE");
    println!("{}", "-".repeat(100));
    for item in items.iter().take(limit) {
        let title = if item.title.chars().count() > 37 {
            format!("{}...", item.title.chars().take(37).collect::<String>())
        } else {
            item.title.clone()
        };
        println!(
            "{:<38} {:<15} {:<5} {:<40}",
            item.id,
            item.item_type.as_str(),
            if item.is_published { "yes" } else { "no" },
            title
        );
    }
    println!("\nTotal: {} items", items.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags(Some("coral, reef,,".to_string())), ["coral", "reef"]);
        assert!(parse_tags(None).is_empty());
    }

    #[test]
    fn test_cli_parses_item_add() {
        let cli = Cli::try_parse_from([
            "marinelib",
            "--actor",
            "ana",
            "item",
            "add",
            "Coral Survey",
            "--type",
            "research-paper",
            "--difficulty",
            "2",
        ])
        .unwrap();

        assert_eq!(cli.actor, "ana");
        match cli.command {
            Commands::Item {
                command: ItemCommands::Add { item_type, difficulty, .. },
            } => {
                assert_eq!(item_type, ItemType::ResearchPaper);
                assert_eq!(difficulty, Some(2));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resolve_category_by_name() {
        let engine = CatalogEngine::in_memory();
        let reef = engine.create_category(CategoryDraft::new("Reef"), "t").await.unwrap();

        assert_eq!(resolve_category(&engine, "reef").await.unwrap(), reef.id);
        assert_eq!(
            resolve_category(&engine, &reef.id.to_string()).await.unwrap(),
            reef.id
        );
        assert!(resolve_category(&engine, "kelp").await.is_err());
    }
}
