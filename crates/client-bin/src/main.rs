//! TechInsights CLI - session-aware client for the TechInsights API.

mod app;
mod commands;
mod output;

use app::{App, AppOptions};
use clap::{Parser, Subcommand};
use feed_api::SortBy;
use std::path::PathBuf;

/// TechInsights CLI - browse tech-blog posts and manage your session.
#[derive(Parser)]
#[command(name = "techinsights")]
#[command(about = "TechInsights client for posts, rankings, search and session management")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "TECHINSIGHTS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Directory for config, device id and logs (default ~/.techinsights)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Session cookie to send, as name=value
    #[arg(long, global = true, env = "TECHINSIGHTS_SESSION_COOKIE", hide_env_values = true)]
    session_cookie: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check who is logged in
    Whoami,

    /// Print the URL to sign in with
    LoginUrl,

    /// Logout and clear session
    Logout,

    /// Change your nickname
    Nickname {
        /// New nickname (2-20 characters)
        name: String,
    },

    /// Print the anonymous device id
    DeviceId {
        /// Discard the stored id and generate a new one
        #[arg(long)]
        reset: bool,
    },

    /// List latest posts
    Posts {
        /// Page number, starting at 0
        #[arg(short, long, default_value = "0")]
        page: u32,
        /// Category filter ("All" for no filter)
        #[arg(short, long)]
        category: Option<String>,
        /// Only posts from this company
        #[arg(long, conflicts_with = "category")]
        company: Option<String>,
    },

    /// Show one post
    Post {
        /// Post ID
        id: String,
    },

    /// Show the most viewed companies
    Trending,

    /// Show the company ranking
    Companies,

    /// Show category statistics
    Categories,

    /// Search posts
    Search {
        /// Search terms
        query: String,
        /// Page number, starting at 0
        #[arg(short, long, default_value = "0")]
        page: u32,
        /// Sort order (relevance, latest, popular)
        #[arg(short, long, default_value = "relevance")]
        sort: SortBy,
        /// Type-ahead suggestions instead of full results
        #[arg(long)]
        instant: bool,
    },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let app = App::build(AppOptions {
        base_dir: cli.base_dir,
        log_level: cli.log_level,
        session_cookie: cli.session_cookie,
        init_logging: true,
    })?;
    let format = &cli.format;

    match cli.command {
        Commands::Whoami => commands::whoami(&app, format).await,
        Commands::LoginUrl => commands::login_url(&app, format),
        Commands::Logout => commands::logout(&app, format).await,
        Commands::Nickname { name } => commands::nickname(&app, &name, format).await,
        Commands::DeviceId { reset } => commands::device_id(&app, reset, format),
        Commands::Posts {
            page,
            category,
            company,
        } => commands::posts(&app, page, category.as_deref(), company.as_deref(), format).await,
        Commands::Post { id } => commands::post(&app, &id, format).await,
        Commands::Trending => commands::trending(&app, format).await,
        Commands::Companies => commands::companies(&app, format).await,
        Commands::Categories => commands::categories(&app, format).await,
        Commands::Search {
            query,
            page,
            sort,
            instant,
        } => commands::search(&app, &query, page, sort, instant, format).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let format = cli.format;

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e), &format);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search_with_sort() {
        let cli = Cli::try_parse_from([
            "techinsights",
            "search",
            "kafka",
            "--sort",
            "latest",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.format, output::OutputFormat::Json);
        match cli.command {
            Commands::Search { query, sort, page, instant } => {
                assert_eq!(query, "kafka");
                assert_eq!(sort, SortBy::Latest);
                assert_eq!(page, 0);
                assert!(!instant);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_posts_category_and_company_conflict() {
        assert!(Cli::try_parse_from([
            "techinsights",
            "posts",
            "--category",
            "AI",
            "--company",
            "c1"
        ])
        .is_err());
    }

    #[test]
    fn test_parse_device_id_reset() {
        let cli = Cli::try_parse_from(["techinsights", "device-id", "--reset"]).unwrap();
        assert!(matches!(cli.command, Commands::DeviceId { reset: true }));
    }

    #[test]
    fn test_unknown_sort_is_rejected() {
        assert!(Cli::try_parse_from(["techinsights", "search", "x", "--sort", "newest"]).is_err());
    }
}
