//! Feed commands.

use super::auth::report_navigation;
use crate::app::App;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use feed_api::{Post, SearchResponse, SortBy};

fn print_post_line(post: &Post) {
    let date = post.published_at.get(..10).unwrap_or(&post.published_at);
    println!("  [{}] {} ({})", post.company_name, post.title, date);
    if !post.url.is_empty() {
        println!("      {}", post.url);
    }
}

pub async fn posts(
    app: &App,
    page: u32,
    category: Option<&str>,
    company: Option<&str>,
    format: &OutputFormat,
) -> Result<()> {
    let result = match company {
        Some(company_id) => app.feed.posts_by_company(company_id, page).await,
        None => app.feed.posts(page, category).await,
    };
    match format {
        OutputFormat::Text => {
            output::print_heading(&format!(
                "Posts - page {} of {}",
                page + 1,
                result.total_pages.max(1)
            ));
            if result.content.is_empty() {
                println!("  No posts.");
            }
            for post in &result.content {
                print_post_line(post);
            }
        }
        OutputFormat::Json => output::print_json(&result),
    }
    report_navigation(app, format);
    Ok(())
}

pub async fn post(app: &App, id: &str, format: &OutputFormat) -> Result<()> {
    match app.feed.post(id).await {
        Some(post) => match format {
            OutputFormat::Text => {
                output::print_heading(&post.title);
                output::print_row("Company", &post.company_name);
                output::print_row("Published", &post.published_at);
                output::print_row("URL", &post.url);
                if !post.content.is_empty() {
                    println!("\n{}", post.content);
                }
            }
            OutputFormat::Json => output::print_json(&post),
        },
        None => output::print_error(&format!("Post {} not found", id), format),
    }
    report_navigation(app, format);
    Ok(())
}

pub async fn trending(app: &App, format: &OutputFormat) -> Result<()> {
    let companies = app.feed.trending_companies().await;
    match format {
        OutputFormat::Text => {
            output::print_heading("Trending companies");
            for (rank, company) in companies.iter().enumerate() {
                println!(
                    "  {:>2}. {:<24} {:>10} views",
                    rank + 1,
                    company.title,
                    company.view_count
                );
            }
        }
        OutputFormat::Json => output::print_json(&companies),
    }
    report_navigation(app, format);
    Ok(())
}

pub async fn companies(app: &App, format: &OutputFormat) -> Result<()> {
    let summaries = app.feed.company_summaries().await;
    match format {
        OutputFormat::Text => {
            output::print_heading("Companies");
            for company in &summaries {
                println!(
                    "  {:>2}. {:<24} {:>5} posts {:>10} views",
                    company.rank, company.name, company.post_count, company.total_views
                );
            }
        }
        OutputFormat::Json => output::print_json(&summaries),
    }
    report_navigation(app, format);
    Ok(())
}

pub async fn categories(app: &App, format: &OutputFormat) -> Result<()> {
    let stats = app.feed.category_stats().await;
    match format {
        OutputFormat::Text => {
            output::print_heading("Categories");
            for stat in &stats {
                println!(
                    "  {:<20} {:>5} posts {:>10} views",
                    stat.name, stat.post_count, stat.total_views
                );
            }
        }
        OutputFormat::Json => output::print_json(&stats),
    }
    report_navigation(app, format);
    Ok(())
}

fn print_search(result: &SearchResponse) {
    output::print_heading(&format!(
        "{} results for \"{}\" - page {} of {}",
        result.total_count,
        result.query,
        result.current_page + 1,
        result.total_pages.max(1)
    ));
    for post in &result.posts {
        println!("  [{}] {} ({} views)", post.company_name, post.title, post.view_count);
    }
}

pub async fn search(
    app: &App,
    query: &str,
    page: u32,
    sort: SortBy,
    instant: bool,
    format: &OutputFormat,
) -> Result<()> {
    if instant {
        match app.feed.instant_search(query).await {
            Some(result) => match format {
                OutputFormat::Text => {
                    output::print_heading(&format!("Suggestions for \"{}\"", result.query));
                    for company in &result.companies {
                        println!("  company  {} ({} posts)", company.name, company.post_count);
                    }
                    for post in &result.posts {
                        println!("  post     {} - {}", post.title, post.company_name);
                    }
                }
                OutputFormat::Json => output::print_json(&result),
            },
            None => output::print_error("No suggestions", format),
        }
    } else {
        match app.feed.search(query, page, sort).await {
            Some(result) => match format {
                OutputFormat::Text => print_search(&result),
                OutputFormat::Json => output::print_json(&result),
            },
            None => output::print_error("Search failed or query was empty", format),
        }
    }
    report_navigation(app, format);
    Ok(())
}
