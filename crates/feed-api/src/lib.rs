//! Typed request functions for the TechInsights feed.
//!
//! Posts, companies, category statistics, recommendations and search, all
//! issued through the session-aware [`session_http_client::ApiClient`].

mod client;
mod types;

pub use client::{
    FeedClient, ALL_CATEGORIES, CATEGORY_STATS_PATH, COMPANIES_PATH, COMPANY_SUMMARIES_PATH,
    INSTANT_SEARCH_PATH, POSTS_PATH, RECOMMENDATIONS_PATH, SEARCH_PATH, TRENDING_COMPANIES_PATH,
};
pub use types::{
    CategoryStat, Company, CompanyInfo, CompanySummary, InstantSearchCompany, InstantSearchPost,
    InstantSearchResponse, Page, Post, PostDetail, PostPage, RecommendedPost, SearchPost,
    SearchResponse, SortBy, TrendingCompany, LOGO_DIR, TRENDING_TITLE_MAX_CHARS,
};
