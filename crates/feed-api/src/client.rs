//! Feed request functions.
//!
//! Every call goes through the shared [`ApiClient`], so it gets the session
//! headers, maintenance navigation and the refresh policy for free. Failures
//! are logged and degrade to an empty value; callers render "nothing" rather
//! than an error page.

use crate::types::{
    has_logo, logo_path, truncate_title, CategoryRow, CategoryStat, Company, CompanyInfo,
    CompanyRow, CompanySummary, CompanySummaryRow, InstantSearchResponse, Page, Post, PostDetail,
    PostPage, RecommendationRow, RecommendedPost, SearchResponse, SortBy, TrendingCompany,
};
use serde::de::DeserializeOwned;
use session_http_client::{ApiClient, ApiResult, RequestContext};
use tracing::{debug, warn};

pub const POSTS_PATH: &str = "/api/v1/posts";
pub const COMPANIES_PATH: &str = "/api/v1/companies";
pub const TRENDING_COMPANIES_PATH: &str = "/api/v1/companies/top-by-views";
pub const COMPANY_SUMMARIES_PATH: &str = "/api/v1/companiesSummaries";
pub const CATEGORY_STATS_PATH: &str = "/api/v1/categories/stats";
pub const RECOMMENDATIONS_PATH: &str = "/api/v1/recommendations";
pub const SEARCH_PATH: &str = "/api/v1/search";
pub const INSTANT_SEARCH_PATH: &str = "/api/v1/search/instant";

/// Category value meaning "no filter".
pub const ALL_CATEGORIES: &str = "All";

const POSTS_PAGE_SIZE: u32 = 10;
const TRENDING_SIZE: u32 = 5;
const COMPANIES_SIZE: u32 = 30;
const CATEGORY_STATS_SIZE: u32 = 10;
const SEARCH_PAGE_SIZE: u32 = 20;

/// Typed client for the read-only feed endpoints.
#[derive(Clone)]
pub struct FeedClient {
    api: ApiClient,
}

impl FeedClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Latest posts, optionally filtered by category.
    pub async fn posts(&self, page: u32, category: Option<&str>) -> PostPage {
        let mut ctx = RequestContext::get(POSTS_PATH)
            .query("page", page)
            .query("size", POSTS_PAGE_SIZE);
        if let Some(category) = category.filter(|c| !c.is_empty() && *c != ALL_CATEGORIES) {
            ctx = ctx.query("category", category);
        }

        self.fetch::<Page<Post>>(ctx, "posts")
            .await
            .map(PostPage::from)
            .unwrap_or_else(PostPage::empty)
    }

    pub async fn posts_by_company(&self, company_id: &str, page: u32) -> PostPage {
        let ctx = RequestContext::get(POSTS_PATH)
            .query("page", page)
            .query("size", POSTS_PAGE_SIZE)
            .query("companyId", company_id);

        self.fetch::<Page<Post>>(ctx, "company posts")
            .await
            .map(PostPage::from)
            .unwrap_or_else(PostPage::empty)
    }

    pub async fn post(&self, post_id: &str) -> Option<PostDetail> {
        let ctx = RequestContext::get(item_path(POSTS_PATH, post_id)?);
        self.fetch(ctx, "post").await
    }

    pub async fn company_info(&self, company_id: &str) -> Option<CompanyInfo> {
        let ctx = RequestContext::get(item_path(COMPANIES_PATH, company_id)?);
        self.fetch(ctx, "company info").await
    }

    /// Top companies by views. Rows without a logo are dropped.
    pub async fn trending_companies(&self) -> Vec<TrendingCompany> {
        let ctx = RequestContext::get(TRENDING_COMPANIES_PATH)
            .query("page", 0)
            .query("size", TRENDING_SIZE);

        let Some(page) = self.fetch::<Page<CompanyRow>>(ctx, "trending companies").await else {
            return Vec::new();
        };

        page.content
            .into_iter()
            .filter(|row| has_logo(&row.logo_image_name))
            .map(|row| TrendingCompany {
                logo_image: logo_path(row.logo_image_name.as_deref().unwrap_or_default()),
                title: row.name.as_deref().map(truncate_title).unwrap_or_default(),
                view_count: row.total_view_count.unwrap_or(0),
            })
            .collect()
    }

    pub async fn companies(&self) -> Vec<Company> {
        let ctx = RequestContext::get(COMPANIES_PATH)
            .query("page", 0)
            .query("size", COMPANIES_SIZE);

        let Some(page) = self.fetch::<Page<CompanyRow>>(ctx, "companies").await else {
            return Vec::new();
        };

        page.content
            .into_iter()
            .filter(|row| has_logo(&row.logo_image_name))
            .map(|row| Company {
                logo_image: logo_path(row.logo_image_name.as_deref().unwrap_or_default()),
                name: row.name.unwrap_or_default(),
            })
            .collect()
    }

    /// Company ranking. Companies without posts are skipped before ranking.
    pub async fn company_summaries(&self) -> Vec<CompanySummary> {
        let ctx = RequestContext::get(COMPANY_SUMMARIES_PATH);
        let Some(rows) = self
            .fetch::<Vec<CompanySummaryRow>>(ctx, "company summaries")
            .await
        else {
            return Vec::new();
        };

        rows.into_iter()
            .filter(|row| row.post_count.unwrap_or(0) > 0)
            .enumerate()
            .map(|(index, row)| CompanySummary {
                logo_image: logo_path(&row.logo_image_name),
                post_count: row.post_count.unwrap_or(0),
                total_views: row.total_view_count.unwrap_or(0),
                id: row.id,
                name: row.name,
                last_posted_at: row.last_posted_at,
                blog_url: row.blog_url,
                rank: index + 1,
            })
            .collect()
    }

    pub async fn category_stats(&self) -> Vec<CategoryStat> {
        let ctx = RequestContext::get(CATEGORY_STATS_PATH)
            .query("page", 0)
            .query("size", CATEGORY_STATS_SIZE);

        self.fetch::<Page<CategoryRow>>(ctx, "category stats")
            .await
            .map(|page| page.content.into_iter().map(CategoryStat::from).collect())
            .unwrap_or_default()
    }

    pub async fn recommended_posts(&self) -> Vec<RecommendedPost> {
        let ctx = RequestContext::get(RECOMMENDATIONS_PATH);
        let Some(rows) = self
            .fetch::<Vec<RecommendationRow>>(ctx, "recommendations")
            .await
        else {
            return Vec::new();
        };

        rows.into_iter()
            .filter(|row| has_logo(&row.logo_image_name))
            .map(|row| RecommendedPost {
                logo: logo_path(row.logo_image_name.as_deref().unwrap_or_default()),
                title: row.title,
            })
            .collect()
    }

    /// Full-text search. Blank queries are not sent.
    pub async fn search(&self, query: &str, page: u32, sort: SortBy) -> Option<SearchResponse> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        let ctx = RequestContext::get(SEARCH_PATH)
            .query("query", query)
            .query("page", page)
            .query("size", SEARCH_PAGE_SIZE)
            .query("sortBy", sort);
        self.fetch(ctx, "search").await
    }

    /// Type-ahead search. Blank queries are not sent.
    pub async fn instant_search(&self, query: &str) -> Option<InstantSearchResponse> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        let ctx = RequestContext::get(INSTANT_SEARCH_PATH).query("query", query);
        self.fetch(ctx, "instant search").await
    }

    async fn fetch<T: DeserializeOwned>(&self, ctx: RequestContext, what: &str) -> Option<T> {
        let path = ctx.target().to_string();
        let result: ApiResult<T> = self.api.request_json(ctx).await;
        match result {
            Ok(value) => {
                debug!(path = %path, "Fetched {}", what);
                Some(value)
            }
            Err(e) => {
                warn!(
                    path = %path,
                    status = ?e.status(),
                    transient = e.is_transient(),
                    error = %e,
                    "Failed to fetch {}",
                    what
                );
                None
            }
        }
    }
}

/// `collection/id` with the id encoded as exactly one path segment.
///
/// Ids that are blank or would be read as a dot segment yield `None`.
fn item_path(collection: &str, id: &str) -> Option<String> {
    let id = id.trim();
    if id.is_empty() || id == "." || id == ".." {
        warn!(id = %id, "Refusing to request an invalid item id");
        return None;
    }
    Some(format!("{}/{}", collection, urlencoding::encode(id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use session_http_client::{ClientConfig, ClientRuntime, Navigator};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingNavigator {
        targets: Mutex<Vec<String>>,
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, target: &str) {
            self.targets.lock().unwrap().push(target.to_string());
        }
    }

    async fn feed_for(server: &mockito::ServerGuard) -> (FeedClient, Arc<RecordingNavigator>) {
        let navigator = Arc::new(RecordingNavigator::default());
        let config = ClientConfig::new(
            url::Url::parse(&server.url()).unwrap(),
            ClientRuntime::Browser {
                identity: device_identity::DeviceIdentity::server(),
            },
        );
        let api = ApiClient::builder(config)
            .navigator(navigator.clone())
            .build()
            .unwrap();
        (FeedClient::new(api), navigator)
    }

    #[test]
    fn test_item_path_keeps_id_in_one_segment() {
        assert_eq!(item_path(POSTS_PATH, "42").as_deref(), Some("/api/v1/posts/42"));
        assert_eq!(
            item_path(POSTS_PATH, "1?admin=true#x").as_deref(),
            Some("/api/v1/posts/1%3Fadmin%3Dtrue%23x")
        );
        assert_eq!(
            item_path(COMPANIES_PATH, "../users/me").as_deref(),
            Some("/api/v1/companies/..%2Fusers%2Fme")
        );
        assert_eq!(item_path(POSTS_PATH, ".."), None);
        assert_eq!(item_path(POSTS_PATH, "  "), None);
    }

    #[tokio::test]
    async fn test_blank_search_is_not_sent() {
        let mut server = mockito::Server::new_async().await;
        let search = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let (feed, _) = feed_for(&server).await;

        assert!(feed.search("   ", 0, SortBy::Latest).await.is_none());
        assert!(feed.instant_search("").await.is_none());
        search.assert_async().await;
    }

    #[tokio::test]
    async fn test_unavailable_service_navigates_to_maintenance_and_degrades() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", POSTS_PATH)
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;
        let (feed, navigator) = feed_for(&server).await;

        assert_eq!(feed.posts(0, None).await, PostPage::empty());
        assert_eq!(*navigator.targets.lock().unwrap(), vec!["/maintenance.html"]);
    }
}
