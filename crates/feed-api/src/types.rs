//! Wire and view types for the feed endpoints.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix under which company logo files are served.
pub const LOGO_DIR: &str = "/logos";

/// Company names longer than this are cut in the trending list.
pub const TRENDING_TITLE_MAX_CHARS: usize = 20;

/// Ids arrive as strings from some endpoints and as numbers from others.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or numeric id, got {}",
            other
        ))),
    }
}

pub(crate) fn logo_path(file_name: &str) -> String {
    format!("{}/{}", LOGO_DIR, file_name)
}

pub(crate) fn has_logo(file_name: &Option<String>) -> bool {
    file_name
        .as_deref()
        .map(|name| !name.trim().is_empty())
        .unwrap_or(false)
}

pub(crate) fn truncate_title(name: &str) -> String {
    if name.chars().count() > TRENDING_TITLE_MAX_CHARS {
        let head: String = name.chars().take(TRENDING_TITLE_MAX_CHARS).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

/// Spring-style page envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default = "one")]
    pub total_pages: u32,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub company_name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_image_name: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// One page of posts. Failures yield [`PostPage::empty`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub content: Vec<Post>,
    pub total_pages: u32,
}

impl PostPage {
    pub fn empty() -> Self {
        Self {
            content: Vec::new(),
            total_pages: 1,
        }
    }
}

impl From<Page<Post>> for PostPage {
    fn from(page: Page<Post>) -> Self {
        Self {
            content: page.content,
            total_pages: page.total_pages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub company_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    pub name: String,
    #[serde(default)]
    pub logo_image_name: String,
}

/// Raw company row shared by the company listing endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CompanyRow {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub logo_image_name: Option<String>,
    #[serde(default)]
    pub total_view_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingCompany {
    pub logo_image: String,
    pub title: String,
    pub view_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub name: String,
    pub logo_image: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CompanySummaryRow {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub blog_url: String,
    #[serde(default)]
    pub logo_image_name: String,
    #[serde(default)]
    pub total_view_count: Option<u64>,
    #[serde(default)]
    pub post_count: Option<u64>,
    #[serde(default)]
    pub last_posted_at: Option<String>,
}

/// Company ranking row; `rank` is 1-based over companies that have posts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    pub id: String,
    pub name: String,
    pub logo_image: String,
    pub post_count: u64,
    pub total_views: u64,
    pub last_posted_at: Option<String>,
    pub blog_url: String,
    pub rank: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CategoryRow {
    pub name: String,
    #[serde(default)]
    pub post_count: u64,
    #[serde(default)]
    pub total_view_count: u64,
    #[serde(default)]
    pub latest_post_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStat {
    /// Lowercased name, used as a stable key.
    pub id: String,
    pub name: String,
    pub post_count: u64,
    pub total_views: u64,
    pub latest_post_at: Option<String>,
}

impl From<CategoryRow> for CategoryStat {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.name.to_lowercase(),
            name: row.name,
            post_count: row.post_count,
            total_views: row.total_view_count,
            latest_post_at: row.latest_post_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecommendationRow {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub logo_image_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendedPost {
    pub title: String,
    pub logo: String,
}

/// Ordering for full-text search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortBy {
    #[default]
    Relevance,
    Latest,
    Popular,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Relevance => "RELEVANCE",
            SortBy::Latest => "LATEST",
            SortBy::Popular => "POPULAR",
        }
    }
}

impl std::fmt::Display for SortBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RELEVANCE" => Ok(SortBy::Relevance),
            "LATEST" => Ok(SortBy::Latest),
            "POPULAR" => Ok(SortBy::Popular),
            other => Err(format!(
                "unknown sort order '{}' (expected relevance, latest or popular)",
                other.to_lowercase()
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPost {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub preview: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub company_id: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub company_logo: String,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub is_summary: bool,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub relevance_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub posts: Vec<SearchPost>,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub has_next: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstantSearchCompany {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logo_image_name: String,
    #[serde(default)]
    pub post_count: u64,
    #[serde(default)]
    pub matched_post_count: u64,
    #[serde(default)]
    pub highlighted_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstantSearchPost {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub company_logo: String,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub highlighted_title: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstantSearchResponse {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub companies: Vec<InstantSearchCompany>,
    #[serde(default)]
    pub posts: Vec<InstantSearchPost>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_post_id_accepts_numbers_and_strings() {
        let post: Post = serde_json::from_value(json!({ "id": 17, "title": "A" })).unwrap();
        assert_eq!(post.id, "17");
        let post: Post = serde_json::from_value(json!({ "id": "p-1", "title": "A" })).unwrap();
        assert_eq!(post.id, "p-1");
        assert!(serde_json::from_value::<Post>(json!({ "id": null, "title": "A" })).is_err());
    }

    #[test]
    fn test_page_defaults() {
        let page: Page<Post> = serde_json::from_value(json!({})).unwrap();
        assert!(page.content.is_empty());
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_truncate_title_counts_characters() {
        assert_eq!(truncate_title("Toss"), "Toss");
        assert_eq!(truncate_title(&"a".repeat(20)), "a".repeat(20));
        assert_eq!(truncate_title(&"가".repeat(21)), format!("{}...", "가".repeat(20)));
    }

    #[test]
    fn test_has_logo() {
        assert!(has_logo(&Some("toss.svg".into())));
        assert!(!has_logo(&Some("  ".into())));
        assert!(!has_logo(&None));
    }

    #[test]
    fn test_sort_by() {
        assert_eq!(SortBy::default(), SortBy::Relevance);
        assert_eq!("latest".parse::<SortBy>().unwrap(), SortBy::Latest);
        assert_eq!(SortBy::Popular.to_string(), "POPULAR");
        assert!("newest".parse::<SortBy>().is_err());
        assert_eq!(serde_json::to_value(SortBy::Latest).unwrap(), json!("LATEST"));
    }

    #[test]
    fn test_category_stat_from_row() {
        let row: CategoryRow = serde_json::from_value(json!({
            "name": "FrontEnd",
            "postCount": 12,
            "totalViewCount": 340,
            "latestPostAt": "2025-03-01T10:00:00"
        }))
        .unwrap();
        let stat = CategoryStat::from(row);
        assert_eq!(stat.id, "frontend");
        assert_eq!(stat.total_views, 340);
    }
}
