use crate::{
    error::AppResult,
    models::VideoRecord,
    services::providers::TrendingSource,
};

/// In-process curated trending catalog
///
/// Stands in for a live trending feed: each fetch returns the catalog in
/// insertion order, which is the display order downstream. A real feed
/// integration would implement [`TrendingSource`] the same way.
#[derive(Clone)]
pub struct CatalogTrendingSource {
    records: Vec<VideoRecord>,
}

impl CatalogTrendingSource {
    /// Creates the source seeded with the curated catalog
    pub fn new() -> Self {
        Self {
            records: curated_catalog(),
        }
    }

    /// Creates the source over a caller-supplied record set
    pub fn with_records(records: Vec<VideoRecord>) -> Self {
        Self { records }
    }
}

impl Default for CatalogTrendingSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TrendingSource for CatalogTrendingSource {
    async fn fetch_all(&self) -> AppResult<Vec<VideoRecord>> {
        Ok(self.records.clone())
    }

    fn name(&self) -> &'static str {
        "catalog"
    }
}

/// Builds one curated catalog entry
#[allow(clippy::too_many_arguments)]
fn entry(
    id: &str,
    title: &str,
    channel: &str,
    views: &str,
    likes: &str,
    duration: &str,
    published_at: &str,
    photo: &str,
    description: &str,
    tags: &[&str],
    category: &str,
    trending_score: u8,
) -> VideoRecord {
    VideoRecord {
        id: id.to_string(),
        title: title.to_string(),
        channel: channel.to_string(),
        views: views.to_string(),
        likes: likes.to_string(),
        duration: duration.to_string(),
        published_at: published_at.to_string(),
        thumbnail: format!("https://images.unsplash.com/{}?w=400&h=225&fit=crop", photo),
        description: description.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        category: category.to_string(),
        trending_score,
    }
}

/// The curated trending set served by default
fn curated_catalog() -> Vec<VideoRecord> {
    vec![
        entry(
            "dQw4w9WgXcQ",
            "The Secret to Viral Content Creation in 2024",
            "CreatorInsights",
            "2.4M",
            "89K",
            "12:34",
            "2 days ago",
            "photo-1611162617474-5b21e879e113",
            "Learn the proven strategies that top creators use to make viral content...",
            &["viral", "content creation", "youtube tips", "social media"],
            "Education",
            95,
        ),
        entry(
            "abc123def456",
            "AI Tools That Will Change Everything in 2024",
            "TechFuture",
            "1.8M",
            "67K",
            "15:22",
            "1 day ago",
            "photo-1677442136019-21780ecad995",
            "Discover the most powerful AI tools that are revolutionizing industries...",
            &["AI", "technology", "tools", "future"],
            "Technology",
            92,
        ),
        entry(
            "xyz789ghi012",
            "How I Made $100K in 30 Days (Real Strategy)",
            "BusinessMastery",
            "3.2M",
            "124K",
            "18:45",
            "3 days ago",
            "photo-1556742049-0cfed4f6a45d",
            "The exact step-by-step process I used to generate six figures...",
            &["business", "entrepreneurship", "money", "success"],
            "Business",
            88,
        ),
        entry(
            "mno345pqr678",
            "The Psychology Behind Viral Videos",
            "MindHacks",
            "956K",
            "43K",
            "10:12",
            "5 days ago",
            "photo-1559757148-5c350d0d3c56",
            "Understanding the psychological triggers that make content go viral...",
            &["psychology", "viral content", "marketing", "behavior"],
            "Education",
            85,
        ),
        entry(
            "stu901vwx234",
            "Faceless YouTube Channel Made Me Rich",
            "AnonymousCreator",
            "1.5M",
            "78K",
            "14:33",
            "1 week ago",
            "photo-1611224923853-80b023f02d71",
            "How I built a million-dollar faceless YouTube channel from scratch...",
            &["faceless youtube", "passive income", "automation", "youtube"],
            "Business",
            90,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_fetch_all_returns_catalog_in_order() {
        let source = CatalogTrendingSource::new();
        let records = source.fetch_all().await.unwrap();

        assert_eq!(records.len(), 5);
        assert_eq!(records[0].id, "dQw4w9WgXcQ");
        assert_eq!(records[4].id, "stu901vwx234");
    }

    #[tokio::test]
    async fn test_catalog_ids_unique_and_scores_in_range() {
        let records = CatalogTrendingSource::new().fetch_all().await.unwrap();

        let ids: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), records.len());

        for record in &records {
            assert!(!record.id.is_empty());
            assert!(record.trending_score <= 100);
        }
    }

    #[tokio::test]
    async fn test_catalog_category_composition() {
        let records = CatalogTrendingSource::new().fetch_all().await.unwrap();

        let count = |category: &str| {
            records
                .iter()
                .filter(|r| r.category.eq_ignore_ascii_case(category))
                .count()
        };

        assert_eq!(count("technology"), 1);
        assert_eq!(count("education"), 2);
        assert_eq!(count("business"), 2);
    }

    #[tokio::test]
    async fn test_with_records_overrides_catalog() {
        let source = CatalogTrendingSource::with_records(vec![]);
        assert!(source.fetch_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_catalog_descriptions_are_preview_snippets() {
        let records = CatalogTrendingSource::new().fetch_all().await.unwrap();

        for record in &records {
            assert!(record.description.ends_with("..."));
        }
        assert_eq!(
            records[0].description,
            "Learn the proven strategies that top creators use to make viral content..."
        );
    }
}
