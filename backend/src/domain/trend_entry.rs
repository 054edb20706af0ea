use serde::{Deserialize, Serialize};

/// One researched trend in canonical shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendEntry {
    /// 1-based position in the final list.
    pub number: usize,
    /// Heading of an overview entry, e.g. "Artisan Breads".
    #[serde(default)]
    pub category_name: Option<String>,
    pub description: String,
    pub references: Vec<String>,
    pub image_prompts: Vec<String>,
    pub image_urls: Vec<String>,
    pub images_count: usize,
}

impl TrendEntry {
    pub fn new(
        number: usize,
        description: String,
        references: Vec<String>,
        image_prompts: Vec<String>,
        image_urls: Vec<String>,
    ) -> Self {
        let images_count = image_urls.len();
        Self {
            number,
            category_name: None,
            description,
            references,
            image_prompts,
            image_urls,
            images_count,
        }
    }

    pub fn with_category_name(mut self, category_name: Option<String>) -> Self {
        self.category_name = category_name;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendsReport {
    pub trends: Vec<TrendEntry>,
    pub generated_at: Option<String>,
    pub research_model: Option<String>,
    /// Language the research answered in, when it says so.
    #[serde(default)]
    pub language: Option<String>,
}

impl TrendsReport {
    pub fn total_trends(&self) -> usize {
        self.trends.len()
    }

    /// References across all trends, first occurrence wins.
    pub fn unique_references(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.trends
            .iter()
            .flat_map(|trend| trend.references.iter())
            .map(String::as_str)
            .filter(|reference| seen.insert(*reference))
            .collect()
    }
}
