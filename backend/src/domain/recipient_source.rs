use crate::domain::trend_category::TrendCategory;
use async_trait::async_trait;

#[async_trait]
pub trait RecipientSource: Send + Sync {
    /// Active recipient addresses for `category`, in list order.
    async fn active_recipients(&self, category: TrendCategory)
        -> Result<Vec<String>, anyhow::Error>;
}
