use crate::domain::recipient_source::RecipientSource;
use crate::domain::trend_category::TrendCategory;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct RecipientFile {
    recipients: Vec<RecipientEntry>,
}

#[derive(Debug, Deserialize)]
struct RecipientEntry {
    email: String,
    #[serde(default)]
    active: bool,
}

/// Reads `<directory>/<category>.json` on every call so edits to the lists
/// take effect without a redeploy.
#[derive(Debug, Clone)]
pub struct JsonFileRecipientList {
    directory: PathBuf,
}

impl JsonFileRecipientList {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn path_for(&self, category: TrendCategory) -> PathBuf {
        self.directory.join(format!("{}.json", category.as_str()))
    }
}

#[async_trait]
impl RecipientSource for JsonFileRecipientList {
    #[tracing::instrument(name = "Loading recipient list", skip(self))]
    async fn active_recipients(
        &self,
        category: TrendCategory,
    ) -> Result<Vec<String>, anyhow::Error> {
        let path = self.path_for(category);

        let contents = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read recipient list {}", path.display()))?;

        let file: RecipientFile = serde_json::from_str(&contents)
            .with_context(|| format!("Recipient list {} is not valid", path.display()))?;

        let total = file.recipients.len();
        let active: Vec<String> = file
            .recipients
            .into_iter()
            .filter(|recipient| recipient.active)
            .map(|recipient| recipient.email)
            .collect();

        tracing::info!("{} of {} recipients are active", active.len(), total);

        Ok(active)
    }
}
