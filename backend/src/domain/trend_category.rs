use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendCategory {
    #[default]
    Fashion,
    Military,
    Bakery,
}

impl TrendCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendCategory::Fashion => "fashion",
            TrendCategory::Military => "military",
            TrendCategory::Bakery => "bakery",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TrendCategory::Fashion => "Fashion",
            TrendCategory::Military => "Military",
            TrendCategory::Bakery => "Bakery",
        }
    }

    /// Subcategory used when a trigger does not name one.
    pub fn default_subcategory(&self) -> &'static str {
        match self {
            TrendCategory::Fashion => "high-fashion",
            TrendCategory::Military => "air-sea-land",
            TrendCategory::Bakery => "hosting-platters",
        }
    }

    pub fn resolve_subcategory<'a>(&self, subcategory: Option<&'a str>) -> &'a str {
        match subcategory.map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => self.default_subcategory(),
        }
    }
}

impl std::fmt::Display for TrendCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrendCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "fashion" => Ok(Self::Fashion),
            "military" => Ok(Self::Military),
            "bakery" => Ok(Self::Bakery),
            other => Err(format!(
                "{} is not a supported category. Use fashion, military or bakery",
                other
            )),
        }
    }
}
