use super::{timestamp, Post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(with = "timestamp")]
    pub start_date: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSeries {
    pub title: String,
    pub description: String,
    #[serde(with = "timestamp")]
    pub start_date: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// A series on the home page with its aggregates.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesOverview {
    #[serde(flatten)]
    pub series: Series,
    pub post_amount: usize,
    /// Images of the (up to) three most recently published posts.
    pub post_imgs: Vec<Option<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesWithPosts {
    #[serde(flatten)]
    pub series: Series,
    pub posts: Vec<Post>,
}

/// An entry of the series select on the post form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesChoice {
    pub id: String,
    pub title: String,
}

impl From<&Series> for SeriesChoice {
    fn from(series: &Series) -> Self {
        Self {
            id: series.id.clone(),
            title: series.title.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeriesSubmission {
    pub title: String,
    pub description: String,
}
