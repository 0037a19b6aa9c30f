use super::{timestamp, Series};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post as read back from the `posts` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub series_id: Option<String>,
    #[serde(with = "timestamp")]
    pub published_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// The document body written when a post is created.
#[derive(Debug, Clone, Serialize)]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub content: String,
    pub image: String,
    pub series_id: String,
    #[serde(with = "timestamp")]
    pub published_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// A post on the home page, joined to its series.
#[derive(Debug, Clone, Serialize)]
pub struct PostListing {
    #[serde(flatten)]
    pub post: Post,
    pub series: String,
    pub days_ago: i64,
}

/// A single post page.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub series: Option<Series>,
    pub content_html: String,
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Where a post's image comes from. A submission carries exactly one.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Upload(ImageUpload),
    Url(String),
}

/// A validated post form.
#[derive(Debug, Clone)]
pub struct PostSubmission {
    pub title: String,
    pub description: String,
    pub content: String,
    pub image: ImageSource,
    pub series_id: String,
}
