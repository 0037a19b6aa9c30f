use crate::db::{StoreResult, WriteBatch, POSTS, SERIES};
use crate::models::{timestamp, ImageSource, NewPost, Post, PostSubmission, PostView};
use crate::services::markdown::MarkdownRenderer;
use crate::services::{feed, series, uploads};
use crate::storage::BlobStore;
use crate::Database;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Create a post, stamping it and touching its series with one instant.
pub fn create_post(
    db: &Database,
    blobs: &dyn BlobStore,
    submission: PostSubmission,
) -> Result<String> {
    create_post_at(db, blobs, submission, timestamp::now())
}

pub fn create_post_at(
    db: &Database,
    blobs: &dyn BlobStore,
    submission: PostSubmission,
    now: DateTime<Utc>,
) -> Result<String> {
    let (image, uploaded_key) = match submission.image {
        ImageSource::Upload(upload) => {
            let key = uploads::upload_key(&upload.filename);
            let object = blobs
                .put(&key, &upload.data, &upload.content_type)
                .context("Failed to store uploaded image")?;
            (object.public_url, Some(key))
        }
        ImageSource::Url(url) => (url, None),
    };

    let post = NewPost {
        title: submission.title,
        description: submission.description,
        content: submission.content,
        image,
        series_id: submission.series_id,
        published_at: now,
        created_at: now,
        updated_at: now,
    };

    match write_post(db, &post, now) {
        Ok(id) => {
            tracing::info!(post_id = %id, series_id = %post.series_id, "Post created");
            Ok(id)
        }
        Err(e) => {
            if let Some(key) = uploaded_key {
                if let Err(cleanup) = blobs.delete(&key) {
                    tracing::warn!(key = %key, "Could not remove orphaned upload: {}", cleanup);
                }
            }
            Err(anyhow::Error::new(e).context("Failed to save post"))
        }
    }
}

/// Add the post and touch its series in one atomic batch. A vanished series
/// fails the whole batch.
fn write_post(db: &Database, post: &NewPost, now: DateTime<Utc>) -> StoreResult<String> {
    let mut touch = Map::new();
    touch.insert(
        "updated_at".to_string(),
        Value::String(timestamp::format(&now)),
    );

    let mut batch = WriteBatch::new();
    let id = batch.add(POSTS, post)?;
    batch.update(SERIES, &post.series_id, touch);
    db.commit(batch)?;
    Ok(id)
}

pub fn get_post(db: &Database, id: &str) -> Result<Option<Post>> {
    match db.fetch(POSTS, id)? {
        Some(doc) => Ok(Some(doc.decode()?)),
        None => Ok(None),
    }
}

/// A post with its series and rendered content, for the single post page.
pub fn get_post_view(
    db: &Database,
    markdown: &MarkdownRenderer,
    id: &str,
) -> Result<Option<PostView>> {
    let Some(post) = get_post(db, id)? else {
        return Ok(None);
    };
    let series = match post.series_id.as_deref() {
        Some(series_id) => series::get_series(db, series_id)?,
        None => None,
    };
    let content_html = markdown.render(&post.content);
    Ok(Some(PostView {
        post,
        series,
        content_html,
    }))
}

/// Every readable post in store order.
pub fn list_all_posts(db: &Database) -> Result<Vec<Post>> {
    Ok(feed::decode_readable(db.stream(POSTS)?).0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImageUpload, SeriesSubmission};
    use crate::storage::LocalBlobStore;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 7, 7, 7];

    fn setup_test_db() -> Database {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let db = Database::open_memory(&format!("posts_test_{}", id)).unwrap();
        db.migrate().unwrap();
        db
    }

    fn temp_blobs() -> LocalBlobStore {
        let root = std::env::temp_dir().join(format!("episode-posts-{}", uuid::Uuid::new_v4()));
        LocalBlobStore::new(root, "/media")
    }

    fn make_series(db: &Database) -> String {
        series::create_series(
            db,
            &SeriesSubmission {
                title: "Pilot Notes".into(),
                description: "Notes".into(),
            },
        )
        .unwrap()
    }

    fn submission(series_id: &str, image: ImageSource) -> PostSubmission {
        PostSubmission {
            title: "Ep 1".into(),
            description: "First".into(),
            content: "# Hello\n\nWorld".into(),
            image,
            series_id: series_id.into(),
        }
    }

    #[test]
    fn test_create_post_stamps_post_and_series_with_one_instant() {
        let db = setup_test_db();
        let blobs = temp_blobs();
        let series_id = make_series(&db);
        let now = timestamp::now() + chrono::Duration::seconds(5);

        let id = create_post_at(
            &db,
            &blobs,
            submission(&series_id, ImageSource::Url("https://img.example.com/1.png".into())),
            now,
        )
        .unwrap();

        let post = get_post(&db, &id).unwrap().unwrap();
        assert_eq!(post.published_at, now);
        assert_eq!(post.created_at, now);
        assert_eq!(post.updated_at, now);
        assert_eq!(post.image.as_deref(), Some("https://img.example.com/1.png"));

        let series = series::get_series(&db, &series_id).unwrap().unwrap();
        assert_eq!(series.updated_at, now);
        assert!(series.start_date < now);
    }

    #[test]
    fn test_create_post_with_upload_stores_blob() {
        let db = setup_test_db();
        let blobs = temp_blobs();
        let series_id = make_series(&db);

        let id = create_post(
            &db,
            &blobs,
            submission(
                &series_id,
                ImageSource::Upload(ImageUpload {
                    filename: "my cover.png".into(),
                    content_type: "image/png".into(),
                    data: PNG.to_vec(),
                }),
            ),
        )
        .unwrap();

        let image = get_post(&db, &id).unwrap().unwrap().image.unwrap();
        assert!(image.starts_with("/media/uploads/"));
        assert!(image.ends_with("_my_cover.png"));
        assert_ne!(image, "my cover.png");

        let key = image.trim_start_matches("/media/");
        let stored = std::fs::read(blobs.root().join(key)).unwrap();
        assert_eq!(stored, PNG);

        let _ = std::fs::remove_dir_all(blobs.root());
    }

    #[test]
    fn test_missing_series_writes_nothing_and_removes_upload() {
        let db = setup_test_db();
        let blobs = temp_blobs();

        let result = create_post(
            &db,
            &blobs,
            submission(
                "vanished",
                ImageSource::Upload(ImageUpload {
                    filename: "cover.png".into(),
                    content_type: "image/png".into(),
                    data: PNG.to_vec(),
                }),
            ),
        );

        assert!(result.is_err());
        assert!(list_all_posts(&db).unwrap().is_empty());
        let leftovers = std::fs::read_dir(blobs.root().join("uploads"))
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(leftovers, 0);

        let _ = std::fs::remove_dir_all(blobs.root());
    }

    #[test]
    fn test_post_view_renders_content_and_series() {
        let db = setup_test_db();
        let blobs = temp_blobs();
        let series_id = make_series(&db);
        let id = create_post(
            &db,
            &blobs,
            submission(&series_id, ImageSource::Url("https://img.example.com/1.png".into())),
        )
        .unwrap();

        let renderer = MarkdownRenderer::new();
        let view = get_post_view(&db, &renderer, &id).unwrap().unwrap();
        assert!(view.content_html.contains("<h1>Hello</h1>"));
        assert_eq!(view.series.unwrap().title, "Pilot Notes");

        assert!(get_post_view(&db, &renderer, "missing").unwrap().is_none());
    }
}
