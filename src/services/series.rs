//! Series: named groups of posts.

use crate::db::{Query, POSTS, SERIES};
use crate::models::{timestamp, NewSeries, Post, Series, SeriesChoice, SeriesSubmission, SeriesWithPosts};
use crate::services::feed;
use crate::Database;
use anyhow::Result;
use chrono::{DateTime, Utc};

pub fn create_series(db: &Database, submission: &SeriesSubmission) -> Result<String> {
    create_series_at(db, submission, timestamp::now())
}

pub fn create_series_at(
    db: &Database,
    submission: &SeriesSubmission,
    now: DateTime<Utc>,
) -> Result<String> {
    let series = NewSeries {
        title: submission.title.clone(),
        description: submission.description.clone(),
        start_date: now,
        updated_at: now,
    };
    let id = db.add(SERIES, &series)?;
    tracing::info!(series_id = %id, title = %series.title, "Series created");
    Ok(id)
}

pub fn get_series(db: &Database, id: &str) -> Result<Option<Series>> {
    match db.fetch(SERIES, id)? {
        Some(doc) => Ok(Some(doc.decode()?)),
        None => Ok(None),
    }
}

/// The series and all of its readable posts in store order.
pub fn get_series_with_posts(db: &Database, id: &str) -> Result<Option<SeriesWithPosts>> {
    let Some(series) = get_series(db, id)? else {
        return Ok(None);
    };

    let docs = db.query(&Query::collection(POSTS).filter_eq("series_id", id))?;
    let (posts, _) = feed::decode_readable::<Post>(docs);

    Ok(Some(SeriesWithPosts { series, posts }))
}

/// Options for the series select on the post form.
pub fn series_choices(db: &Database) -> Result<Vec<SeriesChoice>> {
    Ok(feed::list_series(db)?.iter().map(SeriesChoice::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn setup_test_db() -> Database {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let db = Database::open_memory(&format!("series_test_{}", id)).unwrap();
        db.migrate().unwrap();
        db
    }

    fn submission(title: &str) -> SeriesSubmission {
        SeriesSubmission {
            title: title.into(),
            description: "A multi-part series".into(),
        }
    }

    #[test]
    fn test_create_and_get_series() {
        let db = setup_test_db();
        let now = timestamp::now();
        let id = create_series_at(&db, &submission("Pilot Notes"), now).unwrap();

        let series = get_series(&db, &id).unwrap().unwrap();
        assert_eq!(series.id, id);
        assert_eq!(series.title, "Pilot Notes");
        assert_eq!(series.start_date, now);
        assert_eq!(series.updated_at, now);

        assert!(get_series(&db, "missing").unwrap().is_none());
    }

    #[test]
    fn test_series_with_posts_filters_by_series() {
        let db = setup_test_db();
        let a = create_series(&db, &submission("A")).unwrap();
        let b = create_series(&db, &submission("B")).unwrap();

        let stamp = timestamp::format(&timestamp::now());
        for (title, series_id) in [("a1", &a), ("b1", &b), ("a2", &a)] {
            db.add(
                POSTS,
                &json!({
                    "title": title,
                    "description": "d",
                    "content": "c",
                    "image": null,
                    "series_id": series_id,
                    "published_at": stamp,
                    "created_at": stamp,
                    "updated_at": stamp,
                }),
            )
            .unwrap();
        }

        let found = get_series_with_posts(&db, &a).unwrap().unwrap();
        assert_eq!(found.series.title, "A");
        let titles: Vec<_> = found.posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["a1", "a2"]);
        assert!(found.posts[0].image.is_none());

        assert!(get_series_with_posts(&db, "missing").unwrap().is_none());
    }

    #[test]
    fn test_series_choices_in_store_order() {
        let db = setup_test_db();
        let first = create_series(&db, &submission("Zeta")).unwrap();
        let second = create_series(&db, &submission("Alpha")).unwrap();

        let choices = series_choices(&db).unwrap();
        assert_eq!(
            choices,
            vec![
                SeriesChoice { id: first, title: "Zeta".into() },
                SeriesChoice { id: second, title: "Alpha".into() },
            ]
        );
    }
}
