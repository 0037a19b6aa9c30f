//! Public listings: posts joined to their series and per-series aggregates.

use crate::db::{Document, POSTS, SERIES};
use crate::models::{timestamp, Post, PostListing, Series, SeriesOverview};
use crate::Database;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

pub const PREVIEW_IMAGES: usize = 3;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Serialize)]
pub struct PostFeed {
    pub posts: Vec<PostListing>,
    /// Posts left out: undecodable (including a missing `published_at`) or
    /// pointing at a series that could not be resolved.
    pub unavailable: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HomeFeed {
    pub posts: Vec<PostListing>,
    pub series: Vec<SeriesOverview>,
    /// Unavailable posts plus series documents that could not be read.
    pub unavailable: usize,
}

/// Whole days elapsed since `published_at`, rounded down.
pub fn days_ago(published_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - published_at).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Decode each document, skipping the ones that do not fit `T`. Returns the
/// decoded values in document order and how many were skipped.
pub fn decode_readable<T: DeserializeOwned>(docs: Vec<Document>) -> (Vec<T>, usize) {
    let mut decoded = Vec::with_capacity(docs.len());
    let mut skipped = 0;
    for doc in docs {
        match doc.decode() {
            Ok(value) => decoded.push(value),
            Err(e) => {
                tracing::warn!(
                    collection = %doc.collection,
                    id = %doc.id,
                    "Skipping unreadable document: {}",
                    e
                );
                skipped += 1;
            }
        }
    }
    (decoded, skipped)
}

fn read_series(db: &Database) -> Result<(Vec<Series>, usize)> {
    Ok(decode_readable(db.stream(SERIES)?))
}

/// Every readable series in store order.
pub fn list_series(db: &Database) -> Result<Vec<Series>> {
    Ok(read_series(db)?.0)
}

/// Posts newest first, each joined to its series title. Equal timestamps
/// keep store order.
///
/// A post that cannot be decoded, or whose series is missing or
/// unresolvable, is skipped and counted in [`PostFeed::unavailable`].
pub fn list_posts(db: &Database, series: &[Series], now: DateTime<Utc>) -> Result<PostFeed> {
    let titles: HashMap<&str, &str> = series
        .iter()
        .map(|s| (s.id.as_str(), s.title.as_str()))
        .collect();

    let (decoded, mut unavailable) = decode_readable::<Post>(db.stream(POSTS)?);

    let mut posts = Vec::with_capacity(decoded.len());
    for post in decoded {
        let title = post
            .series_id
            .as_deref()
            .and_then(|id| titles.get(id).copied());
        let Some(title) = title else {
            tracing::warn!(
                post_id = %post.id,
                series_id = ?post.series_id,
                "Skipping post with unresolvable series"
            );
            unavailable += 1;
            continue;
        };

        posts.push(PostListing {
            series: title.to_string(),
            days_ago: days_ago(post.published_at, now),
            post,
        });
    }
    // Stable sort: ties stay in store order.
    posts.sort_by(|a, b| b.post.published_at.cmp(&a.post.published_at));

    Ok(PostFeed { posts, unavailable })
}

/// Attach post counts and preview images to each series, keeping the order
/// of `series`.
pub fn list_series_overview(series: Vec<Series>, posts: &[PostListing]) -> Vec<SeriesOverview> {
    series
        .into_iter()
        .map(|s| {
            let mut members: Vec<&Post> = posts
                .iter()
                .map(|p| &p.post)
                .filter(|p| p.series_id.as_deref() == Some(s.id.as_str()))
                .collect();
            // Stable sort: equal timestamps keep listing order.
            members.sort_by(|a, b| b.published_at.cmp(&a.published_at));

            SeriesOverview {
                post_amount: members.len(),
                post_imgs: members
                    .iter()
                    .take(PREVIEW_IMAGES)
                    .map(|p| p.image.clone())
                    .collect(),
                series: s,
            }
        })
        .collect()
}

/// Everything the home page shows, computed against a single `now`.
pub fn home_feed(db: &Database) -> Result<HomeFeed> {
    let now = timestamp::now();
    let (series, unreadable_series) = read_series(db)?;
    let feed = list_posts(db, &series, now)?;
    let unavailable = feed.unavailable + unreadable_series;
    if unavailable > 0 {
        tracing::warn!(
            posts = feed.unavailable,
            series = unreadable_series,
            "Home page is missing unreadable or orphaned content"
        );
    }
    let series = list_series_overview(series, &feed.posts);

    Ok(HomeFeed {
        posts: feed.posts,
        series,
        unavailable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap() + Duration::hours(hours)
    }

    fn series(id: &str) -> Series {
        Series {
            id: id.into(),
            title: format!("Series {}", id),
            description: String::new(),
            start_date: at(0),
            updated_at: at(0),
        }
    }

    fn listing(id: &str, series_id: &str, hours: i64) -> PostListing {
        PostListing {
            post: Post {
                id: id.into(),
                title: id.into(),
                description: String::new(),
                content: String::new(),
                image: Some(format!("https://img.example.com/{}.png", id)),
                series_id: Some(series_id.into()),
                published_at: at(hours),
                created_at: at(hours),
                updated_at: at(hours),
            },
            series: format!("Series {}", series_id),
            days_ago: 0,
        }
    }

    #[test]
    fn test_days_ago() {
        let now = at(0);
        assert_eq!(days_ago(now, now), 0);
        assert_eq!(days_ago(now - Duration::hours(25), now), 1);
        assert_eq!(days_ago(now - Duration::hours(23), now), 0);
        assert_eq!(days_ago(now - Duration::days(30), now), 30);
        assert_eq!(days_ago(now + Duration::hours(1), now), -1);
    }

    #[test]
    fn test_post_amount_counts_matching_posts() {
        let posts = vec![
            listing("p1", "a", 3),
            listing("p2", "b", 2),
            listing("p3", "a", 1),
        ];
        let overview = list_series_overview(vec![series("a"), series("b"), series("c")], &posts);

        let amounts: Vec<_> = overview.iter().map(|o| (o.series.id.as_str(), o.post_amount)).collect();
        assert_eq!(amounts, vec![("a", 2), ("b", 1), ("c", 0)]);
        assert!(overview[2].post_imgs.is_empty());
    }

    #[test]
    fn test_preview_images_are_three_newest() {
        // Listing order is not chronological here on purpose.
        let posts = vec![
            listing("old", "a", 1),
            listing("newest", "a", 9),
            listing("mid", "a", 5),
            listing("newer", "a", 7),
        ];
        let overview = list_series_overview(vec![series("a")], &posts);

        assert_eq!(overview[0].post_amount, 4);
        assert_eq!(
            overview[0].post_imgs,
            vec![
                Some("https://img.example.com/newest.png".to_string()),
                Some("https://img.example.com/newer.png".to_string()),
                Some("https://img.example.com/mid.png".to_string()),
            ]
        );
    }

    #[test]
    fn test_preview_ties_keep_listing_order() {
        let mut first = listing("first", "a", 4);
        first.post.image = None;
        let posts = vec![first, listing("second", "a", 4)];
        let overview = list_series_overview(vec![series("a")], &posts);
        assert_eq!(
            overview[0].post_imgs,
            vec![None, Some("https://img.example.com/second.png".to_string())]
        );
    }
}
