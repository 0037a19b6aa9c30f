pub mod auth;
pub mod feed;
pub mod forms;
pub mod markdown;
pub mod posts;
pub mod series;
pub mod uploads;
