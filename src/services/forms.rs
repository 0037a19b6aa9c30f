//! Form input and validation. Validation runs before any store call; a
//! failed form is redisplayed with the collected per-field messages.

use super::uploads;
use crate::models::{
    ImageSource, ImageUpload, PostSubmission, Series, SeriesChoice, SeriesSubmission,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const POST_DESCRIPTION_MAX: usize = 25;
pub const SERIES_DESCRIPTION_MAX: usize = 50;

const REQUIRED: &str = "This field is required.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        !self.get(field).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

fn require(errors: &mut FormErrors, field: &str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.add(field, REQUIRED);
        false
    } else {
        true
    }
}

fn max_length(errors: &mut FormErrors, field: &str, value: &str, max: usize) {
    if value.trim().chars().count() > max {
        errors.add(
            field,
            format!("Field cannot be longer than {} characters.", max),
        );
    }
}

/// Absolute http(s) URL with a host.
pub fn is_valid_url(value: &str) -> bool {
    match url::Url::parse(value) {
        Ok(u) => matches!(u.scheme(), "http" | "https") && u.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub title: String,
    pub description: String,
    pub content: String,
    pub image_url: String,
    pub series_id: String,
    #[serde(skip)]
    pub pic: Option<UploadedFile>,
}

impl PostForm {
    /// Validate against the series that currently exist.
    pub fn validate(&self, choices: &[SeriesChoice]) -> Result<PostSubmission, FormErrors> {
        let mut errors = FormErrors::new();

        require(&mut errors, "title", &self.title);
        if require(&mut errors, "description", &self.description) {
            max_length(&mut errors, "description", &self.description, POST_DESCRIPTION_MAX);
        }
        require(&mut errors, "content", &self.content);

        // An empty file part is what browsers send when no file was picked.
        let pic = self.pic.as_ref().filter(|f| !f.data.is_empty());
        if let Some(file) = pic {
            if !uploads::has_allowed_extension(&file.filename)
                || uploads::sniff_image(&file.data).is_none()
            {
                errors.add("pic", "Please upload images only.");
            }
        }

        let image_url = self.image_url.trim();
        if !image_url.is_empty() && !is_valid_url(image_url) {
            errors.add("image_url", "Please add a valid URL.");
        }

        match (pic.is_some(), image_url.is_empty()) {
            (false, true) => errors.add("image_url", "Please add an image file or a valid URL."),
            (true, false) => errors.add(
                "image_url",
                "Choose either an image file or an image URL, not both.",
            ),
            _ => {}
        }

        let series_id = self.series_id.trim();
        if series_id.is_empty() {
            errors.add("series_id", "Every post should have a Series");
        } else if !choices.iter().any(|c| c.id == series_id) {
            errors.add("series_id", "Not a valid choice.");
        }

        errors.finish(|| {
            let image = match pic {
                Some(file) => ImageSource::Upload(ImageUpload {
                    filename: file.filename.clone(),
                    content_type: uploads::content_type_for(
                        &file.filename,
                        file.content_type.as_deref(),
                        &file.data,
                    ),
                    data: file.data.clone(),
                }),
                None => ImageSource::Url(image_url.to_string()),
            };
            PostSubmission {
                title: self.title.trim().to_string(),
                description: self.description.trim().to_string(),
                content: self.content.clone(),
                image,
                series_id: series_id.to_string(),
            }
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesForm {
    pub title: String,
    pub description: String,
}

impl SeriesForm {
    pub fn validate(&self, existing: &[Series]) -> Result<SeriesSubmission, FormErrors> {
        let mut errors = FormErrors::new();

        let title = self.title.trim();
        if require(&mut errors, "title", title) && existing.iter().any(|s| s.title.trim() == title) {
            errors.add("title", "A series with this title already exists.");
        }
        if require(&mut errors, "description", &self.description) {
            max_length(&mut errors, "description", &self.description, SERIES_DESCRIPTION_MAX);
        }

        errors.finish(|| SeriesSubmission {
            title: title.to_string(),
            description: self.description.trim().to_string(),
        })
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub name: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        require(&mut errors, "name", &self.name);
        require(&mut errors, "password", &self.password);
        errors.finish(|| ())
    }
}
