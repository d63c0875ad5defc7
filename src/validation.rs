//! Validation layer - inbound payload schemas.
//!
//! Each write operation has two variants: Create/Replace (every NOT NULL
//! column required and non-empty) and Partial-Update (every field optional,
//! but present fields obey the same per-field rule). Failures produce a
//! field -> message map and short-circuit before any store is touched.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{ApiError, FieldErrors};

/// Nullable patch field: distinguishes an absent key (keep the stored
/// value) from an explicit JSON null (clear the column).
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Canonical URL-safe form of a slug or title.
pub fn slugify(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .replace('\u{2019}', "'")
        .replace('&', "and")
        .replace('/', "-")
        .replace(' ', "-")
}

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    // US "12345" or "12345-6789"
    static ref US_ZIP_RE: Regex = Regex::new(r"^\d{5}(?:-\d{4})?$").unwrap();
    static ref DIGITS_DASH_RE: Regex = Regex::new(r"^[0-9\-]+$").unwrap();
}

/// Accumulates per-field failures into one ValidationError.
#[derive(Default)]
struct Checker {
    errors: FieldErrors,
}

impl Checker {
    fn reject(&mut self, field: &str, message: &str) {
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }

    fn require_text(&mut self, field: &str, value: &str, max_len: usize) {
        if value.trim().is_empty() {
            self.reject(field, &format!("{field} cannot be empty."));
        } else if value.len() > max_len {
            self.reject(field, &format!("{field} too long (max {max_len})."));
        }
    }

    fn check_slug(&mut self, value: &str) {
        if value.trim().is_empty() {
            self.reject("slug", "Slug cannot be empty.");
        } else if value != slugify(value) {
            self.reject("slug", "Slug must be URL-safe (lowercase, hyphenated).");
        }
    }

    fn check_email(&mut self, value: &str) {
        if value.trim().is_empty() {
            self.reject("email", "Email cannot be empty.");
        } else if value.len() > 300 || !EMAIL_RE.is_match(value) {
            self.reject("email", "Not a valid email address.");
        }
    }

    fn check_zip(&mut self, value: &str) {
        if value.trim().is_empty() {
            self.reject("zip_code", "ZIP code cannot be empty.");
        } else if value.len() > 10 {
            self.reject("zip_code", "ZIP code too long (max 10).");
        } else if DIGITS_DASH_RE.is_match(value) && !US_ZIP_RE.is_match(value) {
            // Only enforce the US shape when the value looks numeric.
            self.reject("zip_code", "ZIP must be 12345 or 12345-6789.");
        }
    }

    fn check_counter(&mut self, field: &str, value: i64) {
        if value < 0 {
            self.reject(field, &format!("{field} must be non-negative."));
        }
    }

    fn check_content(&mut self, value: &Value) {
        if !value.is_object() {
            self.reject("content", "Content must be a JSON object.");
        }
    }

    fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

/// `end_date` must be strictly after `start_date`. Shared by create and by
/// patch paths that merge dates with the stored row before re-checking.
pub fn validate_date_range(start_date: NaiveDate, end_date: NaiveDate) -> Result<(), ApiError> {
    if end_date <= start_date {
        return Err(ApiError::field(
            "end_date",
            "End date must be after start date.",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// BlogCategory
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CategoryPayload {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
}

impl CategoryPayload {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut check = Checker::default();
        check.require_text("title", &self.title, 255);
        check.check_slug(&self.slug);
        check.finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoryPatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
}

impl CategoryPatch {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut check = Checker::default();
        if let Some(title) = &self.title {
            check.require_text("title", title, 255);
        }
        if let Some(slug) = &self.slug {
            check.check_slug(slug);
        }
        check.finish()
    }
}

// ---------------------------------------------------------------------------
// MyUser
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct UserPayload {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: String,
    pub dob: NaiveDate,
    pub zip_code: String,
    pub city_state: Option<String>,
    pub image: String,
    pub is_active: Option<bool>,
    pub is_admin: Option<bool>,
}

impl UserPayload {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut check = Checker::default();
        check.require_text("first_name", &self.first_name, 255);
        check.require_text("last_name", &self.last_name, 255);
        check.check_email(&self.email);
        check.require_text("gender", &self.gender, 20);
        check.check_zip(&self.zip_code);
        check.require_text("image", &self.image, 300);
        check.finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<NaiveDate>,
    pub zip_code: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub city_state: Option<Option<String>>,
    pub image: Option<String>,
    pub is_active: Option<bool>,
    pub is_admin: Option<bool>,
}

impl UserPatch {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut check = Checker::default();
        if let Some(first_name) = &self.first_name {
            check.require_text("first_name", first_name, 255);
        }
        if let Some(last_name) = &self.last_name {
            check.require_text("last_name", last_name, 255);
        }
        if let Some(email) = &self.email {
            check.check_email(email);
        }
        if let Some(gender) = &self.gender {
            check.require_text("gender", gender, 20);
        }
        if let Some(zip_code) = &self.zip_code {
            check.check_zip(zip_code);
        }
        if let Some(image) = &self.image {
            check.require_text("image", image, 300);
        }
        check.finish()
    }
}

// ---------------------------------------------------------------------------
// BlogPost
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PostPayload {
    pub title: String,
    pub slug: String,
    pub blog_cat_id: i32,
    pub author_id: i32,
    pub image: String,
    pub content_mongo_id: Option<String>,
    /// Optional article body; written to the content store, never to SQL.
    pub content: Option<Value>,
}

impl PostPayload {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut check = Checker::default();
        check.require_text("title", &self.title, 255);
        check.check_slug(&self.slug);
        check.require_text("image", &self.image, 300);
        if let Some(content) = &self.content {
            check.check_content(content);
        }
        check.finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct PostPatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub blog_cat_id: Option<i32>,
    pub author_id: Option<i32>,
    pub image: Option<String>,
    pub content_mongo_id: Option<String>,
    pub content: Option<Value>,
}

impl PostPatch {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut check = Checker::default();
        if let Some(title) = &self.title {
            check.require_text("title", title, 255);
        }
        if let Some(slug) = &self.slug {
            check.check_slug(slug);
        }
        if let Some(image) = &self.image {
            check.require_text("image", image, 300);
        }
        if let Some(content) = &self.content {
            check.check_content(content);
        }
        check.finish()
    }
}

// ---------------------------------------------------------------------------
// NewsPost / NewsMain
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct NewsPayload {
    pub post_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct NewsMainPayload {
    pub post_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub notes: Option<String>,
}

impl NewsMainPayload {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_date_range(self.start_date, self.end_date)
    }
}

#[derive(Debug, Deserialize)]
pub struct NewsMainPatch {
    pub post_id: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

// ---------------------------------------------------------------------------
// BlogAnalytics
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AnalyticsPayload {
    pub post_id: i32,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub comments: i64,
    #[serde(default)]
    pub shares: i64,
}

impl AnalyticsPayload {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut check = Checker::default();
        check.check_counter("views", self.views);
        check.check_counter("likes", self.likes);
        check.check_counter("comments", self.comments);
        check.check_counter("shares", self.shares);
        check.finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsPatch {
    pub views: Option<i64>,
    pub likes: Option<i64>,
    pub comments: Option<i64>,
    pub shares: Option<i64>,
}

impl AnalyticsPatch {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut check = Checker::default();
        if let Some(views) = self.views {
            check.check_counter("views", views);
        }
        if let Some(likes) = self.likes {
            check.check_counter("likes", likes);
        }
        if let Some(comments) = self.comments {
            check.check_counter("comments", comments);
        }
        if let Some(shares) = self.shares {
            check.check_counter("shares", shares);
        }
        check.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_errors(err: ApiError) -> FieldErrors {
        match err {
            ApiError::Validation(errors) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_slugify_normalizes() {
        assert_eq!(slugify("Local News"), "local-news");
        assert_eq!(slugify("Food & Drink"), "food-and-drink");
        assert_eq!(slugify("  Arts/Culture "), "arts-culture");
        assert_eq!(slugify("local-news"), "local-news");
    }

    #[test]
    fn test_category_create_requires_canonical_slug() {
        let payload = CategoryPayload {
            title: "Local News".to_string(),
            slug: "Local News".to_string(),
            description: None,
        };
        let errors = field_errors(payload.validate().unwrap_err());
        assert!(errors["slug"].contains("URL-safe"));
    }

    #[test]
    fn test_category_create_accepts_valid_payload() {
        let payload = CategoryPayload {
            title: "Local News".to_string(),
            slug: "local-news".to_string(),
            description: Some("Neighborhood reporting".to_string()),
        };
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_category_patch_skips_absent_fields() {
        let patch = CategoryPatch {
            title: None,
            slug: None,
            description: Some(Some("only the description".to_string())),
        };
        assert!(patch.validate().is_ok());

        let patch = CategoryPatch {
            title: Some("   ".to_string()),
            slug: None,
            description: None,
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn test_patch_null_clears_nullable_field() {
        let patch: CategoryPatch = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(patch.description, Some(None));

        let patch: CategoryPatch = serde_json::from_str("{}").unwrap();
        assert_eq!(patch.description, None);

        let patch: CategoryPatch =
            serde_json::from_str(r#"{"description": "Neighborhood reporting"}"#).unwrap();
        assert_eq!(
            patch.description,
            Some(Some("Neighborhood reporting".to_string()))
        );

        // The merge every PATCH handler applies: absent keeps, null clears.
        let stored = Some("old".to_string());
        assert_eq!(None::<Option<String>>.unwrap_or(stored.clone()), stored);
        assert_eq!(Some(None::<String>).unwrap_or(stored), None);
    }

    #[test]
    fn test_user_zip_rules() {
        let mut payload = UserPayload {
            first_name: "Ada".to_string(),
            last_name: "Jones".to_string(),
            email: "ada@example.com".to_string(),
            gender: "female".to_string(),
            dob: NaiveDate::from_ymd_opt(1990, 4, 2).unwrap(),
            zip_code: "30303".to_string(),
            city_state: None,
            image: "ada.png".to_string(),
            is_active: None,
            is_admin: None,
        };
        assert!(payload.validate().is_ok());

        payload.zip_code = "303".to_string();
        let errors = field_errors(payload.validate().unwrap_err());
        assert!(errors.contains_key("zip_code"));
    }

    #[test]
    fn test_user_email_must_parse() {
        let patch = UserPatch {
            first_name: None,
            last_name: None,
            email: Some("not-an-email".to_string()),
            gender: None,
            dob: None,
            zip_code: None,
            city_state: None,
            image: None,
            is_active: None,
            is_admin: None,
        };
        let errors = field_errors(patch.validate().unwrap_err());
        assert!(errors.contains_key("email"));
    }

    #[test]
    fn test_post_content_must_be_object() {
        let payload = PostPayload {
            title: "Beltline Update".to_string(),
            slug: "beltline-update".to_string(),
            blog_cat_id: 1,
            author_id: 1,
            image: "beltline.jpg".to_string(),
            content_mongo_id: None,
            content: Some(json!(["not", "an", "object"])),
        };
        let errors = field_errors(payload.validate().unwrap_err());
        assert!(errors.contains_key("content"));
    }

    #[test]
    fn test_post_create_collects_multiple_errors() {
        let payload = PostPayload {
            title: "".to_string(),
            slug: "Bad Slug".to_string(),
            blog_cat_id: 1,
            author_id: 1,
            image: "".to_string(),
            content_mongo_id: None,
            content: None,
        };
        let errors = field_errors(payload.validate().unwrap_err());
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_news_main_rejects_inverted_range() {
        let payload = NewsMainPayload {
            post_id: 1,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
            notes: None,
        };
        let errors = field_errors(payload.validate().unwrap_err());
        assert!(errors["end_date"].contains("after start date"));
    }

    #[test]
    fn test_news_main_rejects_equal_dates() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        assert!(validate_date_range(day, day).is_err());
    }

    #[test]
    fn test_analytics_counters_non_negative() {
        let payload = AnalyticsPayload {
            post_id: 1,
            views: 10,
            likes: -1,
            comments: 0,
            shares: 0,
        };
        let errors = field_errors(payload.validate().unwrap_err());
        assert!(errors.contains_key("likes"));

        let patch = AnalyticsPatch {
            views: Some(5),
            likes: None,
            comments: None,
            shares: Some(-2),
        };
        let errors = field_errors(patch.validate().unwrap_err());
        assert!(errors.contains_key("shares"));
    }
}
