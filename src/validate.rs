//! Boundary validation.
//!
//! Everything here runs before the first backend call. Checks collect
//! into [`ValidationIssue`]s rather than failing fast, so a form caller
//! can surface every problem at once.

use std::sync::LazyLock;

use email_address::EmailAddress;
use regex::Regex;
use url::Url;

use crate::errors::{ValidationError, ValidationIssue, ValidationResult};
use crate::limits;
use crate::types::{CollectionInput, CollectionUpdate, PostInput, PostUpdate, UserInput, UserUpdate};

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("username regex"));

/// Tags are stored lowercased; dashes allowed for multi-word tags
/// ("all-season").
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("tag regex"));

/// Returns `true` if the provided string is a syntactically valid email address.
pub fn is_valid_email(value: &str) -> bool {
    EmailAddress::is_valid(value)
}

/// Returns `true` if the provided string parses as an http(s) URL.
pub fn is_valid_http_url(value: &str) -> bool {
    matches!(Url::parse(value), Ok(url) if url.scheme() == "http" || url.scheme() == "https")
}

/// Lowercases a username for storage and lookup. Usernames are compared
/// case-insensitively everywhere.
pub fn normalize_username(username: &str) -> String {
    username.trim().to_ascii_lowercase()
}

pub(crate) fn check_username(username: &str, issues: &mut Vec<ValidationIssue>) {
    let trimmed = username.trim();
    if trimmed.chars().count() < limits::USERNAME_MIN_LENGTH {
        issues.push(ValidationIssue::new(
            "username",
            "validation.length",
            format!("username must be at least {} characters", limits::USERNAME_MIN_LENGTH),
        ));
    } else if trimmed.chars().count() > limits::USERNAME_MAX_LENGTH {
        issues.push(ValidationIssue::new(
            "username",
            "validation.length",
            format!("username must be at most {} characters", limits::USERNAME_MAX_LENGTH),
        ));
    }
    if !trimmed.is_empty() && !USERNAME_RE.is_match(trimmed) {
        issues.push(ValidationIssue::new(
            "username",
            "validation.format",
            "username may only contain letters, numbers, and underscores",
        ));
    }
}

fn check_max_chars(field: &str, value: &str, max: usize, issues: &mut Vec<ValidationIssue>) {
    if value.chars().count() > max {
        issues.push(ValidationIssue::new(
            field,
            "validation.length",
            format!("{field} must be at most {max} characters"),
        ));
    }
}

fn check_http_url(field: &str, value: &str, issues: &mut Vec<ValidationIssue>) {
    if !is_valid_http_url(value) {
        issues.push(ValidationIssue::new(
            field,
            "validation.url",
            format!("{field} must be an http(s) URL"),
        ));
    }
}

/// Normalizes a tag list: trim, lowercase, drop duplicates while keeping
/// first-seen order. Charset and count violations become issues.
pub(crate) fn normalize_tags(tags: &[String], issues: &mut Vec<ValidationIssue>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for raw in tags {
        let tag = raw.trim().to_ascii_lowercase();
        if tag.is_empty() || tag.chars().count() > limits::TAG_MAX_LENGTH || !TAG_RE.is_match(&tag) {
            issues.push(ValidationIssue::new(
                "tags",
                "validation.format",
                format!("invalid tag {raw:?}: lowercase letters, digits, and dashes only"),
            ));
            continue;
        }
        if !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    if normalized.len() > limits::MAX_TAGS_PER_POST {
        issues.push(ValidationIssue::new(
            "tags",
            "validation.count",
            format!("at most {} tags per post", limits::MAX_TAGS_PER_POST),
        ));
    }
    normalized
}

fn finish(issues: Vec<ValidationIssue>) -> ValidationResult<()> {
    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(issues))
    }
}

pub(crate) fn validate_new_user(email: &str, input: &UserInput) -> ValidationResult<()> {
    let mut issues = Vec::new();
    check_username(&input.username, &mut issues);
    if !is_valid_email(email) {
        issues.push(ValidationIssue::new("email", "validation.email", "invalid email address"));
    }
    if input.display_name.trim().is_empty() {
        issues.push(ValidationIssue::new(
            "display_name",
            "validation.required",
            "display name is required",
        ));
    }
    if let Some(bio) = &input.bio {
        check_max_chars("bio", bio, limits::BIO_MAX_LENGTH, &mut issues);
    }
    if let Some(url) = &input.profile_photo_url
        && !url.is_empty()
    {
        check_http_url("profile_photo_url", url, &mut issues);
    }
    finish(issues)
}

pub(crate) fn validate_user_update(update: &UserUpdate) -> ValidationResult<()> {
    let mut issues = Vec::new();
    if update.is_empty() {
        issues.push(ValidationIssue::new("update", "validation.empty", "no fields to update"));
    }
    if let Some(username) = &update.username {
        check_username(username, &mut issues);
    }
    if let Some(display_name) = &update.display_name
        && display_name.trim().is_empty()
    {
        issues.push(ValidationIssue::new(
            "display_name",
            "validation.required",
            "display name cannot be blank",
        ));
    }
    if let Some(bio) = &update.bio {
        check_max_chars("bio", bio, limits::BIO_MAX_LENGTH, &mut issues);
    }
    if let Some(url) = &update.profile_photo_url
        && !url.is_empty()
    {
        check_http_url("profile_photo_url", url, &mut issues);
    }
    finish(issues)
}

/// Validates a new post and returns the normalized tag list.
pub(crate) fn validate_new_post(input: &PostInput) -> ValidationResult<Vec<String>> {
    let mut issues = Vec::new();
    check_http_url("image_url", &input.image_url, &mut issues);
    if let Some(caption) = &input.caption {
        check_max_chars("caption", caption, limits::CAPTION_MAX_LENGTH, &mut issues);
    }
    let tags = match &input.tags {
        Some(tags) => normalize_tags(tags, &mut issues),
        None => Vec::new(),
    };
    if issues.is_empty() {
        Ok(tags)
    } else {
        Err(ValidationError::new(issues))
    }
}

/// Validates a post update and returns the normalized tag list, when tags
/// are part of the update.
pub(crate) fn validate_post_update(update: &PostUpdate) -> ValidationResult<Option<Vec<String>>> {
    let mut issues = Vec::new();
    if update.is_empty() {
        issues.push(ValidationIssue::new("update", "validation.empty", "no fields to update"));
    }
    if let Some(caption) = &update.caption {
        check_max_chars("caption", caption, limits::CAPTION_MAX_LENGTH, &mut issues);
    }
    let tags = update.tags.as_ref().map(|tags| normalize_tags(tags, &mut issues));
    if issues.is_empty() {
        Ok(tags)
    } else {
        Err(ValidationError::new(issues))
    }
}

pub(crate) fn check_collection_name(name: &str, issues: &mut Vec<ValidationIssue>) {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        issues.push(ValidationIssue::new(
            "name",
            "validation.required",
            "collection name is required",
        ));
    }
    check_max_chars("name", trimmed, limits::COLLECTION_NAME_MAX_LENGTH, issues);
}

pub(crate) fn validate_new_collection(input: &CollectionInput) -> ValidationResult<()> {
    let mut issues = Vec::new();
    check_collection_name(&input.name, &mut issues);
    finish(issues)
}

pub(crate) fn validate_collection_update(update: &CollectionUpdate) -> ValidationResult<()> {
    let mut issues = Vec::new();
    if update.is_empty() {
        issues.push(ValidationIssue::new("update", "validation.empty", "no fields to update"));
    }
    if let Some(name) = &update.name {
        check_collection_name(name, &mut issues);
    }
    finish(issues)
}
