//! Book (catalog entry) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub department: String,
    /// Copies owned by the library
    pub book_count: i32,
    /// Copies currently out on loan, never above `book_count`
    pub borrowed_count: i32,
    /// Opaque reference to the cover image (path or URL)
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Book {
    pub fn available_copies(&self) -> i32 {
        (self.book_count - self.borrowed_count).max(0)
    }

    pub fn is_available(&self) -> bool {
        self.available_copies() > 0
    }

    /// Case-insensitive match on title, author or ISBN
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [&self.title, &self.author, &self.isbn]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Missing required field: title"))]
    pub title: String,
    #[validate(length(min = 1, message = "Missing required field: author"))]
    pub author: String,
    #[validate(length(min = 1, message = "Missing required field: isbn"))]
    pub isbn: String,
    #[validate(length(min = 1, message = "Missing required field: department"))]
    pub department: String,
    /// Number of copies (default: 1)
    #[validate(range(min = 0, message = "book_count must not be negative"))]
    pub book_count: Option<i32>,
    pub cover_image: Option<String>,
}

/// Update book request; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "author must not be empty"))]
    pub author: Option<String>,
    #[validate(length(min = 1, message = "isbn must not be empty"))]
    pub isbn: Option<String>,
    #[validate(length(min = 1, message = "department must not be empty"))]
    pub department: Option<String>,
    #[validate(range(min = 0, message = "book_count must not be negative"))]
    pub book_count: Option<i32>,
    pub cover_image: Option<String>,
}

/// Book search query
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Exact department
    pub department: Option<String>,
    /// Case-insensitive search in title, author and ISBN
    pub search: Option<String>,
    /// Only books with at least one copy on the shelf
    pub available: Option<bool>,
}

/// Catalog-wide counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct CatalogSummary {
    pub titles: i64,
    pub copies: i64,
    pub borrowed_copies: i64,
    pub available_titles: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(book_count: i32, borrowed_count: i32) -> Book {
        Book {
            id: 1,
            title: "The Rust Programming Language".to_string(),
            author: "Steve Klabnik".to_string(),
            isbn: "978-1718503106".to_string(),
            department: "Computer Science".to_string(),
            book_count,
            borrowed_count,
            cover_image: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn available_copies_is_stock_minus_borrowed() {
        assert_eq!(book(3, 1).available_copies(), 2);
        assert!(book(3, 1).is_available());
        assert_eq!(book(1, 1).available_copies(), 0);
        assert!(!book(1, 1).is_available());
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let b = book(1, 0);
        assert!(b.matches_search("rust"));
        assert!(b.matches_search("KLABNIK"));
        assert!(b.matches_search("1718503106"));
        assert!(!b.matches_search("python"));
    }

    #[test]
    fn create_book_requires_every_descriptive_field() {
        let request = CreateBook {
            title: "".to_string(),
            author: "A".to_string(),
            isbn: "1".to_string(),
            department: "D".to_string(),
            book_count: Some(1),
            cover_image: None,
        };
        assert!(request.validate().is_err());
    }
}
