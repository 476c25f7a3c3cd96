//! Catalog management service

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::AppResult,
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
    repository::Repository,
    services::{email::Notifier, notices},
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    notifier: Arc<dyn Notifier>,
    admin_email: Option<String>,
}

impl CatalogService {
    pub fn new(
        repository: Repository,
        notifier: Arc<dyn Notifier>,
        admin_email: Option<String>,
    ) -> Self {
        Self {
            repository,
            notifier,
            admin_email,
        }
    }

    /// Search books with filters
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        self.repository.books.search(query).await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Add a book and let the administrator know
    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        book.validate()?;

        let created = self.repository.books.create(&book).await?;
        tracing::info!(book_id = created.id, isbn = %created.isbn, "Book added");

        if let Some(ref admin_email) = self.admin_email {
            let notice = notices::book_added(&created);
            if !self.notifier.send(&notice.subject, &notice.body, admin_email).await {
                tracing::warn!(book_id = created.id, "New book notice not delivered");
            }
        }

        Ok(created)
    }

    pub async fn update_book(&self, id: i32, update: UpdateBook) -> AppResult<Book> {
        update.validate()?;
        self.repository.books.update(id, &update).await
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    /// Distinct departments, sorted
    pub async fn departments(&self) -> AppResult<Vec<String>> {
        self.repository.books.departments().await
    }
}
