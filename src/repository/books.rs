//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CatalogSummary, CreateBook, UpdateBook},
};

use super::CatalogStore;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl CatalogStore for BooksRepository {
    async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, isbn, department, book_count, borrowed_count, cover_image, created_at)
            VALUES ($1, $2, $3, $4, $5, 0, $6, NOW())
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.department)
        .bind(book.book_count.unwrap_or(1))
        .bind(&book.cover_image)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn search(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM books WHERE TRUE");

        if let Some(ref department) = query.department {
            builder.push(" AND department = ").push_bind(department.clone());
        }

        if let Some(ref search) = query.search {
            let pattern = format!("%{}%", search);
            builder
                .push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR author ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR isbn ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        if query.available == Some(true) {
            builder.push(" AND book_count > borrowed_count");
        }

        builder.push(" ORDER BY created_at DESC, id DESC");

        let books = builder.build_query_as::<Book>().fetch_all(&self.pool).await?;
        Ok(books)
    }

    async fn update(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        // The stock guard lives in the WHERE clause so a concurrent lend
        // cannot slip between the check and the write.
        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                isbn = COALESCE($4, isbn),
                department = COALESCE($5, department),
                book_count = COALESCE($6, book_count),
                cover_image = COALESCE($7, cover_image)
            WHERE id = $1 AND COALESCE($6, book_count) >= borrowed_count
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.title)
        .bind(&update.author)
        .bind(&update.isbn)
        .bind(&update.department)
        .bind(update.book_count)
        .bind(&update.cover_image)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(book) => Ok(book),
            None if self.exists(id).await? => Err(AppError::Conflict(
                "book_count cannot be lower than the copies currently on loan".to_string(),
            )),
            None => Err(AppError::NotFound(format!("Book with id {} not found", id))),
        }
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1 AND borrowed_count = 0")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            if self.exists(id).await? {
                return Err(AppError::Conflict(
                    "Book has copies on loan and cannot be deleted".to_string(),
                ));
            }
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        Ok(())
    }

    async fn departments(&self) -> AppResult<Vec<String>> {
        let departments: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT department FROM books ORDER BY department")
                .fetch_all(&self.pool)
                .await?;
        Ok(departments)
    }

    async fn summary(&self) -> AppResult<CatalogSummary> {
        let (titles, copies, borrowed_copies, available_titles): (i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT COUNT(*),
                       COALESCE(SUM(book_count), 0)::bigint,
                       COALESCE(SUM(borrowed_count), 0)::bigint,
                       COUNT(*) FILTER (WHERE book_count > borrowed_count)
                FROM books
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(CatalogSummary {
            titles,
            copies,
            borrowed_copies,
            available_titles,
        })
    }
}
