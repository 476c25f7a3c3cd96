//! Store tests against a live PostgreSQL database
//!
//! Run with: DATABASE_URL=postgres://... cargo test --test postgres -- --ignored

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;

use circulation_server::{
    error::AppError,
    models::{
        book::{Book, CreateBook, UpdateBook},
        loan::{Loan, LoanClosure, NewLoan},
        user::{NewUser, Role},
    },
    repository::Repository,
};

async fn repository() -> Repository {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    Repository::new(pool)
}

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

async fn add_book(repository: &Repository, copies: i32) -> Book {
    repository
        .books
        .create(&CreateBook {
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            isbn: "9780441013593".to_string(),
            department: "Fiction".to_string(),
            book_count: Some(copies),
            cover_image: None,
        })
        .await
        .unwrap()
}

/// Creates a user with a run-unique id and returns that id
async fn add_user(repository: &Repository, prefix: &str) -> String {
    let id = format!("{}-{}", prefix, rand::random::<u32>());
    repository
        .users
        .create(&NewUser {
            id: id.clone(),
            name: prefix.to_string(),
            email: format!("{}@example.org", id),
            role: Role::User,
            password_hash: "hash".to_string(),
        })
        .await
        .unwrap();
    id
}

async fn open(repository: &Repository, book_id: i32, user_id: &str) -> Result<Loan, AppError> {
    repository
        .loans
        .open(&NewLoan {
            book_id,
            user_id: user_id.to_string(),
            borrowed_date: at(2024, 1, 1),
            due_date: at(2024, 1, 10),
        })
        .await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn concurrent_opens_reserve_the_last_copy_once() {
    let repository = repository().await;
    let book_id = add_book(&repository, 1).await.id;

    let mut handles = Vec::new();
    for prefix in ["race-a", "race-b", "race-c", "race-d"] {
        let user_id = add_user(&repository, prefix).await;
        let repository = repository.clone();
        handles.push(tokio::spawn(async move {
            open(&repository, book_id, &user_id).await
        }));
    }
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| matches!(r, Err(AppError::Conflict(_)))));

    let stored = repository.books.get_by_id(book_id).await.unwrap();
    assert_eq!(stored.borrowed_count, 1);
}

#[tokio::test]
#[ignore]
async fn open_checks_book_then_user() {
    let repository = repository().await;
    let book = add_book(&repository, 1).await;

    let err = open(&repository, -1, "nobody").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref m) if m.contains("Book")));

    let err = open(&repository, book.id, "nobody").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref m) if m.contains("User")));
    assert_eq!(repository.books.get_by_id(book.id).await.unwrap().borrowed_count, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn loan_closes_once_and_charges_once() {
    let repository = repository().await;
    let book = add_book(&repository, 1).await;
    let user_id = add_user(&repository, "close").await;
    let loan = open(&repository, book.id, &user_id).await.unwrap();

    let closure = LoanClosure {
        returned_date: at(2024, 1, 15),
        days_late: 5,
        penalty: Decimal::from(25),
    };
    let loan_id = loan.id;
    let mut handles = Vec::new();
    for _ in 0..4 {
        let repository = repository.clone();
        let closure = closure.clone();
        handles.push(tokio::spawn(async move {
            repository.loans.close(loan_id, &closure).await
        }));
    }
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);

    let err = repository.loans.close(loan.id, &closure).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let user = repository.users.find_by_id(&user_id).await.unwrap().unwrap();
    assert_eq!(user.total_penalty, Decimal::from(25));
    assert_eq!(repository.books.get_by_id(book.id).await.unwrap().borrowed_count, 0);

    let stored = repository.loans.get_by_id(loan.id).await.unwrap();
    assert_eq!(stored.days_late, Some(5));
    assert_eq!(stored.penalty_amount, Some(Decimal::from(25)));
}

#[tokio::test]
#[ignore]
async fn book_count_cannot_drop_below_copies_on_loan() {
    let repository = repository().await;
    let book = add_book(&repository, 2).await;
    let user_id = add_user(&repository, "stock").await;
    open(&repository, book.id, &user_id).await.unwrap();
    open(&repository, book.id, &user_id).await.unwrap();

    let err = repository
        .books
        .update(
            book.id,
            &UpdateBook {
                book_count: Some(1),
                ..UpdateBook::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let stored = repository.books.get_by_id(book.id).await.unwrap();
    assert_eq!(stored.book_count, 2);

    let err = repository.books.delete(book.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
#[ignore]
async fn users_with_open_loans_are_kept() {
    let repository = repository().await;
    let book = add_book(&repository, 1).await;
    let user_id = add_user(&repository, "keep").await;
    let loan = open(&repository, book.id, &user_id).await.unwrap();

    let err = repository.users.delete(&user_id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    repository
        .loans
        .close(
            loan.id,
            &LoanClosure {
                returned_date: at(2024, 1, 5),
                days_late: 0,
                penalty: Decimal::ZERO,
            },
        )
        .await
        .unwrap();
    repository.users.delete(&user_id).await.unwrap();

    // The loan keeps its snapshot after the borrower is gone
    let stored = repository.loans.get_by_id(loan.id).await.unwrap();
    assert_eq!(stored.book_title, "Dune");
}
