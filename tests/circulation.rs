//! Lending, returns and overdue reminders against the in-memory store

mod common;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use circulation_server::{
    error::AppError,
    models::loan::{LendRequest, Loan},
    repository::Repository,
    services::loans::LoansService,
};
use common::{add_book, add_user, at, services, RecordingNotifier};

fn request(book_id: i32, user_id: &str, due: DateTime<Utc>) -> LendRequest {
    LendRequest {
        book_id,
        user_id: user_id.to_string(),
        due_date: due,
    }
}

async fn total_penalty(repository: &Repository, user_id: &str) -> Decimal {
    repository
        .users
        .find_by_id(user_id)
        .await
        .unwrap()
        .unwrap()
        .total_penalty
}

async fn borrowed(repository: &Repository, book_id: i32) -> i32 {
    repository.books.get_by_id(book_id).await.unwrap().borrowed_count
}

#[tokio::test]
async fn single_copy_scenario() {
    let repository = Repository::in_memory();
    let notifier = RecordingNotifier::new();
    let loans = services(&repository, notifier.clone()).loans;
    let book = add_book(&repository, "Dune", 1).await;
    add_user(&repository, "a").await;
    add_user(&repository, "b").await;

    let loan = loans
        .lend_at(request(book.id, "a", at(2024, 2, 1)), at(2024, 1, 15))
        .await
        .unwrap();
    assert_eq!(borrowed(&repository, book.id).await, 1);

    let err = loans
        .lend_at(request(book.id, "b", at(2024, 2, 1)), at(2024, 1, 16))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let returned = loans.return_loan_at(loan.id, at(2024, 2, 1)).await.unwrap();
    assert_eq!(returned.penalty_amount, Some(Decimal::ZERO));
    assert_eq!(borrowed(&repository, book.id).await, 0);

    loans
        .lend_at(request(book.id, "b", at(2024, 3, 1)), at(2024, 2, 2))
        .await
        .unwrap();
    assert_eq!(borrowed(&repository, book.id).await, 1);
}

#[tokio::test]
async fn lending_takes_exactly_one_copy() {
    let repository = Repository::in_memory();
    let loans = services(&repository, RecordingNotifier::new()).loans;
    let book = add_book(&repository, "Emma", 2).await;
    add_user(&repository, "a").await;

    for expected in 1..=2 {
        loans
            .lend_at(request(book.id, "a", at(2024, 2, 1)), at(2024, 1, 1))
            .await
            .unwrap();
        let stored = repository.books.get_by_id(book.id).await.unwrap();
        assert_eq!(stored.borrowed_count, expected);
        assert!(stored.borrowed_count <= stored.book_count);
    }

    let err = loans
        .lend_at(request(book.id, "a", at(2024, 2, 1)), at(2024, 1, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(borrowed(&repository, book.id).await, 2);
}

#[tokio::test]
async fn missing_book_is_reported_before_missing_user() {
    let repository = Repository::in_memory();
    let loans = services(&repository, RecordingNotifier::new()).loans;
    let book = add_book(&repository, "Dune", 1).await;

    let err = loans
        .lend_at(request(book.id + 100, "ghost", at(2024, 2, 1)), at(2024, 1, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref msg) if msg.contains("Book")));

    let err = loans
        .lend_at(request(book.id, "ghost", at(2024, 2, 1)), at(2024, 1, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref msg) if msg.contains("User")));
    assert_eq!(borrowed(&repository, book.id).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_lends_on_the_last_copy() {
    let repository = Repository::in_memory();
    let loans = services(&repository, RecordingNotifier::new()).loans;
    let book = add_book(&repository, "Dune", 1).await;
    add_user(&repository, "a").await;
    add_user(&repository, "b").await;

    let book_id = book.id;
    let spawn = move |service: LoansService, user: &'static str| {
        tokio::spawn(async move {
            service
                .lend_at(request(book_id, user, at(2024, 2, 1)), at(2024, 1, 1))
                .await
        })
    };
    let first = spawn(loans.clone(), "a");
    let second = spawn(loans.clone(), "b");
    let results: Vec<Result<Loan, AppError>> =
        vec![first.await.unwrap(), second.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(AppError::Conflict(_))))
            .count(),
        1
    );
    assert_eq!(borrowed(&repository, book.id).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_returns_close_the_loan_once() {
    let repository = Repository::in_memory();
    let loans = services(&repository, RecordingNotifier::new()).loans;
    let book = add_book(&repository, "Dune", 1).await;
    add_user(&repository, "a").await;

    let loan = loans
        .lend_at(request(book.id, "a", at(2024, 1, 1)), at(2023, 12, 15))
        .await
        .unwrap();

    let loan_id = loan.id;
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = loans.clone();
            tokio::spawn(async move { service.return_loan_at(loan_id, at(2024, 1, 6)).await })
        })
        .collect();
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| matches!(r, Err(AppError::Conflict(_)))));
    assert_eq!(total_penalty(&repository, "a").await, Decimal::from(25));
    assert_eq!(borrowed(&repository, book.id).await, 0);
}

#[tokio::test]
async fn late_return_is_charged_once() {
    let repository = Repository::in_memory();
    let loans = services(&repository, RecordingNotifier::new()).loans;
    let book = add_book(&repository, "Dune", 1).await;
    add_user(&repository, "a").await;

    let loan = loans
        .lend_at(request(book.id, "a", at(2024, 1, 1)), at(2023, 12, 15))
        .await
        .unwrap();
    assert_eq!(total_penalty(&repository, "a").await, Decimal::ZERO);

    let returned = loans.return_loan_at(loan.id, at(2024, 1, 6)).await.unwrap();
    assert_eq!(returned.days_late, Some(5));
    assert_eq!(returned.penalty_amount, Some(Decimal::from(25)));
    assert_eq!(total_penalty(&repository, "a").await, Decimal::from(25));

    let err = loans
        .return_loan_at(loan.id, at(2024, 1, 9))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(total_penalty(&repository, "a").await, Decimal::from(25));
    assert_eq!(borrowed(&repository, book.id).await, 0);
}

#[tokio::test]
async fn penalties_accumulate_across_returns() {
    let repository = Repository::in_memory();
    let loans = services(&repository, RecordingNotifier::new()).loans;
    let book = add_book(&repository, "Dune", 2).await;
    add_user(&repository, "a").await;

    let early = loans
        .lend_at(request(book.id, "a", at(2024, 1, 10)), at(2024, 1, 1))
        .await
        .unwrap();
    let late = loans
        .lend_at(request(book.id, "a", at(2024, 1, 10)), at(2024, 1, 1))
        .await
        .unwrap();

    loans
        .return_loan_at(early.id, at(2024, 1, 10) - Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(total_penalty(&repository, "a").await, Decimal::ZERO);

    loans
        .return_loan_at(late.id, at(2024, 1, 12) + Duration::hours(3))
        .await
        .unwrap();
    assert_eq!(total_penalty(&repository, "a").await, Decimal::from(10));
}

#[tokio::test]
async fn failed_notifications_do_not_undo_a_return() {
    let repository = Repository::in_memory();
    let notifier = RecordingNotifier::failing();
    let loans = services(&repository, notifier.clone()).loans;
    let book = add_book(&repository, "Dune", 1).await;
    add_user(&repository, "a").await;

    let loan = loans
        .lend_at(request(book.id, "a", at(2024, 1, 5)), at(2024, 1, 1))
        .await
        .unwrap();
    let returned = loans.return_loan_at(loan.id, at(2024, 1, 8)).await.unwrap();

    assert!(!returned.is_open());
    assert_eq!(notifier.sent_to("a@example.org").len(), 2);
    let receipt = &notifier.sent_to("a@example.org")[1];
    assert!(receipt.body.contains("Penalty Amount: Rs. 15"));
}

#[tokio::test]
async fn loan_snapshot_survives_book_changes() {
    let repository = Repository::in_memory();
    let loans = services(&repository, RecordingNotifier::new()).loans;
    let book = add_book(&repository, "Dune", 1).await;
    add_user(&repository, "a").await;

    let loan = loans
        .lend_at(request(book.id, "a", at(2024, 2, 1)), at(2024, 1, 1))
        .await
        .unwrap();
    loans.return_loan_at(loan.id, at(2024, 1, 20)).await.unwrap();
    repository.books.delete(book.id).await.unwrap();

    let stored = loans.get_loan(loan.id).await.unwrap();
    assert_eq!(stored.book_title, "Dune");
    assert_eq!(stored.department, "Fiction");
}

#[tokio::test]
async fn scanner_sends_one_reminder_per_user() {
    let repository = Repository::in_memory();
    let notifier = RecordingNotifier::new();
    let services = services(&repository, notifier.clone());
    let dune = add_book(&repository, "Dune", 1).await;
    let emma = add_book(&repository, "Emma", 1).await;
    add_user(&repository, "a").await;

    for book in [&dune, &emma] {
        services
            .loans
            .lend_at(request(book.id, "a", at(2024, 1, 1)), at(2023, 12, 1))
            .await
            .unwrap();
    }
    let before = notifier.sent().len();

    let report = services.overdue.scan_at(at(2024, 1, 4)).await.unwrap();

    assert_eq!(report.overdue_loans, 2);
    assert_eq!(report.notified_users, 1);
    let reminders = &notifier.sent()[before..];
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].recipient, "a@example.org");
    assert!(reminders[0].body.contains("Dune"));
    assert!(reminders[0].body.contains("Emma"));
    assert!(reminders[0].body.contains("Rs. 15"));

    // Previews are never charged
    assert_eq!(total_penalty(&repository, "a").await, Decimal::ZERO);
}

#[tokio::test]
async fn scanner_is_silent_without_overdue_loans() {
    let repository = Repository::in_memory();
    let notifier = RecordingNotifier::new();
    let services = services(&repository, notifier.clone());
    let book = add_book(&repository, "Dune", 1).await;
    add_user(&repository, "a").await;

    let loan = services
        .loans
        .lend_at(request(book.id, "a", at(2024, 1, 1)), at(2023, 12, 1))
        .await
        .unwrap();
    services.loans.return_loan_at(loan.id, at(2023, 12, 20)).await.unwrap();
    let before = notifier.sent().len();

    let report = services.overdue.scan_at(at(2024, 3, 1)).await.unwrap();

    assert_eq!(report.overdue_loans, 0);
    assert_eq!(notifier.sent().len(), before);
}
