//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use circulation_server::{
    config::{AppConfig, LoansConfig},
    models::{
        book::{Book, CreateBook},
        user::{NewUser, Role},
    },
    repository::Repository,
    services::{email::Notifier, Services},
    AppState,
};

/// One delivered (or attempted) mail
#[derive(Debug, Clone)]
pub struct SentMail {
    pub subject: String,
    pub body: String,
    pub recipient: String,
}

/// Notifier that keeps every message instead of sending it
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMail>>,
    deliver: bool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            deliver: true,
        })
    }

    /// Records the attempts but reports every one as failed
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            deliver: false,
        })
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, recipient: &str) -> Vec<SentMail> {
        self.sent()
            .into_iter()
            .filter(|mail| mail.recipient == recipient)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, subject: &str, body: &str, recipient: &str) -> bool {
        self.sent.lock().unwrap().push(SentMail {
            subject: subject.to_string(),
            body: body.to_string(),
            recipient: recipient.to_string(),
        });
        self.deliver
    }
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

pub fn services(repository: &Repository, notifier: Arc<RecordingNotifier>) -> Services {
    Services::new(
        repository.clone(),
        notifier,
        &LoansConfig::default(),
        Some("admin@library.local".to_string()),
    )
}

pub fn app_state(repository: &Repository, notifier: Arc<RecordingNotifier>) -> AppState {
    AppState {
        config: Arc::new(AppConfig::default()),
        services: Arc::new(services(repository, notifier)),
    }
}

pub async fn add_book(repository: &Repository, title: &str, copies: i32) -> Book {
    repository
        .books
        .create(&CreateBook {
            title: title.to_string(),
            author: "Frank Herbert".to_string(),
            isbn: format!("isbn-{}", title.to_lowercase()),
            department: "Fiction".to_string(),
            book_count: Some(copies),
            cover_image: None,
        })
        .await
        .unwrap()
}

pub async fn add_user(repository: &Repository, id: &str) {
    repository
        .users
        .create(&NewUser {
            id: id.to_string(),
            name: format!("User {}", id),
            email: format!("{}@example.org", id),
            role: Role::User,
            password_hash: "hash".to_string(),
        })
        .await
        .unwrap();
}
