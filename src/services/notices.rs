//! Subjects and HTML bodies of the mails sent to patrons and staff

use chrono::{DateTime, Utc};

use crate::models::{
    book::Book,
    loan::{Loan, OverdueLoan},
    user::User,
};

const SIGNATURE: &str = "<p>Best regards,<br>Library Management System Team</p>";

const CELL: &str = "padding: 10px; border: 1px solid #e5e7eb;";

/// A rendered mail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub subject: String,
    pub body: String,
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn day(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn account_created(user: &User, password: &str) -> Notice {
    Notice {
        subject: "Your Library Management System Account".to_string(),
        body: format!(
            "<h2>Welcome to Library Management System</h2>\
             <p>Dear {name},</p>\
             <p>Your account has been created successfully. Here are your login credentials:</p>\
             <ul>\
             <li><strong>User ID:</strong> {id}</li>\
             <li><strong>Password:</strong> {password}</li>\
             </ul>\
             <p>Please change your password after your first login for security purposes.</p>\
             {SIGNATURE}",
            name = escape(&user.name),
            id = escape(&user.id),
            password = escape(password),
        ),
    }
}

pub fn password_updated(user: &User, password: &str) -> Notice {
    Notice {
        subject: "Your Library Management System Password Has Been Updated".to_string(),
        body: format!(
            "<h2>Password Update Notification</h2>\
             <p>Dear {name},</p>\
             <p>Your password has been updated by the administrator. Here are your new login credentials:</p>\
             <ul>\
             <li><strong>User ID:</strong> {id}</li>\
             <li><strong>New Password:</strong> {password}</li>\
             </ul>\
             <p>Please change your password after your next login for security purposes.</p>\
             {SIGNATURE}",
            name = escape(&user.name),
            id = escape(&user.id),
            password = escape(password),
        ),
    }
}

pub fn book_added(book: &Book) -> Notice {
    Notice {
        subject: "New Book Added to Library".to_string(),
        body: format!(
            "<h2>New Book Added</h2>\
             <p>A new book has been added to the library:</p>\
             <ul>\
             <li><strong>Title:</strong> {title}</li>\
             <li><strong>Author:</strong> {author}</li>\
             <li><strong>ISBN:</strong> {isbn}</li>\
             <li><strong>Department:</strong> {department}</li>\
             <li><strong>Copies:</strong> {copies}</li>\
             </ul>",
            title = escape(&book.title),
            author = escape(&book.author),
            isbn = escape(&book.isbn),
            department = escape(&book.department),
            copies = book.book_count,
        ),
    }
}

pub fn loan_confirmation(user: &User, loan: &Loan) -> Notice {
    Notice {
        subject: "Book Borrowed Successfully".to_string(),
        body: format!(
            "<h2>Book Borrowed</h2>\
             <p>Dear {name},</p>\
             <p>You have successfully borrowed the following book:</p>\
             <ul>\
             <li><strong>Title:</strong> {title}</li>\
             <li><strong>Author:</strong> {author}</li>\
             <li><strong>ISBN:</strong> {isbn}</li>\
             <li><strong>Return Date:</strong> {due}</li>\
             </ul>\
             <p>Please return the book by the specified return date.</p>\
             {SIGNATURE}",
            name = escape(&user.name),
            title = escape(&loan.book_title),
            author = escape(&loan.author),
            isbn = escape(&loan.isbn),
            due = day(loan.due_date),
        ),
    }
}

/// Includes a penalty section when the loan came back late
pub fn return_confirmation(user: &User, loan: &Loan) -> Notice {
    let returned = loan.returned_date.map(day).unwrap_or_default();
    let mut body = format!(
        "<h2>Book Returned</h2>\
         <p>Dear {name},</p>\
         <p>The following book has been marked as returned:</p>\
         <ul>\
         <li><strong>Title:</strong> {title}</li>\
         <li><strong>Author:</strong> {author}</li>\
         <li><strong>ISBN:</strong> {isbn}</li>\
         <li><strong>Due Date:</strong> {due}</li>\
         <li><strong>Returned Date:</strong> {returned}</li>\
         </ul>",
        name = escape(&user.name),
        title = escape(&loan.book_title),
        author = escape(&loan.author),
        isbn = escape(&loan.isbn),
        due = day(loan.due_date),
    );

    if let Some(penalty) = loan.penalty_amount.filter(|p| !p.is_zero()) {
        body.push_str(&format!(
            "<p><strong>Late Return Penalty:</strong></p>\
             <ul>\
             <li>Days Late: {days}</li>\
             <li>Penalty Amount: Rs. {penalty}</li>\
             </ul>\
             <p>Please pay the penalty amount at the library counter.</p>",
            days = loan.days_late.unwrap_or_default(),
        ));
    }

    body.push_str("<p>Thank you for returning the book!</p>");
    body.push_str(SIGNATURE);

    Notice {
        subject: "Book Returned Successfully".to_string(),
        body,
    }
}

/// One consolidated reminder covering every overdue loan of a user
pub fn overdue_reminder(user: &User, loans: &[OverdueLoan]) -> Notice {
    let mut body = format!(
        "<h2>Overdue Books Alert</h2>\
         <p>Dear {name},</p>\
         <p>This is a reminder that you have the following overdue books:</p>\
         <table style=\"width: 100%; border-collapse: collapse; margin: 20px 0;\">\
         <tr style=\"background-color: #f3f4f6;\">\
         <th style=\"{CELL} text-align: left;\">Book Title</th>\
         <th style=\"{CELL} text-align: left;\">Due Date</th>\
         <th style=\"{CELL} text-align: left;\">Days Overdue</th>\
         <th style=\"{CELL} text-align: left;\">Estimated Penalty</th>\
         </tr>",
        name = escape(&user.name),
    );

    for overdue in loans {
        body.push_str(&format!(
            "<tr>\
             <td style=\"{CELL}\">{title}</td>\
             <td style=\"{CELL}\">{due}</td>\
             <td style=\"{CELL}\">{days} days</td>\
             <td style=\"{CELL}\">Rs. {penalty}</td>\
             </tr>",
            title = escape(&overdue.loan.book_title),
            due = day(overdue.loan.due_date),
            days = overdue.days_overdue,
            penalty = overdue.estimated_penalty,
        ));
    }

    body.push_str(
        "</table>\
         <p><strong>Please return these books as soon as possible to avoid additional penalties.</strong></p>\
         <p>If you have already returned the books, please ignore this email.</p>",
    );
    body.push_str(SIGNATURE);

    Notice {
        subject: "Overdue Books Alert - Library Management System".to_string(),
        body,
    }
}
