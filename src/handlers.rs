pub mod admin;
pub mod analytics;
pub mod auth;
pub mod bank_accounts;
pub mod bank_statements;
pub mod categories;
pub mod goals;
pub mod health;
pub mod insights;
pub mod notifications;
pub mod transactions;
pub mod users;
