// src/config.rs

use dotenvy::dotenv;
use std::{env, path::PathBuf};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub bcrypt_cost: u32,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub email_from_name: String,
    pub email_from_address: String,
    pub organization: OrganizationInfo,
    pub storage_dir: PathBuf,
    pub public_base_url: String,
    pub receipt_batch_size: usize,
    pub reminder_days_ahead: i64,
    pub reminder_hour_utc: u32,
    pub scheduler_enabled: bool,
    pub payment_live_key: Option<String>,
    /// Seeds an admin account on startup when no user has this email yet
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

/// Branding printed on receipts and emails
#[derive(Debug, Clone)]
pub struct OrganizationInfo {
    pub name: String,
    pub address: String,
    pub registration_number: String,
    pub contact_email: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port: u16 = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .expect("SERVER_PORT must be a valid port number");

        Self {
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port)),
            server_host,
            server_port,
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRY_HOURS must be a number"),
            bcrypt_cost: env::var("BCRYPT_COST")
                .ok()
                .map(|v| v.parse().expect("BCRYPT_COST must be a number"))
                .unwrap_or(bcrypt::DEFAULT_COST),
            smtp_host: env::var("SMTP_HOST").expect("SMTP_HOST must be set"),
            smtp_port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()
                .expect("SMTP_PORT must be a number"),
            smtp_username: env::var("SMTP_USERNAME").expect("SMTP_USERNAME must be set"),
            smtp_password: env::var("SMTP_PASSWORD").expect("SMTP_PASSWORD must be set"),
            email_from_name: env::var("EMAIL_FROM_NAME")
                .unwrap_or_else(|_| "Temple Donations".to_string()),
            email_from_address: env::var("EMAIL_FROM_ADDRESS")
                .expect("EMAIL_FROM_ADDRESS must be set"),
            organization: OrganizationInfo {
                name: env::var("ORGANIZATION_NAME")
                    .unwrap_or_else(|_| "Halton-Peel Buddhist Cultural Society".to_string()),
                address: env::var("ORGANIZATION_ADDRESS")
                    .unwrap_or_else(|_| "[Address Line 1], [City, Province, Postal Code]".to_string()),
                registration_number: env::var("CHARITY_REGISTRATION_NUMBER")
                    .unwrap_or_else(|_| "[XXXXXXXXX]".to_string()),
                contact_email: env::var("ORGANIZATION_CONTACT_EMAIL")
                    .unwrap_or_else(|_| "info@temple.org".to_string()),
            },
            storage_dir: env::var("STORAGE_DIR")
                .unwrap_or_else(|_| "./storage".to_string())
                .into(),
            receipt_batch_size: env::var("RECEIPT_BATCH_SIZE")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .expect("RECEIPT_BATCH_SIZE must be a number"),
            reminder_days_ahead: env::var("REMINDER_DAYS_AHEAD")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .expect("REMINDER_DAYS_AHEAD must be a number"),
            reminder_hour_utc: env::var("REMINDER_HOUR_UTC")
                .unwrap_or_else(|_| "9".to_string())
                .parse()
                .expect("REMINDER_HOUR_UTC must be a number"),
            scheduler_enabled: env::var("SCHEDULER_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            payment_live_key: env::var("PAYMENT_LIVE_KEY").ok().filter(|k| !k.is_empty()),
            admin_email: env::var("ADMIN_EMAIL").ok().filter(|v| !v.is_empty()),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty()),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Public URL of a document stored under `storage_dir`
    pub fn file_url(&self, key: &str) -> String {
        format!("{}/files/{}", self.public_base_url.trim_end_matches('/'), key)
    }
}
