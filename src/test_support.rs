//! Shared fixtures for unit and router tests.

use crate::{
    auth::generate_token,
    config::{Config, OrganizationInfo},
    errors::{AppError, AppResult},
    models::{DonationCause, Donor, NewDonor, NewUser, User, UserRole},
    services::{
        email::{Contact, DeliveryError, Notifier, Outgoing},
        storage::DocumentStore,
    },
    state::AppState,
    store::{Store, memory::MemoryStore},
};
use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret";

pub fn test_config() -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 3000,
        database_url: "postgres://unused".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiry_hours: 1,
        bcrypt_cost: 4,
        smtp_host: "localhost".to_string(),
        smtp_port: 587,
        smtp_username: String::new(),
        smtp_password: String::new(),
        email_from_name: "Temple Donations".to_string(),
        email_from_address: "donations@temple.org".to_string(),
        organization: OrganizationInfo {
            name: "Halton-Peel Buddhist Cultural Society".to_string(),
            address: "1 Temple Rd, Mississauga, ON".to_string(),
            registration_number: "123456789RR0001".to_string(),
            contact_email: "info@temple.org".to_string(),
        },
        storage_dir: "./storage".into(),
        public_base_url: "http://files.test".to_string(),
        receipt_batch_size: 2,
        reminder_days_ahead: 7,
        reminder_hour_utc: 9,
        scheduler_enabled: false,
        payment_live_key: None,
        admin_email: None,
        admin_password: None,
    }
}

// ─── Notifier ─────────────────────────────────────────────────────────────────

/// Records delivered messages. Like SMTP it only accepts email contacts.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Contact, Outgoing)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn email_only() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(Contact, Outgoing)> {
        self.sent.lock().unwrap().clone()
    }

    /// Waits for spawned deliveries to land.
    pub async fn wait_for(&self, count: usize) -> Vec<(Contact, Outgoing)> {
        for _ in 0..100 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.sent()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, contact: &Contact, message: &Outgoing) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Transport("connection refused".to_string()));
        }
        if !matches!(contact, Contact::Email(_)) {
            return Err(DeliveryError::UnsupportedChannel(contact.clone()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((contact.clone(), message.clone()));
        Ok(())
    }
}

// ─── Documents ────────────────────────────────────────────────────────────────

/// Keeps documents in memory; keys containing `fail_on` are refused.
#[derive(Default)]
pub struct MemoryDocuments {
    files: Mutex<HashMap<String, Vec<u8>>>,
    fail_on: Mutex<Option<String>>,
}

impl MemoryDocuments {
    pub fn fail_on(&self, fragment: &str) {
        *self.fail_on.lock().unwrap() = Some(fragment.to_string());
    }

    pub fn heal(&self) {
        *self.fail_on.lock().unwrap() = None;
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocuments {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> AppResult<()> {
        if let Some(fragment) = self.fail_on.lock().unwrap().as_deref() {
            if key.contains(fragment) {
                return Err(AppError::Storage(format!("refusing {}", key)));
            }
        }
        self.files.lock().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.files.lock().unwrap().remove(key);
        Ok(())
    }
}

// ─── App ──────────────────────────────────────────────────────────────────────

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub documents: Arc<MemoryDocuments>,
}

pub fn test_app() -> TestApp {
    test_app_with(RecordingNotifier::email_only())
}

pub fn test_app_with(notifier: RecordingNotifier) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(notifier);
    let documents = Arc::new(MemoryDocuments::default());
    let state = AppState::new(
        store.clone(),
        test_config(),
        notifier.clone(),
        documents.clone(),
    );
    TestApp {
        state,
        store,
        notifier,
        documents,
    }
}

pub fn sample_donor() -> Donor {
    Donor {
        id: Uuid::new_v4(),
        user_id: None,
        primary_donor_id: None,
        first_name: "Nimal".to_string(),
        last_name: "Perera".to_string(),
        email: Some("nimal@example.com".to_string()),
        mobile: None,
        landline: None,
        address: "12 Lotus Ave".to_string(),
        city: "Mississauga".to_string(),
        province: "ON".to_string(),
        postal_code: "L5B 1A1".to_string(),
        country: "Canada".to_string(),
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn new_donor(first_name: &str, email: Option<String>, active: bool) -> NewDonor {
    NewDonor {
        user_id: None,
        primary_donor_id: None,
        first_name: first_name.to_string(),
        last_name: "Perera".to_string(),
        email,
        mobile: None,
        landline: None,
        address: "12 Lotus Ave".to_string(),
        city: "Mississauga".to_string(),
        province: "ON".to_string(),
        postal_code: "L5B 1A1".to_string(),
        country: "Canada".to_string(),
        is_active: active,
    }
}

impl TestApp {
    /// A donor account with a linked profile.
    pub async fn donor(&self, first_name: &str, approved: bool) -> (User, Donor) {
        let email = format!("{}-{}@example.com", first_name.to_lowercase(), Uuid::new_v4());
        let user = NewUser {
            email: Some(email.clone()),
            phone: None,
            username: None,
            password_hash: bcrypt::hash("password123", 4).unwrap(),
            role: UserRole::Donor,
            is_active: approved,
        };
        self.store
            .create_user_with_donor(user, new_donor(first_name, Some(email), approved))
            .await
            .unwrap()
    }

    /// A donor profile with no login, as staff would create it.
    pub async fn offline_donor(&self, first_name: &str) -> Donor {
        self.store
            .insert_donor(new_donor(first_name, None, true))
            .await
            .unwrap()
    }

    pub async fn staff(&self, role: UserRole) -> User {
        self.store
            .create_user(NewUser {
                email: Some(format!("staff-{}@temple.org", Uuid::new_v4())),
                phone: None,
                username: None,
                password_hash: bcrypt::hash("password123", 4).unwrap(),
                role,
                is_active: true,
            })
            .await
            .unwrap()
    }

    pub fn token(&self, user: &User) -> String {
        generate_token(user.id, user.role, JWT_SECRET, 1).unwrap()
    }

    pub fn cause(&self, name: &str) -> DonationCause {
        self.store.add_cause(name, true)
    }
}
