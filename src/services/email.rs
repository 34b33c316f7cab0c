use crate::{
    config::Config,
    models::{Donor, User},
};
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;
use tracing::info;

/// Where a message can reach a person, in order of preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contact {
    Email(String),
    Phone(String),
    Username(String),
    None,
}

impl Contact {
    pub fn describe(&self) -> &str {
        match self {
            Contact::Email(v) | Contact::Phone(v) | Contact::Username(v) => v,
            Contact::None => "<no contact>",
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Picks the best channel: user email, donor email, user phone, donor mobile,
/// donor landline, username.
pub fn preferred_contact(user: Option<&User>, donor: Option<&Donor>) -> Contact {
    if let Some(email) = non_empty(user.and_then(|u| u.email.as_ref()))
        .or_else(|| non_empty(donor.and_then(|d| d.email.as_ref())))
    {
        return Contact::Email(email);
    }
    if let Some(phone) = non_empty(user.and_then(|u| u.phone.as_ref()))
        .or_else(|| non_empty(donor.and_then(|d| d.mobile.as_ref())))
        .or_else(|| non_empty(donor.and_then(|d| d.landline.as_ref())))
    {
        return Contact::Phone(phone);
    }
    match non_empty(user.and_then(|u| u.username.as_ref())) {
        Some(username) => Contact::Username(username),
        None => Contact::None,
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("no delivery channel for {0:?}")]
    UnsupportedChannel(Contact),

    #[error("invalid address: {0}")]
    Address(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone)]
pub struct Outgoing {
    pub recipient_name: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, contact: &Contact, message: &Outgoing) -> Result<(), DeliveryError>;
}

/// SMTP notifier. The transport is built once and shared by every send.
#[derive(Clone)]
pub struct EmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_name: String,
    from_address: String,
}

impl EmailService {
    pub fn new(config: &Config) -> Result<Self, DeliveryError> {
        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| DeliveryError::Transport(e.to_string()))?
            .credentials(creds)
            .port(config.smtp_port)
            .build();

        Ok(Self {
            transport,
            from_name: config.email_from_name.clone(),
            from_address: config.email_from_address.clone(),
        })
    }
}

#[async_trait]
impl Notifier for EmailService {
    async fn send(&self, contact: &Contact, message: &Outgoing) -> Result<(), DeliveryError> {
        let Contact::Email(address) = contact else {
            return Err(DeliveryError::UnsupportedChannel(contact.clone()));
        };

        let from_mailbox = format!("{} <{}>", self.from_name, self.from_address)
            .parse()
            .map_err(|e: lettre::address::AddressError| DeliveryError::Address(e.to_string()))?;

        let to_mailbox = format!("{} <{}>", message.recipient_name, address)
            .parse()
            .map_err(|e: lettre::address::AddressError| DeliveryError::Address(e.to_string()))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(message.subject.clone())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(message.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(message.html.clone()),
                    ),
            )
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        info!("Email '{}' sent to {}", message.subject, address);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(email: Option<&str>, phone: Option<&str>, username: Option<&str>) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.map(str::to_string),
            phone: phone.map(str::to_string),
            username: username.map(str::to_string),
            password_hash: String::new(),
            role: UserRole::Donor,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn donor(email: Option<&str>, mobile: Option<&str>, landline: Option<&str>) -> Donor {
        Donor {
            id: Uuid::new_v4(),
            user_id: None,
            primary_donor_id: None,
            first_name: "Nimal".to_string(),
            last_name: "Perera".to_string(),
            email: email.map(str::to_string),
            mobile: mobile.map(str::to_string),
            landline: landline.map(str::to_string),
            address: "1 Main St".to_string(),
            city: "Mississauga".to_string(),
            province: "ON".to_string(),
            postal_code: "L5B 1A1".to_string(),
            country: "Canada".to_string(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn email_wins_over_phone() {
        let u = user(None, Some("905-555-0100"), Some("nimal"));
        let d = donor(Some("nimal@example.com"), None, None);
        assert_eq!(
            preferred_contact(Some(&u), Some(&d)),
            Contact::Email("nimal@example.com".to_string())
        );
    }

    #[test]
    fn falls_back_through_phones_then_username() {
        let d = donor(None, None, Some("905-555-0199"));
        assert_eq!(
            preferred_contact(None, Some(&d)),
            Contact::Phone("905-555-0199".to_string())
        );

        let u = user(Some("  "), None, Some("nimal"));
        assert_eq!(
            preferred_contact(Some(&u), None),
            Contact::Username("nimal".to_string())
        );
        assert_eq!(preferred_contact(None, None), Contact::None);
    }
}
