// src/services/notifications.rs
//
// Message templates plus the fire-and-forget dispatch used after writes.

use crate::{
    config::OrganizationInfo,
    models::{AlokaPuja, Donation, Donor},
    services::{
        email::{Contact, DeliveryError, Notifier, Outgoing},
        pdf::format_money,
    },
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Sends `message` on a background task. Delivery failures are logged and
/// never reach the caller.
pub fn dispatch(
    notifier: Arc<dyn Notifier>,
    contact: Contact,
    message: Outgoing,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match notifier.send(&contact, &message).await {
            Ok(()) => {}
            Err(DeliveryError::UnsupportedChannel(_)) => {
                warn!(
                    "No email channel for {}; '{}' not delivered",
                    contact.describe(),
                    message.subject
                );
            }
            Err(e) => {
                warn!(
                    "Failed to deliver '{}' to {}: {}",
                    message.subject,
                    contact.describe(),
                    e
                );
            }
        }
    })
}

fn wrap_html(org: &OrganizationInfo, heading: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <style>
    body {{ font-family: Arial, sans-serif; background: #f4f4f4; color: #333; }}
    .container {{ max-width: 600px; margin: 30px auto; background: #fff; border-radius: 8px; overflow: hidden; }}
    .header {{ background: #b45309; color: #fff; padding: 24px 32px; }}
    .header h1 {{ margin: 0; font-size: 22px; }}
    .body {{ padding: 24px 32px; }}
    table {{ width: 100%; border-collapse: collapse; }}
    td {{ padding: 8px 4px; border-bottom: 1px solid #f1f1f1; }}
    td:last-child {{ text-align: right; font-weight: 600; }}
    .footer {{ background: #f9fafb; padding: 16px 32px; font-size: 12px; color: #6b7280; text-align: center; }}
  </style>
</head>
<body>
<div class="container">
  <div class="header"><h1>{org_name}</h1><p>{heading}</p></div>
  <div class="body">{body}</div>
  <div class="footer"><p>Questions? Contact {contact}.</p></div>
</div>
</body>
</html>"#,
        org_name = org.name,
        heading = heading,
        body = body,
        contact = org.contact_email,
    )
}

fn greeting(donor: Option<&Donor>) -> String {
    donor
        .map(|d| d.first_name.clone())
        .unwrap_or_else(|| "Friend".to_string())
}

fn donation_rows(donation: &Donation, cause_name: &str) -> String {
    format!(
        "<table>\
           <tr><td>Cause</td><td>{cause}</td></tr>\
           <tr><td>Amount</td><td>{amount} {currency}</td></tr>\
           <tr><td>Method</td><td>{method}</td></tr>\
           <tr><td>Date</td><td>{date}</td></tr>\
         </table>",
        cause = cause_name,
        amount = format_money(donation.amount),
        currency = donation.currency.as_str(),
        method = donation.donation_type.as_str(),
        date = donation.recorded_at.format("%Y-%m-%d"),
    )
}

pub fn donation_acknowledgment(
    org: &OrganizationInfo,
    donor: Option<&Donor>,
    donation: &Donation,
    cause_name: &str,
) -> Outgoing {
    let name = greeting(donor);
    let text = format!(
        "Dear {name},\n\n\
        Thank you for your donation of {amount} {currency} to {cause}.\n\
        Our team will confirm it shortly.\n\n\
        {org}",
        name = name,
        amount = format_money(donation.amount),
        currency = donation.currency.as_str(),
        cause = cause_name,
        org = org.name,
    );
    let body = format!(
        "<p>Dear <strong>{}</strong>,</p><p>Thank you for your generous donation. \
         Our team will confirm it shortly.</p>{}",
        name,
        donation_rows(donation, cause_name)
    );
    Outgoing {
        recipient_name: donor.map(Donor::full_name).unwrap_or_else(|| name.clone()),
        subject: format!("Thank you for your donation - {}", org.name),
        text,
        html: wrap_html(org, "Donation received", &body),
    }
}

pub fn donation_validated(
    org: &OrganizationInfo,
    donor: Option<&Donor>,
    donation: &Donation,
    cause_name: &str,
) -> Outgoing {
    let name = greeting(donor);
    let text = format!(
        "Dear {name},\n\n\
        Your donation of {amount} {currency} to {cause} has been verified.\n\
        It will be included in your year-end tax receipt.\n\n\
        {org}",
        name = name,
        amount = format_money(donation.amount),
        currency = donation.currency.as_str(),
        cause = cause_name,
        org = org.name,
    );
    let body = format!(
        "<p>Dear <strong>{}</strong>,</p><p>Your donation has been verified and will be \
         included in your year-end tax receipt.</p>{}",
        name,
        donation_rows(donation, cause_name)
    );
    Outgoing {
        recipient_name: donor.map(Donor::full_name).unwrap_or_else(|| name.clone()),
        subject: format!("Your donation has been verified - {}", org.name),
        text,
        html: wrap_html(org, "Donation verified", &body),
    }
}

pub fn account_approved(org: &OrganizationInfo, donor: Option<&Donor>) -> Outgoing {
    let name = greeting(donor);
    Outgoing {
        recipient_name: donor.map(Donor::full_name).unwrap_or_else(|| name.clone()),
        subject: format!("Your account has been approved - {}", org.name),
        text: format!(
            "Dear {},\n\nYour donor account has been approved. You can now log in \
             to record donations and book Aloka Puja.\n\n{}",
            name, org.name
        ),
        html: wrap_html(
            org,
            "Account approved",
            &format!(
                "<p>Dear <strong>{}</strong>,</p><p>Your donor account has been approved. \
                 You can now log in to record donations and book Aloka Puja.</p>",
                name
            ),
        ),
    }
}

pub fn puja_reminder(org: &OrganizationInfo, donor: &Donor, puja: &AlokaPuja) -> Outgoing {
    let date = puja.puja_date.format("%A, %B %-d, %Y");
    let remembered: Vec<String> = puja
        .remembered_persons
        .iter()
        .map(|p| match &p.relationship {
            Some(rel) => format!("{} {} ({})", p.first_name, p.last_name, rel),
            None => format!("{} {}", p.first_name, p.last_name),
        })
        .collect();

    let mut text = format!(
        "Dear {},\n\nThis is a reminder of your {} booking on {}.\n",
        donor.first_name, puja.puja_type, date
    );
    let mut body = format!(
        "<p>Dear <strong>{}</strong>,</p><p>This is a reminder of your <strong>{}</strong> \
         booking on <strong>{}</strong>.</p>",
        donor.first_name, puja.puja_type, date
    );
    if !remembered.is_empty() {
        text.push_str(&format!("In memory of: {}\n", remembered.join(", ")));
        body.push_str(&format!("<p>In memory of: {}</p>", remembered.join(", ")));
    }
    text.push_str(&format!("\n{}", org.name));

    Outgoing {
        recipient_name: donor.full_name(),
        subject: format!("Reminder: {} on {}", puja.puja_type, puja.puja_date.format("%Y-%m-%d")),
        text,
        html: wrap_html(org, "Aloka Puja reminder", &body),
    }
}
