// src/services/payment.rs
//
// Card payment simulator. There is no gateway behind it: test mode approves
// the well-known test numbers and live mode only runs the local checks.

use crate::{
    errors::{AppError, AppResult},
    models::{CardPaymentRequest, CardPaymentResult, PaymentMode},
};
use chrono::{Datelike, NaiveDate};
use rand::Rng;
use rust_decimal::Decimal;
use uuid::Uuid;

const TEST_VISA: &str = "4111111111111111";

fn card_digits(card_number: &str) -> AppResult<String> {
    let invalid = || AppError::BadRequest("Invalid card number".to_string());
    if card_number
        .chars()
        .any(|c| !(c.is_ascii_digit() || c == ' ' || c == '-'))
    {
        return Err(invalid());
    }
    let digits: String = card_number.chars().filter(char::is_ascii_digit).collect();
    if !(12..=19).contains(&digits.len()) || !luhn_valid(&digits) {
        return Err(invalid());
    }
    Ok(digits)
}

/// Luhn checksum over a string of ASCII digits.
pub fn luhn_valid(digits: &str) -> bool {
    let mut sum = 0u32;
    for (i, c) in digits.chars().rev().enumerate() {
        let Some(mut digit) = c.to_digit(10) else {
            return false;
        };
        if i % 2 == 1 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }
    !digits.is_empty() && sum % 10 == 0
}

/// Expands a `YY` expiry year into the century that keeps it within 50
/// years of `current_year`. Four-digit years pass through.
fn full_expiry_year(exp_year: u32, current_year: i32) -> AppResult<i32> {
    match exp_year {
        0..=99 => {
            let century = current_year - current_year.rem_euclid(100);
            let mut year = century + exp_year as i32;
            if year + 50 < current_year {
                year += 100;
            } else if year - 50 > current_year {
                year -= 100;
            }
            Ok(year)
        }
        1000..=9999 => Ok(exp_year as i32),
        _ => Err(AppError::BadRequest("Invalid expiry year".to_string())),
    }
}

pub fn process_card_payment(
    request: CardPaymentRequest,
    live_key_configured: bool,
    today: NaiveDate,
) -> AppResult<CardPaymentResult> {
    if request.amount <= Decimal::ZERO {
        return Err(AppError::BadRequest(
            "Amount must be greater than zero".to_string(),
        ));
    }

    let digits = card_digits(&request.card_number)?;

    let cvc = request.cvc.trim();
    if !(3..=4).contains(&cvc.len()) || !cvc.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::BadRequest("Invalid CVC".to_string()));
    }

    if !(1..=12).contains(&request.exp_month) {
        return Err(AppError::BadRequest("Invalid expiry month".to_string()));
    }
    let exp_year = full_expiry_year(request.exp_year, today.year())?;
    if exp_year < today.year()
        || (exp_year == today.year() && request.exp_month < today.month())
    {
        return Err(AppError::BadRequest("Card expired".to_string()));
    }

    let test_mode =
        request.mode.unwrap_or_default() == PaymentMode::Test || !live_key_configured;
    if test_mode && !(digits.ends_with("4242") || digits == TEST_VISA) {
        return Err(AppError::BadRequest(
            "Test transaction declined (use 4242 4242 4242 4242 to approve)".to_string(),
        ));
    }

    let authorization_code = rand::thread_rng().gen_range(100_000..1_000_000).to_string();

    Ok(CardPaymentResult {
        transaction_id: format!("txn_{}", Uuid::new_v4()),
        authorization_code,
        amount: request.amount,
        currency: request.currency.unwrap_or_else(|| "CAD".to_string()),
        status: "AUTHORIZED".to_string(),
        simulated: test_mode,
        mode: if test_mode {
            PaymentMode::Test
        } else {
            PaymentMode::Live
        },
        last4: digits[digits.len() - 4..].to_string(),
    })
}
