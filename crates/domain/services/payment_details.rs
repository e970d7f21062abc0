use std::sync::Arc;

use anyhow::{Result as AnyResult, bail};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::domain::{
    errors::ChargeError,
    services::id_generator::IdGenerator,
    value_objects::{
        charges::{BoletoRequest, CreditCardRequest, PaymentDetailsRequest, PixRequest},
        enums::{card_brands::CardBrand, payment_methods::PaymentMethod},
        money::to_minor_units,
        payment_details::{
            BoletoDetails, CreditCardDetails, MAX_INSTALLMENTS, MIN_INSTALLMENTS,
            PaymentDetails, PixDetails,
        },
        timestamps::at_storage_precision,
    },
};

pub const PIX_SCHEME: &str = "pix://";
pub const DEFAULT_BOLETO_BASE_URL: &str = "https://boleto.example.com/view";
pub const DEFAULT_PIX_EXPIRATION_HOURS: i64 = 24;
pub const DEFAULT_BOLETO_DUE_HOURS: i64 = 72;
const BOLETO_AMOUNT_WIDTH: usize = 10;
const BOLETO_SUFFIX_RANGE: u32 = 1_000_000;

#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub pix_expiration: Duration,
    pub boleto_due: Duration,
    pub boleto_base_url: Url,
}

impl GeneratorSettings {
    pub fn new(pix_expiration_hours: i64, boleto_due_hours: i64, boleto_base_url: Url) -> Self {
        Self {
            pix_expiration: Duration::hours(pix_expiration_hours),
            boleto_due: Duration::hours(boleto_due_hours),
            boleto_base_url,
        }
    }
}

impl GeneratorSettings {
    /// 24h PIX expiry, 72h boleto due date and the placeholder boleto viewer.
    pub fn with_defaults() -> AnyResult<Self> {
        Ok(Self::new(
            DEFAULT_PIX_EXPIRATION_HOURS,
            DEFAULT_BOLETO_DUE_HOURS,
            Url::parse(DEFAULT_BOLETO_BASE_URL)?,
        ))
    }
}

/// Charge inputs the generator needs.
#[derive(Debug, Clone, Copy)]
pub struct DetailRequest<'a> {
    pub payment_method: PaymentMethod,
    pub amount: Decimal,
    pub customer_id: &'a str,
    pub merchant_id: &'a str,
    pub description: Option<&'a str>,
    pub details: Option<&'a PaymentDetailsRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PixPayload<'a> {
    merchant_key: &'a str,
    amount: String,
    description: String,
    transaction_id: String,
}

/// Synthesizes the method-specific artifacts of a new charge. Nothing here
/// talks to a payment network.
pub struct PaymentDetailGenerator {
    settings: GeneratorSettings,
    id_generator: Arc<dyn IdGenerator>,
}

impl PaymentDetailGenerator {
    pub fn new(settings: GeneratorSettings, id_generator: Arc<dyn IdGenerator>) -> Self {
        Self {
            settings,
            id_generator,
        }
    }

    pub fn generate(&self, request: &DetailRequest<'_>) -> Result<PaymentDetails, ChargeError> {
        let details = request.details;
        match request.payment_method {
            PaymentMethod::Pix => self.pix(request, details.and_then(|d| d.pix.as_ref())),
            PaymentMethod::CreditCard => {
                Self::credit_card(details.and_then(|d| d.credit_card.as_ref()))
            }
            PaymentMethod::Boleto => {
                self.boleto(request, details.and_then(|d| d.boleto.as_ref()))
            }
        }
    }

    fn pix(
        &self,
        request: &DetailRequest<'_>,
        pix: Option<&PixRequest>,
    ) -> Result<PaymentDetails, ChargeError> {
        let expires_at = at_storage_precision(
            pix.and_then(|pix| pix.expires_at)
                .unwrap_or_else(|| Utc::now() + self.settings.pix_expiration),
        );

        let payload = PixPayload {
            merchant_key: request.merchant_id,
            amount: request.amount.to_string(),
            description: request
                .description
                .map(str::to_string)
                .unwrap_or_else(|| format!("Payment from customer {}", request.customer_id)),
            transaction_id: self.id_generator.next_id(),
        };
        let encoded = serde_json::to_vec(&payload).map_err(anyhow::Error::from)?;
        let qr_code = format!("{PIX_SCHEME}{}", STANDARD.encode(encoded));

        let qr_code_base64 = match render_qr_placeholder(&qr_code) {
            Ok(image) => Some(image),
            Err(err) => {
                warn!(error = ?err, "payment_details: qr image rendering failed, continuing without it");
                None
            }
        };

        debug!(
            transaction_id = %payload.transaction_id,
            %expires_at,
            "payment_details: pix artifacts generated"
        );

        Ok(PaymentDetails::Pix(PixDetails {
            qr_code,
            qr_code_base64,
            expires_at,
        }))
    }

    fn credit_card(card: Option<&CreditCardRequest>) -> Result<PaymentDetails, ChargeError> {
        let card = card.ok_or_else(|| ChargeError::validation("credit card details are required"))?;

        let digits = normalize_card_number(&card.number)?;
        if !luhn_check(&digits) {
            return Err(ChargeError::validation(
                "invalid card number (Luhn check failed)",
            ));
        }

        if card.holder_name.trim().is_empty() {
            return Err(ChargeError::validation("card holder name is required"));
        }

        let installments = card.installments.unwrap_or(MIN_INSTALLMENTS);
        if !(MIN_INSTALLMENTS..=MAX_INSTALLMENTS).contains(&installments) {
            return Err(ChargeError::validation(format!(
                "installments must be between {MIN_INSTALLMENTS} and {MAX_INSTALLMENTS}"
            )));
        }

        let brand = CardBrand::from_card_number(&digits);
        let last_four_digits = digits[digits.len() - 4..].to_string();

        Ok(PaymentDetails::CreditCard(CreditCardDetails {
            last_four_digits,
            brand,
            holder_name: card.holder_name.trim().to_string(),
            installments,
        }))
    }

    fn boleto(
        &self,
        request: &DetailRequest<'_>,
        boleto: Option<&BoletoRequest>,
    ) -> Result<PaymentDetails, ChargeError> {
        let due_date = at_storage_precision(
            boleto
                .and_then(|boleto| boleto.due_date)
                .unwrap_or_else(|| Utc::now() + self.settings.boleto_due),
        );

        let suffix = rand::thread_rng().gen_range(0..BOLETO_SUFFIX_RANGE);
        let barcode = boleto_barcode(request.amount, due_date, suffix)?;

        let mut url = self.settings.boleto_base_url.clone();
        url.query_pairs_mut().append_pair("barcode", &barcode);

        Ok(PaymentDetails::Boleto(BoletoDetails {
            barcode,
            url: url.to_string(),
            due_date,
        }))
    }
}

/// Strips whitespace and checks the 13–19 digit shape of a card number.
pub fn normalize_card_number(raw: &str) -> Result<String, ChargeError> {
    let digits: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if !(13..=19).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ChargeError::validation("invalid card number"));
    }
    Ok(digits)
}

/// Luhn mod-10 check over an all-digit string.
pub fn luhn_check(digits: &str) -> bool {
    let mut sum = 0u32;
    for (position, c) in digits.chars().rev().enumerate() {
        let Some(mut digit) = c.to_digit(10) else {
            return false;
        };
        if position % 2 == 1 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }
    !digits.is_empty() && sum % 10 == 0
}

/// `YYYYMMDD` of the due date, the amount in cents padded to ten digits, then
/// a six digit random suffix.
fn boleto_barcode(
    amount: Decimal,
    due_date: DateTime<Utc>,
    suffix: u32,
) -> Result<String, ChargeError> {
    let minor = to_minor_units(amount)?;
    Ok(format!(
        "{}{:0width$}{:06}",
        due_date.format("%Y%m%d"),
        minor,
        suffix,
        width = BOLETO_AMOUNT_WIDTH
    ))
}

/// Decorative SVG for display next to the copy-and-paste code. Not part of
/// the PIX payload.
fn render_qr_placeholder(qr_code: &str) -> AnyResult<String> {
    if !qr_code.starts_with(PIX_SCHEME) {
        bail!("qr code is not a pix payload");
    }
    let svg = format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="256" height="256">"#,
            r##"<rect width="256" height="256" fill="#fff"/>"##,
            r#"<text x="128" y="128" font-size="12" text-anchor="middle">PIX {}</text>"#,
            "</svg>"
        ),
        qr_code.len()
    );
    Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg)))
}
