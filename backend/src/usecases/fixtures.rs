use chrono::{Duration, Utc};
use charges::domain::{
    aggregates::charge::{Charge, NewCharge},
    value_objects::{
        charges::Metadata,
        enums::payment_methods::PaymentMethod,
        payment_details::{BoletoDetails, PaymentDetails, PixDetails},
    },
};
use rust_decimal::Decimal;
use serde_json::json;

pub const MERCHANT_ID: &str = "mer_1";
pub const OTHER_MERCHANT_ID: &str = "mer_2";
pub const CUSTOMER_ID: &str = "cus_1";

pub fn pix_charge(id: &str, merchant_id: &str) -> Charge {
    Charge::create(NewCharge {
        id: Some(id.to_string()),
        customer_id: CUSTOMER_ID.to_string(),
        merchant_id: merchant_id.to_string(),
        amount: Decimal::new(150_50, 2),
        currency: None,
        payment_method: PaymentMethod::Pix,
        description: Some("Order 42".to_string()),
        payment_details: Some(PaymentDetails::Pix(PixDetails {
            qr_code: "pix://eyJ0ZXN0Ijp0cnVlfQ==".to_string(),
            qr_code_base64: None,
            expires_at: Utc::now() + Duration::hours(24),
        })),
        metadata: None,
    })
    .unwrap()
}

pub fn overdue_boleto_charge(id: &str, merchant_id: &str) -> Charge {
    Charge::create(NewCharge {
        id: Some(id.to_string()),
        customer_id: CUSTOMER_ID.to_string(),
        merchant_id: merchant_id.to_string(),
        amount: Decimal::new(7_00, 2),
        currency: None,
        payment_method: PaymentMethod::Boleto,
        description: None,
        payment_details: Some(PaymentDetails::Boleto(BoletoDetails {
            barcode: "202401010000000700123456".to_string(),
            url: "https://boleto.example.com/view?barcode=202401010000000700123456".to_string(),
            due_date: Utc::now() - Duration::hours(1),
        })),
        metadata: None,
    })
    .unwrap()
}

pub fn paid_charge(id: &str, merchant_id: &str) -> Charge {
    let mut charge = pix_charge(id, merchant_id);
    charge.pay().unwrap();
    charge
}

pub fn idempotency_metadata(key: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("idempotencyKey".to_string(), json!(key));
    metadata
}
