use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoercionError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(CustomerId);

/// An authenticated session as issued by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub customer_id: CustomerId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceSnapshot {
    pub customer_id: CustomerId,
    pub amount: f64,
}

impl BalanceSnapshot {
    /// Display form used by the balance panel, e.g. `$12.50`.
    pub fn formatted_amount(&self) -> String {
        format!("${:.2}", self.amount)
    }
}

/// A transfer that has passed local coercion and may be put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransferRequest {
    pub recipient_id: CustomerId,
    pub amount: f64,
}

impl TransferRequest {
    /// Coerces raw form text into a transfer. Empty or non-numeric input is
    /// rejected rather than defaulted.
    pub fn parse(raw_recipient: &str, raw_amount: &str) -> Result<Self, CoercionError> {
        let recipient = raw_recipient.trim();
        if recipient.is_empty() {
            return Err(CoercionError::MissingRecipient);
        }
        let recipient_id = recipient
            .parse::<i64>()
            .map_err(|_| CoercionError::InvalidRecipient(recipient.to_string()))?;
        if recipient_id < 0 {
            return Err(CoercionError::InvalidRecipient(recipient.to_string()));
        }

        let amount_text = raw_amount.trim();
        if amount_text.is_empty() {
            return Err(CoercionError::MissingAmount);
        }
        let amount = amount_text
            .parse::<f64>()
            .map_err(|_| CoercionError::InvalidAmount(amount_text.to_string()))?;
        if !amount.is_finite() {
            return Err(CoercionError::InvalidAmount(amount_text.to_string()));
        }
        if amount <= 0.0 {
            return Err(CoercionError::NonPositiveAmount);
        }

        Ok(Self {
            recipient_id: CustomerId(recipient_id),
            amount,
        })
    }
}
