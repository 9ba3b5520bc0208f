//! KYC preconditions on settlement counter-parties
//!
//! Validation runs before any gateway call so a malformed party never
//! costs a network round trip or leaves a half-submitted payment.

use crate::{types::CustomerType, Error, Result};
use wallet_core::Counterparty;

fn require(field: Option<&String>, missing: &mut Vec<&'static str>, name: &'static str) {
    if field.map(|s| s.trim().is_empty()).unwrap_or(true) {
        missing.push(name);
    }
}

/// Validate a counter-party against the KYC rules for its customer type.
///
/// - Retail requires name, phone, country, address, dob, idNumber, idType
/// - Retail in Nigeria additionally requires additionalIdType and
///   additionalIdNumber
/// - Institution requires businessId and businessName
pub fn validate_party(customer_type: CustomerType, party: &Counterparty) -> Result<()> {
    let mut missing: Vec<&'static str> = Vec::new();

    match customer_type {
        CustomerType::Retail => {
            require(party.name.as_ref(), &mut missing, "name");
            require(party.phone.as_ref(), &mut missing, "phone");
            require(party.country.as_ref(), &mut missing, "country");
            require(party.address.as_ref(), &mut missing, "address");
            require(party.dob.as_ref(), &mut missing, "dob");
            require(party.id_number.as_ref(), &mut missing, "idNumber");
            require(party.id_type.as_ref(), &mut missing, "idType");

            if party.country.as_deref() == Some("NG") {
                require(
                    party.additional_id_type.as_ref(),
                    &mut missing,
                    "additionalIdType",
                );
                require(
                    party.additional_id_number.as_ref(),
                    &mut missing,
                    "additionalIdNumber",
                );
            }
        }
        CustomerType::Institution => {
            require(party.business_id.as_ref(), &mut missing, "businessId");
            require(party.business_name.as_ref(), &mut missing, "businessName");
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "Missing required {} party fields: {}",
            customer_type,
            missing.join(", ")
        )))
    }
}
