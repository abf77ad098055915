// loyalty-core/src/rules/mod.rs
//
// Rule validation and reward computation for admin-configured validators.
// Field matching is driven by a statically enumerated table, so the set of
// match criteria is closed and exhaustively testable.

pub mod formula;

use std::collections::HashMap;

use loyalty_common::error::Error;
use loyalty_common::models::{TransactionPayload, Validator};

use formula::{Formula, FormulaError};

/// The one variable bound from the payload rather than the validator.
pub const TRANSACTION_AMOUNT_VAR: &str = "transactionAmount";

/// Check an incoming transaction against the admin's validator.
///
/// Match semantics per field in {channel, product, transactionType, unit,
/// source}: an empty/unset admin value is a wildcard; otherwise the request
/// field must contain the admin value as a case-sensitive substring.
/// `formula`, `multiplier` and `value` are reward inputs and never matched.
pub fn validate(validator: Option<&Validator>, payload: &TransactionPayload) -> Result<(), Error> {
    let v = require_validator(validator)?;
    let attrs = &payload.attributes;

    let checks: [(&str, Option<&String>, Option<&String>); 5] = [
        ("channel", v.channel.as_ref(), attrs.channel.as_ref()),
        ("product", v.product.as_ref(), attrs.product.as_ref()),
        (
            "transactionType",
            v.transaction_type.as_ref(),
            attrs.transaction_type.as_ref(),
        ),
        ("unit", v.unit.as_ref(), attrs.unit.as_ref()),
        ("source", v.source.as_ref(), attrs.source.as_ref()),
    ];

    for (field, admin, request) in checks {
        let Some(admin) = admin.filter(|s| !s.is_empty()) else {
            continue;
        };
        let request = request.map(String::as_str).unwrap_or("");
        if !request.contains(admin.as_str()) {
            return Err(Error::validation(
                field,
                format!("'{request}' on this transaction is not valid to use this"),
            ));
        }
    }

    if let Some(min) = v.minimal_transaction.as_deref().filter(|s| !s.is_empty()) {
        let threshold: f64 = min.parse().map_err(|_| {
            Error::validation("minimalTransaction", format!("'{min}' is not a number"))
        })?;
        if payload.transaction_amount < threshold {
            return Err(Error::validation(
                "transactionAmount",
                format!(
                    "amount {} is below the minimum transaction of {}",
                    payload.transaction_amount, threshold
                ),
            ));
        }
    }

    Ok(())
}

/// Evaluate the validator's formula for this payload.
///
/// `transactionAmount` is bound from the payload; every other identifier in
/// the formula must resolve through the validator's numeric field table.
pub fn formula_result(v: &Validator, payload: &TransactionPayload) -> Result<f64, Error> {
    let Some(src) = v.formula.as_deref().filter(|s| !s.is_empty()) else {
        return Err(Error::Unavailable(
            "validator has no formula configured".to_string(),
        ));
    };

    let parsed = Formula::parse(src)?;

    let mut scope = HashMap::new();
    scope.insert(
        TRANSACTION_AMOUNT_VAR.to_string(),
        payload.transaction_amount,
    );
    for name in parsed.variables() {
        if name == TRANSACTION_AMOUNT_VAR {
            continue;
        }
        let value = v
            .numeric_field(name)
            .ok_or_else(|| FormulaError::UnknownVariable(name.to_string()))?;
        scope.insert(name.to_string(), value);
    }

    Ok(parsed.eval(&scope)?)
}

/// Compute the reward for an already-validated payload. Which source drives
/// the number is configuration: the formula when one is set, else the
/// multiplier applied to the amount, else the flat value.
pub fn compute_reward(v: &Validator, payload: &TransactionPayload) -> Result<f64, Error> {
    if v.formula.as_deref().is_some_and(|s| !s.is_empty()) {
        return formula_result(v, payload);
    }
    if let Some(multiplier) = v.multiplier {
        return Ok(multiplier * payload.transaction_amount);
    }
    if let Some(value) = v.value {
        return Ok(value as f64);
    }
    Err(Error::validation(
        "validator",
        "no reward source (formula, multiplier or value) is configured",
    ))
}

/// Full transaction validation: rule matching, then reward computation.
pub fn validate_transaction(
    validator: Option<&Validator>,
    payload: &TransactionPayload,
) -> Result<f64, Error> {
    validate(validator, payload)?;
    let v = require_validator(validator)?;
    compute_reward(v, payload)
}

fn require_validator(validator: Option<&Validator>) -> Result<&Validator, Error> {
    validator.ok_or_else(|| Error::Unavailable("validator is not configured".to_string()))
}
