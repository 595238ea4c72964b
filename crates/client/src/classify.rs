//! Classification of mutation failures
//!
//! The upstream reports edit/delete failures in several inconsistent shapes.
//! This module maps the known ones onto stable soft failures; anything it
//! does not recognize is re-raised unmodified for the caller to treat as
//! unexpected.
//!
//! Matching free-text server messages is inherently fragile, so the match
//! patterns live here as configuration data — updating them never touches
//! dispatch logic.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::errors::{ClientError, Result};
use crate::outcome::Outcome;

/// Which mutation produced the failure; delete activates the conflict rule
/// and selects the delete-flavored not-found pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MutationKind {
    Edit,
    Delete,
}

/// Fixed message returned when deletion is blocked by associated entities.
pub(crate) const ASSOCIATED_CAMPAIGNS_CONFLICT: &str =
    "Cannot delete this advertiser. It has one or more associated campaigns";

/// Fixed message for a downgraded not-found condition.
pub(crate) const NOT_FOUND_MESSAGE: &str = "Not found";

static NOT_FOUND_ON_UPDATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Could not load object .* to update").expect("valid pattern"));
static NOT_FOUND_ON_DELETE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Could not load object .* to delete").expect("valid pattern"));

/// Map a mutation failure to a soft [`Outcome`] when it matches a known
/// upstream shape, or re-raise the original error when it does not.
///
/// Rules, most specific first:
/// 1. delete only: an `errors.base` entry carrying the associated-campaigns
///    sentence yields that fixed message alone — unrelated errors in the
///    same list are not folded into it.
/// 2. a not-found message (nested or in `errors.base`) is downgraded to a
///    `Not found` soft failure unless `fail_on_not_found` re-raises it.
///    Checked before generic aggregation so an unrelated validation message
///    in the same batch never masks a not-found condition.
/// 3. HTTP 400 with leftover `errors.base` entries aggregates them.
pub(crate) fn classify_mutation_failure(
    kind: MutationKind,
    fail_on_not_found: bool,
    err: ClientError,
) -> Result<Outcome<Value>> {
    let ClientError::Status { status, body } = &err else {
        return Err(err);
    };

    let base = base_errors(body);

    if kind == MutationKind::Delete
        && base.iter().any(|m| m.contains(ASSOCIATED_CAMPAIGNS_CONFLICT))
    {
        debug!("deletion blocked by associated campaigns");
        return Ok(Outcome::failure(400, ASSOCIATED_CAMPAIGNS_CONFLICT));
    }

    let not_found = match kind {
        MutationKind::Edit => &NOT_FOUND_ON_UPDATE,
        MutationKind::Delete => &NOT_FOUND_ON_DELETE,
    };
    let not_found_hit = nested_messages(body)
        .into_iter()
        .chain(base.iter().copied())
        .any(|m| not_found.is_match(m));
    if not_found_hit {
        if fail_on_not_found {
            return Err(err);
        }
        debug!("object not found, downgraded to soft failure");
        return Ok(Outcome::failure(400, NOT_FOUND_MESSAGE));
    }

    if *status == 400 && !base.is_empty() {
        return Ok(Outcome::failure(400, format!("Error(s): {}", base.join(", "))));
    }

    Err(err)
}

/// Generic field-error list at `errors.base`.
fn base_errors(body: &Value) -> Vec<&str> {
    body.get("errors")
        .and_then(|errors| errors.get("base"))
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Free-text messages nested in the payload: `error.message`, a bare
/// `message`, or a plain-string `error`.
fn nested_messages(body: &Value) -> Vec<&str> {
    [
        body.get("error").and_then(|e| e.get("message")).and_then(Value::as_str),
        body.get("message").and_then(Value::as_str),
        body.get("error").and_then(Value::as_str),
    ]
    .into_iter()
    .flatten()
    .collect()
}
