//! # Subjects
//!
//! Dot-separated tokens. Subscriptions may use `*` for exactly one token and
//! a trailing `>` for one or more tokens; published subjects may not.

use crate::BusError;

const SINGLE: &str = "*";
const TAIL: &str = ">";

fn check_tokens(subject: &str) -> Result<(), BusError> {
    let invalid = subject.is_empty()
        || subject.chars().any(char::is_whitespace)
        || subject.split('.').any(str::is_empty);
    if invalid {
        Err(BusError::InvalidSubject(subject.to_string()))
    } else {
        Ok(())
    }
}

/// Validate a subject messages are published on.
pub fn validate_publish(subject: &str) -> Result<(), BusError> {
    check_tokens(subject)?;
    if subject.split('.').any(|t| t == SINGLE || t == TAIL) {
        return Err(BusError::InvalidSubject(subject.to_string()));
    }
    Ok(())
}

/// Validate a subscription pattern.
pub fn validate_pattern(pattern: &str) -> Result<(), BusError> {
    check_tokens(pattern)?;
    let tokens: Vec<&str> = pattern.split('.').collect();
    let misplaced_tail = tokens
        .iter()
        .enumerate()
        .any(|(i, t)| *t == TAIL && i + 1 != tokens.len());
    if misplaced_tail {
        return Err(BusError::InvalidSubject(pattern.to_string()));
    }
    Ok(())
}

/// Whether `subject` is matched by `pattern`.
pub fn matches(pattern: &str, subject: &str) -> bool {
    let mut subject_tokens = subject.split('.');
    for token in pattern.split('.') {
        match (token, subject_tokens.next()) {
            (TAIL, Some(_)) => return true,
            (SINGLE, Some(_)) => {}
            (literal, Some(s)) if literal == s => {}
            _ => return false,
        }
    }
    subject_tokens.next().is_none()
}
