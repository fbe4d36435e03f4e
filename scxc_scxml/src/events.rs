//! Event descriptors of transitions.
//!
//! A descriptor is a dotted name such as `error.send`, optionally terminated by `.*`,
//! or the wildcard `*`.
//! Descriptors match events by token prefix:
//! `error` matches `error`, `error.send` and `error.send.failed`, but not `errors`.

const WILDCARD: &str = "*";

fn tokens(descriptor: &str) -> impl Iterator<Item = &str> {
    descriptor
        .strip_suffix(".*")
        .unwrap_or(descriptor)
        .trim_end_matches('.')
        .split('.')
}

/// Whether `token` is a syntactically valid descriptor.
pub fn is_valid_descriptor(token: &str) -> bool {
    if token == WILDCARD {
        return true;
    }
    let name = token.strip_suffix(".*").unwrap_or(token);
    !name.is_empty()
        && name.split('.').all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | ':'))
        })
}

/// Whether `descriptor` matches the event named `event`.
pub fn matches(descriptor: &str, event: &str) -> bool {
    if descriptor == WILDCARD {
        return true;
    }
    let mut event = tokens(event);
    tokens(descriptor).all(|token| event.next() == Some(token))
}

/// Whether some event is matched by both descriptors.
pub fn overlap(a: &str, b: &str) -> bool {
    matches(a, b) || matches(b, a)
}
