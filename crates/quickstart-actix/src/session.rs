use actix_session::Session;
use rand::Rng;
use subtle::ConstantTimeEq;

use quickstart_core::QuickstartError;

pub const USER_ID_KEY: &str = "userId";
pub const OAUTH_STATE_KEY: &str = "oauthState";

const OAUTH_STATE_LEN: usize = 32;

/// The signed-in user id, if any. An empty value counts as signed out.
pub fn user_id(session: &Session) -> Result<Option<String>, QuickstartError> {
    session
        .get::<String>(USER_ID_KEY)
        .map(|id| id.filter(|id| !id.is_empty()))
        .map_err(|e| QuickstartError::session(&format!("Unable to retrieve user ID: {e}")))
}

pub fn store_user_id(session: &Session, user_id: &str) -> Result<(), QuickstartError> {
    session
        .insert(USER_ID_KEY, user_id)
        .map_err(|e| QuickstartError::session(&format!("Unable to store user ID: {e}")))
}

pub fn clear_user_id(session: &Session) {
    session.remove(USER_ID_KEY);
}

pub fn store_oauth_state(session: &Session, state: &str) -> Result<(), QuickstartError> {
    session
        .insert(OAUTH_STATE_KEY, state)
        .map_err(|e| QuickstartError::session(&format!("Unable to store OAuth state: {e}")))
}

/// Read and forget the pending OAuth state. Each state is good for one callback.
pub fn take_oauth_state(session: &Session) -> Result<Option<String>, QuickstartError> {
    let state = session
        .get::<String>(OAUTH_STATE_KEY)
        .map_err(|e| QuickstartError::session(&format!("Unable to read OAuth state: {e}")))?;
    session.remove(OAUTH_STATE_KEY);
    Ok(state)
}

pub fn new_oauth_state() -> String {
    let mut rng = rand::rng();
    (0..OAUTH_STATE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..62u8);
            match idx {
                0..=25 => (b'a' + idx) as char,
                26..=51 => (b'A' + (idx - 26)) as char,
                _ => (b'0' + (idx - 52)) as char,
            }
        })
        .collect()
}

/// Constant-time comparison of the stored and returned OAuth state.
pub fn state_matches(expected: &str, provided: &str) -> bool {
    !expected.is_empty() && bool::from(expected.as_bytes().ct_eq(provided.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_states_are_alphanumeric_and_distinct() {
        let a = new_oauth_state();
        let b = new_oauth_state();
        assert_eq!(a.len(), OAUTH_STATE_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn state_comparison() {
        assert!(state_matches("abc", "abc"));
        assert!(!state_matches("abc", "abd"));
        assert!(!state_matches("abc", "ab"));
        assert!(!state_matches("", ""));
    }
}
