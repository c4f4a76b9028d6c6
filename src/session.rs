use std::sync::RwLock;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Process-wide session state. The analysis command layer only reads the
/// authentication flag; nothing else in the core interprets the user.
#[derive(Default)]
pub struct SessionContext {
    user: RwLock<Option<User>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn login(&self, user: User) {
        *self.user.write().unwrap() = Some(user);
    }

    pub fn logout(&self) {
        *self.user.write().unwrap() = None;
    }

    pub fn current_user(&self) -> Option<User> {
        self.user.read().unwrap().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.read().unwrap().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_and_logout_toggle_the_gate() {
        let session = SessionContext::new();
        assert!(!session.is_authenticated());
        assert!(session.current_user().is_none());

        session.login(User {
            username: "inspector".into(),
            display_name: None,
        });
        assert!(session.is_authenticated());
        assert_eq!(session.current_user().unwrap().username, "inspector");

        session.logout();
        assert!(!session.is_authenticated());
    }
}
