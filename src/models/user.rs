use serde::{Deserialize, Serialize};

/// The public view of an account, as returned by the auth procedures and held
/// in the client-side auth store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct User {
    pub id: String,
    pub username: String,
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        User {
            id: id.into(),
            username: username.into(),
        }
    }
}
