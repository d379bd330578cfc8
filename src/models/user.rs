/// A user as seen after a successful credential check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserAccount {
    /// The user's unique login.
    pub login: String,
}

/// The role given to accounts created through sign-up.
pub const DEFAULT_ROLE: &str = "user";
