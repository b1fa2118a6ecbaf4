use serde::{Deserialize, Serialize};

/// Token claims minted by the hosted identity provider. Deliberately free of
/// any role information: the durable user record is the single source of
/// truth for authorization, so a stale token can never smuggle in an old
/// role.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Claims {
    /// Provider subject id, the key users are provisioned under.
    pub sub: String,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
    pub exp: usize, // expiration (as UNIX timestamp)
    pub iss: String,
    pub aud: String,
}
