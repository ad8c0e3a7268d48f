use serde::{Deserialize, Serialize};

/// Claims of the access token the external SSO hands to clients.
/// This service only verifies; issuance lives elsewhere.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}
