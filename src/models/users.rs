use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    Pending,
    Verified,
    Rejected,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub wallet_address: String,
    pub balance: f64,
    pub kyc_status: KycStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub uid: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Public view of a profile.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub wallet_address: String,
    pub balance: f64,
    pub kyc_status: KycStatus,
}

impl From<User> for UserDetails {
    fn from(user: User) -> Self {
        Self {
            uid: user.uid,
            email: user.email,
            display_name: user.display_name,
            wallet_address: user.wallet_address,
            balance: user.balance,
            kyc_status: user.kyc_status,
        }
    }
}
