use std::env;
use dotenvy::dotenv;
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,

    /// Seconds a scan token stays valid after issue.
    pub qr_token_ttl_secs: i64,
    /// Reference zone as a fixed UTC offset (WIB = +7).
    pub utc_offset_hours: i32,

    // Rate limiting
    pub rate_qr_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            qr_token_ttl_secs: env::var("QR_TOKEN_TTL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap(),
            utc_offset_hours: env::var("UTC_OFFSET_HOURS")
                .unwrap_or_else(|_| "7".to_string()) // Asia/Jakarta
                .parse()
                .unwrap(),

            rate_qr_per_min: env::var("RATE_QR_PER_MIN")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .unwrap(),
            rate_protected_per_min: env::var("RATE_PROTECTED_PER_MIN")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap(),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
        }
    }
}
