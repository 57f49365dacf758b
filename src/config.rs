use crate::utils::time::OrgTimeZone;
use chrono::NaiveTime;
use dotenvy::dotenv;
use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_access_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// Organization wall-clock offset, minutes east of UTC (-300 = Bogota).
    pub org_utc_offset_minutes: i32,
    /// Local time stamped on synthesized check-outs.
    pub auto_close_time: NaiveTime,

    // Managed face-recognition service
    pub face_api_url: String,
    pub face_api_key: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            access_token_ttl: env::var("ACCESS_TOKEN_TTL")
                .unwrap_or_else(|_| "900".to_string()) // default 15 min
                .parse()
                .unwrap(),
            refresh_token_ttl: env::var("REFRESH_TOKEN_TTL")
                .unwrap_or_else(|_| "604800".to_string()) // default 7 days
                .parse()
                .unwrap(),

            rate_login_per_min: env::var("RATE_LOGIN_PER_MIN")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap(),
            rate_register_per_min: env::var("RATE_REGISTER_PER_MIN")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap(),
            rate_refresh_per_min: env::var("RATE_REFRESH_PER_MIN")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap(),
            rate_access_per_min: env::var("RATE_ACCESS_PER_MIN")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .unwrap(),
            rate_protected_per_min: env::var("RATE_PROTECTED_PER_MIN")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap(),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),

            org_utc_offset_minutes: env::var("ORG_UTC_OFFSET_MINUTES")
                .unwrap_or_else(|_| "-300".to_string()) // Bogota, UTC-5
                .parse()
                .unwrap(),
            auto_close_time: NaiveTime::parse_from_str(
                &env::var("AUTO_CLOSE_TIME").unwrap_or_else(|_| "23:59:59".to_string()),
                "%H:%M:%S",
            )
            .expect("AUTO_CLOSE_TIME must be HH:MM:SS"),

            face_api_url: env::var("FACE_API_URL").expect("FACE_API_URL must be set"),
            face_api_key: env::var("FACE_API_KEY").expect("FACE_API_KEY must be set"),
        }
    }

    pub fn org_tz(&self) -> OrgTimeZone {
        OrgTimeZone::from_offset_minutes(self.org_utc_offset_minutes)
            .expect("ORG_UTC_OFFSET_MINUTES out of range")
    }
}
