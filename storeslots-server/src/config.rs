pub struct Config {
    /// Postgres connection string. Without one, configurations live in memory
    /// and are lost on restart.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Key exchanged for editor tokens at `POST /api/auth/token`.
    pub admin_api_key: String,
    pub listen_addr: String,
    /// Comma-separated allowed CORS origins. If empty or "*", allows all origins (dev mode).
    pub cors_origins: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            jwt_secret: std::env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            admin_api_key: std::env::var("ADMIN_API_KEY").expect("ADMIN_API_KEY must be set"),
            listen_addr: std::env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            cors_origins: std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()),
        }
    }
}
