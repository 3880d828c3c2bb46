use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Settings for the OpenAI-compatible oracle. Absent when no API key is set.
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub food_db_path: String,
    pub daily_meal_limit: u32,
    pub oracle: Option<OracleConfig>,
}

pub const DEFAULT_DAILY_MEAL_LIMIT: u32 = 4;

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "glycemind".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "glycemind-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
        };
        let oracle = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(|api_key| OracleConfig {
                api_key,
                base_url: std::env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
                model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".into()),
                timeout_secs: std::env::var("OPENAI_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(30),
            });
        Ok(Self {
            database_url,
            jwt,
            food_db_path: std::env::var("FOOD_DB_PATH").unwrap_or_else(|_| "data/foods.json".into()),
            daily_meal_limit: std::env::var("DAILY_MEAL_LIMIT")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(DEFAULT_DAILY_MEAL_LIMIT),
            oracle,
        })
    }
}
