use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentGatewayConfig {
    pub api_key: String,
    pub api_secret: String,
    pub webhook_secret: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub payment: PaymentGatewayConfig,
    pub cors_origin: String,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            ttl_days: std::env::var("JWT_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(7),
        };
        let payment = PaymentGatewayConfig {
            api_key: std::env::var("VISA_GATEWAY_API_KEY").unwrap_or_default(),
            api_secret: std::env::var("VISA_GATEWAY_API_SECRET").unwrap_or_default(),
            webhook_secret: std::env::var("VISA_GATEWAY_WEBHOOK_SECRET").unwrap_or_default(),
            base_url: std::env::var("VISA_GATEWAY_API_URL")
                .unwrap_or_else(|_| "https://api.visa-gateway.example.com".into()),
        };
        Ok(Self {
            database_url,
            jwt,
            payment,
            cors_origin: std::env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3001".into()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("APP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(3000),
        })
    }
}
