pub use crate::utils::database;
use crate::utils::{cache::Cache, rate_limiter::RateLimiter};
use async_trait::async_trait;
use std::env;
use std::time::Duration;

#[derive(Clone)]
pub enum AppEnvironment {
    Production,
    Development,
}

impl AppEnvironment {
    pub fn from(raw_environment: String) -> Self {
        match raw_environment.as_ref() {
            "production" => Self::Production,
            _ => Self::Development,
        }
    }
}

#[derive(Clone)]
pub struct AppContext {
    pub host: String,
    pub environment: AppEnvironment,
    pub port: u32,
    pub url: String,
}

#[derive(Clone)]
pub struct MailContext {
    pub host: String,
    pub sender_name: String,
    pub sender_email: String,
    pub user: String,
    pub password: String,
}

#[derive(Clone)]
pub struct SmsContext {
    pub api_endpoint: String,
    pub api_key: String,
    pub sender_id: String,
}

#[derive(Clone)]
pub struct GoogleContext {
    pub client_id: String,
    pub token_info_endpoint: String,
}

pub struct Context {
    pub app: AppContext,
    pub db_conn: database::DatabaseConnection,
    pub mail: MailContext,
    pub sms: SmsContext,
    pub google: GoogleContext,
    pub recommendations_cache: Cache,
    pub rate_limiter: RateLimiter,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub environment: AppEnvironment,
    pub port: u32,
    pub url: String,
}

#[derive(Clone)]
pub struct MailConfig {
    pub host: String,
    pub sender_name: String,
    pub sender_email: String,
    pub user: String,
    pub password: String,
}

#[derive(Clone)]
pub struct SmsConfig {
    pub api_endpoint: String,
    pub api_key: String,
    pub sender_id: String,
}

#[derive(Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub token_info_endpoint: String,
}

#[derive(Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub app: AppConfig,
    pub mail: MailConfig,
    pub sms: SmsConfig,
    pub google: GoogleConfig,
}

/// Recommendation responses may be served stale for up to this long.
pub const RECOMMENDATIONS_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

impl Default for Config {
    fn default() -> Self {
        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL not set");
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let environment = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u32>()
            .expect("Invalid PORT number");
        let url = env::var("URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));
        let mail_host = env::var("MAIL_HOST").expect("MAIL_HOST not set");
        let mail_sender_name = env::var("MAIL_SENDER_NAME").expect("MAIL_SENDER_NAME not set");
        let mail_sender_email = env::var("MAIL_SENDER_EMAIL").expect("MAIL_SENDER_EMAIL not set");
        let mail_user = env::var("MAIL_USER").expect("MAIL_USER not set");
        let mail_password = env::var("MAIL_PASSWORD").expect("MAIL_PASSWORD not set");
        let sms_api_endpoint = env::var("SMS_API_ENDPOINT").expect("SMS_API_ENDPOINT not set");
        let sms_api_key = env::var("SMS_API_KEY").expect("SMS_API_KEY not set");
        let sms_sender_id = env::var("SMS_SENDER_ID").expect("SMS_SENDER_ID not set");
        let google_client_id = env::var("GOOGLE_CLIENT_ID").expect("GOOGLE_CLIENT_ID not set");
        let google_token_info_endpoint = env::var("GOOGLE_TOKEN_INFO_ENDPOINT")
            .unwrap_or_else(|_| "https://oauth2.googleapis.com/tokeninfo".to_string());

        Self {
            database: DatabaseConfig { url: database_url },
            app: AppConfig {
                host,
                environment: AppEnvironment::from(environment),
                port,
                url,
            },
            mail: MailConfig {
                host: mail_host,
                sender_name: mail_sender_name,
                sender_email: mail_sender_email,
                user: mail_user,
                password: mail_password,
            },
            sms: SmsConfig {
                api_endpoint: sms_api_endpoint,
                api_key: sms_api_key,
                sender_id: sms_sender_id,
            },
            google: GoogleConfig {
                client_id: google_client_id,
                token_info_endpoint: google_token_info_endpoint,
            },
        }
    }
}

#[async_trait]
pub trait ToContext {
    async fn to_context(self) -> Context;
}

#[async_trait]
impl ToContext for Config {
    async fn to_context(self) -> Context {
        let db_conn = database::connect(self.database.url.as_str()).await;
        database::migrate(db_conn.clone()).await;

        Context {
            app: AppContext {
                host: self.app.host,
                environment: self.app.environment,
                port: self.app.port,
                url: self.app.url,
            },
            db_conn,
            mail: MailContext {
                host: self.mail.host,
                sender_name: self.mail.sender_name,
                sender_email: self.mail.sender_email,
                user: self.mail.user,
                password: self.mail.password,
            },
            sms: SmsContext {
                api_endpoint: self.sms.api_endpoint,
                api_key: self.sms.api_key,
                sender_id: self.sms.sender_id,
            },
            google: GoogleContext {
                client_id: self.google.client_id,
                token_info_endpoint: self.google.token_info_endpoint,
            },
            recommendations_cache: Cache::new(RECOMMENDATIONS_CACHE_TTL),
            rate_limiter: RateLimiter::default(),
        }
    }
}
