use std::env;

/// Credentials for the hosted media CDN. Absent settings are not an error:
/// issue creation degrades to an empty photo reference.
#[derive(Clone, Debug)]
pub struct MediaSettings {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

pub struct Config {
    pub database_url: String,
    pub frontend_origin: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    /// Shared secret gating citizen -> authority elevation. Optional so a
    /// deployment without it simply refuses elevation with a 500.
    pub authority_secret_code: Option<String>,
    pub media: Option<MediaSettings>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok(); // Load .env file

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let frontend_origin = env::var("FRONTEND_ORIGIN").expect("FRONTEND_ORIGIN must be set");
        let jwt_issuer = env::var("AUTH_JWT_ISSUER").expect("AUTH_JWT_ISSUER must be set");
        let jwt_audience = env::var("AUTH_JWT_AUDIENCE").expect("AUTH_JWT_AUDIENCE must be set");

        let authority_secret_code = env::var("AUTHORITY_SECRET_CODE").ok();

        let media = match (
            env::var("CLOUDINARY_CLOUD_NAME"),
            env::var("CLOUDINARY_API_KEY"),
            env::var("CLOUDINARY_API_SECRET"),
        ) {
            (Ok(cloud_name), Ok(api_key), Ok(api_secret)) => Some(MediaSettings {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        Config {
            database_url,
            frontend_origin,
            jwt_issuer,
            jwt_audience,
            authority_secret_code,
            media,
        }
    }
}
