use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendConfig,
    pub storage: StorageConfig,
}

/// Connection settings for the hosted backend service
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub url: String,
    pub api_key: String,
    pub request_timeout_secs: u64,
}

/// Blob storage settings for issue photo uploads
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Bucket name for uploaded files
    pub bucket: String,
    /// Prefix for publicly accessible files (e.g., "public")
    pub public_prefix: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            // Only error if it's not "file not found" - that's acceptable
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            backend: BackendConfig::from_env()?,
            storage: StorageConfig::from_env()?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig {
                url: BackendConfig::DEFAULT_URL.to_string(),
                api_key: String::new(),
                request_timeout_secs: BackendConfig::DEFAULT_REQUEST_TIMEOUT_SECS,
            },
            storage: StorageConfig {
                bucket: StorageConfig::DEFAULT_BUCKET.to_string(),
                public_prefix: StorageConfig::DEFAULT_PUBLIC_PREFIX.to_string(),
            },
        }
    }
}

impl BackendConfig {
    const DEFAULT_URL: &'static str = "http://localhost:54321";
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

    pub fn from_env() -> Result<Self, String> {
        let url = env::var("BACKEND_URL").unwrap_or_else(|_| Self::DEFAULT_URL.to_string());

        let api_key = env::var("BACKEND_API_KEY").unwrap_or_default();

        let request_timeout_secs = env::var("BACKEND_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_REQUEST_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "BACKEND_REQUEST_TIMEOUT_SECS must be a valid number".to_string())?;

        Ok(Self {
            url,
            api_key,
            request_timeout_secs,
        })
    }
}

impl StorageConfig {
    const DEFAULT_BUCKET: &'static str = "ndreqe-uploads";
    const DEFAULT_PUBLIC_PREFIX: &'static str = "public";

    pub fn from_env() -> Result<Self, String> {
        let bucket = env::var("STORAGE_BUCKET").unwrap_or_else(|_| Self::DEFAULT_BUCKET.to_string());

        let public_prefix =
            env::var("STORAGE_PUBLIC_PREFIX").unwrap_or_else(|_| Self::DEFAULT_PUBLIC_PREFIX.to_string());

        Ok(Self {
            bucket,
            public_prefix,
        })
    }

    /// Object key for an issue photo, e.g. "public/issues/<uuid>_<name>"
    pub fn issue_image_key(&self, file_name: &str) -> String {
        format!(
            "{}/issues/{}_{}",
            self.public_prefix,
            uuid::Uuid::new_v4(),
            file_name
        )
    }
}
