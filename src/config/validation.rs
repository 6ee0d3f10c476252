use crate::config::types::{Config, FlickrConfig, HarvestConfig, StoreConfig};
use crate::ConfigError;
use url::Url;

/// Largest page the Flickr search API will return
const MAX_PAGE_SIZE: u32 = 500;

/// Upper bound for either worker pool
const MAX_WORKERS: usize = 1000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_flickr_config(&config.flickr)?;
    validate_harvest_config(&config.harvest)?;
    validate_store_config(&config.store)?;
    Ok(())
}

/// Validates the remote source configuration
fn validate_flickr_config(config: &FlickrConfig) -> Result<(), ConfigError> {
    if config.api_key.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "api_key cannot be empty (set it in the config file or via {})",
            crate::config::API_KEY_ENV
        )));
    }

    if config.owner_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "owner_id cannot be empty".to_string(),
        ));
    }

    let endpoint = Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid endpoint: {}", e)))?;

    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "Endpoint '{}' must use http or https",
            config.endpoint
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates page range and pool sizes
fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    if config.page_size < 1 || config.page_size > MAX_PAGE_SIZE {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and {}, got {}",
            MAX_PAGE_SIZE, config.page_size
        )));
    }

    if config.first_page < 1 {
        return Err(ConfigError::Validation(format!(
            "first_page must be >= 1, got {}",
            config.first_page
        )));
    }

    if config.last_page < config.first_page {
        return Err(ConfigError::Validation(format!(
            "last_page ({}) must not be before first_page ({})",
            config.last_page, config.first_page
        )));
    }

    validate_pool_size("fetch_workers", config.fetch_workers)?;
    validate_pool_size("persist_workers", config.persist_workers)?;

    if config.persist_queue_capacity == Some(0) {
        return Err(ConfigError::Validation(
            "persist_queue_capacity must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_pool_size(name: &str, size: usize) -> Result<(), ConfigError> {
    if size < 1 || size > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "{} must be between 1 and {}, got {}",
            name, MAX_WORKERS, size
        )));
    }
    Ok(())
}

/// Validates store configuration
fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.key_prefix.is_empty() {
        return Err(ConfigError::Validation(
            "key_prefix cannot be empty".to_string(),
        ));
    }

    if config.index_name.is_empty() {
        return Err(ConfigError::Validation(
            "index_name cannot be empty".to_string(),
        ));
    }

    // Record keys and the index name share one namespace.
    if config.index_name.starts_with(&config.key_prefix) {
        return Err(ConfigError::Validation(format!(
            "index_name '{}' must not start with key_prefix '{}'",
            config.index_name, config.key_prefix
        )));
    }

    Ok(())
}
