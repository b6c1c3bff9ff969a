use once_cell::sync::Lazy;

pub static RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime")
});

/// Installs the `env_logger` backend for the `log` facade. `RUST_LOG` wins
/// over the default `info` level; calling this twice is harmless.
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    let _ = env_logger::Builder::from_env(env).format_timestamp_millis().try_init();
}

pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_keeps_scheme_and_defaults_to_https() {
        assert_eq!(normalize_url(" http://localhost:8080/api "), "http://localhost:8080/api");
        assert_eq!(normalize_url("cobuild.example.org/api"), "https://cobuild.example.org/api");
    }
}
