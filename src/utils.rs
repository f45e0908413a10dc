#[cfg(not(target_arch = "riscv64"))]
use rustls::crypto::aws_lc_rs;
#[cfg(target_arch = "riscv64")]
use rustls::crypto::ring;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "AIDANT_LOG";

pub fn setup_crypto_provider() {
    static DONE: std::sync::OnceLock<()> = std::sync::OnceLock::new();
    DONE.get_or_init(|| {
        if rustls::crypto::CryptoProvider::get_default().is_none() {
            #[cfg(target_arch = "riscv64")]
            let provider = ring::default_provider();

            #[cfg(not(target_arch = "riscv64"))]
            let provider = aws_lc_rs::default_provider();

            let _ = provider.install_default();
        }
    });
}

pub fn setup_http_client() -> reqwest::Client {
    setup_crypto_provider();
    reqwest::Client::new()
}

/// Diagnostics go to stderr, filtered by `AIDANT_LOG` (default `warn`).
/// `verbose` raises the default to `info` when the variable is unset.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "aidant=info" } else { "warn" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}

/// `$AIDANT_CONFIG_DIR`, else `$XDG_CONFIG_HOME/aidant`, else `~/.config/aidant`.
pub fn get_app_config_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("AIDANT_CONFIG_DIR").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(xdg).join("aidant"));
    }
    std::env::var_os("HOME")
        .filter(|v| !v.is_empty())
        .map(|home| PathBuf::from(home).join(".config").join("aidant"))
}
