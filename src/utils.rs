//! Shared helpers and constants will live here.

use chrono::Utc;

pub const APP_NAME: &str = "ledgerfeed_backend";

pub fn now_utc_iso() -> String {
    Utc::now().to_rfc3339()
}

pub fn print_banner() {
    println!("{} v{}", APP_NAME, env!("CARGO_PKG_VERSION"));
}
