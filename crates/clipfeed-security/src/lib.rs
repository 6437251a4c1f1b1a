//! Per-IP rate limiting (C3, §4.3) and the credential cookie vault (C12,
//! §4.12).

mod cookie_repo;
mod cookie_vault;
mod ip_extract;
mod rate_limiter;

pub use cookie_repo::{delete, load, upsert, Error as CookieRepoError};
pub use cookie_vault::CookieVault;
pub use ip_extract::{default_trusted_cidrs, extract_client_ip};
pub use rate_limiter::RateLimiter;
