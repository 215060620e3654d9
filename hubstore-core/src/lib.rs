pub mod config;
pub mod core_store;
pub mod logging;
pub mod metrics;

pub mod test_utils;

pub use config::Config;
pub use core_store::{StoreError, StoreResult, StoreSet};
pub use logging::{init_logging, LogLevel};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Ensure the main exports are accessible
        let _ = LogLevel::Info;
        assert!(Config::default().validate().is_ok());
    }
}
