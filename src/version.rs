// Version information for the Confidential Bridge

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-confidential-bridge-2025-10-20";

/// Semantic version number
pub const VERSION_NUMBER: &str = "0.1.0";

/// Major version number
pub const VERSION_MAJOR: u32 = 0;

/// Minor version number
pub const VERSION_MINOR: u32 = 1;

/// Patch version number
pub const VERSION_PATCH: u32 = 0;

/// Build date
pub const BUILD_DATE: &str = "2025-10-20";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "mint",
    "confidential-wrap",
    "oracle-unwrap",
    "user-decryption",
    "eip712-authorization",
    "ephemeral-keypairs",
    "per-asset-sessions",
    "relayer-client",
    "hardhat-deployments",
];

/// Supported chain IDs
pub const SUPPORTED_CHAINS: &[u64] = &[
    31337,    // Hardhat / local fhEVM
    11155111, // Sepolia
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Confidential Bridge {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Get full version info as JSON
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "date": BUILD_DATE,
        "features": FEATURES,
        "chains": SUPPORTED_CHAINS,
    })
}
