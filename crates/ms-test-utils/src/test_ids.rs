//! Fixed test IDs for deterministic tests.

use uuid::Uuid;

// Callers (100-199)
pub const TEST_USER_PARENT: Uuid = Uuid::from_u128(100);
pub const TEST_USER_STRANGER: Uuid = Uuid::from_u128(101);

// Targets (1000-1099)
pub const TEST_TARGET_BABY: Uuid = Uuid::from_u128(1000);
pub const TEST_TARGET_OTHER_BABY: Uuid = Uuid::from_u128(1001);

// Measurements (5000-5099)
pub const TEST_MEASUREMENT_1: Uuid = Uuid::from_u128(5000);
pub const TEST_MEASUREMENT_2: Uuid = Uuid::from_u128(5001);

// Service account
pub const TEST_SERVICE_USERNAME: &str = "measurement-service";
pub const TEST_SERVICE_PASSWORD: &str = "test-password-do-not-use-in-production";
pub const TEST_LOGIN_PATH: &str = "/auth/login";
