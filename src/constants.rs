pub const MAX_NAME_LENGTH: usize = 255;

pub const PRICE_MAX_DIGITS: u32 = 5;
pub const PRICE_DECIMAL_PLACES: u32 = 2;

pub const PASSWORD_MIN_LENGTH: usize = 5;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_SESSION_LIFETIME_HOURS: i64 = 24;
pub const DEFAULT_MEDIA_ROOT: &str = "./media";

pub const MEDIA_URL: &str = "/media/";
pub const RECIPE_IMAGE_DIR: &str = "uploads/recipe";

/// Upper bound for multipart image uploads (5MB)
pub const MAX_UPLOAD_SIZE: u64 = 5 * 1024 * 1024;
pub const MAX_JSON_BODY_SIZE: u64 = 64 * 1024;

/// Largest accepted image side, checked from the header before decoding
pub const MAX_IMAGE_DIMENSION: u32 = 4096;
pub const MAX_IMAGE_DECODE_BYTES: u64 = 96 * 1024 * 1024;

pub const REQUIRED_FIELD: &str = "This field is required.";
pub const BLANK_FIELD: &str = "This field may not be blank.";
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
pub const MISSING_IMAGE: &str = "No file was submitted.";
