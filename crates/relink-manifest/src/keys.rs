//! Well-known paths and metadata keys.

/// Path of the root entry.
pub const ROOT_PATH: &str = "/";

/// Root metadata: document served for the site root.
pub const WEBSITE_INDEX_DOCUMENT: &str = "website-index-document";

/// Root metadata: document served when a path is missing.
pub const WEBSITE_ERROR_DOCUMENT: &str = "website-error-document";

/// File metadata: original file name.
pub const ENTRY_FILENAME: &str = "Filename";

/// File metadata: MIME type.
pub const ENTRY_CONTENT_TYPE: &str = "Content-Type";
