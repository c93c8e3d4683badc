//! Well-known setting names
//!
//! The resolver treats names as opaque; these are the ones the rest of the
//! tool reads.

/// Bundle identifier of the app
pub const APP_IDENTIFIER: &str = "app_identifier";

/// Apple ID used for both the Developer Portal and App Store Connect
pub const APPLE_ID: &str = "apple_id";

/// Developer Portal team id
pub const TEAM_ID: &str = "team_id";

/// Developer Portal team name
pub const TEAM_NAME: &str = "team_name";

/// App Store Connect team id
pub const ITC_TEAM_ID: &str = "itc_team_id";

/// App Store Connect team name
pub const ITC_TEAM_NAME: &str = "itc_team_name";

/// Apple ID for the Developer Portal only
pub const APPLE_DEV_PORTAL_ID: &str = "apple_dev_portal_id";

/// Apple ID for App Store Connect only
pub const ITUNES_CONNECT_ID: &str = "itunes_connect_id";

/// Path to the Google Play service account key
pub const JSON_KEY_FILE: &str = "json_key_file";

/// Android package name
pub const PACKAGE_NAME: &str = "package_name";

/// All well-known names
pub const ALL: &[&str] = &[
    APP_IDENTIFIER,
    APPLE_ID,
    TEAM_ID,
    TEAM_NAME,
    ITC_TEAM_ID,
    ITC_TEAM_NAME,
    APPLE_DEV_PORTAL_ID,
    ITUNES_CONNECT_ID,
    JSON_KEY_FILE,
    PACKAGE_NAME,
];

/// Whether `name` is one of the well-known settings
pub fn is_known(name: &str) -> bool {
    ALL.contains(&name)
}
