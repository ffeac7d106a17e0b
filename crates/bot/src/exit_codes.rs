//! Exit Code Registry
//!
//! Single source of truth for the process exit codes. The bot only exits
//! on startup failures; once polling starts it runs until killed.
//!
//! | Range   | Domain    | Description                                   |
//! |---------|-----------|-----------------------------------------------|
//! | 0       | Universal | Clean shutdown                                |
//! | 1       | Universal | General error (unspecified)                   |
//! | 2       | Universal | Usage error (bad flag values)                 |
//! | 10-19   | startup   | Configuration and platform checks             |

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Clean shutdown.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - flag values clap accepted but the bot cannot use.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Startup (10-19)
// =============================================================================

/// A required setting (bot token, sheet credentials, sheet id) is missing.
pub const EXIT_CONFIG_MISSING: u8 = 10;

/// The chat platform rejected the bot token (getMe failed).
pub const EXIT_BOT_AUTH: u8 = 11;
