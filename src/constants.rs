// User Agent constants
pub const USER_AGENT: &str = "RynxInline/0.1.0 reqwest/0.12";

// Network configuration
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
pub const MAX_REDIRECTS: usize = 10;

// Persistence endpoints: /blog/edit/{post|page}/{id}/
pub const EDIT_ENDPOINT_PREFIX: &str = "/blog/edit";

// Channel capacity
pub const CHANNEL_CAPACITY: usize = 10;

// Toasts live for a fixed 3 seconds
pub const TOAST_LIFETIME_MS: u64 = 3000;
pub const TOAST_WIDTH: u16 = 44;

// UI layout constants
pub const TOOLBAR_HEIGHT: u16 = 3;
pub const UI_ROW_OFFSET: u16 = 4;
pub const UI_HEIGHT_OFFSET: u16 = 5;
pub const UI_BORDER_WIDTH: usize = 2;
pub const REGION_GUTTER_WIDTH: usize = 2;
pub const MOUSE_SCROLL_LINES: usize = 3;

// File size limits
pub const MAX_PAGE_SIZE_BYTES: u64 = 10 * 1024 * 1024; // 10MB

// Event polling
pub const EVENT_POLL_TIMEOUT_MS: u64 = 10;

// Default key bindings
pub const DEFAULT_SAVE_KEY: &str = "ctrl+s";
pub const DEFAULT_CANCEL_KEY: &str = "ctrl+esc";

// Log file name inside the log directory
pub const LOG_FILE_NAME: &str = "rynx-inline.log";
