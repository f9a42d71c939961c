/// Application name
pub const APP_NAME: &str = "w3chat";

/// Account address size in bytes
pub const ADDRESS_SIZE: usize = 20;

/// Separator between the first name and the rest of a display name
pub const FIRST_NAME_SEPARATOR: char = ' ';

/// Page size used when a reader does not ask for one
pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// Capacity of the notification broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Header carrying the authenticated caller address
pub const CALLER_HEADER: &str = "x-caller-address";

/// Most read calls accepted in one batch
pub const MAX_BATCH_CALLS: usize = 64;
