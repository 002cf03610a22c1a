/// Longest stay accepted in a single request.
pub const MAX_STAY_NIGHTS: u32 = 366;

/// Most rooms reserved by a single request.
pub const MAX_QUANTITY: i32 = 500;

/// Physical rooms per room type. Also caps overbooking limits, channel pools
/// and any single bucket adjustment.
pub const MAX_TOTAL_INVENTORY: i32 = 10_000;

/// How many days a single `open_range` call may create.
pub const MAX_OPEN_NIGHTS: u32 = 1_100;
