/// 1.0 in fixed point (7 decimals, the Stellar asset convention)
pub const PRECISION: i128 = 10_000_000;

/// 100% expressed in `PRECISION` units
pub const PERCENTAGE_100: i128 = 100 * PRECISION;

/// Amount of a position token used to quote its unit price in base token
pub const PRICE_UNIT: i128 = PRECISION;

/// Scale of the per-share dividend accumulator of invest proposals
pub const REWARD_SCALE: i128 = 1_000_000_000_000_000_000;

/// Number of protocol commission recipients (treasury, dividends, insurance)
pub const PROTOCOL_RECIPIENTS: u32 = 3;

/// Number of commission periods
pub const COMMISSION_PERIODS: u32 = 3;

/// Upper bound for the base token decimals accepted at pool creation
pub const MAX_BASE_DECIMALS: u32 = 18;

/// Upper bound of ids processed by one batched proposal query
pub const MAX_BATCH_SIZE: u32 = 50;
