use soroban_sdk::{symbol_short, Symbol};

// Pool lifecycle
pub const POOL_INITIALIZED: Symbol = symbol_short!("init");
pub const PARAMS_CHANGED: Symbol = symbol_short!("params");
pub const PRIVATE_INVESTORS: Symbol = symbol_short!("priv_inv");

// Base pool
pub const INVESTED: Symbol = symbol_short!("invested");
pub const DIVESTED: Symbol = symbol_short!("divested");
pub const EXCHANGED: Symbol = symbol_short!("exchanged");
pub const POSITION_CLOSED: Symbol = symbol_short!("pos_close");

// Commission
pub const COMMISSION_PAID: Symbol = symbol_short!("comm_paid");

// Proposals
pub const PROPOSAL_CREATED: Symbol = symbol_short!("prop_new");
pub const PROPOSAL_INVESTED: Symbol = symbol_short!("prop_inv");
pub const PROPOSAL_REINVESTED: Symbol = symbol_short!("prop_rein");
pub const PROPOSAL_EXCHANGED: Symbol = symbol_short!("prop_exch");
pub const PROPOSAL_TRANSFER: Symbol = symbol_short!("prop_xfer");
pub const PROPOSAL_WITHDRAWN: Symbol = symbol_short!("prop_wdr");
pub const PROPOSAL_SUPPLIED: Symbol = symbol_short!("prop_sup");
pub const PROPOSAL_CLAIMED: Symbol = symbol_short!("prop_clm");
pub const PROPOSAL_CONVERTED: Symbol = symbol_short!("prop_conv");
