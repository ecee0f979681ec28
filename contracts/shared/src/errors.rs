use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    NotInit = 1,
    AlreadyInit = 2,
    Unauthorized = 3,
    InvInput = 4,
    NotFound = 5,

    // Validation errors
    ZeroAmount = 10,
    LenMismatch = 11,
    SameToken = 12,
    NotWhitelisted = 13,
    PrivatePool = 14,
    UnderInvest = 15,
    InsufShares = 16,
    InsufBalance = 17,
    WrongPoolKind = 18,
    InvParams = 19,

    // Limit errors
    InvestorsLim = 20,
    PositionsLim = 21,
    LeverageLim = 22,
    EmissionLim = 23,
    InvestDelay = 24,
    PropExpired = 25,
    PropCap = 26,
    MoreThanTrader = 27,
    PriceTooHigh = 28,
    WrongPropToken = 29,
    PropConverted = 30,
    InvestorHasShares = 31,
    PositionNotOpen = 32,

    // Economic no-op errors
    NoCommission = 40,
    NothingToClaim = 41,
    NothingToReinvest = 42,
    OutOfRange = 43,
    NothingToConvert = 44,
    EmptyProposal = 45,

    // Oracle and arithmetic errors
    Slippage = 50,
    ZeroValue = 51,
    Overflow = 52,
    BadQuote = 53,
}
