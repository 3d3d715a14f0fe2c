// =============================================================================
// Exit Management Module
// =============================================================================
//
// The per-request position monitor: buy, poll the quote, sell on take-profit
// or stop-loss.

pub mod monitor;
