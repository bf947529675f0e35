//! Factory preference schema for the trading interface
//!
//! Every field a user can edit lives here, together with its default.
//! Hotkey field names under `hotkeys` match `HotkeyAction::field_name`.

use crate::core::hotkey::{HotkeyAction, HOTKEY_SECTION};
use crate::core::schema::Schema;

pub const ORDER_TYPES: &[&str] = &["market", "limit", "stop"];
pub const THEMES: &[&str] = &["dark", "light"];
pub const CHART_INTERVALS: &[&str] = &["1m", "5m", "15m", "1h", "4h", "1d"];

/// Builds the trading interface schema.
pub fn trading_schema() -> Schema {
    Schema::builder()
        .record("orderEntry", |r| {
            r.bounded("defaultQuantity", 10.0, 1.0, 1_000_000.0)
                .choice("defaultOrderType", "market", ORDER_TYPES)
                .bool("confirmBeforeSubmit", true)
                .bounded("slippageTolerancePercent", 0.5, 0.0, 50.0)
        })
        .record("risk", |r| {
            r.bool("enableStopLoss", true)
                .bounded("stopLossPercent", 5.0, 0.0, 100.0)
                .bounded("takeProfitPercent", 10.0, 0.0, 1_000.0)
                .at_least("maxPositionSize", 1_000.0, 0.0)
        })
        .record("display", |r| {
            r.choice("theme", "dark", THEMES)
                .bool("compactMode", false)
                .bool("showPnlPercent", true)
                .bounded("priceDecimals", 2.0, 0.0, 8.0)
                .record("chart", |c| {
                    c.choice("interval", "1m", CHART_INTERVALS)
                        .bool("showVolume", true)
                })
        })
        .record("notifications", |r| {
            r.bool("orderFilled", true)
                .bool("priceAlerts", true)
                .bool("sound", false)
        })
        .record("autoTrade", |r| {
            r.bool("enabled", false)
                .bounded("maxTradesPerDay", 20.0, 0.0, 1_000.0)
        })
        .record(HOTKEY_SECTION, |r| {
            r.bool("enabled", true)
                .hotkey(HotkeyAction::QuickBuy.field_name(), "Alt+B")
                .hotkey(HotkeyAction::QuickSell.field_name(), "Alt+S")
                .hotkey(HotkeyAction::CancelAll.field_name(), "Alt+C")
                .hotkey(HotkeyAction::AutoTradeToggle.field_name(), "Alt+T")
        })
        .build()
}
