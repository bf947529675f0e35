// Copyright 2025 Eric Jingryd (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! src/core/hotkey.rs
//!
//! Key combinations and rebindable trading actions
//!
//! This module defines:
//! - `Modifier`: Ctrl, Alt, Shift (in canonical order)
//! - `KeyCombo`: modifiers plus one non-modifier key
//! - `KeyEvent`: a raw key press as delivered by the host
//! - `HotkeyAction`: the fixed set of actions that can be rebound
//!
//! # Canonical form
//! Modifiers appear in the fixed order Ctrl, Alt, Shift, each followed by
//! `+`, then the uppercased key: `Ctrl+Shift+B`. A combination made only
//! of modifier keys is never valid.
//!
//! Parsing uses nom combinators and is lenient about modifier order, case
//! and spacing; `Display` always produces the canonical string, so parse
//! then display is the canonicalisation step.

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while1},
    character::complete::{char, space0},
    combinator::{all_consuming, value},
    multi::many0,
    sequence::{delimited, terminated},
    IResult, Parser,
};
use std::{fmt, str::FromStr};
use thiserror::Error;

use crate::core::path::PrefPath;

/// Schema section holding one hotkey field per action.
pub const HOTKEY_SECTION: &str = "hotkeys";

/// Key names that are modifiers on their own. A key event whose key is
/// one of these never completes a combination.
const MODIFIER_KEYS: &[&str] = &[
    "CONTROL", "CTRL", "ALT", "ALTGRAPH", "SHIFT", "META", "SUPER", "OS",
];

/// Errors raised while building a key combination
#[derive(Clone, Debug, Error, PartialEq)]
pub enum HotkeyError {
    #[error("empty key combination")]
    Empty,

    #[error("'{0}' has no key besides modifiers")]
    ModifierOnly(String),

    #[error("cannot parse '{0}' as a key combination")]
    Malformed(String),
}

/// Keyboard modifier keys.
///
/// Declaration order is the canonical order; `Ord` is derived from it.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Modifier {
    Ctrl,
    Alt,
    Shift,
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::Ctrl => write!(f, "Ctrl"),
            Modifier::Alt => write!(f, "Alt"),
            Modifier::Shift => write!(f, "Shift"),
        }
    }
}

/// A combination of modifier keys and a base key
///
/// Always normalised on construction:
/// - modifiers sorted into canonical order and deduplicated
/// - key uppercased (`" "` becomes `SPACE`, `"+"` becomes `PLUS`)
///
/// Two combos are equal exactly when their canonical strings are equal,
/// which makes `KeyCombo` usable as a HashMap key for conflict lookups.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct KeyCombo {
    modifiers: Vec<Modifier>,
    key: String,
}

impl KeyCombo {
    /// Builds a normalised combination.
    ///
    /// # Errors
    /// - `HotkeyError::Empty` if `key` is empty or whitespace
    /// - `HotkeyError::ModifierOnly` if `key` is itself a modifier
    pub fn new(mut modifiers: Vec<Modifier>, key: &str) -> Result<Self, HotkeyError> {
        let key = canonical_key(key)?;

        modifiers.sort();
        modifiers.dedup();

        Ok(Self { modifiers, key })
    }

    /// Builds the combination for a captured key event.
    pub fn from_event(event: &KeyEvent) -> Result<Self, HotkeyError> {
        let mut modifiers = Vec::new();
        if event.ctrl {
            modifiers.push(Modifier::Ctrl);
        }
        if event.alt {
            modifiers.push(Modifier::Alt);
        }
        if event.shift {
            modifiers.push(Modifier::Shift);
        }
        KeyCombo::new(modifiers, &event.key)
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{}+", modifier)?;
        }
        write!(f, "{}", self.key)
    }
}

impl FromStr for KeyCombo {
    type Err = HotkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_key_combo(s)
    }
}

/// A key press delivered by the host while capturing or while idle.
///
/// `key` is the host's name for the non-modifier key (`"b"`, `"F5"`,
/// `"Control"`); the flags describe modifiers held at the time.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct KeyEvent {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub key: String,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// True when the pressed key is itself a modifier.
    pub fn is_bare_modifier(&self) -> bool {
        is_modifier_key(&self.key)
    }
}

/// Actions that can be bound to a hotkey.
///
/// Declaration order decides which action wins a lookup when two actions
/// share a combination.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum HotkeyAction {
    QuickBuy,
    QuickSell,
    CancelAll,
    AutoTradeToggle,
}

impl HotkeyAction {
    pub const ALL: [HotkeyAction; 4] = [
        HotkeyAction::QuickBuy,
        HotkeyAction::QuickSell,
        HotkeyAction::CancelAll,
        HotkeyAction::AutoTradeToggle,
    ];

    /// Field name under the `hotkeys` section.
    pub fn field_name(self) -> &'static str {
        match self {
            HotkeyAction::QuickBuy => "quickBuy",
            HotkeyAction::QuickSell => "quickSell",
            HotkeyAction::CancelAll => "cancelAll",
            HotkeyAction::AutoTradeToggle => "autoTradeToggle",
        }
    }

    /// Schema path of this action's binding.
    pub fn path(self) -> PrefPath {
        PrefPath::from_segments(&[HOTKEY_SECTION, self.field_name()])
    }

    pub fn label(self) -> &'static str {
        match self {
            HotkeyAction::QuickBuy => "Quick Buy",
            HotkeyAction::QuickSell => "Quick Sell",
            HotkeyAction::CancelAll => "Cancel All Orders",
            HotkeyAction::AutoTradeToggle => "Toggle Auto-Trade",
        }
    }
}

impl fmt::Display for HotkeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field_name())
    }
}

impl FromStr for HotkeyAction {
    type Err = String;

    /// Accepts `quickBuy`, `quick-buy`, `quick_buy` and any casing of them.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        HotkeyAction::ALL
            .into_iter()
            .find(|action| action.field_name().to_lowercase() == wanted)
            .ok_or_else(|| format!("unknown hotkey action '{}'", s))
    }
}

/// Returns true if `key` names a modifier key (case-insensitive).
pub fn is_modifier_key(key: &str) -> bool {
    MODIFIER_KEYS.contains(&key.trim().to_uppercase().as_str())
}

/// Maps a host key name to its canonical form.
fn canonical_key(raw: &str) -> Result<String, HotkeyError> {
    match raw {
        " " => return Ok("SPACE".to_string()),
        "+" => return Ok("PLUS".to_string()),
        _ => {}
    }

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(HotkeyError::Empty);
    }
    if is_modifier_key(trimmed) {
        return Err(HotkeyError::ModifierOnly(raw.to_string()));
    }

    match trimmed.to_uppercase().as_str() {
        "SPACEBAR" => Ok("SPACE".to_string()),
        upper => Ok(upper.to_string()),
    }
}

/// Parse a key combination string
///
/// Formats supported:
/// - "Ctrl+B", "ctrl + b" (any case, optional spaces)
/// - "Shift+Ctrl+B" (any modifier order)
/// - "Control+B" (long modifier name)
/// - "F5" (no modifiers)
pub fn parse_key_combo(input: &str) -> Result<KeyCombo, HotkeyError> {
    if input.trim().is_empty() {
        return Err(HotkeyError::Empty);
    }

    let (_, (modifiers, key)) = all_consuming(combo)
        .parse(input)
        .map_err(|_| HotkeyError::Malformed(input.to_string()))?;

    KeyCombo::new(modifiers, key).map_err(|e| match e {
        HotkeyError::ModifierOnly(_) => HotkeyError::ModifierOnly(input.to_string()),
        other => other,
    })
}

/// `MODIFIER+`* KEY, surrounded by optional spaces
fn combo(input: &str) -> IResult<&str, (Vec<Modifier>, &str)> {
    delimited(
        space0,
        (
            many0(terminated(modifier, separator)),
            take_while1(|c: char| c != '+' && !c.is_whitespace()),
        ),
        space0,
    )
    .parse(input)
}

/// A single modifier name, any case
fn modifier(input: &str) -> IResult<&str, Modifier> {
    alt((
        value(
            Modifier::Ctrl,
            alt((tag_no_case("control"), tag_no_case("ctrl"))),
        ),
        value(Modifier::Alt, tag_no_case("alt")),
        value(Modifier::Shift, tag_no_case("shift")),
    ))
    .parse(input)
}

fn separator(input: &str) -> IResult<&str, char> {
    delimited(space0, char('+'), space0).parse(input)
}
