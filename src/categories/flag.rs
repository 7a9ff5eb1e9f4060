//! TCP flag/state classification. Both tables are priority-ordered decision
//! tables: the first matching rule wins, so rule order is part of the
//! contract, not an implementation detail.

use serde::{Deserialize, Serialize};
use std::fmt;

/// TCP control bits carried on an EVE flow record. Absent bits parse as
/// unset; extra fields in the `tcp` object are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpFlags {
    #[serde(default)]
    pub syn: bool,
    #[serde(default)]
    pub ack: bool,
    #[serde(default)]
    pub fin: bool,
    #[serde(default)]
    pub rst: bool,
}

impl TcpFlags {
    /// True when no control bit is set (also the shape of an absent or
    /// empty `tcp` object).
    pub fn none_set(&self) -> bool {
        !(self.syn || self.ack || self.fin || self.rst)
    }
}

/// Connection-state token produced by the decision tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagToken {
    /// Connection attempt seen, no reply.
    S0,
    /// SYN without ACK, not usual behavior.
    S1,
    /// Normal establishment and termination.
    SF,
    /// Connection attempt rejected.
    REJ,
    /// Reset by originator.
    RSTO,
    /// Reset by originator before reply.
    RSTOS0,
    /// Anything else.
    OTH,
}

impl FlagToken {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagToken::S0 => "S0",
            FlagToken::S1 => "S1",
            FlagToken::SF => "SF",
            FlagToken::REJ => "REJ",
            FlagToken::RSTO => "RSTO",
            FlagToken::RSTOS0 => "RSTOS0",
            FlagToken::OTH => "OTH",
        }
    }
}

impl fmt::Display for FlagToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which decision table the deriver applies. Trained flag encoders are
/// table-specific, so the selection must match the deployed artifact set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagTable {
    /// Flow-state-aware table (vocabulary S0/S1/SF/REJ/OTH): an unanswered
    /// new-flow timeout is distinguished from other silence.
    #[default]
    FlowAware,
    /// Flags-only table (vocabulary extends with RSTO/RSTOS0): no flow
    /// termination context consulted.
    FlagsOnly,
}

impl FlagTable {
    /// Resolve one event's flags to a token. `state`/`reason` come from the
    /// flow object and are only consulted by the flow-aware table.
    pub fn resolve(
        &self,
        flags: &TcpFlags,
        state: Option<&str>,
        reason: Option<&str>,
    ) -> FlagToken {
        match self {
            FlagTable::FlowAware => resolve_flow_aware(flags, state, reason),
            FlagTable::FlagsOnly => resolve_flags_only(flags),
        }
    }

    /// Every token this table can produce, in precedence order.
    pub fn vocabulary(&self) -> &'static [FlagToken] {
        match self {
            FlagTable::FlowAware => &[
                FlagToken::S0,
                FlagToken::S1,
                FlagToken::SF,
                FlagToken::REJ,
                FlagToken::OTH,
            ],
            FlagTable::FlagsOnly => &[
                FlagToken::SF,
                FlagToken::S0,
                FlagToken::RSTO,
                FlagToken::RSTOS0,
                FlagToken::REJ,
                FlagToken::S1,
                FlagToken::OTH,
            ],
        }
    }
}

/// Rules, first match wins:
/// 1. no bits set: new+timeout → S0, else OTH
/// 2. syn without ack: new+timeout → S0, else S1
/// 3. syn+ack → SF
/// 4. rst → REJ
/// 5. → OTH
fn resolve_flow_aware(flags: &TcpFlags, state: Option<&str>, reason: Option<&str>) -> FlagToken {
    let unanswered = state == Some("new") && reason == Some("timeout");

    if flags.none_set() {
        return if unanswered { FlagToken::S0 } else { FlagToken::OTH };
    }
    if flags.syn && !flags.ack {
        return if unanswered { FlagToken::S0 } else { FlagToken::S1 };
    }
    if flags.syn && flags.ack {
        return FlagToken::SF;
    }
    if flags.rst {
        return FlagToken::REJ;
    }
    FlagToken::OTH
}

/// Rules, first match wins:
/// 1. syn+fin → SF
/// 2. syn without ack or fin → S0
/// 3. syn+rst → RSTO
/// 4. ack+rst → RSTOS0
/// 5. rst → REJ
/// 6. fin → S1
/// 7. → OTH
///
/// The combined-flag rules (3, 4) sit above the bare-rst rule so RSTO and
/// RSTOS0 are actually producible.
fn resolve_flags_only(flags: &TcpFlags) -> FlagToken {
    if flags.syn && flags.fin {
        return FlagToken::SF;
    }
    if flags.syn && !(flags.ack || flags.fin) {
        return FlagToken::S0;
    }
    if flags.syn && flags.rst {
        return FlagToken::RSTO;
    }
    if flags.ack && flags.rst {
        return FlagToken::RSTOS0;
    }
    if flags.rst {
        return FlagToken::REJ;
    }
    if flags.fin {
        return FlagToken::S1;
    }
    FlagToken::OTH
}
