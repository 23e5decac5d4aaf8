//! Typed contract events: one payload struct per kind, wrapped in an
//! [`EventRecord`] that pins it to its transaction and block.

use std::fmt;

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::types::Quantity;

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    LiquidationCreated,
    LiquidationDisputed,
    DisputeSettled,
    PositionCreated,
    NewSponsor,
    Deposit,
    Withdrawal,
    Redeem,
    RegularFeePaid,
    FinalFeePaid,
    LiquidationWithdrawn,
    SettleExpiredPosition,
}

impl EventKind {
    pub const ALL: [EventKind; 12] = [
        EventKind::LiquidationCreated,
        EventKind::LiquidationDisputed,
        EventKind::DisputeSettled,
        EventKind::PositionCreated,
        EventKind::NewSponsor,
        EventKind::Deposit,
        EventKind::Withdrawal,
        EventKind::Redeem,
        EventKind::RegularFeePaid,
        EventKind::FinalFeePaid,
        EventKind::LiquidationWithdrawn,
        EventKind::SettleExpiredPosition,
    ];

    /// Event name as declared by the contract.
    pub fn contract_name(&self) -> &'static str {
        match self {
            Self::LiquidationCreated => "LiquidationCreated",
            Self::LiquidationDisputed => "LiquidationDisputed",
            Self::DisputeSettled => "DisputeSettled",
            Self::PositionCreated => "PositionCreated",
            Self::NewSponsor => "NewSponsor",
            Self::Deposit => "Deposit",
            Self::Withdrawal => "Withdrawal",
            Self::Redeem => "Redeem",
            Self::RegularFeePaid => "RegularFeesPaid",
            Self::FinalFeePaid => "FinalFeesPaid",
            Self::LiquidationWithdrawn => "LiquidationWithdrawn",
            Self::SettleExpiredPosition => "SettleExpiredPosition",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.contract_name())
    }
}

// ---------------------------------------------------------------------------
// Payloads, one per kind. Field names match the contract's argument names
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidationCreated {
    pub sponsor: Address,
    pub liquidator: Address,
    pub liquidation_id: Quantity,
    pub tokens_outstanding: Quantity,
    pub locked_collateral: Quantity,
    pub liquidated_collateral: Quantity,
    pub liquidation_time: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidationDisputed {
    pub sponsor: Address,
    pub liquidator: Address,
    pub disputer: Address,
    pub liquidation_id: Quantity,
    pub dispute_bond_amount: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisputeSettled {
    pub caller: Address,
    pub sponsor: Address,
    pub liquidator: Address,
    pub disputer: Address,
    pub liquidation_id: Quantity,
    pub dispute_succeeded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionCreated {
    pub sponsor: Address,
    pub collateral_amount: Quantity,
    pub token_amount: Quantity,
}

/// The on-chain `NewSponsor` log only names the sponsor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSponsorLog {
    pub sponsor: Address,
}

/// A `NewSponsor` log joined with the `PositionCreated` emitted alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSponsor {
    pub sponsor: Address,
    pub collateral_amount: Quantity,
    pub token_amount: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deposit {
    pub sponsor: Address,
    pub collateral_amount: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    pub sponsor: Address,
    pub collateral_amount: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Redeem {
    pub sponsor: Address,
    pub collateral_amount: Quantity,
    pub token_amount: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegularFeePaid {
    pub regular_fee: Quantity,
    pub late_fee: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalFeePaid {
    pub amount: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidationWithdrawn {
    pub caller: Address,
    pub withdrawal_amount: Quantity,
    pub liquidation_status: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleExpiredPosition {
    pub caller: Address,
    pub collateral_returned: Quantity,
    pub tokens_burned: Quantity,
}

// ---------------------------------------------------------------------------
// EventRecord / ContractEvent
// ---------------------------------------------------------------------------

/// One event as held by the cache. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord<P> {
    pub transaction_hash: B256,
    pub block_number: u64,
    #[serde(flatten)]
    pub payload: P,
}

impl<P> EventRecord<P> {
    /// Same position on chain, different payload.
    pub fn with_payload<Q>(&self, payload: Q) -> EventRecord<Q> {
        EventRecord {
            transaction_hash: self.transaction_hash,
            block_number: self.block_number,
            payload,
        }
    }
}

/// Kind-erased view over the twelve record types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ContractEvent {
    LiquidationCreated(EventRecord<LiquidationCreated>),
    LiquidationDisputed(EventRecord<LiquidationDisputed>),
    DisputeSettled(EventRecord<DisputeSettled>),
    PositionCreated(EventRecord<PositionCreated>),
    NewSponsor(EventRecord<NewSponsor>),
    Deposit(EventRecord<Deposit>),
    Withdrawal(EventRecord<Withdrawal>),
    Redeem(EventRecord<Redeem>),
    RegularFeePaid(EventRecord<RegularFeePaid>),
    FinalFeePaid(EventRecord<FinalFeePaid>),
    LiquidationWithdrawn(EventRecord<LiquidationWithdrawn>),
    SettleExpiredPosition(EventRecord<SettleExpiredPosition>),
}

impl ContractEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::LiquidationCreated(_) => EventKind::LiquidationCreated,
            Self::LiquidationDisputed(_) => EventKind::LiquidationDisputed,
            Self::DisputeSettled(_) => EventKind::DisputeSettled,
            Self::PositionCreated(_) => EventKind::PositionCreated,
            Self::NewSponsor(_) => EventKind::NewSponsor,
            Self::Deposit(_) => EventKind::Deposit,
            Self::Withdrawal(_) => EventKind::Withdrawal,
            Self::Redeem(_) => EventKind::Redeem,
            Self::RegularFeePaid(_) => EventKind::RegularFeePaid,
            Self::FinalFeePaid(_) => EventKind::FinalFeePaid,
            Self::LiquidationWithdrawn(_) => EventKind::LiquidationWithdrawn,
            Self::SettleExpiredPosition(_) => EventKind::SettleExpiredPosition,
        }
    }

    pub fn block_number(&self) -> u64 {
        match self {
            Self::LiquidationCreated(r) => r.block_number,
            Self::LiquidationDisputed(r) => r.block_number,
            Self::DisputeSettled(r) => r.block_number,
            Self::PositionCreated(r) => r.block_number,
            Self::NewSponsor(r) => r.block_number,
            Self::Deposit(r) => r.block_number,
            Self::Withdrawal(r) => r.block_number,
            Self::Redeem(r) => r.block_number,
            Self::RegularFeePaid(r) => r.block_number,
            Self::FinalFeePaid(r) => r.block_number,
            Self::LiquidationWithdrawn(r) => r.block_number,
            Self::SettleExpiredPosition(r) => r.block_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_names_follow_the_abi() {
        assert_eq!(EventKind::RegularFeePaid.contract_name(), "RegularFeesPaid");
        assert_eq!(EventKind::FinalFeePaid.to_string(), "FinalFeesPaid");
        assert_eq!(EventKind::ALL.len(), 12);
    }

    #[test]
    fn records_serialize_flat_with_camel_case_fields() {
        let record = EventRecord {
            transaction_hash: B256::repeat_byte(0xaa),
            block_number: 7,
            payload: Deposit {
                sponsor: Address::repeat_byte(0x11),
                collateral_amount: "1000".parse().unwrap(),
            },
        };

        let value = serde_json::to_value(ContractEvent::Deposit(record)).unwrap();
        assert_eq!(value["event"], "deposit");
        assert_eq!(value["blockNumber"], 7);
        assert_eq!(value["collateralAmount"], "1000");
    }
}
