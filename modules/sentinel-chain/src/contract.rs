//! Contract bindings: the monitored contract's events and views, and the
//! ERC-20 calls the bot makes.

use alloy::primitives::B256;
use alloy::rpc::types::Log;
use alloy::sol;
use alloy::sol_types::SolEvent;
use anyhow::{Context, Result};

use sentinel_common::{
    ContractEvent, Deposit, DisputeSettled, EventKind, EventRecord, FinalFeePaid,
    LiquidationCreated, LiquidationDisputed, LiquidationWithdrawn, NewSponsorLog,
    PositionCreated, Quantity, Redeem, RegularFeePaid, SettleExpiredPosition, Withdrawal,
};

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface ExpiringMultiParty {
        event LiquidationCreated(
            address indexed sponsor,
            address indexed liquidator,
            uint256 indexed liquidationId,
            uint256 tokensOutstanding,
            uint256 lockedCollateral,
            uint256 liquidatedCollateral,
            uint256 liquidationTime
        );
        event LiquidationDisputed(
            address indexed sponsor,
            address indexed liquidator,
            address indexed disputer,
            uint256 liquidationId,
            uint256 disputeBondAmount
        );
        event DisputeSettled(
            address indexed caller,
            address indexed sponsor,
            address indexed liquidator,
            address disputer,
            uint256 liquidationId,
            bool disputeSucceeded
        );
        event PositionCreated(address indexed sponsor, uint256 indexed collateralAmount, uint256 indexed tokenAmount);
        event NewSponsor(address indexed sponsor);
        event Deposit(address indexed sponsor, uint256 indexed collateralAmount);
        event Withdrawal(address indexed sponsor, uint256 indexed collateralAmount);
        event Redeem(address indexed sponsor, uint256 indexed collateralAmount, uint256 indexed tokenAmount);
        event RegularFeesPaid(uint256 indexed regularFee, uint256 indexed lateFee);
        event FinalFeesPaid(uint256 indexed amount);
        event LiquidationWithdrawn(address indexed caller, uint256 withdrawalAmount, uint8 indexed liquidationStatus);
        event SettleExpiredPosition(address indexed caller, uint256 indexed collateralReturned, uint256 indexed tokensBurned);

        function getCurrentTime() external view returns (uint256);
        function collateralCurrency() external view returns (address);
        function tokenCurrency() external view returns (address);
    }

    #[derive(Debug, PartialEq, Eq)]
    interface IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

use ExpiringMultiParty as emp;

/// topic0 of `kind`'s logs.
pub fn event_signature(kind: EventKind) -> B256 {
    match kind {
        EventKind::LiquidationCreated => emp::LiquidationCreated::SIGNATURE_HASH,
        EventKind::LiquidationDisputed => emp::LiquidationDisputed::SIGNATURE_HASH,
        EventKind::DisputeSettled => emp::DisputeSettled::SIGNATURE_HASH,
        EventKind::PositionCreated => emp::PositionCreated::SIGNATURE_HASH,
        EventKind::NewSponsor => emp::NewSponsor::SIGNATURE_HASH,
        EventKind::Deposit => emp::Deposit::SIGNATURE_HASH,
        EventKind::Withdrawal => emp::Withdrawal::SIGNATURE_HASH,
        EventKind::Redeem => emp::Redeem::SIGNATURE_HASH,
        EventKind::RegularFeePaid => emp::RegularFeesPaid::SIGNATURE_HASH,
        EventKind::FinalFeePaid => emp::FinalFeesPaid::SIGNATURE_HASH,
        EventKind::LiquidationWithdrawn => emp::LiquidationWithdrawn::SIGNATURE_HASH,
        EventKind::SettleExpiredPosition => emp::SettleExpiredPosition::SIGNATURE_HASH,
    }
}

/// A decoded log. `NewSponsor` stays apart until it has been correlated with
/// its `PositionCreated`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedLog {
    Event(ContractEvent),
    NewSponsor(EventRecord<NewSponsorLog>),
}

/// Decode one log of `kind` into its typed record.
pub fn decode_log(kind: EventKind, log: &Log) -> Result<DecodedLog> {
    let event = match kind {
        EventKind::LiquidationCreated => ContractEvent::LiquidationCreated(record(log, |e: emp::LiquidationCreated| {
            LiquidationCreated {
                sponsor: e.sponsor,
                liquidator: e.liquidator,
                liquidation_id: e.liquidationId.into(),
                tokens_outstanding: e.tokensOutstanding.into(),
                locked_collateral: e.lockedCollateral.into(),
                liquidated_collateral: e.liquidatedCollateral.into(),
                liquidation_time: e.liquidationTime.into(),
            }
        })?),
        EventKind::LiquidationDisputed => ContractEvent::LiquidationDisputed(record(log, |e: emp::LiquidationDisputed| {
            LiquidationDisputed {
                sponsor: e.sponsor,
                liquidator: e.liquidator,
                disputer: e.disputer,
                liquidation_id: e.liquidationId.into(),
                dispute_bond_amount: e.disputeBondAmount.into(),
            }
        })?),
        EventKind::DisputeSettled => ContractEvent::DisputeSettled(record(log, |e: emp::DisputeSettled| {
            DisputeSettled {
                caller: e.caller,
                sponsor: e.sponsor,
                liquidator: e.liquidator,
                disputer: e.disputer,
                liquidation_id: e.liquidationId.into(),
                dispute_succeeded: e.disputeSucceeded,
            }
        })?),
        EventKind::PositionCreated => ContractEvent::PositionCreated(record(log, |e: emp::PositionCreated| {
            PositionCreated {
                sponsor: e.sponsor,
                collateral_amount: e.collateralAmount.into(),
                token_amount: e.tokenAmount.into(),
            }
        })?),
        EventKind::NewSponsor => {
            return Ok(DecodedLog::NewSponsor(record(log, |e: emp::NewSponsor| {
                NewSponsorLog { sponsor: e.sponsor }
            })?))
        }
        EventKind::Deposit => ContractEvent::Deposit(record(log, |e: emp::Deposit| Deposit {
            sponsor: e.sponsor,
            collateral_amount: e.collateralAmount.into(),
        })?),
        EventKind::Withdrawal => ContractEvent::Withdrawal(record(log, |e: emp::Withdrawal| Withdrawal {
            sponsor: e.sponsor,
            collateral_amount: e.collateralAmount.into(),
        })?),
        EventKind::Redeem => ContractEvent::Redeem(record(log, |e: emp::Redeem| Redeem {
            sponsor: e.sponsor,
            collateral_amount: e.collateralAmount.into(),
            token_amount: e.tokenAmount.into(),
        })?),
        EventKind::RegularFeePaid => ContractEvent::RegularFeePaid(record(log, |e: emp::RegularFeesPaid| {
            RegularFeePaid {
                regular_fee: e.regularFee.into(),
                late_fee: e.lateFee.into(),
            }
        })?),
        EventKind::FinalFeePaid => ContractEvent::FinalFeePaid(record(log, |e: emp::FinalFeesPaid| {
            FinalFeePaid { amount: e.amount.into() }
        })?),
        EventKind::LiquidationWithdrawn => ContractEvent::LiquidationWithdrawn(record(log, |e: emp::LiquidationWithdrawn| {
            LiquidationWithdrawn {
                caller: e.caller,
                withdrawal_amount: e.withdrawalAmount.into(),
                liquidation_status: Quantity::from(u64::from(e.liquidationStatus)),
            }
        })?),
        EventKind::SettleExpiredPosition => ContractEvent::SettleExpiredPosition(record(log, |e: emp::SettleExpiredPosition| {
            SettleExpiredPosition {
                caller: e.caller,
                collateral_returned: e.collateralReturned.into(),
                tokens_burned: e.tokensBurned.into(),
            }
        })?),
    };
    Ok(DecodedLog::Event(event))
}

fn record<E: SolEvent, P>(log: &Log, payload: impl FnOnce(E) -> P) -> Result<EventRecord<P>> {
    let transaction_hash = log.transaction_hash.context("log has no transaction hash")?;
    let block_number = log.block_number.context("log has no block number")?;
    let decoded = log
        .log_decode::<E>()
        .with_context(|| format!("log does not match {}", E::SIGNATURE))?;
    Ok(EventRecord {
        transaction_hash,
        block_number,
        payload: payload(decoded.inner.data),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{keccak256, Address, LogData, U256};

    fn mined(data: LogData, block: u64) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: Address::repeat_byte(0xee),
                data,
            },
            block_number: Some(block),
            transaction_hash: Some(B256::repeat_byte(0x0f)),
            log_index: Some(0),
            ..Default::default()
        }
    }

    #[test]
    fn signatures_follow_the_contract_abi() {
        assert_eq!(
            event_signature(EventKind::Deposit),
            keccak256("Deposit(address,uint256)")
        );
        assert_eq!(
            event_signature(EventKind::RegularFeePaid),
            keccak256("RegularFeesPaid(uint256,uint256)")
        );
        assert_eq!(
            event_signature(EventKind::LiquidationWithdrawn),
            keccak256("LiquidationWithdrawn(address,uint256,uint8)")
        );
    }

    #[test]
    fn decodes_indexed_and_data_arguments() {
        let sponsor = Address::repeat_byte(0x01);
        let event = emp::LiquidationCreated {
            sponsor,
            liquidator: Address::repeat_byte(0x02),
            liquidationId: U256::from(3u8),
            tokensOutstanding: U256::from(100u8),
            lockedCollateral: U256::from(150u8),
            liquidatedCollateral: U256::from(140u8),
            liquidationTime: U256::from(1_600_000_000u64),
        };

        let decoded = decode_log(EventKind::LiquidationCreated, &mined(event.encode_log_data(), 9)).unwrap();
        let DecodedLog::Event(ContractEvent::LiquidationCreated(record)) = decoded else {
            panic!("unexpected {decoded:?}");
        };
        assert_eq!(record.block_number, 9);
        assert_eq!(record.payload.sponsor, sponsor);
        assert_eq!(record.payload.liquidation_id.as_str(), "3");
        assert_eq!(record.payload.liquidated_collateral.as_str(), "140");
        assert_eq!(record.payload.liquidation_time.as_str(), "1600000000");
    }

    #[test]
    fn new_sponsor_is_kept_apart() {
        let sponsor = Address::repeat_byte(0x01);
        let log = mined(emp::NewSponsor { sponsor }.encode_log_data(), 4);

        match decode_log(EventKind::NewSponsor, &log).unwrap() {
            DecodedLog::NewSponsor(record) => assert_eq!(record.payload.sponsor, sponsor),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn log_of_another_kind_is_rejected() {
        let data = emp::Deposit {
            sponsor: Address::repeat_byte(0x01),
            collateralAmount: U256::from(5u8),
        }
        .encode_log_data();

        assert!(decode_log(EventKind::Withdrawal, &mined(data, 1)).is_err());
    }

    #[test]
    fn pending_log_is_rejected() {
        let data = emp::FinalFeesPaid { amount: U256::from(5u8) }.encode_log_data();
        let mut log = mined(data, 1);
        log.block_number = None;

        let err = decode_log(EventKind::FinalFeePaid, &log).unwrap_err();
        assert!(err.to_string().contains("block number"));
    }
}
