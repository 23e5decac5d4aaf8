//! Pairing `NewSponsor` logs with their `PositionCreated`.
//!
//! The contract emits `NewSponsor` with only the sponsor's address; the
//! amounts live on the `PositionCreated` emitted by the same call. The two are
//! joined on block number, which is only sound while a block holds exactly
//! one `PositionCreated`. Anything else is a consistency error.

use sentinel_common::{EventRecord, NewSponsor, NewSponsorLog, PositionCreated, SentinelError};

/// Join each `NewSponsor` log with the single `PositionCreated` in its block.
///
/// `created` must be the `PositionCreated` records of the same sync pass.
pub fn correlate_new_sponsors(
    created: &[EventRecord<PositionCreated>],
    logs: &[EventRecord<NewSponsorLog>],
) -> Result<Vec<EventRecord<NewSponsor>>, SentinelError> {
    let mut joined = Vec::with_capacity(logs.len());

    for log in logs {
        let positions: Vec<&EventRecord<PositionCreated>> = created
            .iter()
            .filter(|c| c.block_number == log.block_number)
            .collect();

        match positions.as_slice() {
            [position] => joined.push(log.with_payload(NewSponsor {
                sponsor: log.payload.sponsor,
                collateral_amount: position.payload.collateral_amount.clone(),
                token_amount: position.payload.token_amount.clone(),
            })),
            other => {
                return Err(SentinelError::Consistency {
                    sponsor: log.payload.sponsor,
                    block_number: log.block_number,
                    transaction_hash: log.transaction_hash,
                    matches: other.len(),
                })
            }
        }
    }

    Ok(joined)
}
