//! Duplicate suppression at admission, executed-outcome replay, and
//! compensation for indeterminate ledger postings.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ps_06_thp::{AuthorizedTx, LedgerFaultMode};
    use shared_types::{ChannelId, FinalOutcome, ResponseCode, TraceKey};

    use crate::fixtures::{financial, response_code, switch, switch_config, OPENING_BALANCE, PAN};

    #[tokio::test]
    async fn replayed_request_returns_the_stored_outcome() {
        let (pipeline, container) = switch(switch_config());
        let channel = ChannelId::new("pos-1");

        let first = pipeline.process(financial(1), &channel).await;
        assert_eq!(response_code(&first), Some(ResponseCode::Approved));

        // The resubmission sees the original approval, not a decline, and
        // the ledger is not touched a second time.
        let replay = pipeline.process(financial(1), &channel).await;
        assert_eq!(response_code(&replay), Some(ResponseCode::Approved));
        assert_eq!(container.ledger.balance(PAN), OPENING_BALANCE - 2_500);
        assert_eq!(container.ledger.audit_log().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_duplicates_post_exactly_once() {
        let (pipeline, container) = switch(switch_config());
        let pipeline = Arc::new(pipeline);
        let channel = ChannelId::new("pos-1");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pipeline = Arc::clone(&pipeline);
            let channel = channel.clone();
            handles.push(tokio::spawn(async move {
                pipeline.process(financial(2), &channel).await
            }));
        }

        // The trace cache admits exactly one racing copy; the rest either
        // replay the recorded approval (if the winner already finished) or
        // are discarded. Whatever the interleaving, the ledger moves once.
        let mut approvals = 0;
        for handle in handles {
            let response = handle.await.expect("task");
            match response_code(&response) {
                Some(ResponseCode::Approved) => approvals += 1,
                Some(ResponseCode::FormatError) => {}
                other => panic!("unexpected duplicate response: {other:?}"),
            }
        }
        assert!(approvals >= 1);
        assert_eq!(container.ledger.balance(PAN), OPENING_BALANCE - 2_500);
        assert_eq!(container.ledger.audit_log().len(), 1);
    }

    #[tokio::test]
    async fn replayed_execution_reuses_the_recorded_outcome() {
        let (_, container) = switch(switch_config());
        let trace = TraceKey::new(3, ChannelId::new("pos-1"), 1_700_000_000);

        let authorized = || {
            AuthorizedTx::new(trace.clone(), financial(3), PAN.to_string(), -2_500)
        };
        let first = container.processor.execute(authorized()).await;
        assert_eq!(first, FinalOutcome::Completed);

        // Same trace key: the recorded outcome answers, the ledger is not
        // touched again even though the idempotency key would absorb it.
        let replay = container.processor.execute(authorized()).await;
        assert_eq!(replay, FinalOutcome::Completed);
        assert_eq!(container.ledger.audit_log().len(), 1);
        assert_eq!(container.ledger.balance(PAN), OPENING_BALANCE - 2_500);
    }

    #[tokio::test]
    async fn indeterminate_posting_is_compensated() {
        let (_, container) = switch(switch_config());
        let trace = TraceKey::new(4, ChannelId::new("pos-1"), 1_700_000_000);
        container
            .ledger
            .inject_fault(LedgerFaultMode::UnknownAfterApplyNext);

        let authorized = AuthorizedTx::new(trace, financial(4), PAN.to_string(), -2_500);
        let outcome = container.processor.execute(authorized).await;
        assert_eq!(
            outcome,
            FinalOutcome::Reversed(ResponseCode::IssuerUnavailable)
        );
        // The posting landed before the ack was lost; the compensating
        // reversal nets the balance back out.
        assert_eq!(container.ledger.balance(PAN), OPENING_BALANCE);
        assert_eq!(container.ledger.audit_log().len(), 2);
    }

    #[tokio::test]
    async fn reversal_after_completion_converges_on_one_compensation() {
        let (pipeline, container) = switch(switch_config());
        let channel = ChannelId::new("pos-1");

        pipeline.process(financial(5), &channel).await;
        assert_eq!(container.ledger.balance(PAN), OPENING_BALANCE - 2_500);

        let response = pipeline
            .process(crate::fixtures::reversal(5), &channel)
            .await;
        assert_eq!(response_code(&response), Some(ResponseCode::Approved));
        assert_eq!(container.ledger.balance(PAN), OPENING_BALANCE);

        // The reversal advice may arrive more than once; the ledger's
        // idempotency key makes the retries converge.
        pipeline.process(crate::fixtures::reversal(5), &channel).await;
        assert_eq!(container.ledger.balance(PAN), OPENING_BALANCE);
        assert_eq!(container.ledger.audit_log().len(), 2);
    }

    #[tokio::test]
    async fn reversal_for_an_unknown_original_is_declined_without_funding() {
        let (pipeline, container) = switch(switch_config());
        let channel = ChannelId::new("pos-1");

        // No financial leg was ever processed for this STAN; crediting the
        // reversal amount anyway would mint money.
        let response = pipeline
            .process(crate::fixtures::reversal(9), &channel)
            .await;
        assert_eq!(
            response_code(&response),
            Some(ResponseCode::UnableToLocate)
        );
        assert_eq!(container.ledger.balance(PAN), OPENING_BALANCE);
        assert!(container.ledger.audit_log().is_empty());
    }
}
