//! Shared fixtures: a two-issuer switch configuration and message builders.

use std::sync::Arc;

use ps_03_broker::ChannelAdmission;
use ps_05_authorizer::AccountRecord;
use shared_types::message::{slots, MessageFunction, MessageOrigin, Mti};
use shared_types::{
    ChannelId, EndpointId, FieldValue, MessageCategory, ResponseCode, RoutePredicate, RoutingRule,
    TransactionMessage,
};
use switch_runtime::config::SwitchConfig;
use switch_runtime::container::SwitchContainer;
use switch_runtime::pipeline::SwitchPipeline;

/// Known-good Luhn test PAN seeded with an opening balance.
pub const PAN: &str = "4532015112830366";
/// Channel identity provisioned in the fixture keyring.
pub const CHANNEL: &str = "pos-1";
/// Shared channel key, hex-encoded in the configuration.
pub const KEY: &[u8] = b"fixture-secret";
/// Opening balance for [`PAN`], in minor units.
pub const OPENING_BALANCE: i64 = 100_000;

/// A switch with one catch-all rule cascading issuer-a → issuer-b.
#[must_use]
pub fn switch_config() -> SwitchConfig {
    let mut config = SwitchConfig::default();
    config.routing.push(RoutingRule {
        name: "default".into(),
        priority: 100,
        predicate: RoutePredicate::default(),
        endpoints: vec![EndpointId::new("issuer-a"), EndpointId::new("issuer-b")],
    });
    config.admission.channels.insert(
        ChannelId::new(CHANNEL),
        ChannelAdmission {
            categories: vec![
                MessageCategory::Authorization,
                MessageCategory::Financial,
                MessageCategory::Reversal,
                MessageCategory::Network,
            ],
            priority: 1,
        },
    );
    config
        .security
        .channel_keys
        .insert(CHANNEL.into(), hex::encode(KEY));
    config.accounts.insert(PAN.into(), AccountRecord::active());
    config.opening_balances.insert(PAN.into(), OPENING_BALANCE);
    config
}

/// Container plus pipeline built from [`switch_config`].
#[must_use]
pub fn switch(config: SwitchConfig) -> (SwitchPipeline, Arc<SwitchContainer>) {
    let container = Arc::new(SwitchContainer::new(config).expect("fixture container"));
    (SwitchPipeline::new(Arc::clone(&container)), container)
}

/// A financial request for 2 500 minor units against [`PAN`].
#[must_use]
pub fn financial(stan: u64) -> TransactionMessage {
    base(MessageCategory::Financial, stan)
}

/// An authorization-only request (no money movement on approval).
#[must_use]
pub fn authorization(stan: u64) -> TransactionMessage {
    base(MessageCategory::Authorization, stan)
}

/// The reversal leg for a previous request with the same STAN.
#[must_use]
pub fn reversal(stan: u64) -> TransactionMessage {
    base(MessageCategory::Reversal, stan)
}

fn base(category: MessageCategory, stan: u64) -> TransactionMessage {
    TransactionMessage::new(Mti::new(
        category,
        MessageFunction::Request,
        MessageOrigin::Acquirer,
    ))
    .with(slots::ACCOUNT_REF, FieldValue::Variable(PAN.as_bytes().to_vec()))
    .with(slots::PROCESSING_CODE, FieldValue::Numeric { value: 0, width: 6 })
    .with(slots::AMOUNT, FieldValue::Numeric { value: 2_500, width: 12 })
    .with(slots::TIMESTAMP, FieldValue::Numeric { value: 1_700_000_000, width: 10 })
    .with(slots::STAN, FieldValue::Numeric { value: stan, width: 6 })
    .with(slots::CURRENCY, FieldValue::Numeric { value: 840, width: 3 })
    .with(slots::MERCHANT_CLASS, FieldValue::Numeric { value: 5411, width: 4 })
}

/// Response code carried in a response message, when present and known.
#[must_use]
pub fn response_code(response: &TransactionMessage) -> Option<ResponseCode> {
    response
        .get(slots::RESPONSE_CODE)
        .and_then(FieldValue::as_text)
        .and_then(ResponseCode::from_wire_code)
}
