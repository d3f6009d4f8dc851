//! Priority-ordered routing table with hot reload.

use parking_lot::RwLock;
use shared_types::{RoutingRule, TransactionMessage};
use std::sync::Arc;
use tracing::{info, warn};

/// Immutable, priority-sorted rule set. Rules are cheap to clone behind an
/// `Arc`, so the dispatcher takes a snapshot per transaction and a reload
/// never disturbs in-flight fallback loops.
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<RoutingRule>,
}

impl RuleSet {
    #[must_use]
    pub fn new(mut rules: Vec<RoutingRule>) -> Self {
        // Stable sort: equal priorities keep their configured order.
        rules.sort_by_key(|r| r.priority);
        if !rules.iter().any(|r| r.predicate.is_catch_all()) {
            warn!("routing table has no catch-all rule; unmatched traffic will be discarded");
        }
        Self { rules }
    }

    /// First rule whose predicate matches the message's routing attributes.
    /// Health filtering happens in the dispatcher, which also knows how to
    /// skip a matching rule whose endpoints are all down.
    #[must_use]
    pub fn matching<'a>(
        &'a self,
        message: &TransactionMessage,
    ) -> impl Iterator<Item = &'a RoutingRule> {
        let account = message.account_ref().map(str::to_string);
        let amount = message.amount();
        let currency = message.currency();
        let merchant_class = message.merchant_class();
        self.rules.iter().filter(move |rule| {
            rule.predicate
                .matches(account.as_deref(), amount, currency, merchant_class)
        })
    }

    #[must_use]
    pub fn rules(&self) -> &[RoutingRule] {
        &self.rules
    }
}

/// Shared handle over the active rule set.
pub struct RoutingTable {
    active: RwLock<Arc<RuleSet>>,
}

impl RoutingTable {
    #[must_use]
    pub fn new(rules: Vec<RoutingRule>) -> Self {
        Self {
            active: RwLock::new(Arc::new(RuleSet::new(rules))),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<RuleSet> {
        Arc::clone(&self.active.read())
    }

    /// Swaps in a new rule set. Transactions already holding a snapshot
    /// finish against the old rules.
    pub fn reload(&self, rules: Vec<RoutingRule>) {
        let set = Arc::new(RuleSet::new(rules));
        info!(rules = set.rules().len(), "routing table reloaded");
        *self.active.write() = set;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{slots, EndpointId, FieldValue, MessageCategory, MessageFunction, MessageOrigin, Mti, RoutePredicate};

    fn rule(name: &str, priority: u16, predicate: RoutePredicate) -> RoutingRule {
        RoutingRule {
            name: name.to_string(),
            priority,
            predicate,
            endpoints: vec![EndpointId(format!("{name}-ep"))],
        }
    }

    fn catch_all() -> RoutePredicate {
        RoutePredicate::default()
    }

    fn bin_rule(low: &str, high: &str) -> RoutePredicate {
        RoutePredicate {
            account_range: Some((low.to_string(), high.to_string())),
            ..RoutePredicate::default()
        }
    }

    fn message(account: &str, amount: u64) -> TransactionMessage {
        TransactionMessage::new(Mti::new(
            MessageCategory::Authorization,
            MessageFunction::Request,
            MessageOrigin::Acquirer,
        ))
            .with(slots::ACCOUNT_REF, FieldValue::Variable(account.as_bytes().to_vec()))
            .with(slots::AMOUNT, FieldValue::Numeric { value: amount, width: 12 })
            .with(slots::CURRENCY, FieldValue::Numeric { value: 840, width: 3 })
    }

    #[test]
    fn lower_priority_number_wins() {
        let table = RoutingTable::new(vec![
            rule("fallback", 100, catch_all()),
            rule("visa", 10, bin_rule("400000", "499999")),
        ]);
        let snap = table.snapshot();
        let hit = snap.matching(&message("4111111111111111", 5_000)).next();
        assert_eq!(hit.unwrap().name, "visa");
    }

    #[test]
    fn non_matching_rules_are_skipped() {
        let table = RoutingTable::new(vec![
            rule("visa", 10, bin_rule("400000", "499999")),
            rule("fallback", 100, catch_all()),
        ]);
        let snap = table.snapshot();
        let hit = snap.matching(&message("5500123412341234", 5_000)).next();
        assert_eq!(hit.unwrap().name, "fallback");
    }

    #[test]
    fn no_match_yields_empty_iterator() {
        let table = RoutingTable::new(vec![rule("visa", 10, bin_rule("400000", "499999"))]);
        let snap = table.snapshot();
        assert!(snap.matching(&message("5500123412341234", 5_000)).next().is_none());
    }

    #[test]
    fn reload_does_not_disturb_held_snapshots() {
        let table = RoutingTable::new(vec![rule("old", 10, catch_all())]);
        let before = table.snapshot();
        table.reload(vec![rule("new", 10, catch_all())]);
        assert_eq!(before.rules()[0].name, "old");
        assert_eq!(table.snapshot().rules()[0].name, "new");
    }
}
