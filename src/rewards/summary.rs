use crate::rewards::types::RewardLineItem;

/// Display category for a granted item kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardKind {
    Gold,
    Exp,
    /// Premium currency
    Coupons,
    Item(i64),
}

impl RewardKind {
    pub fn from_id(id: i64) -> Self {
        match id {
            1 | 1001 => RewardKind::Gold,
            2 | 1101 => RewardKind::Exp,
            1002 => RewardKind::Coupons,
            other => RewardKind::Item(other),
        }
    }

    pub fn label(&self, count: i64) -> String {
        match self {
            RewardKind::Gold => format!("gold {}", count),
            RewardKind::Exp => format!("exp {}", count),
            RewardKind::Coupons => format!("coupons {}", count),
            RewardKind::Item(id) => format!("item #{}x{}", id, count),
        }
    }
}

/// Human-readable summary of granted rewards, in input order.
/// Entries with a non-positive count are left out.
pub fn summarize(items: &[RewardLineItem]) -> String {
    items
        .iter()
        .filter(|item| item.count > 0)
        .map(|item| RewardKind::from_id(item.id).label(item.count))
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_generic_kinds_in_order() {
        let items = [
            RewardLineItem::new(1, 100),
            RewardLineItem::new(1002, 5),
            RewardLineItem::new(9999, 3),
        ];
        assert_eq!(summarize(&items), "gold 100/coupons 5/item #9999x3");
    }

    #[test]
    fn test_aliases_share_a_category() {
        assert_eq!(RewardKind::from_id(1001), RewardKind::Gold);
        assert_eq!(RewardKind::from_id(1101), RewardKind::Exp);
        assert_eq!(
            summarize(&[RewardLineItem::new(2, 40), RewardLineItem::new(1101, 2)]),
            "exp 40/exp 2"
        );
    }

    #[test]
    fn test_non_positive_counts_are_dropped() {
        let items = [RewardLineItem::new(1, 0), RewardLineItem::new(5, -2)];
        assert_eq!(summarize(&items), "");
        assert_eq!(summarize(&[]), "");
    }
}
