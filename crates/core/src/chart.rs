//! Chart-of-accounts hierarchy.
//!
//! Accounts form a forest per client through `parent_id`. This module builds
//! the nested view and guards parent changes against cycles.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Revenue => "revenue",
            Self::Expense => "expense",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asset" => Ok(Self::Asset),
            "liability" => Ok(Self::Liability),
            "equity" => Ok(Self::Equity),
            "revenue" => Ok(Self::Revenue),
            "expense" => Ok(Self::Expense),
            other => Err(CoreError::Validation(format!(
                "Invalid account type '{other}'. Must be one of: asset, liability, equity, revenue, expense"
            ))),
        }
    }
}

impl TryFrom<String> for AccountType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Minimal view of an account needed to arrange the hierarchy.
pub trait ChartItem {
    fn id(&self) -> DbId;
    fn parent_id(&self) -> Option<DbId>;
    fn code(&self) -> &str;
}

/// An account with its children, sorted by code.
#[derive(Debug, Clone, Serialize)]
pub struct AccountTreeNode<T: Serialize> {
    #[serde(flatten)]
    pub account: T,
    pub children: Vec<AccountTreeNode<T>>,
}

/// Arrange a flat account list into a forest.
///
/// Accounts whose parent is missing from `accounts` (for example an inactive
/// parent that was filtered out) are promoted to roots.
pub fn build_tree<T>(accounts: Vec<T>) -> Vec<AccountTreeNode<T>>
where
    T: ChartItem + Serialize,
{
    let ids: HashSet<DbId> = accounts.iter().map(ChartItem::id).collect();
    let mut children_of: HashMap<Option<DbId>, Vec<T>> = HashMap::new();
    for account in accounts {
        let parent = account.parent_id().filter(|p| ids.contains(p));
        children_of.entry(parent).or_default().push(account);
    }
    attach_children(None, &mut children_of)
}

fn attach_children<T>(
    parent: Option<DbId>,
    children_of: &mut HashMap<Option<DbId>, Vec<T>>,
) -> Vec<AccountTreeNode<T>>
where
    T: ChartItem + Serialize,
{
    let mut level = children_of.remove(&parent).unwrap_or_default();
    level.sort_by(|a, b| a.code().cmp(b.code()));
    level
        .into_iter()
        .map(|account| {
            let children = attach_children(Some(account.id()), children_of);
            AccountTreeNode { account, children }
        })
        .collect()
}

/// Reject a parent assignment that would make `account_id` its own ancestor.
///
/// `parents` maps every account of the client to its current parent.
pub fn ensure_no_cycle(
    parents: &HashMap<DbId, Option<DbId>>,
    account_id: DbId,
    new_parent_id: DbId,
) -> Result<(), CoreError> {
    if account_id == new_parent_id {
        return Err(CoreError::Validation(
            "An account cannot be its own parent".into(),
        ));
    }

    let mut seen = HashSet::new();
    let mut cursor = Some(new_parent_id);
    while let Some(current) = cursor {
        if current == account_id {
            return Err(CoreError::Validation(format!(
                "Account {new_parent_id} is a descendant of account {account_id}; \
                 moving it there would create a cycle"
            )));
        }
        if !seen.insert(current) {
            break;
        }
        cursor = parents.get(&current).copied().flatten();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    struct Acc {
        id: DbId,
        parent_id: Option<DbId>,
        code: String,
    }

    impl ChartItem for Acc {
        fn id(&self) -> DbId {
            self.id
        }
        fn parent_id(&self) -> Option<DbId> {
            self.parent_id
        }
        fn code(&self) -> &str {
            &self.code
        }
    }

    fn acc(id: DbId, parent_id: Option<DbId>, code: &str) -> Acc {
        Acc {
            id,
            parent_id,
            code: code.into(),
        }
    }

    #[test]
    fn builds_nested_sorted_tree() {
        let tree = build_tree(vec![
            acc(3, Some(1), "1200"),
            acc(1, None, "1000"),
            acc(2, Some(1), "1100"),
            acc(4, None, "2000"),
            acc(5, Some(2), "1110"),
        ]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].account.code, "1000");
        let children: Vec<&str> = tree[0].children.iter().map(|c| c.account.code.as_str()).collect();
        assert_eq!(children, ["1100", "1200"]);
        assert_eq!(tree[0].children[0].children[0].account.id, 5);
        assert!(tree[1].children.is_empty());
    }

    #[test]
    fn orphans_become_roots() {
        let tree = build_tree(vec![acc(2, Some(99), "1100"), acc(1, None, "1000")]);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn tree_serializes_flattened() {
        let tree = build_tree(vec![acc(1, None, "1000")]);
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json[0]["code"], "1000");
        assert_eq!(json[0]["children"], serde_json::json!([]));
    }

    #[test]
    fn cycle_detected() {
        // 1 <- 2 <- 3
        let parents = HashMap::from([(1, None), (2, Some(1)), (3, Some(2))]);
        assert!(ensure_no_cycle(&parents, 1, 3).is_err());
        assert!(ensure_no_cycle(&parents, 2, 2).is_err());
        assert!(ensure_no_cycle(&parents, 3, 1).is_ok());
    }

    #[test]
    fn existing_loops_do_not_hang() {
        let parents = HashMap::from([(1, Some(2)), (2, Some(1)), (3, None)]);
        assert!(ensure_no_cycle(&parents, 3, 1).is_ok());
    }

    #[test]
    fn account_type_parses() {
        assert_eq!("equity".parse::<AccountType>().unwrap(), AccountType::Equity);
        assert!("income".parse::<AccountType>().is_err());
    }
}
