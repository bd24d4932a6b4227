//! Chart of accounts hierarchy
//!
//! Accounts form a forest through `parent_account_id`. [`AccountTree`] is an
//! arena over a borrowed account slice: positions in the slice are the node
//! handles and parent links are resolved once into integer indices, so every
//! ancestry query is a walk over `Vec<Option<usize>>` guarded by a visited set.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::models::Account;
use crate::types::AccountType;

/// Problem found while validating an account form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountIssue {
    MissingField { field: &'static str },
    DuplicateAccountNumber { account_number: String },
}

impl std::fmt::Display for AccountIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountIssue::MissingField { field } => write!(f, "{} is required", field),
            AccountIssue::DuplicateAccountNumber { account_number } => {
                write!(f, "account number {} is already used by another account", account_number)
            }
        }
    }
}

/// Why a parent assignment was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentRejection {
    SelfParent,
    UnknownParent { parent_id: String },
    TypeMismatch { expected: AccountType, found: AccountType },
    /// The proposed parent sits below the account
    Descendant { parent_id: String },
    /// The proposed parent's ancestry already loops
    ExistingCycle { at: String },
}

impl std::fmt::Display for ParentRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParentRejection::SelfParent => write!(f, "an account cannot be its own parent"),
            ParentRejection::UnknownParent { parent_id } => write!(f, "parent {} does not exist", parent_id),
            ParentRejection::TypeMismatch { expected, found } => {
                write!(f, "parent must be a {} account, found {}", expected, found)
            }
            ParentRejection::Descendant { parent_id } => {
                write!(f, "{} is a descendant of this account and would create a cycle", parent_id)
            }
            ParentRejection::ExistingCycle { at } => {
                write!(f, "the parent chain already contains a cycle at {}", at)
            }
        }
    }
}

/// Account tree node for hierarchical display
#[derive(Debug, Clone, Serialize)]
pub struct AccountTreeNode {
    pub account: Account,
    /// Part of a parent cycle stored before cycles were rejected
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub in_cycle: bool,
    pub children: Vec<AccountTreeNode>,
}

/// Result of walking up the parent chain
struct AncestorWalk {
    chain: Vec<usize>,
    /// Position where the walk met a node it had already visited
    cycle_at: Option<usize>,
}

/// Arena view over a slice of accounts
pub struct AccountTree<'a> {
    accounts: &'a [Account],
    index: HashMap<&'a str, usize>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
}

impl<'a> AccountTree<'a> {
    /// Index the accounts. Dangling parent references are treated as roots.
    pub fn new(accounts: &'a [Account]) -> Self {
        let index: HashMap<&'a str, usize> = accounts
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id.as_str(), i))
            .collect();

        let parents: Vec<Option<usize>> = accounts
            .iter()
            .map(|a| a.parent_account_id.as_deref().and_then(|p| index.get(p).copied()))
            .collect();

        let mut children = vec![Vec::new(); accounts.len()];
        for (i, parent) in parents.iter().enumerate() {
            if let Some(p) = parent {
                children[*p].push(i);
            }
        }
        for list in children.iter_mut() {
            list.sort_by(|a, b| accounts[*a].account_number.cmp(&accounts[*b].account_number));
        }

        Self {
            accounts,
            index,
            parents,
            children,
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&'a Account> {
        self.position(id).map(|i| &self.accounts[i])
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn parent_of(&self, id: &str) -> Option<&'a Account> {
        self.position(id)
            .and_then(|i| self.parents[i])
            .map(|p| &self.accounts[p])
    }

    /// Parent chain of `id`, nearest first, cut short where it loops
    pub fn ancestors(&self, id: &str) -> Vec<&'a Account> {
        self.position(id)
            .map(|start| self.walk_up(start).chain.into_iter().map(|i| &self.accounts[i]).collect())
            .unwrap_or_default()
    }

    /// Direct children, ordered by account number
    pub fn children(&self, id: &str) -> Vec<&'a Account> {
        self.position(id)
            .map(|i| self.children[i].iter().map(|c| &self.accounts[*c]).collect())
            .unwrap_or_default()
    }

    /// All accounts below `id`, breadth first. Terminates on cyclic data.
    pub fn descendants(&self, id: &str) -> Vec<&'a Account> {
        let Some(start) = self.position(id) else {
            return Vec::new();
        };
        let mut seen = HashSet::from([start]);
        let mut queue: std::collections::VecDeque<usize> = self.children[start].iter().copied().collect();
        let mut out = Vec::new();
        while let Some(i) = queue.pop_front() {
            if !seen.insert(i) {
                continue;
            }
            out.push(&self.accounts[i]);
            queue.extend(self.children[i].iter().copied());
        }
        out
    }

    fn walk_up(&self, start: usize) -> AncestorWalk {
        let mut visited = HashSet::from([start]);
        let mut chain = Vec::new();
        let mut current = start;
        while let Some(parent) = self.parents[current] {
            if !visited.insert(parent) {
                return AncestorWalk {
                    chain,
                    cycle_at: Some(parent),
                };
            }
            chain.push(parent);
            current = parent;
        }
        AncestorWalk { chain, cycle_at: None }
    }

    /// Check whether `candidate_ancestor` lies above `node`.
    ///
    /// The walk only follows parents of the node's own account type and keeps a
    /// visited set: on cyclic data it stops and answers `false`.
    pub fn is_descendant_of(&self, candidate_ancestor: &str, node: &str) -> bool {
        let Some(start) = self.position(node) else {
            return false;
        };
        let family = self.accounts[start].account_type;
        let mut visited = HashSet::from([start]);
        let mut current = start;

        while let Some(parent) = self.parents[current] {
            let account = &self.accounts[parent];
            if account.account_type != family {
                return false;
            }
            if account.id == candidate_ancestor {
                return true;
            }
            if !visited.insert(parent) {
                log::debug!(
                    target: "ledgerdesk::accounts",
                    "cycle detected above account {} at {}",
                    node,
                    account.id
                );
                return false;
            }
            current = parent;
        }
        false
    }

    /// Accounts that may become the parent of `node` without creating a cycle:
    /// same account type, not the node itself, not below the node.
    pub fn possible_parents(&self, node: &Account) -> Vec<&'a Account> {
        self.accounts
            .iter()
            .filter(|candidate| candidate.account_type == node.account_type)
            .filter(|candidate| candidate.id != node.id)
            .filter(|candidate| !self.is_descendant_of(&node.id, &candidate.id))
            .collect()
    }

    /// Depth of an account (root = 1), `None` when unknown or on a cycle
    pub fn depth_of(&self, id: &str) -> Option<u32> {
        let start = self.position(id)?;
        let walk = self.walk_up(start);
        match walk.cycle_at {
            Some(_) => None,
            None => Some(walk.chain.len() as u32 + 1),
        }
    }

    /// Every pre-existing cycle in the parent links, each as a list of ids
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        // 0 = unvisited, 1 = on the current path, 2 = finished
        let mut state = vec![0u8; self.accounts.len()];
        let mut cycles = Vec::new();

        for start in 0..self.accounts.len() {
            if state[start] != 0 {
                continue;
            }
            let mut path = Vec::new();
            let mut current = Some(start);
            while let Some(i) = current {
                match state[i] {
                    0 => {
                        state[i] = 1;
                        path.push(i);
                        current = self.parents[i];
                    }
                    1 => {
                        if let Some(pos) = path.iter().position(|&p| p == i) {
                            cycles.push(
                                path[pos..]
                                    .iter()
                                    .map(|&p| self.accounts[p].id.clone())
                                    .collect(),
                            );
                        }
                        break;
                    }
                    _ => break,
                }
            }
            for i in path {
                state[i] = 2;
            }
        }
        cycles
    }

    /// Validate giving `node` the parent `new_parent`.
    ///
    /// `node` may be an account that is not stored yet.
    pub fn check_parent_assignment(
        &self,
        node: &Account,
        new_parent: Option<&str>,
    ) -> Result<(), ParentRejection> {
        let Some(parent_id) = new_parent else {
            return Ok(());
        };
        if parent_id == node.id {
            return Err(ParentRejection::SelfParent);
        }
        let Some(parent_pos) = self.position(parent_id) else {
            return Err(ParentRejection::UnknownParent {
                parent_id: parent_id.to_string(),
            });
        };
        let parent = &self.accounts[parent_pos];
        if parent.account_type != node.account_type {
            return Err(ParentRejection::TypeMismatch {
                expected: node.account_type,
                found: parent.account_type,
            });
        }

        let walk = self.walk_up(parent_pos);
        if walk.chain.iter().any(|&i| self.accounts[i].id == node.id) {
            return Err(ParentRejection::Descendant {
                parent_id: parent_id.to_string(),
            });
        }
        if let Some(at) = walk.cycle_at {
            return Err(ParentRejection::ExistingCycle {
                at: self.accounts[at].id.clone(),
            });
        }
        Ok(())
    }

    /// Roots with their subtrees, ordered by account number.
    ///
    /// Accounts with no path to a real root hang off a pre-existing cycle. Each
    /// cycle is appended as an extra root entered at its lowest account number,
    /// with the cycle members flagged `in_cycle`.
    pub fn build_forest(&self) -> Vec<AccountTreeNode> {
        let by_number = |a: &usize, b: &usize| self.accounts[*a].account_number.cmp(&self.accounts[*b].account_number);

        let mut roots: Vec<usize> = (0..self.accounts.len())
            .filter(|&i| self.parents[i].is_none())
            .collect();
        roots.sort_by(by_number);

        let mut on_cycle = HashSet::new();
        let mut entries = Vec::new();
        for cycle in self.find_cycles() {
            let members: Vec<usize> = cycle.iter().filter_map(|id| self.position(id)).collect();
            if let Some(entry) = members.iter().copied().min_by(by_number) {
                entries.push(entry);
            }
            on_cycle.extend(members);
        }
        entries.sort_by(by_number);

        let mut visited = HashSet::new();
        roots
            .into_iter()
            .chain(entries)
            .map(|r| self.build_node(r, &on_cycle, &mut visited))
            .collect()
    }

    fn build_node(&self, i: usize, on_cycle: &HashSet<usize>, visited: &mut HashSet<usize>) -> AccountTreeNode {
        visited.insert(i);
        let mut children = Vec::new();
        for &c in &self.children[i] {
            if !visited.contains(&c) {
                children.push(self.build_node(c, on_cycle, visited));
            }
        }
        AccountTreeNode {
            account: self.accounts[i].clone(),
            in_cycle: on_cycle.contains(&i),
            children,
        }
    }
}

/// Check whether `candidate_ancestor` lies above `node` in `accounts`
pub fn is_descendant_of(candidate_ancestor: &str, node: &str, accounts: &[Account]) -> bool {
    AccountTree::new(accounts).is_descendant_of(candidate_ancestor, node)
}

/// Accounts of the same type that can parent `node` without creating a cycle
pub fn possible_parents<'a>(node: &Account, accounts: &'a [Account]) -> Vec<&'a Account> {
    AccountTree::new(accounts).possible_parents(node)
}

/// Validate an account form before saving.
///
/// `editing_id` is the id of the account being edited, so it may keep its own number.
pub fn validate_account(form: &Account, accounts: &[Account], editing_id: Option<&str>) -> Vec<AccountIssue> {
    let mut issues = Vec::new();
    let number = form.account_number.trim();

    if number.is_empty() {
        issues.push(AccountIssue::MissingField { field: "account_number" });
    }
    if form.account_name.trim().is_empty() {
        issues.push(AccountIssue::MissingField { field: "account_name" });
    }

    if !number.is_empty() {
        let taken = accounts
            .iter()
            .filter(|a| Some(a.id.as_str()) != editing_id)
            .any(|a| a.account_number.trim() == number);
        if taken {
            issues.push(AccountIssue::DuplicateAccountNumber {
                account_number: number.to_string(),
            });
        }
    }

    issues
}
