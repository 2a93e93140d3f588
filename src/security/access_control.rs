//! Static allow / deny lists.
//!
//! Both lists live in one map keyed by IP, so an address can only ever be in
//! one of them: listing it on one side replaces the other.

use dashmap::DashMap;
use serde::Serialize;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Which list an address is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    /// Whitelisted: always admitted.
    Allow,
    /// Blacklisted: always rejected.
    Deny,
}

/// Mutually exclusive whitelist / blacklist registry.
#[derive(Debug, Default)]
pub struct AccessList {
    entries: DashMap<IpAddr, ListKind>,
    allowed: AtomicUsize,
    denied: AtomicUsize,
}

impl AccessList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `ip` on the whitelist, removing it from the blacklist.
    pub fn allow(&self, ip: IpAddr) {
        self.set(ip, ListKind::Allow);
    }

    /// Put `ip` on the blacklist, removing it from the whitelist.
    pub fn deny(&self, ip: IpAddr) {
        self.set(ip, ListKind::Deny);
    }

    /// Remove `ip` from the whitelist. Returns false if it was not whitelisted.
    pub fn remove_allowed(&self, ip: IpAddr) -> bool {
        self.remove_kind(ip, ListKind::Allow)
    }

    /// Remove `ip` from the blacklist. Returns false if it was not blacklisted.
    pub fn remove_denied(&self, ip: IpAddr) -> bool {
        self.remove_kind(ip, ListKind::Deny)
    }

    pub fn lookup(&self, ip: IpAddr) -> Option<ListKind> {
        self.entries.get(&ip).map(|kind| *kind)
    }

    pub fn is_allowed(&self, ip: IpAddr) -> bool {
        self.lookup(ip) == Some(ListKind::Allow)
    }

    pub fn is_denied(&self, ip: IpAddr) -> bool {
        self.lookup(ip) == Some(ListKind::Deny)
    }

    pub fn allowed_count(&self) -> usize {
        self.allowed.load(Ordering::Relaxed)
    }

    pub fn denied_count(&self) -> usize {
        self.denied.load(Ordering::Relaxed)
    }

    fn counter(&self, kind: ListKind) -> &AtomicUsize {
        match kind {
            ListKind::Allow => &self.allowed,
            ListKind::Deny => &self.denied,
        }
    }

    fn set(&self, ip: IpAddr, kind: ListKind) {
        // Counters move while the entry's shard lock is held.
        let mut entry = self.entries.entry(ip).or_insert_with(|| {
            self.counter(kind).fetch_add(1, Ordering::Relaxed);
            kind
        });
        let previous = *entry;
        if previous != kind {
            self.counter(previous).fetch_sub(1, Ordering::Relaxed);
            self.counter(kind).fetch_add(1, Ordering::Relaxed);
            *entry = kind;
        }
    }

    fn remove_kind(&self, ip: IpAddr, kind: ListKind) -> bool {
        let removed = self.entries.remove_if(&ip, |_, current| *current == kind);
        if removed.is_some() {
            self.counter(kind).fetch_sub(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_lists_are_mutually_exclusive() {
        let list = AccessList::new();
        let addr = ip("10.0.0.2");

        list.allow(addr);
        assert!(list.is_allowed(addr));
        assert_eq!((list.allowed_count(), list.denied_count()), (1, 0));

        list.deny(addr);
        assert!(list.is_denied(addr));
        assert!(!list.is_allowed(addr));
        assert_eq!((list.allowed_count(), list.denied_count()), (0, 1));

        list.allow(addr);
        assert!(list.is_allowed(addr));
        assert_eq!((list.allowed_count(), list.denied_count()), (1, 0));
    }

    #[test]
    fn test_repeated_insert_counts_once() {
        let list = AccessList::new();
        list.deny(ip("192.0.2.1"));
        list.deny(ip("192.0.2.1"));
        list.deny(ip("192.0.2.2"));
        assert_eq!(list.denied_count(), 2);
    }

    #[test]
    fn test_remove_only_matching_kind() {
        let list = AccessList::new();
        let addr = ip("2001:db8::1");
        list.allow(addr);

        assert!(!list.remove_denied(addr));
        assert!(list.is_allowed(addr));

        assert!(list.remove_allowed(addr));
        assert_eq!(list.lookup(addr), None);
        assert_eq!(list.allowed_count(), 0);
    }
}
