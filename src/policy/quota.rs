//! Usage quota enforcement
//!
//! Non-privileged users get `daily_limit` generations. The counter only
//! goes back to zero through an explicit reset; there is no calendar
//! rollover despite the name.

use std::collections::HashSet;

use crate::session::Session;

/// Default number of free generations per user
pub const DEFAULT_DAILY_LIMIT: u32 = 10;

/// Outcome of a quota check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Allowed,
    Denied,
}

impl QuotaDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, QuotaDecision::Allowed)
    }
}

/// Decides whether a generation may run and consumes one unit if so.
///
/// Admins and pro sessions are always allowed and never counted. A denied
/// request leaves the session untouched, so repeated denials are idempotent.
pub fn check_and_consume_quota(
    session: &mut Session,
    is_admin: bool,
    daily_limit: u32,
) -> QuotaDecision {
    if is_admin || session.is_pro {
        return QuotaDecision::Allowed;
    }

    if session.message_count >= daily_limit {
        return QuotaDecision::Denied;
    }

    session.message_count += 1;
    QuotaDecision::Allowed
}

/// Privileged user identities that bypass the quota.
#[derive(Debug, Clone, Default)]
pub struct AdminList {
    admins: HashSet<String>,
}

impl AdminList {
    pub fn new<I, S>(admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let admins: HashSet<String> = admins
            .into_iter()
            .map(Into::into)
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        if admins.is_empty() {
            tracing::info!("No admin users configured");
        } else {
            tracing::info!("Admin list initialized with {} user(s)", admins.len());
        }

        Self { admins }
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admins.contains(user_id)
    }

    pub fn len(&self) -> usize {
        self.admins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.admins.is_empty()
    }
}

/// Admin set plus limit, bundled for the conversation service
#[derive(Debug, Clone)]
pub struct QuotaPolicy {
    admins: AdminList,
    daily_limit: u32,
}

impl QuotaPolicy {
    pub fn new(admins: AdminList, daily_limit: u32) -> Self {
        Self {
            admins,
            daily_limit,
        }
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admins.is_admin(user_id)
    }

    /// Applies `check_and_consume_quota` for `user_id`'s session
    pub fn check(&self, user_id: &str, session: &mut Session) -> QuotaDecision {
        check_and_consume_quota(session, self.is_admin(user_id), self.daily_limit)
    }

    /// Generations left before the limit; `None` when unlimited
    pub fn remaining(&self, user_id: &str, session: &Session) -> Option<u32> {
        if self.is_admin(user_id) || session.is_pro {
            None
        } else {
            Some(self.daily_limit.saturating_sub(session.message_count))
        }
    }
}
