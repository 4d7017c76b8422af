//! Turn admission: identity and message quota.
//!
//! Quota storage lives elsewhere; [`QuotaGate`] is the seam. Limits are
//! checked daily window first, then monthly.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Quota window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsagePeriod {
    Daily,
    Monthly,
}

impl std::fmt::Display for UsagePeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UsagePeriod::Daily => write!(f, "daily"),
            UsagePeriod::Monthly => write!(f, "monthly"),
        }
    }
}

/// Usage against one window's limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageWindow {
    pub usage_count: u64,
    pub limit_count: u64,
}

impl UsageWindow {
    pub fn new(usage_count: u64, limit_count: u64) -> Self {
        Self {
            usage_count,
            limit_count,
        }
    }

    pub fn exceeded(&self) -> bool {
        self.usage_count >= self.limit_count
    }
}

/// Current usage in both windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub daily: UsageWindow,
    pub monthly: UsageWindow,
}

impl UsageSnapshot {
    /// Daily first, then monthly.
    pub fn check(&self) -> LimitCheck {
        if self.daily.exceeded() {
            LimitCheck::Exceeded {
                period: UsagePeriod::Daily,
                usage: *self,
            }
        } else if self.monthly.exceeded() {
            LimitCheck::Exceeded {
                period: UsagePeriod::Monthly,
                usage: *self,
            }
        } else {
            LimitCheck::WithinLimit
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitCheck {
    WithinLimit,
    Exceeded {
        period: UsagePeriod,
        usage: UsageSnapshot,
    },
}

/// What a turn consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageKind {
    Message,
}

/// Usage accounting seam.
#[async_trait]
pub trait QuotaGate: Send + Sync {
    async fn usage(&self, identity: &Identity) -> anyhow::Result<UsageSnapshot>;

    async fn increment(&self, identity: &Identity, kind: UsageKind) -> anyhow::Result<()>;

    async fn check_limit(&self, identity: &Identity) -> anyhow::Result<LimitCheck> {
        Ok(self.usage(identity).await?.check())
    }
}

/// Process-local counters with fixed limits. Windows never roll over.
#[derive(Debug)]
pub struct MemoryQuotaGate {
    daily_limit: u64,
    monthly_limit: u64,
    counts: DashMap<String, u64>,
}

impl MemoryQuotaGate {
    pub fn new(daily_limit: u64, monthly_limit: u64) -> Self {
        Self {
            daily_limit,
            monthly_limit,
            counts: DashMap::new(),
        }
    }

    /// No effective limit.
    pub fn unlimited() -> Self {
        Self::new(u64::MAX, u64::MAX)
    }

    pub fn count(&self, identity: &Identity) -> u64 {
        self.counts
            .get(&identity.user_id)
            .map(|c| *c)
            .unwrap_or(0)
    }
}

#[async_trait]
impl QuotaGate for MemoryQuotaGate {
    async fn usage(&self, identity: &Identity) -> anyhow::Result<UsageSnapshot> {
        let used = self.count(identity);
        Ok(UsageSnapshot {
            daily: UsageWindow::new(used, self.daily_limit),
            monthly: UsageWindow::new(used, self.monthly_limit),
        })
    }

    async fn increment(&self, identity: &Identity, kind: UsageKind) -> anyhow::Result<()> {
        match kind {
            UsageKind::Message => {
                *self.counts.entry(identity.user_id.clone()).or_insert(0) += 1;
            }
        }
        Ok(())
    }
}
