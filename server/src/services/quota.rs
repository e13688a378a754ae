//! Daily message quota.

use chrono::{DateTime, Utc};
use serde::Serialize;
use synthia_db::users::{Tier, User};
use synthia_db::{Database, DbError};

use super::tiers::{UNLIMITED, tier_info};

pub fn can_send(limit: i64, used: i64) -> bool {
    limit == UNLIMITED || used < limit
}

/// Messages left today, or `-1` when unlimited.
pub fn remaining(limit: i64, used: i64) -> i64 {
    if limit == UNLIMITED {
        UNLIMITED
    } else {
        (limit - used).max(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub tier: Tier,
    pub used: i64,
    pub limit: i64,
    pub remaining: i64,
}

impl Usage {
    pub fn new(tier: Tier, used: i64) -> Self {
        let limit = tier_info(tier).limits.messages_per_day;
        Self {
            tier,
            used,
            limit,
            remaining: remaining(limit, used),
        }
    }

    pub fn allows_another(&self) -> bool {
        can_send(self.limit, self.used)
    }
}

/// Today's usage for `user` under their effective tier.
pub fn usage_for(db: &Database, user: &User, now: DateTime<Utc>) -> Result<Usage, DbError> {
    let used = db.message_count_on(&user.id, now)?;
    Ok(Usage::new(user.effective_tier(now), used))
}

/// Atomically claim a message slot before the reply is generated.
///
/// `Err(usage)` carries the current usage when the daily cap is reached.
pub fn reserve_message(
    db: &Database,
    user: &User,
    now: DateTime<Utc>,
) -> Result<Result<Usage, Usage>, DbError> {
    let tier = user.effective_tier(now);
    let limit = tier_info(tier).limits.messages_per_day;
    if limit == UNLIMITED {
        let used = db.increment_message_count(&user.id, now)?;
        return Ok(Ok(Usage::new(tier, used)));
    }
    match db.reserve_message_slot(&user.id, limit, now)? {
        Some(used) => Ok(Ok(Usage::new(tier, used))),
        None => {
            let used = db.message_count_on(&user.id, now)?;
            Ok(Err(Usage::new(tier, used)))
        }
    }
}

/// Return a slot whose reply could not be produced.
pub fn release_message(db: &Database, user: &User, now: DateTime<Utc>) -> Result<(), DbError> {
    db.release_message_slot(&user.id, now)
}
