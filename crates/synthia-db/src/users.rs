//! End users and their subscription tier.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::{Database, DbError, OptionalExt};

/// Subscription tier. Ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Observer,
    Participant,
    Builder,
    Sovereign,
}

impl Tier {
    pub const ALL: [Tier; 4] = [
        Tier::Observer,
        Tier::Participant,
        Tier::Builder,
        Tier::Sovereign,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Observer => "observer",
            Tier::Participant => "participant",
            Tier::Builder => "builder",
            Tier::Sovereign => "sovereign",
        }
    }

    pub fn is_paid(self) -> bool {
        self != Tier::Observer
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "observer" => Ok(Tier::Observer),
            "participant" => Ok(Tier::Participant),
            "builder" => Ok(Tier::Builder),
            "sovereign" => Ok(Tier::Sovereign),
            other => Err(DbError::InvalidData(format!("unknown tier: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub tier: Tier,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub subscription_ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The tier that governs access right now. A paid tier whose period has
    /// ended falls back to observer even before the cancellation webhook
    /// arrives.
    pub fn effective_tier(&self, now: DateTime<Utc>) -> Tier {
        match self.subscription_ends_at {
            Some(ends_at) if self.tier.is_paid() && ends_at <= now => Tier::Observer,
            _ => self.tier,
        }
    }
}

const USER_COLUMNS: &str = "id, email, name, tier, stripe_customer_id, stripe_subscription_id, \
                            subscription_ends_at, created_at";

fn row_to_user(row: &Row<'_>) -> Result<User, rusqlite::Error> {
    let tier: String = row.get(3)?;
    let tier: Tier = tier.parse().map_err(|e: DbError| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let ends_at: Option<i64> = row.get(6)?;
    let created_at: i64 = row.get(7)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        tier,
        stripe_customer_id: row.get(4)?,
        stripe_subscription_id: row.get(5)?,
        subscription_ends_at: ends_at.and_then(DateTime::from_timestamp_millis),
        created_at: DateTime::from_timestamp_millis(created_at).unwrap_or_default(),
    })
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

impl Database {
    pub fn get_user(&self, id: &str) -> Result<Option<User>, DbError> {
        self.find_user("id", id)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        self.find_user("email", &normalize_email(email))
    }

    pub fn get_user_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<User>, DbError> {
        self.find_user("stripe_subscription_id", subscription_id)
    }

    fn find_user(&self, column: &'static str, value: &str) -> Result<Option<User>, DbError> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
            let user = conn.query_row(&sql, [value], row_to_user).optional()?;
            Ok(user)
        })
    }

    /// Look up a user by email, creating an observer account on first sight.
    pub fn get_or_create_user(
        &self,
        email: &str,
        name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<User, DbError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(DbError::InvalidData("email must not be empty".into()));
        }
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO users (id, email, name, tier, created_at)
                 VALUES (?1, ?2, ?3, 'observer', ?4)",
                rusqlite::params![
                    uuid::Uuid::new_v4().to_string(),
                    email,
                    name,
                    now.timestamp_millis()
                ],
            )?;
            if inserted == 0 && name.is_some() {
                tx.execute(
                    "UPDATE users SET name = ?2 WHERE email = ?1 AND name IS NULL",
                    rusqlite::params![email, name],
                )?;
            }
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
            let user = tx.query_row(&sql, [&email], row_to_user)?;
            tx.commit()?;
            if inserted > 0 {
                tracing::info!(user_id = %user.id, "Created user");
            }
            Ok(user)
        })
    }

    pub fn set_stripe_customer_id(&self, user_id: &str, customer_id: &str) -> Result<(), DbError> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE users SET stripe_customer_id = ?2 WHERE id = ?1",
                rusqlite::params![user_id, customer_id],
            )?;
            if n == 0 {
                return Err(DbError::NotFound(format!("user {user_id}")));
            }
            Ok(())
        })
    }

    /// Record an active subscription and the tier it grants.
    pub fn apply_subscription(
        &self,
        user_id: &str,
        tier: Tier,
        customer_id: Option<&str>,
        subscription_id: &str,
        ends_at: Option<DateTime<Utc>>,
    ) -> Result<(), DbError> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE users SET
                     tier = ?2,
                     stripe_customer_id = COALESCE(?3, stripe_customer_id),
                     stripe_subscription_id = ?4,
                     subscription_ends_at = ?5
                 WHERE id = ?1",
                rusqlite::params![
                    user_id,
                    tier.as_str(),
                    customer_id,
                    subscription_id,
                    ends_at.map(|t| t.timestamp_millis())
                ],
            )?;
            if n == 0 {
                return Err(DbError::NotFound(format!("user {user_id}")));
            }
            Ok(())
        })
    }

    /// Drop the user back to observer. The Stripe customer id is kept so a
    /// later checkout reuses it.
    pub fn cancel_subscription(&self, user_id: &str) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE users SET tier = 'observer', stripe_subscription_id = NULL,
                     subscription_ends_at = NULL
                 WHERE id = ?1",
                [user_id],
            )?;
            Ok(n > 0)
        })
    }
}
