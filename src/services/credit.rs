//! Credit-limit bookkeeping for clients and suppliers.
//!
//! Every credit-consuming write goes through [`reserve_credit`] inside the
//! caller's transaction. The counterparty row is locked with `FOR UPDATE`
//! before the limit check, so two concurrent operations on the same client or
//! supplier are serialised and cannot both pass the check on a stale balance.

use sqlx::PgConnection;
use thiserror::Error;

/// Slack for float comparisons on money.
const EPSILON: f64 = 1e-9;

#[derive(Debug, Error, PartialEq)]
pub enum CreditError {
    #[error("Insufficient credit: limit {limit:.2}, used {used:.2}, requested {requested:.2}")]
    LimitExceeded { limit: f64, used: f64, requested: f64 },
    #[error("Credit amount must be greater than 0 (got {0})")]
    NonPositiveAmount(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counterparty {
    Client,
    Supplier,
}

impl Counterparty {
    pub fn table(self) -> &'static str {
        match self {
            Counterparty::Client => "clients",
            Counterparty::Supplier => "suppliers",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Counterparty::Client => "Client",
            Counterparty::Supplier => "Supplier",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, sqlx::FromRow)]
pub struct CreditLine {
    #[sqlx(rename = "credit_limit")]
    pub limit: f64,
    #[sqlx(rename = "credit_used")]
    pub used: f64,
}

impl CreditLine {
    pub fn available(&self) -> f64 {
        (self.limit - self.used).max(0.0)
    }

    /// Line after consuming `amount`, or an error if it would pass the limit.
    pub fn reserve(&self, amount: f64) -> Result<CreditLine, CreditError> {
        if amount.is_nan() || amount <= 0.0 {
            return Err(CreditError::NonPositiveAmount(amount));
        }
        let used = self.used + amount;
        if used > self.limit + EPSILON {
            return Err(CreditError::LimitExceeded { limit: self.limit, used: self.used, requested: amount });
        }
        Ok(CreditLine { limit: self.limit, used: used.min(self.limit) })
    }

    /// Line after paying back or un-reserving `amount`; never goes below zero.
    pub fn release(&self, amount: f64) -> Result<CreditLine, CreditError> {
        if amount.is_nan() || amount <= 0.0 {
            return Err(CreditError::NonPositiveAmount(amount));
        }
        Ok(CreditLine { limit: self.limit, used: (self.used - amount).max(0.0) })
    }
}

async fn lock_line(
    conn: &mut PgConnection,
    party: Counterparty,
    id: i64,
) -> Result<Option<CreditLine>, sqlx::Error> {
    let sql = format!(
        "SELECT credit_limit, credit_used FROM {} WHERE id = $1 FOR UPDATE",
        party.table()
    );
    sqlx::query_as::<_, CreditLine>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await
}

async fn store_used(
    conn: &mut PgConnection,
    party: Counterparty,
    id: i64,
    used: f64,
) -> Result<(), sqlx::Error> {
    let sql = format!("UPDATE {} SET credit_used = $2 WHERE id = $1", party.table());
    sqlx::query(&sql).bind(id).bind(used).execute(conn).await?;
    Ok(())
}

/// Check-and-consume credit on a counterparty row. Must run inside a transaction.
pub async fn reserve_credit(
    conn: &mut PgConnection,
    party: Counterparty,
    id: i64,
    amount: f64,
) -> Result<CreditLine, crate::error::AppError> {
    let line = lock_line(&mut *conn, party, id)
        .await?
        .ok_or_else(|| crate::error::AppError::not_found(format!("{} not found", party.label())))?;

    let updated = line.reserve(amount)?;
    store_used(conn, party, id, updated.used).await?;

    tracing::debug!(party = party.table(), id, amount, used = updated.used, "Credit reserved");
    Ok(updated)
}

/// Give credit back (payment or cancellation). Must run inside a transaction.
pub async fn release_credit(
    conn: &mut PgConnection,
    party: Counterparty,
    id: i64,
    amount: f64,
) -> Result<CreditLine, crate::error::AppError> {
    let line = lock_line(&mut *conn, party, id)
        .await?
        .ok_or_else(|| crate::error::AppError::not_found(format!("{} not found", party.label())))?;

    let updated = line.release(amount)?;
    store_used(conn, party, id, updated.used).await?;

    tracing::debug!(party = party.table(), id, amount, used = updated.used, "Credit released");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[test]
    fn reserve_within_limit() {
        let line = CreditLine { limit: 1000.0, used: 250.0 };
        let next = line.reserve(750.0).unwrap();
        assert_eq!(next.used, 1000.0);
        assert_eq!(next.available(), 0.0);
    }

    #[test]
    fn reserve_past_limit_fails_without_change() {
        let line = CreditLine { limit: 1000.0, used: 900.0 };
        let err = line.reserve(100.01).unwrap_err();
        assert_eq!(err, CreditError::LimitExceeded { limit: 1000.0, used: 900.0, requested: 100.01 });
    }

    #[test]
    fn zero_limit_means_no_credit() {
        let line = CreditLine { limit: 0.0, used: 0.0 };
        assert!(matches!(line.reserve(1.0), Err(CreditError::LimitExceeded { .. })));
    }

    #[test]
    fn amounts_must_be_positive() {
        let line = CreditLine { limit: 10.0, used: 0.0 };
        assert_eq!(line.reserve(0.0), Err(CreditError::NonPositiveAmount(0.0)));
        assert_eq!(line.release(-5.0), Err(CreditError::NonPositiveAmount(-5.0)));
    }

    #[test]
    fn release_floors_at_zero() {
        let line = CreditLine { limit: 500.0, used: 120.0 };
        assert_eq!(line.release(200.0).unwrap().used, 0.0);
        assert_eq!(line.release(20.0).unwrap().used, 100.0);
    }

    // The mutex plays the role of the row lock taken by `FOR UPDATE`.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_never_exceed_limit() {
        let line = Arc::new(Mutex::new(CreditLine { limit: 1000.0, used: 0.0 }));

        let mut handles = Vec::new();
        for _ in 0..40 {
            let line = Arc::clone(&line);
            handles.push(tokio::spawn(async move {
                let mut guard = line.lock().await;
                match guard.reserve(75.0) {
                    Ok(next) => {
                        tokio::task::yield_now().await;
                        *guard = next;
                        true
                    }
                    Err(_) => false,
                }
            }));
        }

        let mut committed = 0;
        for h in handles {
            if h.await.unwrap() {
                committed += 1;
            }
        }

        let final_line = *line.lock().await;
        assert_eq!(committed, 13);
        assert!(final_line.used <= final_line.limit);
        assert!((final_line.used - 975.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn two_writers_whose_sum_exceeds_limit_do_not_both_commit() {
        let line = Arc::new(Mutex::new(CreditLine { limit: 100.0, used: 20.0 }));

        let a = {
            let line = Arc::clone(&line);
            tokio::spawn(async move {
                let mut g = line.lock().await;
                g.reserve(60.0).map(|next| *g = next).is_ok()
            })
        };
        let b = {
            let line = Arc::clone(&line);
            tokio::spawn(async move {
                let mut g = line.lock().await;
                g.reserve(50.0).map(|next| *g = next).is_ok()
            })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert!(a ^ b);
        assert!(line.lock().await.used <= 100.0);
    }
}
