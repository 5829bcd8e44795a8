//! Caller identification and the privileged-user check.
//!
//! Authentication happens upstream; requests arrive with the caller's user
//! id in the `X-User-Id` header.

use std::collections::HashSet;

use axum::http::HeaderMap;

use crate::errors::{FundError, Result};

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
}

/// Read the caller from request headers.
pub fn caller_from_headers(headers: &HeaderMap) -> Result<Caller> {
    let raw = headers
        .get(USER_ID_HEADER)
        .ok_or(FundError::Unauthorized)?
        .to_str()
        .map_err(|_| FundError::Unauthorized)?;
    let user_id = raw.trim().parse().map_err(|_| FundError::Unauthorized)?;
    Ok(Caller { user_id })
}

#[derive(Debug, Clone, Default)]
pub struct AuthGate {
    superuser_ids: HashSet<i64>,
}

impl AuthGate {
    pub fn new(superuser_ids: HashSet<i64>) -> Self {
        Self { superuser_ids }
    }

    pub fn is_privileged(&self, caller: &Caller) -> bool {
        self.superuser_ids.contains(&caller.user_id)
    }

    /// Any identified caller.
    pub fn authenticated(&self, headers: &HeaderMap) -> Result<Caller> {
        caller_from_headers(headers)
    }

    /// An identified caller who is also a superuser.
    pub fn privileged(&self, headers: &HeaderMap) -> Result<Caller> {
        let caller = caller_from_headers(headers)?;
        if !self.is_privileged(&caller) {
            return Err(FundError::Forbidden);
        }
        Ok(caller)
    }
}
