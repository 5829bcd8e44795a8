//! # Charity Fund
//!
//! Tracks charity projects and the donations that fund them. Whenever a
//! project or a donation is created, unallocated donation money is poured
//! into open projects, oldest first, until one side runs out.
//!
//! | Layer        | Module                                   |
//! |--------------|------------------------------------------|
//! | Entities     | [`models`]                               |
//! | Core         | [`matching`], [`allocation`], [`guard`]  |
//! | Persistence  | [`db`]                                   |
//! | Service      | [`service`], [`report`]                  |
//! | HTTP         | [`api`], [`auth`]                        |

pub mod allocation;
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod guard;
pub mod matching;
pub mod models;
pub mod report;
pub mod service;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_api;
