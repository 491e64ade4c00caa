//! # Repository Module
//!
//! Database repository implementations for the cash register tables.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Kinds of Methods                                 │
//! │                                                                         │
//! │  db.registers().list(&scope)          &self → uses the pool            │
//! │  db.movements().get(&scope, id)       (independent reads)              │
//! │                                                                         │
//! │  MovementRepository::insert(&mut tx, &m)   associated fn → uses the    │
//! │  RegisterRepository::apply_delta(&mut tx)  caller's connection, so     │
//! │                                            the engine can compose      │
//! │                                            them in one transaction     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`RegisterRepository`](register::RegisterRepository) - Register lifecycle rows
//! - [`MovementRepository`](movement::MovementRepository) - Append-only ledger
//! - [`AuditRepository`](audit::AuditRepository) - Reconciliation snapshots

pub mod audit;
pub mod movement;
pub mod register;
