//! # Solve Pacer
//!
//! Adaptive pacing and lifecycle management for jobs fulfilled by a slow,
//! rate-limited, paid external solving service.
//!
//! Every job costs money and every answer goes stale after a couple of
//! minutes, so sending too many jobs wastes money while sending too few
//! makes callers wait. This crate keeps a buffer of ready answers sized to
//! how fast they are actually consumed.
//!
//! ## Core Problem Solved
//!
//! - **Latency hiding**: answers take tens of seconds to produce; callers should not wait that long
//! - **Cost control**: unused answers expire; over-submitting burns balance
//! - **Consistent accounting**: callers and the solver loop mutate the same counters concurrently
//! - **Failure classification**: configuration errors stop everything, transient ones may not
//!
//! ## Key Features
//!
//! - **AutoManager**: self-pacing stream of identical jobs driven by rolling statistics
//! - **ManualManager**: caller-sized batches, deduplicated by a hash of the solving parameters
//! - **SolverService**: dedicated OS thread driving the submit/poll protocol of any
//!   [`core::SolverClient`]
//! - **Restore points**: snapshot and roll back the consumption statistic around bursts
//!
//! ## AutoManager - Self-Pacing
//!
//! ```rust,ignore
//! use solve_pacer::config::{ManagerConfig, ServiceConfig};
//! use solve_pacer::core::{AutoManager, Manager, SolverService, TargetDescriptor};
//! use solve_pacer::infra::{DummySolver, JobQueue};
//! use std::time::Duration;
//!
//! let queue = JobQueue::new();
//! let service = SolverService::new(DummySolver::default(), &queue, ServiceConfig::default())?;
//! service.spawn(None)?;
//!
//! let manager = AutoManager::create(
//!     &queue,
//!     TargetDescriptor::v2("https://example.com/login", "site-key", false),
//!     ManagerConfig::default().with_initial(3).with_limit(10),
//! )?;
//!
//! for _ in 0..20 {
//!     manager.send_request(None, None)?;
//!     let answer = manager.get_request(true, Some(Duration::from_secs(120)))?;
//!     println!("{}", answer.answer);
//! }
//!
//! manager.stop()?;
//! service.stop();
//! service.join()?;
//! ```
//!
//! ## ManualManager - Batches
//!
//! ```rust,ignore
//! use solve_pacer::core::{ManualManager, TargetDescriptor};
//!
//! let manager = ManualManager::create(&queue, ManagerConfig::default())?;
//! let target = TargetDescriptor::v3("https://example.com", "site-key", "login", 0.7);
//! let key = manager
//!     .send_request(target, 5, false)?
//!     .expect("manager is running");
//! let answer = manager.get_request(&key, Some(Duration::from_secs(60)), true)?;
//! ```
//!
//! For complete examples, see:
//! - `tests/service_test.rs` - managers driven by a running solver service
//! - `tests/auto_manager_test.rs` - pacing and accounting without a service

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod builders;
pub mod config;
pub mod core;
pub mod infra;
pub mod util;
