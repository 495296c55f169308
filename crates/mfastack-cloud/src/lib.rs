//! mfastack Cloud Rendering
//!
//! This crate turns a parsed stack definition into a CloudFormation
//! template. Values that only exist after deployment (generated ids, the
//! load balancer's DNS name) are carried as tokens and serialized to
//! intrinsic functions, never as literal placeholders.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  mfastack CLI                    │
//! │          (synth / validate / diff / graph)       │
//! └─────────────────┬───────────────────────────────┘
//!                   │ StackDefinition
//! ┌─────────────────▼───────────────────────────────┐
//! │                mfastack-cloud                    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  render: network → load balancer →       │   │
//! │  │          user pool → client              │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │    Token     │  │ ResourceGraph│            │
//! │  └──────────────┘  └──────────────┘            │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │   Template   │  │  Plan (diff) │            │
//! │  └──────────────┘  └──────────────┘            │
//! └─────────────────┬───────────────────────────────┘
//!                   │ JSON / YAML
//!           external provisioning engine
//! ```

pub mod action;
pub mod error;
pub mod graph;
pub mod render;
pub mod template;
pub mod token;

// Re-exports
pub use action::{Action, ActionType, Plan, PlanSummary};
pub use error::{CloudError, Result};
pub use graph::{ResourceGraph, collect_references};
pub use render::{AllocatedSubnet, allocate_subnets, logical_id, render};
pub use template::{FORMAT_VERSION, Output, OutputFormat, Resource, Template};
pub use token::Token;
