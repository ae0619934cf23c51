// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # cdi-publisher
//!
//! Container Device Interface (CDI) spec generation for the CPU driver.
//!
//! Two kinds of spec are published into the CDI root:
//!
//! - one **common** spec, naming the node and driver, requested by every
//!   container that uses a CPU claim;
//! - one **claim** spec per prepared claim, named deterministically from
//!   `(vendor, class, claimUID)`, listing the claim's devices and the
//!   environment edits for them.
//!
//! [`DescriptorPublisher`] is the seam the claim state manager talks to;
//! [`CdiHandler`] is the file-backed implementation.

mod error;
mod handler;
mod publisher;
pub mod spec;

pub use error::CdiError;
pub use handler::CdiHandler;
pub use publisher::DescriptorPublisher;
pub use spec::{CdiDevice, CdiKind, CdiSpec, ContainerEdits};
