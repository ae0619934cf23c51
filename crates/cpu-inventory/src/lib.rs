// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # cpu-inventory
//!
//! The static catalog of allocatable CPU units on this node.
//!
//! # Key Components
//!
//! - [`CpuTopology`]: cores, SMT width and NUMA layout, either explicit or
//!   detected from sysfs.
//! - [`InventoryCatalog`]: one [`AllocatableUnit`] per hardware thread,
//!   built once and never mutated.
//! - [`AttributeValue`]: the tagged value type for unit attributes.
//! - [`Quantity`]: capacity amounts such as `80Gi`.
//!
//! # Example
//! ```
//! use cpu_inventory::{CpuTopology, InventoryCatalog};
//!
//! let topology = CpuTopology::new(16, 2, 2).unwrap();
//! let catalog = InventoryCatalog::enumerate(&topology).unwrap();
//! assert_eq!(catalog.len(), 32);
//! assert_eq!(catalog.thread_id("cpu-5"), Some(5));
//! ```

mod attribute;
pub mod catalog;
mod error;
mod quantity;
mod topology;

pub use attribute::AttributeValue;
pub use catalog::{AllocatableUnit, InventoryCatalog};
pub use error::InventoryError;
pub use quantity::Quantity;
pub use topology::{CpuTopology, MAX_THREADS};
