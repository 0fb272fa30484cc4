// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kernel ABI definitions shared by the redirfs dispatcher and backend
//! implementations.
//!
//! Everything in here mirrors a layout the kernel hands to (or expects from)
//! userspace. Consumers on the other side of the syscall boundary parse these
//! by raw offset arithmetic, so the shapes must not drift.

pub mod kernel_types;
