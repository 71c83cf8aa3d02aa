// SPDX-License-Identifier: GPL-3.0-only
pub mod traits;
pub mod backend;
pub mod readiness;
pub mod signal;

pub use traits::{CommerceBackend, SeedData};
pub use backend::MedusaBackend;
