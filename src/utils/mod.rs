// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod clock;
pub mod timeout;

pub use clock::{Clock, SystemClock};
pub use timeout::bounded;
