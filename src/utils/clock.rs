// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
/// Wall-clock source in unix seconds, injectable so authorization windows can
/// be tested without sleeping
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        chrono::Utc::now().timestamp().max(0) as u64
    }
}
