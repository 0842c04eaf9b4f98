// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition engine health tracking with circuit breaker pattern.
//
// If a capability keeps failing (models missing, remote service down), stop
// sending it every request and go straight to the next capability in the
// chain. After a cooldown one trial request is let through to check whether
// the engine has recovered.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation — requests pass through.
    Closed,
    /// Too many failures — requests are skipped until the cooldown expires.
    Open,
    /// Cooldown expired — one trial request is in flight.
    HalfOpen,
}

/// Health status for a single engine.
#[derive(Debug, Clone)]
pub struct EngineHealth {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub opened_at: Option<Instant>,
    pub last_success: Option<Instant>,
    pub last_error: Option<String>,
}

impl Default for EngineHealth {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            last_success: None,
            last_error: None,
        }
    }
}

/// Health tracking for every capability in an orchestrator's chain, keyed by
/// engine name.
pub struct HealthTracker {
    engines: HashMap<String, EngineHealth>,
    failure_threshold: u32,
    base_cooldown: Duration,
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(60))
    }
}

impl HealthTracker {
    pub fn new(failure_threshold: u32, base_cooldown: Duration) -> Self {
        Self {
            engines: HashMap::new(),
            failure_threshold: failure_threshold.max(1),
            base_cooldown,
        }
    }

    /// Whether a request to `engine` should be attempted now.
    ///
    /// Closed circuits always allow; open circuits allow a single trial request once
    /// the cooldown has elapsed; half-open circuits block until that trial
    /// reports back.
    pub fn allow_request(&mut self, engine: &str) -> bool {
        let cooldown_base = self.base_cooldown;
        let health = self.engines.entry(engine.to_string()).or_default();

        match health.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let Some(opened_at) = health.opened_at else {
                    health.state = CircuitState::Closed;
                    return true;
                };
                let cooldown = cooldown_duration(cooldown_base, health.consecutive_failures);
                if opened_at.elapsed() >= cooldown {
                    info!(engine, "circuit half-open, allowing trial request");
                    health.state = CircuitState::HalfOpen;
                    true
                } else {
                    debug!(
                        engine,
                        remaining_ms = (cooldown - opened_at.elapsed()).as_millis(),
                        "circuit open, skipping engine"
                    );
                    false
                }
            }
            CircuitState::HalfOpen => false,
        }
    }

    pub fn record_success(&mut self, engine: &str) {
        let health = self.engines.entry(engine.to_string()).or_default();

        if health.state != CircuitState::Closed {
            info!(engine, prev_state = ?health.state, "engine recovered, closing circuit");
        }

        health.state = CircuitState::Closed;
        health.consecutive_failures = 0;
        health.opened_at = None;
        health.last_success = Some(Instant::now());
        health.last_error = None;
    }

    pub fn record_failure(&mut self, engine: &str, error: &str) {
        let threshold = self.failure_threshold;
        let health = self.engines.entry(engine.to_string()).or_default();

        health.consecutive_failures += 1;
        health.last_error = Some(error.to_string());

        if health.state == CircuitState::HalfOpen {
            warn!(engine, "trial request failed, reopening circuit breaker");
            health.state = CircuitState::Open;
            health.opened_at = Some(Instant::now());
        } else if health.consecutive_failures >= threshold && health.state != CircuitState::Open {
            warn!(
                engine,
                failures = health.consecutive_failures,
                "opening circuit breaker for engine"
            );
            health.state = CircuitState::Open;
            health.opened_at = Some(Instant::now());
        }
    }

    pub fn get_health(&self, engine: &str) -> Option<&EngineHealth> {
        self.engines.get(engine)
    }

    /// Human-readable status for an unhealthy engine; `None` when healthy.
    pub fn status_message(&self, engine: &str) -> Option<String> {
        let health = self.engines.get(engine)?;
        match health.state {
            CircuitState::Closed => None,
            CircuitState::Open => {
                let cooldown = cooldown_duration(self.base_cooldown, health.consecutive_failures);
                let remaining = health
                    .opened_at
                    .map(|t| cooldown.saturating_sub(t.elapsed()))
                    .unwrap_or(Duration::ZERO);
                Some(format!(
                    "The {} recognizer is having trouble ({} failures). It will be retried in {} seconds.",
                    engine,
                    health.consecutive_failures,
                    remaining.as_secs()
                ))
            }
            CircuitState::HalfOpen => Some(format!("Checking whether the {} recognizer has recovered...", engine)),
        }
    }
}

/// Cooldown grows with the failure streak: base, 4x base from 5 failures,
/// 10x base from 10.
fn cooldown_duration(base: Duration, failures: u32) -> Duration {
    if failures >= 10 {
        base * 10
    } else if failures >= 5 {
        base * 4
    } else {
        base
    }
}
