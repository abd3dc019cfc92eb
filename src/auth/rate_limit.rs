use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::AppState;

/// Login and registration attempts allowed per client per window.
const AUTH_ATTEMPTS: u32 = 5;
const AUTH_WINDOW: Duration = Duration::from_secs(60);

/// Attempts are counted per client address and per auth route, so a burst
/// of failed logins does not lock the same client out of registering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClientRoute {
    ip: IpAddr,
    route: String,
}

/// Fixed-window attempt counter. Single-instance only.
#[derive(Clone)]
pub struct RateLimitState {
    windows: Arc<Mutex<HashMap<ClientRoute, Window>>>,
    max_attempts: u32,
    window: Duration,
}

#[derive(Clone, Copy)]
struct Window {
    attempts: u32,
    opened_at: Instant,
}

impl Window {
    fn is_open(&self, now: Instant, length: Duration) -> bool {
        now.duration_since(self.opened_at) <= length
    }
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self::new(AUTH_ATTEMPTS, AUTH_WINDOW)
    }
}

impl RateLimitState {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            max_attempts,
            window,
        }
    }

    /// Record one attempt by `ip` on `route`. `Ok` carries the attempts
    /// left in the current window, `Err` the wait until it reopens.
    pub async fn check(&self, ip: IpAddr, route: &str) -> Result<u32, Duration> {
        let now = Instant::now();
        let key = ClientRoute {
            ip,
            route: route.to_owned(),
        };
        let mut windows = self.windows.lock().await;

        let window = match windows.get(&key) {
            Some(w) if w.is_open(now, self.window) => *w,
            _ => Window {
                attempts: 0,
                opened_at: now,
            },
        };

        if window.attempts >= self.max_attempts {
            let elapsed = now.duration_since(window.opened_at);
            return Err(self.window.saturating_sub(elapsed));
        }

        let attempts = window.attempts + 1;
        windows.insert(key, Window { attempts, ..window });
        Ok(self.max_attempts - attempts)
    }

    /// Forget clients whose window closed a while ago.
    pub async fn prune(&self) {
        let now = Instant::now();
        let stale_after = self.window * 2;
        self.windows
            .lock()
            .await
            .retain(|_, w| w.is_open(now, stale_after));
    }

    pub fn spawn_pruner(&self) {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(limiter.window * 5);
            loop {
                ticker.tick().await;
                limiter.prune().await;
            }
        });
    }
}

/// Applied to the login and registration routes.
pub async fn rate_limit_auth(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = addr.ip();
    let route = req.uri().path().to_owned();
    let wait = match state.rate_limiter.check(client, &route).await {
        Ok(_) => return Ok(next.run(req).await),
        Err(wait) => wait,
    };

    tracing::warn!(
        client = %client,
        route = %route,
        wait_secs = wait.as_secs(),
        "Too many auth attempts"
    );
    Err(AppError::RateLimited)
}
