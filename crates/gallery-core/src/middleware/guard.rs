//! Admission guard
//!
//! Runs before routing. Banned addresses are turned away outright; requests
//! whose target trips the denylist are recorded as offenses and may ban the
//! sender on the spot.

use super::Middleware;
use crate::abuse::{AbuseDetector, BanRegistry, Classification};
use crate::config::GuardConfig;
use crate::{Method, Request, Response};
use std::sync::Arc;

/// What the guard decided for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Allow,
    /// Sender was already banned
    Banned,
    /// Suspicious target; sender banned by this request
    NewlyBanned { rule: &'static str },
    /// Suspicious target, sender below the strike threshold
    Rejected { rule: &'static str },
}

/// Ban check plus suspicious-request detection
pub struct AdmissionGuard {
    bans: Arc<BanRegistry>,
    detector: Arc<AbuseDetector>,
    config: GuardConfig,
}

impl AdmissionGuard {
    pub fn new(bans: Arc<BanRegistry>, detector: Arc<AbuseDetector>, config: GuardConfig) -> Self {
        Self {
            bans,
            detector,
            config,
        }
    }

    /// Decide on `req`, recording offenses and bans as a side effect.
    pub fn admit(&self, req: &Request) -> Admission {
        let client = req.client_key();
        if self.bans.is_banned(&client) {
            return Admission::Banned;
        }

        let target = req.target();
        let rule = match self.detector.classify(&target) {
            Classification::Clean => return Admission::Allow,
            Classification::Suspicious(rule) => rule,
        };

        match self.detector.record_offense(&client) {
            Some(notice) => {
                tracing::warn!(
                    address = %notice.address,
                    offenses = notice.offenses,
                    rule,
                    uri = %target,
                    "banning address"
                );
                if let Err(e) = self.bans.ban(&notice.address) {
                    tracing::error!(address = %notice.address, error = %e, "failed to persist ban");
                }
                Admission::NewlyBanned { rule }
            }
            None => {
                tracing::info!(address = %client, rule, uri = %target, "suspicious request");
                Admission::Rejected { rule }
            }
        }
    }

    fn banned_message(&self, method: Method) -> &str {
        match method {
            Method::Post => &self.config.banned_post_message,
            _ => &self.config.banned_get_message,
        }
    }
}

impl Middleware for AdmissionGuard {
    fn before(&self, req: &mut Request) -> Option<Response> {
        match self.admit(req) {
            Admission::Allow => None,
            Admission::Banned => Some(Response::forbidden(self.banned_message(req.method))),
            Admission::NewlyBanned { .. } => Some(Response::forbidden(&self.config.ban_message)),
            Admission::Rejected { .. } => Some(Response::bad_request("Bad Request")),
        }
    }

    fn after(&self, _req: &Request, _res: &mut Response) {}
}
