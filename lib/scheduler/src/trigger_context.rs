//! Persisted bookkeeping for one trigger instance.
//!
//! The driver loop owns and stores this record. The engine only reads it and
//! hands back updated copies.

use crate::backfill::Backfill;
use cadence_flow::Flow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a trigger stands: its next evaluation date and optional backfill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerContext {
    /// Owning tenant.
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Flow namespace.
    pub namespace: String,
    /// Flow id.
    pub flow_id: String,
    /// Trigger id within the flow.
    pub trigger_id: String,
    /// The next date the trigger should be evaluated at.
    pub date: DateTime<Utc>,
    /// Active replay window, if any.
    #[serde(default)]
    pub backfill: Option<Backfill>,
}

impl TriggerContext {
    /// Creates a context for a trigger of `flow`.
    #[must_use]
    pub fn for_flow(flow: &Flow, trigger_id: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            tenant_id: flow.tenant_id.clone(),
            namespace: flow.namespace.clone(),
            flow_id: flow.id.clone(),
            trigger_id: trigger_id.into(),
            date,
            backfill: None,
        }
    }

    /// Attaches a backfill, remembering the current date so it can be
    /// restored on cancel.
    #[must_use]
    pub fn with_backfill(mut self, mut backfill: Backfill) -> Self {
        backfill.previous_next_execution_date = Some(self.date);
        self.backfill = Some(backfill);
        self
    }

    /// Cancels the backfill and restores the date recorded when it was
    /// attached.
    #[must_use]
    pub fn without_backfill(mut self) -> Self {
        if let Some(date) = self
            .backfill
            .take()
            .and_then(|b| b.previous_next_execution_date)
        {
            self.date = date;
        }
        self
    }

    /// Records the result of an evaluation: the trigger moves to `next` and
    /// a running backfill moves its cursor along, or completes once `next`
    /// is past its end.
    #[must_use]
    pub fn advance(mut self, next: DateTime<Utc>) -> Self {
        self.date = next;
        self.backfill = self
            .backfill
            .take()
            .and_then(|backfill| backfill.advanced_to(next));
        self
    }

    /// The backfill, if one is attached and its cursor is inside the window.
    #[must_use]
    pub fn active_backfill(&self) -> Option<&Backfill> {
        self.backfill.as_ref().filter(|b| b.is_active())
    }
}

impl fmt::Display for TriggerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tenant_id {
            Some(tenant) => write!(
                f,
                "{tenant}/{}.{}:{}",
                self.namespace, self.flow_id, self.trigger_id
            ),
            None => write!(f, "{}.{}:{}", self.namespace, self.flow_id, self.trigger_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, 0, 0, 0)
            .single()
            .expect("valid date")
    }

    fn context() -> TriggerContext {
        TriggerContext::for_flow(&Flow::new("ns", "f"), "daily", utc(2024, 6, 1))
    }

    #[test]
    fn copies_flow_identity() {
        let ctx = TriggerContext::for_flow(
            &Flow::new("ns", "f").with_tenant("acme"),
            "daily",
            utc(2024, 6, 1),
        );
        assert_eq!(ctx.tenant_id.as_deref(), Some("acme"));
        assert_eq!(ctx.to_string(), "acme/ns.f:daily");
        assert!(ctx.backfill.is_none());
    }

    #[test]
    fn with_backfill_records_previous_date() {
        let backfill = Backfill::new(utc(2024, 1, 1), utc(2024, 1, 3)).expect("backfill");
        let ctx = context().with_backfill(backfill);

        let attached = ctx.active_backfill().expect("active");
        assert_eq!(attached.previous_next_execution_date, Some(utc(2024, 6, 1)));
    }

    #[test]
    fn cancel_restores_previous_date() {
        let backfill = Backfill::new(utc(2024, 1, 1), utc(2024, 1, 3)).expect("backfill");
        let ctx = context()
            .with_backfill(backfill)
            .advance(utc(2024, 1, 2))
            .without_backfill();

        assert_eq!(ctx.date, utc(2024, 6, 1));
        assert!(ctx.backfill.is_none());
    }

    #[test]
    fn advance_moves_cursor_then_completes() {
        let backfill = Backfill::new(utc(2024, 1, 1), utc(2024, 1, 3)).expect("backfill");
        let ctx = context().with_backfill(backfill).advance(utc(2024, 1, 2));
        assert_eq!(ctx.date, utc(2024, 1, 2));
        assert_eq!(
            ctx.active_backfill().map(|b| b.current_date),
            Some(utc(2024, 1, 2))
        );

        let ctx = ctx.advance(utc(2024, 6, 2));
        assert_eq!(ctx.date, utc(2024, 6, 2));
        assert!(ctx.backfill.is_none());
    }

    #[test]
    fn paused_backfill_keeps_cursor() {
        let backfill = Backfill::new(utc(2024, 1, 1), utc(2024, 1, 3))
            .expect("backfill")
            .paused();
        let ctx = context().with_backfill(backfill).advance(utc(2024, 1, 2));

        let kept = ctx.backfill.as_ref().expect("kept");
        assert_eq!(kept.current_date, utc(2024, 1, 1));
    }

    #[test]
    fn serde_roundtrip() {
        let backfill = Backfill::new(utc(2024, 1, 1), utc(2024, 1, 3)).expect("backfill");
        let ctx = context().with_backfill(backfill);

        let json = serde_json::to_string(&ctx).expect("serialize");
        let parsed: TriggerContext = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, ctx);
    }
}
