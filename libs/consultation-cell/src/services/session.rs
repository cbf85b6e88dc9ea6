// libs/consultation-cell/src/services/session.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use subscription_cell::SubscriptionTier;

use crate::models::{
    format_duration, ConsultationError, Conversation, EndOutcome, Persona, SessionSnapshot,
    SessionStatus,
};
use crate::services::tavus::ConversationProvider;

const TICK: Duration = Duration::from_secs(1);

/// Drives one user's avatar consultation:
/// idle -> connecting -> active -> ended, with errored reachable from
/// connecting. The elapsed counter only advances while active.
pub struct SessionController {
    provider: Arc<dyn ConversationProvider>,
    status: SessionStatus,
    persona: Option<Persona>,
    conversation: Option<Conversation>,
    started_at: Option<DateTime<Utc>>,
    elapsed: Arc<AtomicU64>,
    ticker: Option<JoinHandle<()>>,
    muted: bool,
    video_enabled: bool,
    last_error: Option<String>,
}

impl SessionController {
    pub fn new(provider: Arc<dyn ConversationProvider>) -> Self {
        Self {
            provider,
            status: SessionStatus::Idle,
            persona: None,
            conversation: None,
            started_at: None,
            elapsed: Arc::new(AtomicU64::new(0)),
            ticker: None,
            muted: false,
            video_enabled: true,
            last_error: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed.load(Ordering::Relaxed)
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation.as_ref().map(|c| c.conversation_id.as_str())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let elapsed = self.elapsed_seconds();
        SessionSnapshot {
            status: self.status,
            persona: self.persona.clone(),
            conversation_id: self.conversation.as_ref().map(|c| c.conversation_id.clone()),
            conversation_url: self.conversation.as_ref().and_then(|c| c.conversation_url.clone()),
            started_at: self.started_at,
            elapsed_seconds: elapsed,
            duration: format_duration(elapsed),
            muted: self.muted,
            video_enabled: self.video_enabled,
            error: self.last_error.clone(),
        }
    }

    /// Opens a provider conversation with the persona's replica. Checks run
    /// before any state change, so a rejected start leaves the status as is.
    #[instrument(skip(self, persona), fields(persona_id = %persona.id))]
    pub async fn start(&mut self, persona: Persona, tier: SubscriptionTier) -> Result<Conversation, ConsultationError> {
        if matches!(self.status, SessionStatus::Connecting | SessionStatus::Active) {
            return Err(ConsultationError::AlreadyInProgress);
        }
        if !persona.is_selectable(tier) {
            return Err(ConsultationError::PersonaUnavailable(persona.name));
        }
        if !self.provider.is_configured() {
            return Err(ConsultationError::NotConfigured);
        }

        self.stop_ticker();
        self.elapsed.store(0, Ordering::Relaxed);
        self.status = SessionStatus::Connecting;
        self.conversation = None;
        self.started_at = None;
        self.last_error = None;

        info!("Connecting consultation with {} ({})", persona.name, persona.specialty);

        let result = self
            .provider
            .create_conversation(&persona.tavus_replica_id, &persona.tavus_persona_id)
            .await;
        self.persona = Some(persona);

        match result {
            Ok(conversation) => {
                self.status = SessionStatus::Active;
                self.started_at = Some(Utc::now());
                self.conversation = Some(conversation.clone());
                self.start_ticker();
                Ok(conversation)
            }
            Err(e) => {
                error!("Failed to start consultation: {}", e);
                self.status = SessionStatus::Errored;
                self.last_error = Some("Failed to start consultation. Please try again.".to_string());
                Err(e)
            }
        }
    }

    /// Ends the active conversation. The local session always ends; a failed
    /// provider call is reported in the outcome.
    pub async fn end(&mut self) -> Result<EndOutcome, ConsultationError> {
        if self.status != SessionStatus::Active {
            return Err(ConsultationError::NotActive(self.status));
        }

        self.stop_ticker();
        let duration_seconds = self.elapsed.swap(0, Ordering::Relaxed);
        let conversation_id = self
            .conversation
            .as_ref()
            .map(|c| c.conversation_id.clone())
            .unwrap_or_default();

        let provider_error = match self.provider.end_conversation(&conversation_id).await {
            Ok(()) => None,
            Err(e) => {
                warn!("Provider did not end conversation {}: {}", conversation_id, e);
                Some(e.to_string())
            }
        };

        self.status = SessionStatus::Ended;
        info!("Consultation {} ended after {}", conversation_id, format_duration(duration_seconds));

        Ok(EndOutcome {
            conversation_id,
            duration_seconds,
            provider_error,
        })
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }

    pub fn toggle_video(&mut self) -> bool {
        self.video_enabled = !self.video_enabled;
        self.video_enabled
    }

    /// Local teardown. Returns the conversation that was still open, if any,
    /// so the caller can end it remotely.
    pub fn shutdown(&mut self) -> Option<String> {
        self.stop_ticker();
        if self.status != SessionStatus::Active {
            return None;
        }
        self.status = SessionStatus::Ended;
        self.elapsed.store(0, Ordering::Relaxed);
        self.conversation_id().map(str::to_string)
    }

    fn start_ticker(&mut self) {
        let elapsed = self.elapsed.clone();
        let mut ticks = interval_at(Instant::now() + TICK, TICK);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.ticker = Some(tokio::spawn(async move {
            loop {
                ticks.tick().await;
                elapsed.fetch_add(1, Ordering::Relaxed);
            }
        }));
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            debug!("Stopping session ticker");
            ticker.abort();
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::models::ReplicaStatus;

    #[derive(Default)]
    struct FakeProvider {
        unconfigured: bool,
        fail_create: bool,
        fail_end: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeProvider {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ConversationProvider for FakeProvider {
        fn is_configured(&self) -> bool {
            !self.unconfigured
        }

        async fn create_conversation(&self, replica_id: &str, _persona_id: &str) -> Result<Conversation, ConsultationError> {
            self.calls.lock().unwrap().push(format!("create:{}", replica_id));
            if self.fail_create {
                return Err(ConsultationError::Provider { message: "HTTP 500".to_string() });
            }
            Ok(Conversation {
                conversation_id: "c_1".to_string(),
                conversation_url: Some("https://tavus.daily.co/c_1".to_string()),
                status: Some("active".to_string()),
            })
        }

        async fn end_conversation(&self, conversation_id: &str) -> Result<(), ConsultationError> {
            self.calls.lock().unwrap().push(format!("end:{}", conversation_id));
            if self.fail_end {
                return Err(ConsultationError::Provider { message: "HTTP 502".to_string() });
            }
            Ok(())
        }

        async fn get_conversation(&self, _conversation_id: &str) -> Result<Conversation, ConsultationError> {
            Err(ConsultationError::NotConfigured)
        }

        async fn get_replica_status(&self, replica_id: &str) -> Result<ReplicaStatus, ConsultationError> {
            Ok(ReplicaStatus { replica_id: replica_id.to_string(), status: "completed".to_string() })
        }
    }

    fn persona(is_premium: bool, is_available: bool) -> Persona {
        Persona {
            id: "d1".into(),
            name: "Dr. Amara".into(),
            specialty: "General Physician".into(),
            description: String::new(),
            icon: String::new(),
            tavus_replica_id: "r_1".into(),
            tavus_persona_id: "p_1".into(),
            is_premium,
            is_available,
        }
    }

    fn controller(provider: FakeProvider) -> (SessionController, Arc<FakeProvider>) {
        let provider = Arc::new(provider);
        (SessionController::new(provider.clone()), provider)
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_counts_only_while_active() {
        let (mut session, _) = controller(FakeProvider::default());

        session.start(persona(false, true), SubscriptionTier::Free).await.unwrap();
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.elapsed_seconds(), 0);

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(session.elapsed_seconds(), 3);
        assert_eq!(session.snapshot().duration, "00:03");

        let outcome = session.end().await.unwrap();
        assert_eq!(outcome.duration_seconds, 3);
        assert_eq!(session.elapsed_seconds(), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(session.elapsed_seconds(), 0);
        assert_eq!(session.status(), SessionStatus::Ended);
    }

    #[tokio::test(start_paused = true)]
    async fn end_completes_locally_when_provider_fails() {
        let (mut session, provider) = controller(FakeProvider { fail_end: true, ..Default::default() });

        session.start(persona(false, true), SubscriptionTier::Free).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;

        let outcome = session.end().await.unwrap();

        assert_eq!(session.status(), SessionStatus::Ended);
        assert_eq!(session.elapsed_seconds(), 0);
        assert_eq!(outcome.conversation_id, "c_1");
        assert!(outcome.provider_error.is_some());
        assert_eq!(provider.calls(), vec!["create:r_1".to_string(), "end:c_1".to_string()]);
    }

    #[tokio::test]
    async fn free_user_cannot_start_unavailable_persona() {
        let (mut session, provider) = controller(FakeProvider::default());

        let result = session.start(persona(false, false), SubscriptionTier::Free).await;

        assert_matches!(result, Err(ConsultationError::PersonaUnavailable(_)));
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn premium_user_can_start_premium_persona() {
        let (mut session, _) = controller(FakeProvider::default());
        assert!(session.start(persona(true, true), SubscriptionTier::Monthly).await.is_ok());
        assert_eq!(session.status(), SessionStatus::Active);
    }

    #[tokio::test]
    async fn unavailable_persona_is_refused_even_on_paid_plan() {
        let (mut session, provider) = controller(FakeProvider::default());

        let result = session.start(persona(false, false), SubscriptionTier::Yearly).await;

        assert_matches!(result, Err(ConsultationError::PersonaUnavailable(_)));
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn unconfigured_provider_fails_fast() {
        let (mut session, provider) = controller(FakeProvider { unconfigured: true, ..Default::default() });

        let result = session.start(persona(false, true), SubscriptionTier::Free).await;

        assert_matches!(result, Err(ConsultationError::NotConfigured));
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn provider_failure_moves_to_errored_without_retry() {
        let (mut session, provider) = controller(FakeProvider { fail_create: true, ..Default::default() });

        let result = session.start(persona(false, true), SubscriptionTier::Free).await;

        assert_matches!(result, Err(ConsultationError::Provider { .. }));
        assert_eq!(session.status(), SessionStatus::Errored);
        assert!(session.snapshot().error.is_some());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(session.elapsed_seconds(), 0);
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn second_start_while_active_is_rejected() {
        let (mut session, provider) = controller(FakeProvider::default());

        session.start(persona(false, true), SubscriptionTier::Free).await.unwrap();
        let again = session.start(persona(false, true), SubscriptionTier::Free).await;

        assert_matches!(again, Err(ConsultationError::AlreadyInProgress));
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn errored_session_can_start_again() {
        let provider = Arc::new(FakeProvider { fail_create: true, ..Default::default() });
        let mut session = SessionController::new(provider);
        let _ = session.start(persona(false, true), SubscriptionTier::Free).await;
        assert_eq!(session.status(), SessionStatus::Errored);

        session.provider = Arc::new(FakeProvider::default());
        assert!(session.start(persona(false, true), SubscriptionTier::Free).await.is_ok());
        assert_eq!(session.status(), SessionStatus::Active);
        assert!(session.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn end_requires_active_session() {
        let (mut session, provider) = controller(FakeProvider::default());
        assert_matches!(session.end().await, Err(ConsultationError::NotActive(SessionStatus::Idle)));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn toggles_flip_local_flags() {
        let (mut session, provider) = controller(FakeProvider::default());

        assert!(session.toggle_mute());
        assert!(!session.toggle_mute());
        assert!(!session.toggle_video());
        assert!(session.toggle_video());
        assert!(provider.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_ticking_and_reports_open_conversation() {
        let (mut session, _) = controller(FakeProvider::default());
        session.start(persona(false, true), SubscriptionTier::Free).await.unwrap();
        let elapsed = session.elapsed.clone();

        assert_eq!(session.shutdown().as_deref(), Some("c_1"));
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(elapsed.load(Ordering::Relaxed), 0);
        assert_eq!(session.shutdown(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_controller_aborts_ticker() {
        let (mut session, _) = controller(FakeProvider::default());
        session.start(persona(false, true), SubscriptionTier::Free).await.unwrap();
        let elapsed = session.elapsed.clone();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        drop(session);
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(elapsed.load(Ordering::Relaxed), 1);
    }
}
