use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use shared::{
    domain::{DieFace, IdentityCode, Session},
    error::{ServiceFailure, SessionError},
    protocol::{ChancesPayload, LoginPayload},
};
use tokio::{
    sync::{mpsc, watch},
    time::{sleep_until, Instant},
};
use tracing::{debug, info, warn};

pub mod in_memory;
pub mod messages;
pub mod remote;

pub use in_memory::{InMemoryScoringService, Player, RollRecord};
pub use remote::{RemoteConfigError, RemoteScoringService};

/// Minimum time between starting a roll and revealing its face.
pub const ROLL_REVEAL_DELAY: Duration = Duration::from_millis(1500);

#[async_trait]
pub trait ScoringService: Send + Sync {
    async fn login(&self, code: &IdentityCode) -> Result<LoginPayload, ServiceFailure>;
    async fn roll_dice(
        &self,
        code: &IdentityCode,
        roll_result: DieFace,
    ) -> Result<ChancesPayload, ServiceFailure>;
    async fn add_chance(&self, code: &IdentityCode) -> Result<ChancesPayload, ServiceFailure>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    LoggedOut,
    LoggedIn { chances: u32 },
    Rolling,
}

/// The single button the screen offers in each phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryAction {
    Login,
    Roll { enabled: bool },
    AddChance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollReport {
    Rolled(DieFace),
    NoChancesLeft,
}

/// Snapshot of everything the screen renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionView {
    pub session: Option<Session>,
    pub roll_outcome: Option<DieFace>,
    pub animating: bool,
    pub status: String,
}

impl SessionView {
    pub fn phase(&self) -> SessionPhase {
        match &self.session {
            None => SessionPhase::LoggedOut,
            Some(_) if self.animating => SessionPhase::Rolling,
            Some(session) => SessionPhase::LoggedIn {
                chances: session.chances,
            },
        }
    }

    pub fn primary_action(&self) -> PrimaryAction {
        match &self.session {
            None => PrimaryAction::Login,
            Some(session) if session.chances > 0 => PrimaryAction::Roll {
                enabled: !self.animating,
            },
            Some(_) => PrimaryAction::AddChance,
        }
    }

    pub fn chances(&self) -> Option<u32> {
        self.session.as_ref().map(|session| session.chances)
    }
}

/// Owned session state. Only the controller mutates it, and only through
/// these methods.
#[derive(Debug, Default)]
pub struct SessionState {
    session: Option<Session>,
    roll_outcome: Option<DieFace>,
    animating: bool,
    status: String,
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn snapshot(&self) -> SessionView {
        SessionView {
            session: self.session.clone(),
            roll_outcome: self.roll_outcome,
            animating: self.animating,
            status: self.status.clone(),
        }
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    fn establish(&mut self, session: Session, status: impl Into<String>) {
        self.session = Some(session);
        self.roll_outcome = None;
        self.animating = false;
        self.set_status(status);
    }

    fn clear_session(&mut self, status: impl Into<String>) {
        self.session = None;
        self.roll_outcome = None;
        self.animating = false;
        self.set_status(status);
    }

    fn begin_roll(&mut self, status: impl Into<String>) {
        self.roll_outcome = None;
        self.animating = true;
        self.set_status(status);
    }

    fn reveal_roll(&mut self, face: DieFace, chances: u32, status: impl Into<String>) {
        if let Some(session) = self.session.as_mut() {
            session.chances = chances;
        }
        self.animating = false;
        self.roll_outcome = Some(face);
        self.set_status(status);
    }

    fn abort_roll(&mut self, status: impl Into<String>) {
        self.animating = false;
        self.roll_outcome = None;
        self.set_status(status);
    }

    fn set_chances(&mut self, chances: u32, status: impl Into<String>) {
        if let Some(session) = self.session.as_mut() {
            session.chances = chances;
        }
        self.set_status(status);
    }
}

/// Drives login, rolls, and chance purchases against a scoring service and
/// publishes a [`SessionView`] after every state change.
///
/// [`subscribe`](Self::subscribe) only ever holds the latest view;
/// [`frames`](Self::frames) queues every published view in order.
pub struct SessionController {
    service: Arc<dyn ScoringService>,
    state: SessionState,
    updates: watch::Sender<SessionView>,
    frame_sinks: Vec<mpsc::UnboundedSender<SessionView>>,
    reveal_delay: Duration,
}

impl SessionController {
    pub fn new(service: Arc<dyn ScoringService>) -> Self {
        let (updates, _) = watch::channel(SessionView::default());
        Self {
            service,
            state: SessionState::default(),
            updates,
            frame_sinks: Vec::new(),
            reveal_delay: ROLL_REVEAL_DELAY,
        }
    }

    pub fn with_reveal_delay(mut self, reveal_delay: Duration) -> Self {
        self.reveal_delay = reveal_delay;
        self
    }

    pub fn reveal_delay(&self) -> Duration {
        self.reveal_delay
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.updates.subscribe()
    }

    pub fn frames(&mut self) -> mpsc::UnboundedReceiver<SessionView> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.frame_sinks.push(tx);
        rx
    }

    pub fn view(&self) -> SessionView {
        self.state.snapshot()
    }

    fn publish(&mut self) {
        let view = self.state.snapshot();
        self.frame_sinks.retain(|sink| sink.send(view.clone()).is_ok());
        self.updates.send_replace(view);
    }

    pub async fn login(&mut self, raw_code: &str) -> Result<(), SessionError> {
        let Some(code) = IdentityCode::parse(raw_code) else {
            self.state.set_status(messages::ENTER_CODE);
            self.publish();
            return Err(SessionError::Validation);
        };

        self.state.set_status(messages::REQUESTING);
        self.publish();
        info!(%code, "login requested");

        match self.service.login(&code).await {
            Ok(LoginPayload { name, chances }) => {
                let status = if chances > 0 {
                    messages::greeting(&name, chances)
                } else {
                    messages::no_chances_left(&name)
                };
                info!(%code, chances, "login succeeded");
                self.state.establish(
                    Session {
                        identity_code: code,
                        display_name: name,
                        chances,
                    },
                    status,
                );
                self.publish();
                Ok(())
            }
            Err(failure) => {
                warn!(%code, error = %failure, "login failed");
                self.state
                    .clear_session(messages::failure(&failure, messages::LOGIN_FAILED));
                self.publish();
                Err(failure.into())
            }
        }
    }

    /// Spends one chance. The face is drawn locally when the roll starts and
    /// is revealed no earlier than the reveal delay, once the service has
    /// confirmed the new chance count. A failed debit ends the roll at once.
    pub async fn roll_dice(&mut self) -> Result<RollReport, SessionError> {
        let Some(session) = self.state.session().cloned() else {
            self.state.set_status(messages::LOGIN_FIRST);
            self.publish();
            return Err(SessionError::NotLoggedIn);
        };

        if session.chances == 0 {
            let status = messages::no_chances_left(&session.display_name);
            self.state.set_status(status);
            self.publish();
            return Ok(RollReport::NoChancesLeft);
        }

        let Session {
            identity_code: code,
            display_name: name,
            ..
        } = session;
        let reveal_at = Instant::now() + self.reveal_delay;
        let face = DieFace::roll(&mut rand::rng());

        self.state.begin_roll(messages::ROLLING);
        self.publish();
        debug!(%code, face = face.value(), "roll started");

        match self.service.roll_dice(&code, face).await {
            Ok(ChancesPayload { chances }) => {
                sleep_until(reveal_at).await;
                let status = if chances == 0 {
                    messages::no_chances_left(&name)
                } else {
                    messages::remaining(chances)
                };
                info!(%code, face = face.value(), chances, "roll revealed");
                self.state.reveal_roll(face, chances, status);
                self.publish();
                Ok(RollReport::Rolled(face))
            }
            Err(failure) => {
                warn!(%code, error = %failure, "roll failed");
                self.state
                    .abort_roll(messages::failure(&failure, messages::ROLL_FAILED));
                self.publish();
                Err(failure.into())
            }
        }
    }

    /// Buys one more chance and returns the count the service confirmed.
    pub async fn add_chance(&mut self) -> Result<u32, SessionError> {
        let Some(session) = self.state.session().cloned() else {
            self.state.set_status(messages::LOGIN_FIRST);
            self.publish();
            return Err(SessionError::NotLoggedIn);
        };

        let Session {
            identity_code: code,
            display_name: name,
            ..
        } = session;
        info!(%code, "chance purchase requested");

        match self.service.add_chance(&code).await {
            Ok(ChancesPayload { chances }) => {
                self.state.set_chances(chances, messages::chance_added(&name));
                self.publish();
                Ok(chances)
            }
            Err(failure) => {
                warn!(%code, error = %failure, "chance purchase failed");
                self.state
                    .set_status(messages::failure(&failure, messages::ADD_CHANCE_FAILED));
                self.publish();
                Err(failure.into())
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
