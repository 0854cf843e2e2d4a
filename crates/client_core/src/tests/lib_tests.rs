use super::*;
use tokio::{sync::Mutex, time};

/// Scoring service with canned answers that records every call it receives.
struct ScriptedScoringService {
    login_result: Result<LoginPayload, ServiceFailure>,
    roll_result: Result<ChancesPayload, ServiceFailure>,
    add_result: Result<ChancesPayload, ServiceFailure>,
    login_latency: Duration,
    roll_latency: Duration,
    calls: Arc<Mutex<Vec<String>>>,
    rolled_faces: Arc<Mutex<Vec<DieFace>>>,
}

impl ScriptedScoringService {
    fn logged_in_as(name: &str, chances: u32) -> Self {
        Self {
            login_result: Ok(LoginPayload {
                name: name.to_string(),
                chances,
            }),
            roll_result: Ok(ChancesPayload {
                chances: chances.saturating_sub(1),
            }),
            add_result: Ok(ChancesPayload {
                chances: chances + 1,
            }),
            login_latency: Duration::ZERO,
            roll_latency: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
            rolled_faces: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_login(mut self, result: Result<LoginPayload, ServiceFailure>) -> Self {
        self.login_result = result;
        self
    }

    fn with_roll(mut self, result: Result<ChancesPayload, ServiceFailure>) -> Self {
        self.roll_result = result;
        self
    }

    fn with_add(mut self, result: Result<ChancesPayload, ServiceFailure>) -> Self {
        self.add_result = result;
        self
    }

    fn with_login_latency(mut self, latency: Duration) -> Self {
        self.login_latency = latency;
        self
    }

    fn with_roll_latency(mut self, latency: Duration) -> Self {
        self.roll_latency = latency;
        self
    }
}

#[async_trait]
impl ScoringService for ScriptedScoringService {
    async fn login(&self, code: &IdentityCode) -> Result<LoginPayload, ServiceFailure> {
        self.calls.lock().await.push(format!("login:{code}"));
        if !self.login_latency.is_zero() {
            time::sleep(self.login_latency).await;
        }
        self.login_result.clone()
    }

    async fn roll_dice(
        &self,
        code: &IdentityCode,
        roll_result: DieFace,
    ) -> Result<ChancesPayload, ServiceFailure> {
        self.calls.lock().await.push(format!("rollDice:{code}"));
        self.rolled_faces.lock().await.push(roll_result);
        if !self.roll_latency.is_zero() {
            time::sleep(self.roll_latency).await;
        }
        self.roll_result.clone()
    }

    async fn add_chance(&self, code: &IdentityCode) -> Result<ChancesPayload, ServiceFailure> {
        self.calls.lock().await.push(format!("addChance:{code}"));
        self.add_result.clone()
    }
}

fn controller_with(
    service: ScriptedScoringService,
) -> (SessionController, Arc<Mutex<Vec<String>>>) {
    let calls = service.calls.clone();
    (SessionController::new(Arc::new(service)), calls)
}

fn transport_down() -> ServiceFailure {
    ServiceFailure::Transport("connection refused".into())
}

#[tokio::test]
async fn blank_code_fails_validation_without_calling_service() {
    let (mut controller, calls) = controller_with(ScriptedScoringService::logged_in_as("Kim", 3));

    for raw in ["", "   ", "\t"] {
        let err = controller.login(raw).await.unwrap_err();
        assert_eq!(err, SessionError::Validation);
    }

    let view = controller.view();
    assert!(view.session.is_none());
    assert_eq!(view.status, messages::ENTER_CODE);
    assert!(calls.lock().await.is_empty());
}

#[tokio::test]
async fn login_success_creates_session_with_greeting() {
    let (mut controller, calls) = controller_with(ScriptedScoringService::logged_in_as("Kim", 3));

    controller.login("user123").await.expect("login");

    let view = controller.view();
    let session = view.session.clone().expect("session");
    assert_eq!(session.identity_code.as_str(), "user123");
    assert_eq!(session.display_name, "Kim");
    assert_eq!(session.chances, 3);
    assert_eq!(view.status, messages::greeting("Kim", 3));
    assert!(view.status.contains('3'));
    assert_eq!(view.phase(), SessionPhase::LoggedIn { chances: 3 });
    assert_eq!(view.primary_action(), PrimaryAction::Roll { enabled: true });
    assert_eq!(*calls.lock().await, vec!["login:user123".to_string()]);
}

#[tokio::test]
async fn login_with_zero_chances_uses_no_chances_greeting() {
    let (mut controller, _calls) = controller_with(ScriptedScoringService::logged_in_as("Lee", 0));

    controller.login("user456").await.expect("login");

    let view = controller.view();
    assert_eq!(view.chances(), Some(0));
    assert_eq!(view.status, messages::no_chances_left("Lee"));
    assert_eq!(view.primary_action(), PrimaryAction::AddChance);
}

#[tokio::test(start_paused = true)]
async fn login_publishes_requesting_status_before_the_answer() {
    let (controller, _calls) = controller_with(
        ScriptedScoringService::logged_in_as("Kim", 3).with_login_latency(Duration::from_secs(1)),
    );
    let mut updates = controller.subscribe();

    let handle = tokio::spawn(async move {
        let mut controller = controller;
        controller.login("user123").await.map(|()| controller)
    });

    updates.changed().await.expect("requesting update");
    let pending = updates.borrow_and_update().clone();
    assert_eq!(pending.status, messages::REQUESTING);
    assert!(pending.session.is_none());

    let controller = handle.await.expect("join").expect("login");
    assert_eq!(updates.borrow_and_update().status, messages::greeting("Kim", 3));
    assert_eq!(controller.view().chances(), Some(3));
}

#[tokio::test]
async fn rejected_login_clears_existing_session_and_shows_service_message() {
    let (mut controller, _calls) = controller_with(ScriptedScoringService::logged_in_as("Kim", 3));
    controller.login("user123").await.expect("login");

    let service = ScriptedScoringService::logged_in_as("Kim", 3).with_login(Err(
        ServiceFailure::Rejected("번호를 다시 확인해주세요.".into()),
    ));
    let service: Arc<dyn ScoringService> = Arc::new(service);
    controller.service = service;

    let err = controller.login("userXXX").await.unwrap_err();
    assert_eq!(err, SessionError::Service("번호를 다시 확인해주세요.".into()));

    let view = controller.view();
    assert!(view.session.is_none());
    assert!(view.roll_outcome.is_none());
    assert!(!view.animating);
    assert_eq!(view.status, "번호를 다시 확인해주세요.");
    assert_eq!(view.phase(), SessionPhase::LoggedOut);
    assert_eq!(view.primary_action(), PrimaryAction::Login);
}

#[tokio::test]
async fn unreachable_service_during_login_shows_generic_text() {
    let (mut controller, _calls) = controller_with(
        ScriptedScoringService::logged_in_as("Kim", 3).with_login(Err(transport_down())),
    );

    let err = controller.login("user123").await.unwrap_err();
    assert!(matches!(err, SessionError::Transport(_)));

    let view = controller.view();
    assert!(view.session.is_none());
    assert_eq!(view.status, messages::LOGIN_FAILED);
}

#[tokio::test]
async fn roll_without_session_is_rejected_locally() {
    let (mut controller, calls) = controller_with(ScriptedScoringService::logged_in_as("Kim", 3));

    let err = controller.roll_dice().await.unwrap_err();

    assert_eq!(err, SessionError::NotLoggedIn);
    let view = controller.view();
    assert_eq!(view.status, messages::LOGIN_FIRST);
    assert!(!view.animating);
    assert!(view.roll_outcome.is_none());
    assert!(calls.lock().await.is_empty());
}

#[tokio::test]
async fn roll_with_zero_chances_only_updates_status() {
    let (mut controller, calls) = controller_with(ScriptedScoringService::logged_in_as("Lee", 0));
    controller.login("user456").await.expect("login");
    let before = controller.view();

    let report = controller.roll_dice().await.expect("roll");

    assert_eq!(report, RollReport::NoChancesLeft);
    let view = controller.view();
    assert_eq!(view.session, before.session);
    assert_eq!(view.roll_outcome, None);
    assert!(!view.animating);
    assert_eq!(view.status, messages::no_chances_left("Lee"));
    assert_eq!(*calls.lock().await, vec!["login:user456".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn last_chance_roll_reveals_after_delay_with_no_chances_message() {
    let service = ScriptedScoringService::logged_in_as("Kim", 1)
        .with_roll(Ok(ChancesPayload { chances: 0 }));
    let rolled_faces = service.rolled_faces.clone();
    let (mut controller, _calls) = controller_with(service);
    controller.login("user123").await.expect("login");

    let started = time::Instant::now();
    let report = controller.roll_dice().await.expect("roll");
    let elapsed = started.elapsed();

    let RollReport::Rolled(face) = report else {
        panic!("expected a rolled face, got {report:?}");
    };
    assert!(elapsed >= ROLL_REVEAL_DELAY, "revealed after {elapsed:?}");
    assert!((1..=6).contains(&face.value()));
    assert_eq!(*rolled_faces.lock().await, vec![face]);

    let view = controller.view();
    assert_eq!(view.chances(), Some(0));
    assert_eq!(view.roll_outcome, Some(face));
    assert!(!view.animating);
    assert_eq!(view.status, messages::no_chances_left("Kim"));
    assert_eq!(view.primary_action(), PrimaryAction::AddChance);
}

#[tokio::test(start_paused = true)]
async fn roll_shows_animation_until_reveal() {
    let (mut controller, _calls) = controller_with(
        ScriptedScoringService::logged_in_as("Kim", 3).with_roll(Ok(ChancesPayload { chances: 2 })),
    );
    controller.login("user123").await.expect("login");
    let mut updates = controller.subscribe();
    updates.borrow_and_update();

    let handle = tokio::spawn(async move {
        let report = controller.roll_dice().await;
        (controller, report)
    });

    updates.changed().await.expect("rolling update");
    let rolling = updates.borrow_and_update().clone();
    assert!(rolling.animating);
    assert!(rolling.roll_outcome.is_none());
    assert_eq!(rolling.status, messages::ROLLING);
    assert_eq!(rolling.phase(), SessionPhase::Rolling);
    assert_eq!(rolling.primary_action(), PrimaryAction::Roll { enabled: false });
    assert_eq!(rolling.chances(), Some(3));

    let (controller, report) = handle.await.expect("join");
    let face = match report.expect("roll") {
        RollReport::Rolled(face) => face,
        other => panic!("expected a rolled face, got {other:?}"),
    };

    let revealed = updates.borrow_and_update().clone();
    assert_eq!(revealed, controller.view());
    assert!(!revealed.animating);
    assert_eq!(revealed.roll_outcome, Some(face));
    assert_eq!(revealed.chances(), Some(2));
    assert_eq!(revealed.status, messages::remaining(2));
}

#[tokio::test(start_paused = true)]
async fn slow_debit_reveals_when_the_response_arrives() {
    let latency = Duration::from_secs(3);
    let (mut controller, _calls) = controller_with(
        ScriptedScoringService::logged_in_as("Kim", 3)
            .with_roll(Ok(ChancesPayload { chances: 2 }))
            .with_roll_latency(latency),
    );
    controller.login("user123").await.expect("login");

    let started = time::Instant::now();
    controller.roll_dice().await.expect("roll");
    let elapsed = started.elapsed();

    assert!(elapsed >= latency, "revealed after {elapsed:?}");
    assert!(
        elapsed < latency + ROLL_REVEAL_DELAY,
        "timer and request must run concurrently, took {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn failed_roll_ends_animation_immediately_and_keeps_chances() {
    let (mut controller, _calls) = controller_with(
        ScriptedScoringService::logged_in_as("Kim", 2).with_roll(Err(transport_down())),
    );
    controller.login("user123").await.expect("login");

    let started = time::Instant::now();
    let err = controller.roll_dice().await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, SessionError::Transport(_)));
    assert!(elapsed < ROLL_REVEAL_DELAY, "aborted after {elapsed:?}");
    let view = controller.view();
    assert!(!view.animating);
    assert!(view.roll_outcome.is_none());
    assert_eq!(view.chances(), Some(2));
    assert_eq!(view.status, messages::ROLL_FAILED);
}

#[tokio::test(start_paused = true)]
async fn rejected_roll_shows_service_message() {
    let (mut controller, _calls) = controller_with(
        ScriptedScoringService::logged_in_as("Kim", 2)
            .with_roll(Err(ServiceFailure::Rejected("시트 오류".into()))),
    );
    controller.login("user123").await.expect("login");

    let err = controller.roll_dice().await.unwrap_err();

    assert_eq!(err, SessionError::Service("시트 오류".into()));
    let view = controller.view();
    assert_eq!(view.status, "시트 오류");
    assert_eq!(view.chances(), Some(2));
    assert!(!view.animating);
}

#[tokio::test(start_paused = true)]
async fn roll_takes_chance_count_from_service() {
    let (mut controller, _calls) = controller_with(
        ScriptedScoringService::logged_in_as("Kim", 2).with_roll(Ok(ChancesPayload { chances: 7 })),
    );
    controller.login("user123").await.expect("login");

    controller.roll_dice().await.expect("roll");

    assert_eq!(controller.view().chances(), Some(7));
    assert_eq!(controller.view().status, messages::remaining(7));
}

#[tokio::test(start_paused = true)]
async fn new_login_clears_previous_roll_outcome() {
    let (mut controller, _calls) = controller_with(ScriptedScoringService::logged_in_as("Kim", 3));
    controller.login("user123").await.expect("login");
    controller.roll_dice().await.expect("roll");
    assert!(controller.view().roll_outcome.is_some());

    controller.login("user123").await.expect("login again");

    let view = controller.view();
    assert!(view.roll_outcome.is_none());
    assert_eq!(view.chances(), Some(3));
}

#[tokio::test]
async fn add_chance_without_session_is_rejected_locally() {
    let (mut controller, calls) = controller_with(ScriptedScoringService::logged_in_as("Kim", 0));

    let err = controller.add_chance().await.unwrap_err();

    assert_eq!(err, SessionError::NotLoggedIn);
    assert_eq!(controller.view().status, messages::LOGIN_FIRST);
    assert!(calls.lock().await.is_empty());
}

#[tokio::test]
async fn add_chance_uses_confirmed_count() {
    let (mut controller, calls) = controller_with(
        ScriptedScoringService::logged_in_as("Lee", 0).with_add(Ok(ChancesPayload { chances: 5 })),
    );
    controller.login("user456").await.expect("login");

    let chances = controller.add_chance().await.expect("add chance");

    assert_eq!(chances, 5);
    let view = controller.view();
    assert_eq!(view.chances(), Some(5));
    assert_eq!(view.status, messages::chance_added("Lee"));
    assert_eq!(view.primary_action(), PrimaryAction::Roll { enabled: true });
    assert_eq!(
        *calls.lock().await,
        vec!["login:user456".to_string(), "addChance:user456".to_string()]
    );
}

#[tokio::test]
async fn failed_add_chance_only_updates_status() {
    let (mut controller, _calls) = controller_with(
        ScriptedScoringService::logged_in_as("Lee", 0).with_add(Err(transport_down())),
    );
    controller.login("user456").await.expect("login");
    let before = controller.view();

    let err = controller.add_chance().await.unwrap_err();

    assert!(matches!(err, SessionError::Transport(_)));
    let view = controller.view();
    assert_eq!(view.session, before.session);
    assert_eq!(view.status, messages::ADD_CHANCE_FAILED);
}

#[tokio::test(start_paused = true)]
async fn in_memory_service_plays_a_full_session() {
    let service = Arc::new(InMemoryScoringService::with_demo_players());
    let mut controller = SessionController::new(service.clone());

    controller.login("user789").await.expect("login");
    assert_eq!(controller.view().chances(), Some(1));

    let RollReport::Rolled(face) = controller.roll_dice().await.expect("roll") else {
        panic!("expected a rolled face");
    };
    assert_eq!(controller.view().chances(), Some(0));
    assert_eq!(
        controller.roll_dice().await.expect("roll"),
        RollReport::NoChancesLeft
    );

    assert_eq!(controller.add_chance().await.expect("add"), 1);
    controller.roll_dice().await.expect("roll");
    assert_eq!(controller.view().chances(), Some(0));

    let log = service.roll_log().await;
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].roll_result, face);
    assert_eq!(service.player("user789").await.expect("player").chances, 0);
}

#[tokio::test(start_paused = true)]
async fn in_memory_outage_during_roll_keeps_chances() {
    let service = Arc::new(InMemoryScoringService::with_demo_players());
    let mut controller = SessionController::new(service.clone());
    controller.login("user123").await.expect("login");

    service.fail_transport(true);
    let err = controller.roll_dice().await.unwrap_err();

    assert!(matches!(err, SessionError::Transport(_)));
    let view = controller.view();
    assert!(!view.animating);
    assert!(view.roll_outcome.is_none());
    assert_eq!(view.chances(), Some(3));
    assert_eq!(view.status, messages::ROLL_FAILED);
    assert!(service.roll_log().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn custom_reveal_delay_is_honored() {
    let (controller, _calls) = controller_with(ScriptedScoringService::logged_in_as("Kim", 3));
    let mut controller = controller.with_reveal_delay(Duration::from_millis(200));
    assert_eq!(controller.reveal_delay(), Duration::from_millis(200));
    controller.login("user123").await.expect("login");

    let started = time::Instant::now();
    controller.roll_dice().await.expect("roll");

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < ROLL_REVEAL_DELAY);
}

#[tokio::test(start_paused = true)]
async fn frames_queue_every_published_view_in_order() {
    let (mut controller, _calls) = controller_with(
        ScriptedScoringService::logged_in_as("Park", 1).with_roll(Ok(ChancesPayload { chances: 0 })),
    );
    let mut frames = controller.frames();

    controller.login("user789").await.expect("login");
    controller.roll_dice().await.expect("roll");
    drop(controller);

    let mut statuses = Vec::new();
    while let Some(view) = frames.recv().await {
        statuses.push((view.status, view.animating));
    }
    assert_eq!(
        statuses,
        vec![
            (messages::REQUESTING.to_string(), false),
            (messages::greeting("Park", 1), false),
            (messages::ROLLING.to_string(), true),
            (messages::no_chances_left("Park"), false),
        ]
    );
}

#[tokio::test]
async fn dropped_frame_receiver_is_forgotten() {
    let (mut controller, _calls) = controller_with(ScriptedScoringService::logged_in_as("Kim", 3));
    drop(controller.frames());

    controller.login("user123").await.expect("login");

    assert!(controller.frame_sinks.is_empty());
}
