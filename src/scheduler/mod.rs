/// 입찰 세션 스케줄러
/// 하나의 태스크가 세션을 소유하고, 명령과 타이머 이벤트를 순서대로 처리한다.
/// 카운트다운(1초 주기)과 판매자별 입찰 공개는 별도 태스크가 이벤트를 보내는 방식이며,
/// LiveBidding 을 벗어나는 즉시 모두 abort 된다.
// region:    --- Imports
use crate::bid_request::BidRequestStore;
use crate::bidding::model::{Bid, BidDuration};
use crate::bidding::session::{BiddingSession, Epoch, ScheduledReveal, SessionView, TickOutcome};
use crate::catalog::model::Product;
use crate::config::SessionSettings;
use crate::error::SessionError;
use crate::identity::UserIdentity;
use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

// endregion: --- Imports

const COMMAND_CHANNEL_LEN: usize = 32;

// region:    --- Messages
/// 세션 종료 결과
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Accepted(Bid),
    Discarded,
}

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

enum Command {
    SelectDuration(BidDuration, Reply<()>),
    Start(Reply<()>),
    ViewAll(Reply<()>),
    Accept(String, Reply<Bid>),
    Discard,
}

enum SessionEvent {
    Tick(Epoch),
    Reveal(Epoch, usize),
    BidRequestCreated(String),
}
// endregion: --- Messages

// region:    --- Session Handle
/// 세션 조작 핸들 (복제 가능)
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<SessionView>,
}

impl SessionHandle {
    /// 최신 스냅샷
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// 스냅샷 변경 구독
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    pub async fn select_duration(&self, duration: BidDuration) -> Result<(), SessionError> {
        self.request(|reply| Command::SelectDuration(duration, reply))
            .await
    }

    pub async fn start(&self) -> Result<(), SessionError> {
        self.request(Command::Start).await
    }

    pub async fn view_all(&self) -> Result<(), SessionError> {
        self.request(Command::ViewAll).await
    }

    pub async fn accept(&self, bid_id: impl Into<String>) -> Result<Bid, SessionError> {
        let bid_id = bid_id.into();
        self.request(|reply| Command::Accept(bid_id, reply)).await
    }

    /// 세션 폐기 (이미 종료된 세션이면 무시)
    pub async fn discard(&self) {
        let _ = self.commands.send(Command::Discard).await;
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)?
    }
}
// endregion: --- Session Handle

// region:    --- Session Scheduler
pub struct SessionScheduler<R> {
    session: BiddingSession,
    rng: R,
    settings: SessionSettings,
    store: Arc<dyn BidRequestStore>,
    identity: Arc<dyn UserIdentity>,
    commands: mpsc::Receiver<Command>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    view_tx: watch::Sender<SessionView>,
    /// 카운트다운 및 공개 태스크 (한 그룹으로 취소)
    timers: Vec<JoinHandle<()>>,
    /// 진행 중인 입찰 요청 생성 (완료 시 id)
    bid_request: Option<JoinHandle<Option<String>>>,
}

impl<R> SessionScheduler<R>
where
    R: Rng + Send + 'static,
{
    /// 세션 태스크 시작
    /// 반환된 JoinHandle 은 수락 또는 폐기 시 종료 결과를 돌려준다.
    pub fn spawn(
        product: Product,
        rng: R,
        settings: SessionSettings,
        store: Arc<dyn BidRequestStore>,
        identity: Arc<dyn UserIdentity>,
    ) -> (SessionHandle, JoinHandle<SessionOutcome>) {
        let session = BiddingSession::new(product);
        let (commands_tx, commands) = mpsc::channel(COMMAND_CHANNEL_LEN);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (view_tx, view) = watch::channel(session.view());

        let scheduler = Self {
            session,
            rng,
            settings,
            store,
            identity,
            commands,
            events_tx,
            events_rx,
            view_tx,
            timers: Vec::new(),
            bid_request: None,
        };
        let task = tokio::spawn(scheduler.run());

        (
            SessionHandle {
                commands: commands_tx,
                view,
            },
            task,
        )
    }

    async fn run(mut self) -> SessionOutcome {
        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let outcome = match command {
                        Some(command) => self.handle_command(command),
                        // 모든 핸들이 사라지면 화면 이탈로 본다
                        None => self.discard(),
                    };
                    if let Some(outcome) = outcome {
                        self.publish();
                        return outcome;
                    }
                }
                Some(event) = self.events_rx.recv() => self.handle_event(event),
            }
            self.publish();
        }
    }

    // 응답 전에 스냅샷을 먼저 갱신한다
    fn handle_command(&mut self, command: Command) -> Option<SessionOutcome> {
        match command {
            Command::SelectDuration(duration, reply) => {
                let result = self.session.select_duration(duration);
                self.reply(reply, result);
            }
            Command::Start(reply) => {
                let result = self.start();
                self.reply(reply, result);
            }
            Command::ViewAll(reply) => {
                let result = self.session.view_all();
                if result.is_ok() {
                    self.cancel_timers();
                }
                self.reply(reply, result);
            }
            Command::Accept(bid_id, reply) => {
                let result = self.session.accept(&bid_id);
                let outcome = result.as_ref().ok().cloned().map(SessionOutcome::Accepted);
                if let Some(SessionOutcome::Accepted(bid)) = &outcome {
                    self.cancel_timers();
                    self.forward_accept(bid.id.clone());
                }
                self.reply(reply, result);
                return outcome;
            }
            Command::Discard => return self.discard(),
        }
        None
    }

    fn reply<T>(&self, reply: Reply<T>, result: Result<T, SessionError>) {
        self.publish();
        let _ = reply.send(result);
    }

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Tick(epoch) => {
                if self.session.tick(epoch) == TickOutcome::Expired {
                    self.cancel_timers();
                }
            }
            SessionEvent::Reveal(epoch, index) => {
                if !self.session.reveal(epoch, index) {
                    debug!("{:<12} --> 무시된 입찰 공개: index={}", "Scheduler", index);
                }
            }
            SessionEvent::BidRequestCreated(id) => {
                info!("{:<12} --> 입찰 요청 기록: id={}", "Scheduler", id);
                self.session.record_bid_request(id);
            }
        }
    }

    /// LiveBidding 진입: 시계, 공개 일정, 원격 기록 요청
    fn start(&mut self) -> Result<(), SessionError> {
        let epoch = self.session.start(&mut self.rng, Utc::now())?;

        self.spawn_countdown(epoch);
        for reveal in self.session.reveal_plan(self.settings.reveal_interval) {
            self.spawn_reveal(epoch, reveal);
        }
        self.create_bid_request();
        Ok(())
    }

    fn discard(&mut self) -> Option<SessionOutcome> {
        self.session.discard();
        self.cancel_timers();
        Some(SessionOutcome::Discarded)
    }

    fn spawn_countdown(&mut self, epoch: Epoch) {
        let events = self.events_tx.clone();
        let period = self.settings.tick_period;
        self.timers.push(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                interval.tick().await;
                if events.send(SessionEvent::Tick(epoch)).is_err() {
                    break;
                }
            }
        }));
    }

    fn spawn_reveal(&mut self, epoch: Epoch, reveal: ScheduledReveal) {
        let events = self.events_tx.clone();
        self.timers.push(tokio::spawn(async move {
            sleep(reveal.delay).await;
            let _ = events.send(SessionEvent::Reveal(epoch, reveal.index));
        }));
    }

    // 실패해도 세션은 계속 진행된다 (fire-and-forget)
    fn create_bid_request(&mut self) {
        let store = Arc::clone(&self.store);
        let identity = Arc::clone(&self.identity);
        let events = self.events_tx.clone();
        let product_id = self.session.product().id.clone();
        let duration = self.session.duration();

        self.bid_request = Some(tokio::spawn(async move {
            let user_id = identity.current_user_id().await;
            match store.create(&user_id, &product_id, duration).await {
                Ok(request) => {
                    let _ = events.send(SessionEvent::BidRequestCreated(request.id.clone()));
                    Some(request.id)
                }
                Err(e) => {
                    warn!(
                        "{:<12} --> 입찰 요청 생성 실패, 세션은 계속 진행: {}",
                        "Scheduler", e
                    );
                    None
                }
            }
        }));
    }

    /// 수락된 입찰을 원격 저장소에 best-effort 로 전달한다.
    /// 입찰 요청 생성이 아직 끝나지 않았으면 완료를 기다린 뒤 전달한다.
    fn forward_accept(&mut self, bid_id: String) {
        let store = Arc::clone(&self.store);
        let known = self.session.bid_request_id().map(str::to_string);
        let pending = self.bid_request.take();

        tokio::spawn(async move {
            let bid_request_id = match (known, pending) {
                (Some(id), _) => Some(id),
                (None, Some(pending)) => pending.await.ok().flatten(),
                (None, None) => None,
            };
            let Some(bid_request_id) = bid_request_id else {
                warn!(
                    "{:<12} --> 입찰 요청 id 가 없어 수락을 전달하지 않음: bid={}",
                    "Scheduler", bid_id
                );
                return;
            };
            match store.accept(&bid_request_id, &bid_id).await {
                Ok(()) => info!(
                    "{:<12} --> 입찰 수락 전달: request={}, bid={}",
                    "Scheduler", bid_request_id, bid_id
                ),
                Err(e) => warn!("{:<12} --> 입찰 수락 전달 실패: {}", "Scheduler", e),
            }
        });
    }

    fn cancel_timers(&mut self) {
        if self.timers.is_empty() {
            return;
        }
        debug!(
            "{:<12} --> 타이머 {}개 취소",
            "Scheduler",
            self.timers.len()
        );
        for timer in self.timers.drain(..) {
            timer.abort();
        }
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.session.view());
    }
}

impl<R> Drop for SessionScheduler<R> {
    fn drop(&mut self) {
        for timer in self.timers.drain(..) {
            timer.abort();
        }
    }
}
// endregion: --- Session Scheduler
