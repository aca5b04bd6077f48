/// 입찰 세션 상태 머신
/// SelectingDuration -> LiveBidding -> Results
///
/// 타이머 콜백은 예약 시점의 epoch 를 들고 온다. LiveBidding 을 벗어나면 epoch 가
/// 바뀌므로 이전에 예약된 콜백은 아무 효과가 없다.
// region:    --- Imports
use crate::bidding::clock::Countdown;
use crate::bidding::generator::BidGenerator;
use crate::bidding::model::{Bid, BidDuration, Phase};
use crate::catalog::model::Product;
use crate::error::SessionError;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};
// endregion: --- Imports

// region:    --- Schedule Types
/// 세션 세대 토큰
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Epoch(u64);

/// 예약된 입찰 공개
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledReveal {
    pub delay: Duration,
    pub index: usize,
}

/// 카운트다운 1회 진행 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// 만료된 토큰이거나 LiveBidding 이 아님
    Ignored,
    Running(u64),
    Expired,
}
// endregion: --- Schedule Types

// region:    --- Session View
/// 호출자(UI)에게 노출되는 세션 스냅샷
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub product_id: String,
    pub product_name: String,
    pub product_price: i64,
    pub phase: Phase,
    pub duration: BidDuration,
    pub remaining_seconds: u64,
    pub time_remaining: String,
    pub bids: Vec<Bid>,
    pub best_offer: Option<Bid>,
    pub savings: Option<i64>,
    pub bid_request_id: Option<String>,
    pub accepted: Option<Bid>,
    pub closed: bool,
}
// endregion: --- Session View

// region:    --- Bidding Session
pub struct BiddingSession {
    product: Product,
    duration: BidDuration,
    phase: Phase,
    countdown: Countdown,
    epoch: u64,
    /// 판매자 순서대로 생성된 입찰 (공개되면 None)
    pending: Vec<Option<Bid>>,
    /// 공개된 입찰, 항상 가격 오름차순
    bids: Vec<Bid>,
    bid_request_id: Option<String>,
    accepted: Option<Bid>,
    closed: bool,
}

impl BiddingSession {
    pub fn new(product: Product) -> Self {
        let duration = BidDuration::default();
        Self {
            product,
            duration,
            phase: Phase::SelectingDuration,
            countdown: Countdown::new(duration),
            epoch: 0,
            pending: Vec::new(),
            bids: Vec::new(),
            bid_request_id: None,
            accepted: None,
            closed: false,
        }
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn duration(&self) -> BidDuration {
        self.duration
    }

    pub fn epoch(&self) -> Epoch {
        Epoch(self.epoch)
    }

    pub fn bids(&self) -> &[Bid] {
        &self.bids
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.countdown.remaining_seconds()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// 기간 선택 (SelectingDuration 단계에서만)
    pub fn select_duration(&mut self, duration: BidDuration) -> Result<(), SessionError> {
        self.ensure_open()?;
        if self.phase != Phase::SelectingDuration {
            return Err(SessionError::InvalidPhase(self.phase));
        }
        self.duration = duration;
        self.countdown = Countdown::new(duration);
        Ok(())
    }

    /// 입찰 시작: 판매자별 입찰을 생성하고 카운트다운을 시작한다
    pub fn start<R: Rng>(&mut self, rng: &mut R, now: DateTime<Utc>) -> Result<Epoch, SessionError> {
        self.ensure_open()?;
        if self.phase != Phase::SelectingDuration {
            return Err(SessionError::InvalidPhase(self.phase));
        }

        self.pending = BidGenerator::new(rng, now)
            .generate_all(&self.product.sellers)
            .into_iter()
            .map(Some)
            .collect();
        self.bids = Vec::with_capacity(self.pending.len());
        self.countdown = Countdown::new(self.duration);
        self.countdown.start();
        self.epoch += 1;
        self.phase = Phase::LiveBidding;

        info!(
            "{:<12} --> 입찰 시작: product={}, duration={}, sellers={}",
            "Session",
            self.product.id,
            self.duration,
            self.pending.len()
        );

        // 판매자가 없으면 공개할 입찰이 없을 뿐 오류는 아니다
        Ok(self.epoch())
    }

    /// 현재 세대의 공개 일정: delay = (index + 1) * interval
    /// 지연이 Duration 범위를 넘는 공개는 일정에서 빠진다.
    pub fn reveal_plan(&self, interval: Duration) -> Vec<ScheduledReveal> {
        if self.phase != Phase::LiveBidding {
            return Vec::new();
        }
        self.pending
            .iter()
            .enumerate()
            .filter(|(_, bid)| bid.is_some())
            .filter_map(|(index, _)| {
                let slot = u32::try_from(index + 1).ok()?;
                Some(ScheduledReveal {
                    delay: interval.checked_mul(slot)?,
                    index,
                })
            })
            .collect()
    }

    /// 카운트다운 1초 진행
    pub fn tick(&mut self, epoch: Epoch) -> TickOutcome {
        if !self.is_live(epoch) {
            return TickOutcome::Ignored;
        }
        if self.countdown.tick() {
            info!("{:<12} --> 입찰 시간 종료: product={}", "Session", self.product.id);
            self.finish();
            return TickOutcome::Expired;
        }
        debug!(
            "{:<12} --> 남은 시간 {}",
            "Session",
            self.countdown.display()
        );
        TickOutcome::Running(self.countdown.remaining_seconds())
    }

    /// 입찰 공개: 삽입 후 정렬을 한 번에 수행한다
    pub fn reveal(&mut self, epoch: Epoch, index: usize) -> bool {
        if !self.is_live(epoch) {
            return false;
        }
        let Some(bid) = self.pending.get_mut(index).and_then(Option::take) else {
            return false;
        };

        debug!(
            "{:<12} --> 입찰 도착: seller={}, price={}",
            "Session", bid.seller_name, bid.price
        );
        // 동일 가격은 도착 순서 유지 (stable sort)
        self.bids.push(bid);
        self.bids.sort_by_key(|b| b.price);
        true
    }

    /// 만료 전에 결과 보기
    pub fn view_all(&mut self) -> Result<(), SessionError> {
        self.ensure_open()?;
        if self.phase != Phase::LiveBidding {
            return Err(SessionError::InvalidPhase(self.phase));
        }
        info!(
            "{:<12} --> 전체 입찰 보기: product={}, bids={}",
            "Session",
            self.product.id,
            self.bids.len()
        );
        self.finish();
        Ok(())
    }

    /// 입찰 수락. LiveBidding 중이면 먼저 결과 단계로 넘어간다.
    pub fn accept(&mut self, bid_id: &str) -> Result<Bid, SessionError> {
        self.ensure_open()?;
        if self.phase == Phase::SelectingDuration {
            return Err(SessionError::InvalidPhase(self.phase));
        }
        let bid = self
            .bids
            .iter()
            .find(|b| b.id == bid_id)
            .cloned()
            .ok_or_else(|| SessionError::BidNotFound(bid_id.to_string()))?;

        if self.phase == Phase::LiveBidding {
            self.finish();
        }
        info!(
            "{:<12} --> 입찰 수락: seller={}, price={}",
            "Session", bid.seller_name, bid.price
        );
        self.accepted = Some(bid.clone());
        self.closed = true;
        Ok(bid)
    }

    /// 세션 폐기 (화면 이탈)
    pub fn discard(&mut self) {
        if self.closed {
            return;
        }
        info!("{:<12} --> 세션 폐기: product={}", "Session", self.product.id);
        self.invalidate();
        self.closed = true;
    }

    pub fn bid_request_id(&self) -> Option<&str> {
        self.bid_request_id.as_deref()
    }

    /// 원격 입찰 요청 id 기록
    pub fn record_bid_request(&mut self, id: impl Into<String>) {
        self.bid_request_id = Some(id.into());
    }

    pub fn view(&self) -> SessionView {
        let best_offer = self.bids.first().cloned();
        let savings = best_offer.as_ref().map(|b| self.product.price - b.price);
        SessionView {
            product_id: self.product.id.clone(),
            product_name: self.product.name.clone(),
            product_price: self.product.price,
            phase: self.phase,
            duration: self.duration,
            remaining_seconds: self.countdown.remaining_seconds(),
            time_remaining: self.countdown.display(),
            bids: self.bids.clone(),
            best_offer,
            savings,
            bid_request_id: self.bid_request_id.clone(),
            accepted: self.accepted.clone(),
            closed: self.closed,
        }
    }

    fn is_live(&self, epoch: Epoch) -> bool {
        !self.closed && self.phase == Phase::LiveBidding && epoch.0 == self.epoch
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        Ok(())
    }

    // LiveBidding 종료: 시계를 멈추고 남은 공개를 모두 무효화한다
    fn finish(&mut self) {
        self.invalidate();
        self.phase = Phase::Results;
    }

    fn invalidate(&mut self) {
        self.countdown.stop();
        self.pending.clear();
        self.epoch += 1;
    }
}
// endregion: --- Bidding Session
