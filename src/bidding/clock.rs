use crate::bidding::model::BidDuration;

/// 카운트다운 시계
/// 남은 시간은 초 단위 정수이며 증가하지 않는다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining: u64,
    running: bool,
}

impl Countdown {
    pub fn new(duration: BidDuration) -> Self {
        Self {
            remaining: duration.total_seconds(),
            running: false,
        }
    }

    pub fn start(&mut self) {
        self.running = self.remaining > 0;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining
    }

    /// 1초 감소. 0에 도달하면 스스로 멈추고 `true`를 반환한다.
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.running = false;
            return true;
        }
        false
    }

    /// `"{h}h {m}m {s}s"` 형식의 남은 시간
    pub fn display(&self) -> String {
        format_remaining(self.remaining)
    }
}

pub fn format_remaining(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{}h {}m {}s", hours, minutes, seconds)
}
