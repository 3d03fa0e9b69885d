//! 检测会话：调度状态 + 代号 + 最近结果
//!
//! 所有可变状态都在一把 Mutex 后面。每个周期持有签发时的代号，
//! stop / 重新 start 会推进代号，迟到的结果按代号丢弃。
//! in_flight 不随代号重置：旧周期返回之前，重启后的会话不会开新周期。

use super::state_machine::{DetectionState, SchedulerEvent, StateAction};
use crate::core::config::{SchedulerConfig, MAX_INTERVAL_MS, MIN_INTERVAL_MS};
use crate::core::error::DetectorError;
use crate::core::fuser::DetectionResult;
use crate::core::vision::FrameBuffer;
use log::{debug, info};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// 被接受的检测：结果 + 对应的取景框帧
#[derive(Debug, Clone)]
pub struct AcceptedDocument {
    pub result: DetectionResult,
    pub frame: FrameBuffer,
}

pub type AcceptedCallback = Box<dyn FnMut(AcceptedDocument) + Send>;

/// 一个在途周期的凭证，只能完成或放弃一次
#[derive(Debug)]
pub struct CycleTicket {
    generation: u64,
}

#[derive(Debug)]
pub enum TickDecision {
    Start(CycleTicket),
    Dropped,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Accepted,
    Continue,
    /// 会话已停止或已重启
    Discarded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub cycles_started: u64,
    pub cycles_completed: u64,
    pub dropped_ticks: u64,
    pub discarded_results: u64,
}

struct SessionInner {
    state: DetectionState,
    generation: u64,
    /// 任意代号的周期在途
    in_flight: bool,
    /// 最近结果及其帧号
    last_result: Option<(DetectionResult, u64)>,
    on_accepted: Option<AcceptedCallback>,
    stats: SessionStats,
}

pub struct DetectionSession {
    config: SchedulerConfig,
    inner: Mutex<SessionInner>,
}

impl DetectionSession {
    pub fn new(config: SchedulerConfig) -> Result<Self, DetectorError> {
        if !(MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&config.interval_ms) {
            return Err(DetectorError::InvalidConfig(format!(
                "scheduler interval {}ms outside {}-{}ms",
                config.interval_ms, MIN_INTERVAL_MS, MAX_INTERVAL_MS
            )));
        }
        if config.acceptance_threshold > 100 {
            return Err(DetectorError::InvalidConfig(format!(
                "acceptance threshold {} exceeds 100",
                config.acceptance_threshold
            )));
        }

        Ok(Self {
            config,
            inner: Mutex::new(SessionInner {
                state: DetectionState::Idle,
                generation: 0,
                in_flight: false,
                last_result: None,
                on_accepted: None,
                stats: SessionStats::default(),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.config.interval_ms)
    }

    pub fn threshold(&self) -> u8 {
        self.config.acceptance_threshold
    }

    pub fn state(&self) -> DetectionState {
        self.lock().state
    }

    pub fn is_active(&self) -> bool {
        self.lock().state.is_active()
    }

    pub fn stats(&self) -> SessionStats {
        self.lock().stats
    }

    /// 开始检测；第一个达到阈值的结果会交给 on_accepted，然后自动停止
    pub fn start_detection<F>(&self, camera_active: bool, on_accepted: F) -> Result<(), DetectorError>
    where
        F: FnMut(AcceptedDocument) + Send + 'static,
    {
        let mut inner = self.lock();
        let (state, action) = inner.state.transition(
            SchedulerEvent::Start { camera_active },
            self.config.acceptance_threshold,
        );

        match action {
            StateAction::Arm => {
                inner.state = state;
                inner.generation += 1;
                inner.last_result = None;
                inner.on_accepted = Some(Box::new(on_accepted));
                info!(
                    "🟢 Detection started (every {}ms, accept at {}%)",
                    self.config.interval_ms, self.config.acceptance_threshold
                );
                Ok(())
            }
            StateAction::AlreadyActive => Err(DetectorError::AlreadyRunning),
            _ => Err(DetectorError::CameraInactive),
        }
    }

    /// 停止检测，在途周期的结果到达后会被丢弃
    pub fn stop_detection(&self) {
        let mut inner = self.lock();
        let was_active = inner.state.is_active();
        let (state, _) = inner
            .state
            .transition(SchedulerEvent::Stop, self.config.acceptance_threshold);
        inner.state = state;
        inner.generation += 1;
        inner.on_accepted = None;

        if was_active {
            info!("🔴 Detection stopped");
        }
    }

    pub fn on_tick(&self) -> TickDecision {
        let mut inner = self.lock();
        if inner.in_flight && inner.state == DetectionState::Waiting {
            inner.stats.dropped_ticks += 1;
            debug!("⏭️ Tick dropped, previous session's cycle still running");
            return TickDecision::Dropped;
        }

        let (state, action) = inner
            .state
            .transition(SchedulerEvent::Tick, self.config.acceptance_threshold);
        inner.state = state;

        match action {
            StateAction::StartCycle => {
                inner.in_flight = true;
                inner.stats.cycles_started += 1;
                TickDecision::Start(CycleTicket {
                    generation: inner.generation,
                })
            }
            StateAction::DropTick => {
                inner.stats.dropped_ticks += 1;
                debug!("⏭️ Tick dropped, cycle still running");
                TickDecision::Dropped
            }
            _ => TickDecision::Inactive,
        }
    }

    /// 周期没有拿到帧，回到等待
    pub fn abort_cycle(&self, ticket: CycleTicket) {
        let mut inner = self.lock();
        inner.in_flight = false;
        if ticket.generation != inner.generation {
            return;
        }
        let (state, _) = inner
            .state
            .transition(SchedulerEvent::CycleAborted, self.config.acceptance_threshold);
        inner.state = state;
    }

    pub fn complete_cycle(
        &self,
        ticket: CycleTicket,
        frame: FrameBuffer,
        result: DetectionResult,
    ) -> CycleOutcome {
        let mut inner = self.lock();
        inner.in_flight = false;
        if ticket.generation != inner.generation || inner.state != DetectionState::Running {
            inner.stats.discarded_results += 1;
            debug!("🗑️ Stale result discarded ({}%)", result.probability);
            return CycleOutcome::Discarded;
        }

        let (state, action) = inner.state.transition(
            SchedulerEvent::CycleCompleted {
                probability: result.probability,
            },
            self.config.acceptance_threshold,
        );
        inner.state = state;
        inner.stats.cycles_completed += 1;
        inner.last_result = Some((result.clone(), frame.frame_number()));

        if action != StateAction::Accept {
            return CycleOutcome::Continue;
        }

        info!("✅ Document accepted: {}%", result.probability);
        let callback = inner.on_accepted.take();
        drop(inner);

        // 回调在锁外执行，允许回调里再操作会话
        if let Some(mut callback) = callback {
            callback(AcceptedDocument { result, frame });
        }
        CycleOutcome::Accepted
    }

    pub fn last_result(&self) -> Option<DetectionResult> {
        self.lock().last_result.as_ref().map(|(result, _)| result.clone())
    }

    /// 最近结果和产生它的帧号
    pub fn last_result_with_frame(&self) -> Option<(DetectionResult, u64)> {
        self.lock().last_result.clone()
    }

    pub fn clear_result(&self) {
        self.lock().last_result = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn session() -> DetectionSession {
        DetectionSession::new(SchedulerConfig::default()).unwrap()
    }

    fn frame() -> FrameBuffer {
        FrameBuffer::new(RgbaImage::new(4, 4), 0)
    }

    fn numbered_frame(frame_number: u64) -> FrameBuffer {
        FrameBuffer::new(RgbaImage::new(4, 4), frame_number)
    }

    fn result(probability: u8) -> DetectionResult {
        DetectionResult {
            probability,
            features: vec![],
            stats: Default::default(),
        }
    }

    fn expect_ticket(decision: TickDecision) -> CycleTicket {
        match decision {
            TickDecision::Start(ticket) => ticket,
            other => panic!("expected a cycle to start, got {:?}", other),
        }
    }

    fn counting_callback() -> (Arc<AtomicUsize>, impl FnMut(AcceptedDocument) + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        (count, move |_doc: AcceptedDocument| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_invalid_scheduler_config() {
        let config = SchedulerConfig {
            interval_ms: 100,
            ..Default::default()
        };
        assert!(DetectionSession::new(config).is_err());
    }

    #[test]
    fn test_start_without_camera() {
        let session = session();
        let (_, callback) = counting_callback();

        assert!(matches!(
            session.start_detection(false, callback),
            Err(DetectorError::CameraInactive)
        ));
        assert_eq!(session.state(), DetectionState::Idle);
    }

    #[test]
    fn test_start_twice() {
        let session = session();
        session.start_detection(true, |_| {}).unwrap();
        assert!(matches!(
            session.start_detection(true, |_| {}),
            Err(DetectorError::AlreadyRunning)
        ));
    }

    #[test]
    fn test_two_ticks_one_cycle() {
        let session = session();
        session.start_detection(true, |_| {}).unwrap();

        let _ticket = expect_ticket(session.on_tick());
        assert!(matches!(session.on_tick(), TickDecision::Dropped));

        let stats = session.stats();
        assert_eq!(stats.cycles_started, 1);
        assert_eq!(stats.dropped_ticks, 1);
    }

    #[test]
    fn test_below_threshold_keeps_running() {
        let session = session();
        let (count, callback) = counting_callback();
        session.start_detection(true, callback).unwrap();

        let ticket = expect_ticket(session.on_tick());
        let outcome = session.complete_cycle(ticket, frame(), result(40));

        assert_eq!(outcome, CycleOutcome::Continue);
        assert_eq!(session.state(), DetectionState::Waiting);
        assert_eq!(session.last_result().unwrap().probability, 40);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_accept_delivers_once_and_stops() {
        let session = session();
        let (count, callback) = counting_callback();
        session.start_detection(true, callback).unwrap();

        let ticket = expect_ticket(session.on_tick());
        assert_eq!(
            session.complete_cycle(ticket, frame(), result(85)),
            CycleOutcome::Accepted
        );
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(session.state(), DetectionState::Stopped);
        assert!(matches!(session.on_tick(), TickDecision::Inactive));

        // 接受后结果仍保留，直到调用方清除
        assert_eq!(session.last_result().unwrap().probability, 85);
        session.clear_result();
        assert!(session.last_result().is_none());
    }

    #[test]
    fn test_stop_mid_cycle_discards_result() {
        let session = session();
        let (count, callback) = counting_callback();
        session.start_detection(true, callback).unwrap();

        let ticket = expect_ticket(session.on_tick());
        session.stop_detection();

        assert_eq!(
            session.complete_cycle(ticket, frame(), result(100)),
            CycleOutcome::Discarded
        );
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(session.last_result().is_none());
        assert_eq!(session.stats().discarded_results, 1);
    }

    #[test]
    fn test_restart_discards_previous_generation() {
        let session = session();
        let (count, callback) = counting_callback();
        session.start_detection(true, |_| {}).unwrap();
        let stale = expect_ticket(session.on_tick());

        session.stop_detection();
        session.start_detection(true, callback).unwrap();

        // 旧周期还没返回，新会话不开第二个周期
        assert!(matches!(session.on_tick(), TickDecision::Dropped));
        assert_eq!(session.state(), DetectionState::Waiting);

        assert_eq!(
            session.complete_cycle(stale, frame(), result(100)),
            CycleOutcome::Discarded
        );
        let fresh = expect_ticket(session.on_tick());
        assert_eq!(
            session.complete_cycle(fresh, frame(), result(100)),
            CycleOutcome::Accepted
        );
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_abort_returns_to_waiting() {
        let session = session();
        session.start_detection(true, |_| {}).unwrap();

        let ticket = expect_ticket(session.on_tick());
        session.abort_cycle(ticket);
        assert_eq!(session.state(), DetectionState::Waiting);
        assert!(matches!(session.on_tick(), TickDecision::Start(_)));
    }

    #[test]
    fn test_callback_can_use_session() {
        let session = Arc::new(session());
        let inner = Arc::clone(&session);
        session
            .start_detection(true, move |_| {
                inner.clear_result();
            })
            .unwrap();

        let ticket = expect_ticket(session.on_tick());
        session.complete_cycle(ticket, frame(), result(90));
        assert!(session.last_result().is_none());
    }

    #[test]
    fn test_stale_abort_frees_next_session() {
        let session = session();
        session.start_detection(true, |_| {}).unwrap();
        let stale = expect_ticket(session.on_tick());

        session.stop_detection();
        session.start_detection(true, |_| {}).unwrap();
        assert!(matches!(session.on_tick(), TickDecision::Dropped));

        session.abort_cycle(stale);
        assert!(matches!(session.on_tick(), TickDecision::Start(_)));
        assert_eq!(session.stats().cycles_started, 2);
    }

    #[test]
    fn test_last_result_keeps_frame_number() {
        let session = session();
        session.start_detection(true, |_| {}).unwrap();

        let ticket = expect_ticket(session.on_tick());
        session.complete_cycle(ticket, numbered_frame(42), result(30));

        let (last, frame_number) = session.last_result_with_frame().unwrap();
        assert_eq!(last.probability, 30);
        assert_eq!(frame_number, 42);
    }
}
