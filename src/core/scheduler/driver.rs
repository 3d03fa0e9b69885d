//! 定时驱动
//!
//! 独立计时线程按固定间隔发 tick，周期本身放到 rayon 线程池执行，
//! 计时不会被慢周期拖住；周期未结束时到达的 tick 直接丢弃。

use super::session::{AcceptedDocument, CycleOutcome, CycleTicket, DetectionSession, TickDecision};
use crate::core::error::DetectorError;
use crate::core::pipeline::DetectionPipeline;
use crate::core::vision::VideoSource;
use log::{debug, info};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// 会话未在运行
    Idle,
    Dropped,
    CameraClosed,
    NoFrame,
    Completed(CycleOutcome),
}

struct LoopCore {
    session: Arc<DetectionSession>,
    pipeline: Arc<DetectionPipeline>,
    source: Arc<dyn VideoSource>,
}

impl LoopCore {
    fn begin_tick(&self) -> Result<CycleTicket, TickOutcome> {
        if !self.source.is_active() {
            if self.session.is_active() {
                info!("📷 Camera closed, stopping detection");
                self.session.stop_detection();
            }
            return Err(TickOutcome::CameraClosed);
        }

        match self.session.on_tick() {
            TickDecision::Start(ticket) => Ok(ticket),
            TickDecision::Dropped => Err(TickOutcome::Dropped),
            TickDecision::Inactive => Err(TickOutcome::Idle),
        }
    }

    fn run_cycle(&self, ticket: CycleTicket) -> TickOutcome {
        let frame = match self.pipeline.capture(self.source.as_ref()) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("⚠️ Cycle skipped: {}", e);
                self.session.abort_cycle(ticket);
                return TickOutcome::NoFrame;
            }
        };

        let result = self.pipeline.analyze(&frame);
        TickOutcome::Completed(self.session.complete_cycle(ticket, frame, result))
    }
}

pub struct DetectionLoop {
    core: Arc<LoopCore>,
}

impl DetectionLoop {
    pub fn new(
        pipeline: Arc<DetectionPipeline>,
        source: Arc<dyn VideoSource>,
    ) -> Result<Self, DetectorError> {
        let session = DetectionSession::new(pipeline.config().scheduler.clone())?;
        Ok(Self {
            core: Arc::new(LoopCore {
                session: Arc::new(session),
                pipeline,
                source,
            }),
        })
    }

    pub fn session(&self) -> &Arc<DetectionSession> {
        &self.core.session
    }

    /// 在当前线程同步执行一个 tick（由调用方自行驱动时使用）
    pub fn run_tick(&self) -> TickOutcome {
        match self.core.begin_tick() {
            Ok(ticket) => self.core.run_cycle(ticket),
            Err(outcome) => outcome,
        }
    }

    /// 启动会话并开始计时
    pub fn spawn<F>(&self, on_accepted: F) -> Result<LoopHandle, DetectorError>
    where
        F: FnMut(AcceptedDocument) + Send + 'static,
    {
        let core = Arc::clone(&self.core);
        core.session
            .start_detection(core.source.is_active(), on_accepted)?;

        let interval = core.session.interval();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let timer_core = Arc::clone(&core);
        let spawned = thread::Builder::new()
            .name("doc-scan-timer".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    _ => break,
                }
                if !timer_core.session.is_active() {
                    break;
                }

                if let Ok(ticket) = timer_core.begin_tick() {
                    let cycle_core = Arc::clone(&timer_core);
                    rayon::spawn(move || {
                        cycle_core.run_cycle(ticket);
                    });
                }
            });

        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                core.session.stop_detection();
                return Err(e.into());
            }
        };

        Ok(LoopHandle {
            session: Arc::clone(&core.session),
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }
}

/// 计时线程句柄，stop 或 drop 时取消定时并停止会话
pub struct LoopHandle {
    session: Arc<DetectionSession>,
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl LoopHandle {
    pub fn is_running(&self) -> bool {
        self.session.is_active()
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.session.stop_detection();
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for LoopHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
