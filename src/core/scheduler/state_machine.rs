#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionState {
    Idle,
    Waiting,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEvent {
    Start { camera_active: bool },
    Tick,
    CycleCompleted { probability: u8 },
    /// 周期没拿到帧
    CycleAborted,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    Arm,
    RejectStart,
    AlreadyActive,
    StartCycle,
    DropTick,
    Accept,
    Continue,
    Cancel,
    Ignore,
}

impl DetectionState {
    pub fn is_active(&self) -> bool {
        matches!(self, DetectionState::Waiting | DetectionState::Running)
    }

    pub fn transition(&self, event: SchedulerEvent, threshold: u8) -> (DetectionState, StateAction) {
        match (self, event) {
            (_, SchedulerEvent::Stop) => (DetectionState::Stopped, StateAction::Cancel),

            (DetectionState::Idle | DetectionState::Stopped, SchedulerEvent::Start { camera_active }) => {
                if camera_active {
                    (DetectionState::Waiting, StateAction::Arm)
                } else {
                    (*self, StateAction::RejectStart)
                }
            }
            (DetectionState::Waiting | DetectionState::Running, SchedulerEvent::Start { .. }) => {
                (*self, StateAction::AlreadyActive)
            }

            (DetectionState::Waiting, SchedulerEvent::Tick) => {
                (DetectionState::Running, StateAction::StartCycle)
            }
            // 上一个周期未结束，丢弃而不排队
            (DetectionState::Running, SchedulerEvent::Tick) => {
                (DetectionState::Running, StateAction::DropTick)
            }

            (DetectionState::Running, SchedulerEvent::CycleCompleted { probability }) => {
                if probability >= threshold {
                    (DetectionState::Stopped, StateAction::Accept)
                } else {
                    (DetectionState::Waiting, StateAction::Continue)
                }
            }
            (DetectionState::Running, SchedulerEvent::CycleAborted) => {
                (DetectionState::Waiting, StateAction::Continue)
            }

            (state, _) => (*state, StateAction::Ignore),
        }
    }
}
