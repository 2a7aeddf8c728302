//! 播放控制
//!
//! 暂停、继续和单步由外部命令驱动。状态转换是纯函数，
//! 返回值告诉调用方是否需要向宿主请求新的一帧。
//!
//! 指针语义：按下切换暂停；暂停状态下抬起会执行一次单步，然后重新暂停。

use serde::{Deserialize, Serialize};

/// 播放状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    /// 每帧模拟并持续请求下一帧
    #[default]
    Running,
    /// 不模拟，不请求新帧
    Paused,
    /// 模拟并渲染一帧后回到暂停
    SingleStep,
}

/// 外部控制命令
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlCommand {
    PointerDown,
    PointerUp,
    Pause,
    Resume,
    Step,
}

/// 一次状态转换的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlOutcome {
    pub state: PlaybackState,
    /// 是否需要请求新的一帧
    pub request_render: bool,
}

impl PlaybackState {
    /// 应用控制命令
    pub fn apply(self, command: ControlCommand) -> ControlOutcome {
        use ControlCommand::*;
        use PlaybackState::*;

        let (state, request_render) = match (self, command) {
            (Running, PointerDown) => (Paused, false),
            (Paused, PointerDown) => (Running, true),
            (SingleStep, PointerDown) => (Paused, false),

            (Paused, PointerUp) => (SingleStep, true),
            (state, PointerUp) => (state, false),

            (_, Pause) => (Paused, false),

            (Running, Resume) => (Running, false),
            (_, Resume) => (Running, true),

            (Paused, Step) => (SingleStep, true),
            (state, Step) => (state, false),
        };

        if state != self {
            tracing::debug!(
                target: "flow::control",
                from = ?self,
                to = ?state,
                ?command,
                "Playback state changed"
            );
        }
        ControlOutcome {
            state,
            request_render,
        }
    }

    /// 本帧是否执行模拟
    pub fn should_simulate(self) -> bool {
        matches!(self, PlaybackState::Running | PlaybackState::SingleStep)
    }

    /// 帧结束后的状态：单步完成后回到暂停
    pub fn after_frame(self) -> Self {
        match self {
            PlaybackState::SingleStep => PlaybackState::Paused,
            state => state,
        }
    }

    /// 帧结束后是否请求下一帧
    pub fn requests_next_frame(self) -> bool {
        self == PlaybackState::Running
    }
}
