//! 一括復旧の状態遷移
//!
//! Idle → Confirming(wipe) → Running(i/N) → Completed
//! Confirming で消去を拒否すると Aborted。
//! 失敗時中断ポリシーの場合のみ Running → Aborted もあり得る。

use thiserror::Error;

/// 一括復旧の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreState {
    Idle,
    /// userdata 消去の確認待ち
    Confirming { wipe: bool },
    /// step は 0 始まり
    Running { step: usize, total: usize },
    Completed,
    Aborted,
}

/// 開始・遷移の拒否理由
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RestoreError {
    #[error("Required firmware images are missing")]
    NotReady,

    #[error("No device detected")]
    NoDevice,

    #[error("Cannot {action} while {state:?}")]
    InvalidTransition {
        state: RestoreState,
        action: &'static str,
    },
}

/// ステップ失敗時の扱い
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// 失敗しても次のステップへ進む（従来の動作）
    #[default]
    Continue,
    /// 失敗したステップで中断する
    Abort,
}

#[derive(Debug, Clone)]
pub struct RestoreMachine {
    state: RestoreState,
    total: usize,
}

impl RestoreMachine {
    pub fn new(total_steps: usize) -> Self {
        Self {
            state: RestoreState::Idle,
            total: total_steps,
        }
    }

    pub fn state(&self) -> RestoreState {
        self.state
    }

    /// 開始。消去指定があれば確認待ち、なければそのまま実行へ
    pub fn begin(&mut self, ready: bool, connected: bool, wipe: bool) -> Result<RestoreState, RestoreError> {
        if self.state != RestoreState::Idle {
            return Err(self.invalid("begin"));
        }
        if !ready {
            return Err(RestoreError::NotReady);
        }
        if !connected {
            return Err(RestoreError::NoDevice);
        }

        self.state = if wipe {
            RestoreState::Confirming { wipe }
        } else {
            self.first_step()
        };
        Ok(self.state)
    }

    /// 消去確認の結果
    pub fn confirm(&mut self, accepted: bool) -> Result<RestoreState, RestoreError> {
        if !matches!(self.state, RestoreState::Confirming { .. }) {
            return Err(self.invalid("confirm"));
        }
        self.state = if accepted {
            self.first_step()
        } else {
            RestoreState::Aborted
        };
        Ok(self.state)
    }

    /// 現在のステップを終えて次へ
    pub fn advance(&mut self) -> Result<RestoreState, RestoreError> {
        let RestoreState::Running { step, total } = self.state else {
            return Err(self.invalid("advance"));
        };
        self.state = if step + 1 >= total {
            RestoreState::Completed
        } else {
            RestoreState::Running { step: step + 1, total }
        };
        Ok(self.state)
    }

    /// 実行中に中断（中断ポリシーまたはキャンセル）
    pub fn halt(&mut self) -> Result<RestoreState, RestoreError> {
        if !matches!(self.state, RestoreState::Running { .. }) {
            return Err(self.invalid("halt"));
        }
        self.state = RestoreState::Aborted;
        Ok(self.state)
    }

    fn first_step(&self) -> RestoreState {
        if self.total == 0 {
            RestoreState::Completed
        } else {
            RestoreState::Running {
                step: 0,
                total: self.total,
            }
        }
    }

    fn invalid(&self, action: &'static str) -> RestoreError {
        RestoreError::InvalidTransition {
            state: self.state,
            action,
        }
    }
}
